// tests/config_env.rs
//
// SnapshotConfig::from_env(): SP_* переменные и производные пути.
// Один тест на файл: окружение процесса общее для всех потоков.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use statepack::{error_kind, Compression, ErrorKind, SnapshotConfig};

const VARS: &[&str] = &[
    "SP_WORKING_DIR",
    "SP_RELATIONAL_DUMP",
    "SP_SEARCH_DUMP",
    "SP_USE_CACHE",
    "SP_ARCHIVE",
    "SP_ENV",
    "SP_CACHE_WINDOW_SECS",
    "SP_COMPRESSION",
    "SP_EXCLUSIVE_LOCK",
];

fn clear() {
    for v in VARS {
        std::env::remove_var(v);
    }
}

#[test]
fn from_env_overrides_and_validation() -> Result<()> {
    clear();

    // defaults
    let cfg = SnapshotConfig::from_env()?;
    assert_eq!(cfg.working_dir(), std::env::temp_dir().join("statepack"));
    assert_eq!(cfg.relational_dump_path(), cfg.working_dir().join("current.sql"));
    assert_eq!(cfg.search_dump_path(), cfg.working_dir().join("current.idx"));
    assert!(!cfg.use_cache());
    assert!(cfg.archive_path().is_none());
    assert_eq!(cfg.environment(), "development");
    assert_eq!(cfg.cache_window(), Duration::from_secs(60));
    assert_eq!(cfg.compression(), Compression::Gzip);
    assert!(!cfg.exclusive_lock());

    // overrides
    std::env::set_var("SP_WORKING_DIR", "/srv/snap");
    std::env::set_var("SP_SEARCH_DUMP", "/var/spool/index.dump");
    std::env::set_var("SP_USE_CACHE", "yes");
    std::env::set_var("SP_ARCHIVE", "/srv/snap/latest.archive");
    std::env::set_var("SP_ENV", "staging");
    std::env::set_var("SP_CACHE_WINDOW_SECS", "300");
    std::env::set_var("SP_COMPRESSION", "zstd");
    std::env::set_var("SP_EXCLUSIVE_LOCK", "1");

    let cfg = SnapshotConfig::from_env()?;
    assert_eq!(cfg.working_dir(), PathBuf::from("/srv/snap"));
    // не заданный явно путь выводится из working_dir
    assert_eq!(cfg.relational_dump_path(), PathBuf::from("/srv/snap/current.sql"));
    assert_eq!(cfg.search_dump_path(), PathBuf::from("/var/spool/index.dump"));
    assert!(cfg.use_cache());
    assert_eq!(
        cfg.archive_path(),
        Some(PathBuf::from("/srv/snap/latest.archive").as_path())
    );
    assert_eq!(cfg.environment(), "staging");
    assert_eq!(cfg.cache_window(), Duration::from_secs(300));
    assert_eq!(cfg.compression(), Compression::Zstd);
    assert!(cfg.exclusive_lock());

    let shown = cfg.to_string();
    assert!(shown.contains("environment: staging"), "{shown}");

    // пустое значение = не задано
    std::env::set_var("SP_ARCHIVE", "  ");
    assert!(SnapshotConfig::from_env()?.archive_path().is_none());

    // невалидные значения → Configuration
    for (var, bad) in [
        ("SP_USE_CACHE", "maybe"),
        ("SP_CACHE_WINDOW_SECS", "-5"),
        ("SP_COMPRESSION", "lz4"),
    ] {
        let saved = std::env::var(var).ok();
        std::env::set_var(var, bad);
        let err = SnapshotConfig::from_env().unwrap_err();
        assert_eq!(error_kind(&err), Some(ErrorKind::Configuration), "{var}={bad}");
        match saved {
            Some(v) => std::env::set_var(var, v),
            None => std::env::remove_var(var),
        }
    }

    clear();
    Ok(())
}
