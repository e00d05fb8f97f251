// tests/cache_window.rs
//
// Окно свежести capture:
// 1) use_cache + архив моложе 60 с → тот же путь, ни одного вызова дамперов.
// 2) force_cache (capture_cached) работает и при use_cache=false.
// 3) Архив старше окна (61 с) → полный цикл, target перезаписан.
// 4) Без кэша свежий архив всё равно пересобирается.

mod common;

use std::fs::{self, File};
use std::time::{Duration, SystemTime};

use anyhow::Result;

use common::{journal, unique_root, MemDumper};
use statepack::metrics::metrics_snapshot;
use statepack::{SnapshotConfig, SnapshotOrchestrator};

fn age_file(path: &std::path::Path, secs: u64) -> Result<()> {
    let f = File::options().write(true).open(path)?;
    f.set_modified(SystemTime::now() - Duration::from_secs(secs))?;
    Ok(())
}

#[test]
fn fresh_archive_reused_without_dumper_calls() -> Result<()> {
    let wd = unique_root("cache-hit");
    fs::create_dir_all(&wd)?;
    let target = wd.join("recent.archive");
    fs::write(&target, b"previously captured")?;

    let log = journal();
    let cfg = SnapshotConfig::builder()
        .working_dir(&wd)
        .use_cache(true)
        .build();
    let orch = SnapshotOrchestrator::with_pack_codec(
        cfg,
        MemDumper::new("relational", b"r", &log),
        MemDumper::new("search", b"s", &log),
    )?;

    let hits_before = metrics_snapshot().capture_cache_hits;
    let got = orch.capture(Some(target.as_path()), false)?;
    assert_eq!(got, target);
    assert!(log.borrow().is_empty(), "calls: {:?}", log.borrow());
    // содержимое не тронуто
    assert_eq!(fs::read(&target)?, b"previously captured");
    assert!(metrics_snapshot().capture_cache_hits > hits_before);
    Ok(())
}

#[test]
fn force_cache_overrides_config() -> Result<()> {
    let wd = unique_root("cache-force");
    fs::create_dir_all(&wd)?;
    let target = wd.join("recent.archive");
    fs::write(&target, b"x")?;

    let log = journal();
    let cfg = SnapshotConfig::builder().working_dir(&wd).build();
    let orch = SnapshotOrchestrator::with_pack_codec(
        cfg,
        MemDumper::new("relational", b"r", &log),
        MemDumper::new("search", b"s", &log),
    )?;

    assert_eq!(orch.capture_cached(Some(target.as_path()))?, target);
    assert!(log.borrow().is_empty());
    Ok(())
}

#[test]
fn stale_archive_is_recaptured() -> Result<()> {
    let wd = unique_root("cache-stale");
    fs::create_dir_all(&wd)?;
    let target = wd.join("old.archive");
    fs::write(&target, b"stale bytes")?;
    age_file(&target, 61)?;
    let old_mtime = fs::metadata(&target)?.modified()?;

    let log = journal();
    let cfg = SnapshotConfig::builder()
        .working_dir(&wd)
        .use_cache(true)
        .build();
    let orch = SnapshotOrchestrator::with_pack_codec(
        cfg,
        MemDumper::new("relational", b"r", &log),
        MemDumper::new("search", b"s", &log),
    )?;

    let got = orch.capture(Some(target.as_path()), false)?;
    assert_eq!(got, target);
    assert_eq!(log.borrow().len(), 2, "both exports must run");
    assert_ne!(fs::read(&target)?, b"stale bytes");
    assert!(fs::metadata(&target)?.modified()? > old_mtime);
    Ok(())
}

#[test]
fn without_cache_fresh_archive_is_overwritten() -> Result<()> {
    let wd = unique_root("cache-off");
    fs::create_dir_all(&wd)?;
    let target = wd.join("recent.archive");
    fs::write(&target, b"just written")?;

    let log = journal();
    let cfg = SnapshotConfig::builder().working_dir(&wd).build();
    let orch = SnapshotOrchestrator::with_pack_codec(
        cfg,
        MemDumper::new("relational", b"r", &log),
        MemDumper::new("search", b"s", &log),
    )?;

    orch.capture(Some(target.as_path()), false)?;
    assert_eq!(log.borrow().len(), 2);
    assert_ne!(fs::read(&target)?, b"just written");
    Ok(())
}

#[test]
fn custom_window_is_respected() -> Result<()> {
    let wd = unique_root("cache-window");
    fs::create_dir_all(&wd)?;
    let target = wd.join("a.archive");
    fs::write(&target, b"x")?;
    age_file(&target, 120)?;

    let log = journal();
    let cfg = SnapshotConfig::builder()
        .working_dir(&wd)
        .use_cache(true)
        .cache_window(Duration::from_secs(600))
        .build();
    let orch = SnapshotOrchestrator::with_pack_codec(
        cfg,
        MemDumper::new("relational", b"r", &log),
        MemDumper::new("search", b"s", &log),
    )?;

    orch.capture(Some(target.as_path()), false)?;
    assert!(log.borrow().is_empty());
    Ok(())
}
