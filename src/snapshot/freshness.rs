//! Окно свежести для повторного использования уже собранного архива.
//!
//! Архив свежий, если файл существует и его mtime строго новее `now - window`.
//! Проверка — обычное чтение metadata, без лока и без сверки содержимого.

use std::path::Path;
use std::time::{Duration, SystemTime};

use anyhow::Result;

use crate::error::SnapError;

pub fn is_fresh(path: &Path, window: Duration, now: SystemTime) -> Result<bool> {
    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(SnapError::io("stat", path, e).into()),
    };
    if !meta.is_file() {
        return Ok(false);
    }
    let mtime = meta
        .modified()
        .map_err(|e| SnapError::io("mtime", path, e))?;
    Ok(match now.checked_sub(window) {
        Some(cutoff) => mtime > cutoff,
        None => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};

    fn temp_file(tag: &str) -> std::path::PathBuf {
        let p = std::env::temp_dir().join(format!(
            "sp-fresh-{}-{}-{}",
            tag,
            std::process::id(),
            SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        fs::write(&p, b"x").unwrap();
        p
    }

    #[test]
    fn missing_file_is_not_fresh() {
        let p = std::env::temp_dir().join("sp-fresh-definitely-missing.archive");
        assert!(!is_fresh(&p, Duration::from_secs(60), SystemTime::now()).unwrap());
    }

    #[test]
    fn boundary_is_strict() {
        let p = temp_file("boundary");
        let mtime = fs::metadata(&p).unwrap().modified().unwrap();
        let window = Duration::from_secs(60);
        // mtime == now - window → не свежий
        assert!(!is_fresh(&p, window, mtime + window).unwrap());
        assert!(is_fresh(&p, window, mtime + window - Duration::from_secs(1)).unwrap());
        let _ = fs::remove_file(&p);
    }

    #[test]
    fn old_file_is_stale() {
        let p = temp_file("old");
        let f = File::options().write(true).open(&p).unwrap();
        f.set_modified(SystemTime::now() - Duration::from_secs(61)).unwrap();
        drop(f);
        assert!(!is_fresh(&p, Duration::from_secs(60), SystemTime::now()).unwrap());
        let _ = fs::remove_file(&p);
    }
}
