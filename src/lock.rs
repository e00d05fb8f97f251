//! File-based advisory lock around capture/restore.
//!
//! Cross-platform (fs2) advisory lock on `<working_dir>/LOCK`:
//! - Exclusive: one capture/restore per working directory on this host.
//! - Shared: readers of a single-file store (FileDumper export).
//!
//! Lock is released on Drop. Не защищает от процессов, которые лок не берут.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::consts::LOCK_FILE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

#[derive(Debug)]
pub struct LockGuard {
    file: std::fs::File,
    path: PathBuf,
    mode: LockMode,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

pub fn lock_file_path(dir: &Path) -> PathBuf {
    dir.join(LOCK_FILE)
}

/// Заблокировать произвольный файл (создаётся при необходимости). Блокирует до получения.
pub fn lock_path(path: &Path, mode: LockMode) -> Result<LockGuard> {
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(path)
        .with_context(|| format!("open lock file {}", path.display()))?;
    match mode {
        LockMode::Shared => file
            .lock_shared()
            .with_context(|| format!("lock_shared {}", path.display()))?,
        LockMode::Exclusive => file
            .lock_exclusive()
            .with_context(|| format!("lock_exclusive {}", path.display()))?,
    }
    Ok(LockGuard {
        file,
        path: path.to_path_buf(),
        mode,
    })
}

/// Exclusive lock на `<dir>/LOCK`. Блокирует до получения.
pub fn acquire_exclusive_lock(dir: &Path) -> Result<LockGuard> {
    lock_path(&lock_file_path(dir), LockMode::Exclusive)
}

/// Exclusive lock на `<dir>/LOCK` без ожидания. Err, если уже занят.
pub fn try_acquire_exclusive_lock(dir: &Path) -> Result<LockGuard> {
    let path = lock_file_path(dir);
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(&path)
        .with_context(|| format!("open lock file {}", path.display()))?;
    file.try_lock_exclusive()
        .with_context(|| format!("try_lock_exclusive failed: {}", path.display()))?;
    Ok(LockGuard {
        file,
        path,
        mode: LockMode::Exclusive,
    })
}
