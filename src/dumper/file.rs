//! FileDumper — однофайловое хранилище (например, файл встроенной SQL-базы).
//!
//! export: копия `<store>` → dst под shared-локом `<store>.lock`;
//! import: копия src → `<store>` под exclusive-локом (через временный файл + rename).
//!
//! Писатели самого хранилища должны брать тот же `<store>.lock`, иначе копия
//! может оказаться несогласованной.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use log::debug;

use super::StoreDumper;
use crate::error::SnapError;
use crate::lock::{lock_path, LockMode};

#[derive(Debug, Clone)]
pub struct FileDumper {
    name: String,
    store: PathBuf,
}

impl FileDumper {
    pub fn new<N: Into<String>, P: Into<PathBuf>>(name: N, store: P) -> Self {
        Self {
            name: name.into(),
            store: store.into(),
        }
    }

    pub fn store_path(&self) -> &Path {
        &self.store
    }

    fn lock_file(&self) -> PathBuf {
        let mut s = self.store.clone().into_os_string();
        s.push(".lock");
        PathBuf::from(s)
    }
}

impl StoreDumper for FileDumper {
    fn name(&self) -> &str {
        &self.name
    }

    fn export(&self, dst: &Path) -> Result<()> {
        if !self.store.is_file() {
            return Err(SnapError::backend(
                &self.name,
                format!("store file {} not found", self.store.display()),
            )
            .into());
        }
        let _guard = lock_path(&self.lock_file(), LockMode::Shared)?;
        let n = fs::copy(&self.store, dst).map_err(|e| SnapError::io("copy", dst, e))?;
        debug!(
            "{}: exported {} B from {} to {}",
            self.name,
            n,
            self.store.display(),
            dst.display()
        );
        Ok(())
    }

    fn import(&self, src: &Path) -> Result<()> {
        if let Some(parent) = self.store.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| SnapError::io("create_dir_all", parent, e))?;
            }
        }
        let _guard = lock_path(&self.lock_file(), LockMode::Exclusive)?;

        // rename в пределах каталога хранилища: читатели видят либо старый, либо новый файл
        let mut tmp = self.store.clone().into_os_string();
        tmp.push(".importing");
        let tmp = PathBuf::from(tmp);
        let n = match fs::copy(src, &tmp) {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                return Err(SnapError::io("copy", src, e).into());
            }
        };
        if let Err(e) = fs::rename(&tmp, &self.store) {
            let _ = fs::remove_file(&tmp);
            return Err(SnapError::io("rename", &self.store, e).into());
        }
        debug!(
            "{}: imported {} B from {} into {}",
            self.name,
            n,
            src.display(),
            self.store.display()
        );
        Ok(())
    }
}
