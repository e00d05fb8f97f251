//! archive — контракт архивного кодека и его реализация по умолчанию.
//!
//! Состав:
//! - ArchiveCodec: create(target, entries) / extract(archive, dest_dir).
//! - frame: низкоуровневый формат фреймов (общий с TreeDumper).
//! - pack: PackCodec — контейнер SPACK001 поверх none|gzip|zstd.
//!
//! Оркестратору нужно лишь одно свойство: extract воспроизводит файлы
//! под теми же именами (base name), под которыми они были упакованы.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Result;

use crate::error::SnapError;

pub mod frame;
pub mod pack;

pub use pack::{EntryInfo, PackCodec};

/// Файл для упаковки и его имя внутри архива.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: PathBuf,
    pub name: String,
}

impl ArchiveEntry {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(path: P, name: S) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }

    /// Запись с именем = base name файла.
    pub fn from_base_name(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                SnapError::config(format!("path has no usable file name: {}", path.display()))
            })?;
        Ok(Self::new(path, name))
    }
}

/// Архивный кодек (внешний коллаборатор оркестратора).
pub trait ArchiveCodec {
    /// Создать архив `target` из набора файлов. Существующий файл перезаписывается.
    fn create(&self, target: &Path, entries: &[ArchiveEntry]) -> Result<()>;

    /// Распаковать архив в `dest_dir`. Возвращает пути извлечённых файлов.
    fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>>;
}

impl<T: ArchiveCodec + ?Sized> ArchiveCodec for Box<T> {
    fn create(&self, target: &Path, entries: &[ArchiveEntry]) -> Result<()> {
        (**self).create(target, entries)
    }

    fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>> {
        (**self).extract(archive, dest_dir)
    }
}

/// Сжатие потока архива.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Compression {
    None,
    #[default]
    Gzip,
    Zstd,
}

impl FromStr for Compression {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Compression::None),
            "gzip" | "gz" => Ok(Compression::Gzip),
            "zstd" | "zst" => Ok(Compression::Zstd),
            _ => Err(SnapError::config(format!(
                "invalid compression '{}' (supported: none|gzip|zstd)",
                s
            ))
            .into()),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Zstd => "zstd",
        };
        f.write_str(s)
    }
}
