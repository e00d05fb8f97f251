//! PackCodec — архив SPACK001 (фреймы из `frame`) поверх none|gzip|zstd.
//!
//! create:
//! - имена записей — только base name (без разделителей, не "." / ".."), без дублей;
//! - target перезаписывается целиком (truncate); при ошибке посередине файл остаётся
//!   частично записанным — вызывающая сторона не должна его переиспользовать.
//!
//! extract:
//! - сжатие определяется по первым байтам файла (gzip 1f8b, zstd 28b52ffd, raw SPACK001);
//! - каждая запись пишется в <dest_dir>/<name>;
//! - CRC каждой записи проверяется, отсутствие маркера конца — ошибка формата.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::{debug, info};
use serde::Serialize;

use super::frame::{FrameReader, FrameWriter};
use super::{ArchiveCodec, ArchiveEntry, Compression};
use crate::consts::{GZIP_MAGIC, PACK_MAGIC, ZSTD_MAGIC};
use crate::error::SnapError;
use crate::metrics::{record_archive_read, record_archive_written};

/// Сводка по записи архива (для inspect).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    pub name: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PackCodec {
    compression: Compression,
}

impl PackCodec {
    pub fn new(compression: Compression) -> Self {
        Self { compression }
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Список записей архива без распаковки (CRC проверяется).
    pub fn list(&self, archive: &Path) -> Result<Vec<EntryInfo>> {
        let (input, _) = open_detected(archive)?;
        let mut reader = FrameReader::new(input, PACK_MAGIC, archive)?;
        let mut out = Vec::new();
        while let Some(frame) = reader.next_frame()? {
            let name = frame.name.clone();
            let bytes = reader.skip_data(frame)?;
            out.push(EntryInfo { name, bytes });
        }
        Ok(out)
    }
}

impl ArchiveCodec for PackCodec {
    fn create(&self, target: &Path, entries: &[ArchiveEntry]) -> Result<()> {
        let mut seen = HashSet::new();
        for e in entries {
            validate_entry_name(&e.name).map_err(SnapError::config)?;
            if !seen.insert(e.name.as_str()) {
                return Err(
                    SnapError::config(format!("duplicate archive entry '{}'", e.name)).into(),
                );
            }
        }

        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| SnapError::io("create_dir_all", parent, e))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(target)
            .map_err(|e| SnapError::io("create", target, e))?;
        let out = BufWriter::new(file);

        let bytes = match self.compression {
            Compression::None => {
                let (w, bytes) = write_entries(out, entries)?;
                finish_file(w, target)?;
                bytes
            }
            Compression::Gzip => {
                let enc = GzEncoder::new(out, flate2::Compression::default());
                let (enc, bytes) = write_entries(enc, entries)?;
                let w = enc.finish().map_err(|e| SnapError::io("write", target, e))?;
                finish_file(w, target)?;
                bytes
            }
            Compression::Zstd => {
                let enc = zstd::stream::write::Encoder::new(out, 0)
                    .map_err(|e| SnapError::io("zstd init", target, e))?;
                let (enc, bytes) = write_entries(enc, entries)?;
                let w = enc.finish().map_err(|e| SnapError::io("write", target, e))?;
                finish_file(w, target)?;
                bytes
            }
        };

        let on_disk = fs::metadata(target)
            .map_err(|e| SnapError::io("stat", target, e))?
            .len();
        record_archive_written(on_disk);

        info!(
            "archive: created {} (entries={}, raw_bytes={}, on_disk={}, compression={})",
            target.display(),
            entries.len(),
            bytes,
            on_disk,
            self.compression
        );
        Ok(())
    }

    fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>> {
        let (input, detected) = open_detected(archive)?;
        debug!(
            "archive: extract {} into {} (compression={})",
            archive.display(),
            dest_dir.display(),
            detected
        );

        fs::create_dir_all(dest_dir).map_err(|e| SnapError::io("create_dir_all", dest_dir, e))?;

        let mut reader = FrameReader::new(input, PACK_MAGIC, archive)?;
        let mut extracted = Vec::new();
        let mut total: u64 = 0;

        while let Some(frame) = reader.next_frame()? {
            validate_entry_name(&frame.name).map_err(|m| SnapError::format(archive, m))?;
            let dst = dest_dir.join(&frame.name);
            let file = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&dst)
                .map_err(|e| SnapError::io("create", &dst, e))?;
            let mut w = BufWriter::new(file);
            total += reader.read_data(frame, &mut w)?;
            w.flush().map_err(|e| SnapError::io("write", &dst, e))?;
            extracted.push(dst);
        }

        record_archive_read(total);
        info!(
            "archive: extracted {} entr(y/ies), {} bytes from {}",
            extracted.len(),
            total,
            archive.display()
        );
        Ok(extracted)
    }
}

fn write_entries<W: Write>(w: W, entries: &[ArchiveEntry]) -> Result<(W, u64)> {
    let mut fw = FrameWriter::new(w, PACK_MAGIC)?;
    for e in entries {
        let n = fw.add_file(&e.name, &e.path)?;
        debug!("archive: + {} ({} B) from {}", e.name, n, e.path.display());
    }
    let bytes = fw.bytes();
    Ok((fw.finish()?, bytes))
}

fn finish_file(mut w: BufWriter<File>, target: &Path) -> Result<()> {
    w.flush().map_err(|e| SnapError::io("write", target, e))?;
    let f = w
        .into_inner()
        .map_err(|e| SnapError::io("write", target, e.into_error()))?;
    f.sync_all().map_err(|e| SnapError::io("fsync", target, e))?;
    Ok(())
}

/// Открыть архив и подобрать декодер по сигнатуре.
fn open_detected(archive: &Path) -> Result<(Box<dyn Read>, Compression)> {
    let file = File::open(archive).map_err(|e| SnapError::io("open", archive, e))?;
    let mut br = BufReader::new(file);
    let head = br
        .fill_buf()
        .map_err(|e| SnapError::io("read", archive, e))?;

    if head.is_empty() {
        return Err(SnapError::format(archive, "empty archive").into());
    }
    let kind = if head.starts_with(GZIP_MAGIC) {
        Compression::Gzip
    } else if head.starts_with(ZSTD_MAGIC) {
        Compression::Zstd
    } else if head.starts_with(PACK_MAGIC) {
        Compression::None
    } else {
        return Err(SnapError::format(archive, "unknown archive signature").into());
    };

    let input: Box<dyn Read> = match kind {
        Compression::None => Box::new(br),
        Compression::Gzip => Box::new(GzDecoder::new(br)),
        Compression::Zstd => Box::new(
            zstd::stream::read::Decoder::with_buffer(br)
                .map_err(|e| SnapError::io("zstd init", archive, e))?,
        ),
    };
    Ok((input, kind))
}

/// Имя записи архива — ровно один нормальный компонент пути.
fn validate_entry_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(format!("invalid entry name '{}'", name));
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(format!("entry name must be a base name: '{}'", name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_names() {
        assert!(validate_entry_name("current.sql").is_ok());
        assert!(validate_entry_name("..").is_err());
        assert!(validate_entry_name("a/b").is_err());
        assert!(validate_entry_name("").is_err());
    }
}
