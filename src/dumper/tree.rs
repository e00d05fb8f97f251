//! TreeDumper — хранилище в виде каталога (например, on-disk индекс поискового движка).
//!
//! export: рекурсивный обход каталога (в отсортированном порядке) → один файл
//! формата фреймов с magic SPTREE01. Имена — относительные пути через '/'.
//! Пустые каталоги пишутся как записи с завершающим '/' и нулевой длиной.
//! Симлинки и специальные файлы пропускаются.
//!
//! import: распаковка в соседний `<dir>.importing`, затем замена исходного каталога.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use anyhow::Result;
use log::{debug, warn};

use super::StoreDumper;
use crate::archive::frame::{FrameReader, FrameWriter};
use crate::consts::TREE_MAGIC;
use crate::error::SnapError;

#[derive(Debug, Clone)]
pub struct TreeDumper {
    name: String,
    root: PathBuf,
}

impl TreeDumper {
    pub fn new<N: Into<String>, P: Into<PathBuf>>(name: N, root: P) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn staging_dir(&self) -> PathBuf {
        let mut s = self.root.clone().into_os_string();
        s.push(".importing");
        PathBuf::from(s)
    }
}

impl StoreDumper for TreeDumper {
    fn name(&self) -> &str {
        &self.name
    }

    fn export(&self, dst: &Path) -> Result<()> {
        if !self.root.is_dir() {
            return Err(SnapError::backend(
                &self.name,
                format!("store directory {} not found", self.root.display()),
            )
            .into());
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(dst)
            .map_err(|e| SnapError::io("create", dst, e))?;
        let mut fw = FrameWriter::new(BufWriter::new(file), TREE_MAGIC)?;

        walk(&self.name, &self.root, "", &mut fw)?;

        let (frames, bytes) = (fw.frames(), fw.bytes());
        let mut w = fw.finish()?;
        w.flush().map_err(|e| SnapError::io("write", dst, e))?;

        debug!(
            "{}: exported tree {} → {} (entries={}, bytes={})",
            self.name,
            self.root.display(),
            dst.display(),
            frames,
            bytes
        );
        Ok(())
    }

    fn import(&self, src: &Path) -> Result<()> {
        let staging = self.staging_dir();
        if staging.exists() {
            fs::remove_dir_all(&staging)
                .map_err(|e| SnapError::io("remove_dir_all", &staging, e))?;
        }
        fs::create_dir_all(&staging).map_err(|e| SnapError::io("create_dir_all", &staging, e))?;

        let f = File::open(src).map_err(|e| SnapError::io("open", src, e))?;
        let mut reader = FrameReader::new(BufReader::new(f), TREE_MAGIC, src)?;
        let mut entries = 0u64;

        while let Some(frame) = reader.next_frame()? {
            let rel = parse_rel_path(&frame.name).map_err(|m| SnapError::format(src, m))?;
            let dst = staging.join(&rel);

            if frame.name.ends_with('/') {
                fs::create_dir_all(&dst).map_err(|e| SnapError::io("create_dir_all", &dst, e))?;
                reader.skip_data(frame)?;
            } else {
                if let Some(parent) = dst.parent() {
                    fs::create_dir_all(parent)
                        .map_err(|e| SnapError::io("create_dir_all", parent, e))?;
                }
                let out = File::create(&dst).map_err(|e| SnapError::io("create", &dst, e))?;
                let mut w = BufWriter::new(out);
                reader.read_data(frame, &mut w)?;
                w.flush().map_err(|e| SnapError::io("write", &dst, e))?;
            }
            entries += 1;
        }

        if self.root.exists() {
            fs::remove_dir_all(&self.root)
                .map_err(|e| SnapError::io("remove_dir_all", &self.root, e))?;
        }
        fs::rename(&staging, &self.root).map_err(|e| SnapError::io("rename", &self.root, e))?;

        debug!(
            "{}: imported tree {} entr(y/ies) from {} into {}",
            self.name,
            entries,
            src.display(),
            self.root.display()
        );
        Ok(())
    }
}

fn walk<W: Write>(
    store: &str,
    dir: &Path,
    prefix: &str,
    fw: &mut FrameWriter<W>,
) -> Result<()> {
    let mut items: Vec<_> = fs::read_dir(dir)
        .map_err(|e| SnapError::io("read_dir", dir, e))?
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| SnapError::io("read_dir", dir, e))?;
    items.sort_by_key(|e| e.file_name());

    if items.is_empty() && !prefix.is_empty() {
        fw.add_bytes(prefix, &[])?;
        return Ok(());
    }

    for item in items {
        let path = item.path();
        let fname = item.file_name();
        let fname = match fname.to_str() {
            Some(s) => s.to_string(),
            None => {
                warn!("tree: skip non-UTF8 name {}", path.display());
                continue;
            }
        };
        let ft = item
            .file_type()
            .map_err(|e| SnapError::io("stat", &path, e))?;
        if ft.is_dir() {
            let entry = format!("{}{}/", prefix, fname);
            check_entry(store, &entry, &path)?;
            walk(store, &path, &entry, fw)?;
        } else if ft.is_file() {
            let entry = format!("{}{}", prefix, fname);
            check_entry(store, &entry, &path)?;
            fw.add_file(&entry, &path)?;
        } else {
            warn!("tree: skip non-regular entry {}", path.display());
        }
    }
    Ok(())
}

/// Export пишет только те имена, которые import сможет разобрать.
fn check_entry(store: &str, entry: &str, path: &Path) -> Result<()> {
    parse_rel_path(entry).map_err(|m| {
        SnapError::backend(store, format!("cannot export {}: {}", path.display(), m))
    })?;
    Ok(())
}

/// Относительный путь записи: компоненты через '/', без "..", "." и абсолютных путей.
fn parse_rel_path(name: &str) -> std::result::Result<PathBuf, String> {
    let trimmed = name.strip_suffix('/').unwrap_or(name);
    if trimmed.is_empty() || name.starts_with('/') || name.contains('\\') || name.contains('\0') {
        return Err(format!("invalid tree entry '{}'", name));
    }
    let mut out = PathBuf::new();
    for part in trimmed.split('/') {
        let p = Path::new(part);
        match p.components().next() {
            Some(Component::Normal(_)) if p.components().count() == 1 => out.push(part),
            _ => return Err(format!("invalid tree entry component '{}' in '{}'", part, name)),
        }
    }
    Ok(out)
}
