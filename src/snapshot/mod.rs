//! snapshot — оркестратор capture/restore двух подсистем через один архив.
//!
//! Capture:
//!   1) target = явный путь | cfg.archive_path | <working_dir>/{env}.{ts}.archive
//!   2) mkdir -p working_dir (идемпотентно), опционально exclusive lock
//!   3) кэш (use_cache || force_cache): target свежее окна → вернуть target, ничего не трогая
//!   4) relational.export(relational_dump_path), затем search.export(search_dump_path)
//!   5) codec.create(target, [base names обоих файлов]) → target
//!
//! Restore:
//!   1) archive = явный путь | cfg.archive_path, иначе Configuration error (без побочных эффектов)
//!   2) mkdir -p working_dir, опционально exclusive lock
//!   3) codec.extract(archive, working_dir)
//!   4) relational.import(relational_dump_path), затем search.import(search_dump_path)
//!
//! Ограничения:
//! - экспорты двух подсистем не связаны транзакционно;
//! - упавший capture может оставить target частично записанным;
//! - упавший restore может обновить одну подсистему и не обновить другую;
//! - промежуточные файлы фиксированы: параллельные capture в один working_dir гоняются
//!   за одни и те же пути (exclusive_lock закрывает это в пределах одного хоста).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::Result;
use log::{debug, info, warn};

use crate::archive::{ArchiveCodec, ArchiveEntry, PackCodec};
use crate::config::SnapshotConfig;
use crate::dumper::StoreDumper;
use crate::error::SnapError;
use crate::lock::{acquire_exclusive_lock, LockGuard};
use crate::metrics::{record_capture, record_capture_cache_hit, record_restore};

pub mod freshness;
pub mod naming;

pub use freshness::is_fresh;
pub use naming::{default_archive_name, default_archive_path};

pub struct SnapshotOrchestrator<R, S, C = PackCodec> {
    cfg: SnapshotConfig,
    relational: R,
    search: S,
    codec: C,
    relational_entry: String,
    search_entry: String,
}

impl<R: StoreDumper, S: StoreDumper> SnapshotOrchestrator<R, S, PackCodec> {
    /// Оркестратор с PackCodec, сжатие берётся из конфигурации.
    pub fn with_pack_codec(cfg: SnapshotConfig, relational: R, search: S) -> Result<Self> {
        let codec = PackCodec::new(cfg.compression());
        Self::new(cfg, relational, search, codec)
    }
}

impl<R: StoreDumper, S: StoreDumper, C: ArchiveCodec> SnapshotOrchestrator<R, S, C> {
    /// Проверяет, что у промежуточных файлов есть base name и они различаются
    /// (иначе в архиве не различить записи).
    pub fn new(cfg: SnapshotConfig, relational: R, search: S, codec: C) -> Result<Self> {
        let relational_entry = ArchiveEntry::from_base_name(cfg.relational_dump_path())?.name;
        let search_entry = ArchiveEntry::from_base_name(cfg.search_dump_path())?.name;
        if relational_entry == search_entry {
            return Err(SnapError::config(format!(
                "relational and search dumps share the base name '{}'",
                relational_entry
            ))
            .into());
        }
        debug!("snapshot: orchestrator ready, {}", cfg);
        Ok(Self {
            cfg,
            relational,
            search,
            codec,
            relational_entry,
            search_entry,
        })
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.cfg
    }

    /// Куда capture запишет архив при данном явном пути.
    pub fn capture_target(&self, archive: Option<&Path>) -> PathBuf {
        match archive.or(self.cfg.archive_path()) {
            Some(p) => p.to_path_buf(),
            None => default_archive_path(
                self.cfg.working_dir(),
                self.cfg.environment(),
                chrono::Local::now().naive_local(),
            ),
        }
    }

    /// Откуда restore возьмёт архив; None, если путь не задан ни явно, ни в конфиге.
    pub fn restore_source(&self, archive: Option<&Path>) -> Option<PathBuf> {
        archive.or(self.cfg.archive_path()).map(Path::to_path_buf)
    }

    /// Снять обе подсистемы и упаковать в архив. Возвращает путь архива
    /// (собранного сейчас или переиспользованного из окна свежести).
    pub fn capture(&self, archive: Option<&Path>, force_cache: bool) -> Result<PathBuf> {
        let target = self.capture_target(archive);
        let use_cache = self.cfg.use_cache() || force_cache;
        self.ensure_not_intermediate(&target)?;

        self.prepare_working_dir()?;
        let _guard = self.maybe_lock()?;

        if use_cache && is_fresh(&target, self.cfg.cache_window(), SystemTime::now())? {
            info!(
                "capture: reuse fresh archive {} (window={}s)",
                target.display(),
                self.cfg.cache_window().as_secs()
            );
            record_capture_cache_hit();
            return Ok(target);
        }

        info!(
            "capture: start, target={}, working_dir={}",
            target.display(),
            self.cfg.working_dir().display()
        );

        let rel_path = self.cfg.relational_dump_path();
        debug!("capture: {} export → {}", self.relational.name(), rel_path.display());
        self.relational.export(rel_path)?;

        let search_path = self.cfg.search_dump_path();
        debug!("capture: {} export → {}", self.search.name(), search_path.display());
        self.search.export(search_path)?;

        let entries = [
            ArchiveEntry::new(rel_path, self.relational_entry.as_str()),
            ArchiveEntry::new(search_path, self.search_entry.as_str()),
        ];
        self.codec.create(&target, &entries)?;

        record_capture();
        info!("capture: done, archive={}", target.display());
        Ok(target)
    }

    /// `capture` с принудительно включённым окном свежести.
    pub fn capture_cached(&self, archive: Option<&Path>) -> Result<PathBuf> {
        self.capture(archive, true)
    }

    /// Распаковать архив и загрузить обе подсистемы (relational, затем search).
    pub fn restore(&self, archive: Option<&Path>) -> Result<bool> {
        let source = self
            .restore_source(archive)
            .ok_or_else(|| SnapError::config("no archive path specified for restore"))?;
        self.ensure_not_intermediate(&source)?;

        info!(
            "restore: start, archive={}, working_dir={}",
            source.display(),
            self.cfg.working_dir().display()
        );

        self.prepare_working_dir()?;
        let _guard = self.maybe_lock()?;

        let extracted = self.codec.extract(&source, self.cfg.working_dir())?;
        debug!("restore: extracted {} file(s)", extracted.len());
        for path in &extracted {
            let name = path.file_name().and_then(|n| n.to_str());
            if name != Some(self.relational_entry.as_str())
                && name != Some(self.search_entry.as_str())
            {
                warn!(
                    "restore: unexpected archive entry left in working dir: {}",
                    path.display()
                );
            }
        }

        self.place_extracted(
            &source,
            &extracted,
            &self.relational_entry,
            self.cfg.relational_dump_path(),
        )?;
        self.place_extracted(
            &source,
            &extracted,
            &self.search_entry,
            self.cfg.search_dump_path(),
        )?;

        let rel_path = self.cfg.relational_dump_path();
        debug!("restore: {} import ← {}", self.relational.name(), rel_path.display());
        self.relational.import(rel_path)?;

        let search_path = self.cfg.search_dump_path();
        debug!("restore: {} import ← {}", self.search.name(), search_path.display());
        self.search.import(search_path)?;

        record_restore();
        info!("restore: done, archive={}", source.display());
        Ok(true)
    }

    fn prepare_working_dir(&self) -> Result<()> {
        let wd = self.cfg.working_dir();
        fs::create_dir_all(wd).map_err(|e| SnapError::io("create_dir_all", wd, e))?;
        Ok(())
    }

    /// Архив не может совпадать с промежуточным файлом (в том числе с местом
    /// распаковки в working_dir): create/extract перезаписывают его, пока читают записи.
    fn ensure_not_intermediate(&self, archive: &Path) -> Result<()> {
        let a = normalize(archive);
        let wd = self.cfg.working_dir();
        let candidates = [
            self.cfg.relational_dump_path().to_path_buf(),
            self.cfg.search_dump_path().to_path_buf(),
            wd.join(&self.relational_entry),
            wd.join(&self.search_entry),
        ];
        for dump in &candidates {
            if a == normalize(dump) {
                return Err(SnapError::config(format!(
                    "archive path {} is the intermediate dump file {}",
                    archive.display(),
                    dump.display()
                ))
                .into());
            }
        }
        Ok(())
    }

    fn maybe_lock(&self) -> Result<Option<LockGuard>> {
        if !self.cfg.exclusive_lock() {
            return Ok(None);
        }
        let guard = acquire_exclusive_lock(self.cfg.working_dir())?;
        debug!("snapshot: holding {}", guard.path().display());
        Ok(Some(guard))
    }

    /// Архив распаковывается в working_dir под base name. Если промежуточный файл
    /// настроен вне working_dir — переносим его на настроенный путь.
    fn place_extracted(
        &self,
        archive: &Path,
        extracted_files: &[PathBuf],
        entry: &str,
        configured: &Path,
    ) -> Result<()> {
        let found = extracted_files
            .iter()
            .any(|p| p.file_name().and_then(|n| n.to_str()) == Some(entry));
        if !found {
            return Err(SnapError::format(
                archive,
                format!("archive has no entry '{}'", entry),
            )
            .into());
        }
        let extracted = self.cfg.working_dir().join(entry);
        if extracted == configured {
            return Ok(());
        }
        if let Some(parent) = configured.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| SnapError::io("create_dir_all", parent, e))?;
            }
        }
        if fs::rename(&extracted, configured).is_err() {
            // другой раздел — копия
            fs::copy(&extracted, configured).map_err(|e| SnapError::io("copy", configured, e))?;
        }
        debug!(
            "restore: moved {} → {}",
            extracted.display(),
            configured.display()
        );
        Ok(())
    }
}

/// Канонический путь, если файл (или хотя бы его каталог) существует.
fn normalize(path: &Path) -> PathBuf {
    if let Ok(p) = fs::canonicalize(path) {
        return p;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => match fs::canonicalize(parent) {
            Ok(p) => p.join(name),
            Err(_) => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}
