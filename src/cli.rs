//! Тонкий CLI над SnapshotOrchestrator.
//!
//! Конфигурация — из SP_* (см. config.rs). Дамперы подсистем собираются из окружения,
//! для роли ROLE ∈ {RELATIONAL, SEARCH} (по убыванию приоритета):
//! - SP_<ROLE>_EXPORT_CMD + SP_<ROLE>_IMPORT_CMD → CommandDumper (шаблон с {path});
//! - SP_<ROLE>_FILE                              → FileDumper (однофайловое хранилище);
//! - SP_<ROLE>_DIR                               → TreeDumper (хранилище-каталог).
//!
//! Примеры:
//!   statepack capture
//!   statepack capture --out ./prod.archive --cache
//!   statepack restore ./prod.archive
//!   statepack inspect ./prod.archive --json

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::debug;
use std::path::PathBuf;

use crate::archive::PackCodec;
use crate::config::SnapshotConfig;
use crate::dumper::{CommandDumper, FileDumper, StoreDumper, TreeDumper};
use crate::error::SnapError;
use crate::metrics::metrics_snapshot;
use crate::snapshot::SnapshotOrchestrator;

#[derive(Parser, Debug)]
#[command(
    name = "statepack",
    version,
    about = "Capture/restore a relational store and a search index as one archive",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Export both stores and pack them into an archive; prints the archive path.
    Capture {
        /// Output archive (default: SP_ARCHIVE or <working_dir>/{env}.{timestamp}.archive)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Reuse the target if it was written within the freshness window
        #[arg(long, default_value_t = false)]
        cache: bool,
    },
    /// Unpack an archive and import both stores.
    Restore {
        /// Archive path (default: SP_ARCHIVE)
        archive: Option<PathBuf>,
    },
    /// List archive entries (CRC-checked, nothing is extracted).
    Inspect {
        archive: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the resolved configuration.
    Config,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = SnapshotConfig::from_env()?;

    match cli.cmd {
        Cmd::Capture { out, cache } => {
            let orch = build_orchestrator(cfg)?;
            let path = orch.capture(out.as_deref(), cache)?;
            log_metrics()?;
            println!("{}", path.display());
        }
        Cmd::Restore { archive } => {
            let orch = build_orchestrator(cfg)?;
            orch.restore(archive.as_deref())?;
            log_metrics()?;
            println!("restore: OK");
        }
        Cmd::Inspect { archive, json } => {
            let codec = PackCodec::new(cfg.compression());
            let entries = codec.list(&archive)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("(empty archive)");
            } else {
                for e in entries {
                    println!("{:>12} B  {}", e.bytes, e.name);
                }
            }
        }
        Cmd::Config => {
            println!("{}", cfg);
        }
    }
    Ok(())
}

fn log_metrics() -> Result<()> {
    let m = metrics_snapshot();
    debug!(
        "metrics: {} (cache_hit_ratio={:.2})",
        serde_json::to_string(&m)?,
        m.cache_hit_ratio()
    );
    Ok(())
}

type DynDumper = Box<dyn StoreDumper>;

fn build_orchestrator(cfg: SnapshotConfig) -> Result<SnapshotOrchestrator<DynDumper, DynDumper>> {
    let relational = dumper_from_env("relational", "RELATIONAL")?;
    let search = dumper_from_env("search", "SEARCH")?;
    SnapshotOrchestrator::with_pack_codec(cfg, relational, search)
}

fn dumper_from_env(name: &str, role: &str) -> Result<DynDumper> {
    let var = |suffix: &str| -> Option<String> {
        std::env::var(format!("SP_{}_{}", role, suffix))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    match (var("EXPORT_CMD"), var("IMPORT_CMD")) {
        (Some(export), Some(import)) => {
            return Ok(Box::new(CommandDumper::new(name, export, import)));
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err(SnapError::config(format!(
                "SP_{role}_EXPORT_CMD and SP_{role}_IMPORT_CMD must be set together"
            ))
            .into());
        }
        (None, None) => {}
    }
    if let Some(file) = var("FILE") {
        return Ok(Box::new(FileDumper::new(name, file)));
    }
    if let Some(dir) = var("DIR") {
        return Ok(Box::new(TreeDumper::new(name, dir)));
    }
    Err(SnapError::config(format!(
        "no {name} store configured: set SP_{role}_EXPORT_CMD/SP_{role}_IMPORT_CMD, SP_{role}_FILE or SP_{role}_DIR"
    ))
    .into())
}
