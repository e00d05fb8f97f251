// Базовые модули
pub mod consts;
pub mod error;
pub mod config;
pub mod metrics;
pub mod lock;

// Коллабораторы: архивный кодек и дамперы подсистем
pub mod archive; // src/archive/{mod,frame,pack}.rs
pub mod dumper;  // src/dumper/{mod,command,file,tree}.rs

// Ядро: оркестратор capture/restore
pub mod snapshot; // src/snapshot/{mod,naming,freshness}.rs

// CLI (тонкая обёртка над snapshot)
pub mod cli;

// Удобные реэкспорты
pub use archive::{ArchiveCodec, ArchiveEntry, Compression, PackCodec};
pub use config::{SnapshotConfig, SnapshotConfigBuilder};
pub use dumper::{CommandDumper, FileDumper, StoreDumper, TreeDumper};
pub use error::{error_kind, ErrorKind, SnapError};
pub use snapshot::SnapshotOrchestrator;
