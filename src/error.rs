//! Таксономия ошибок snapshot-оркестратора.
//!
//! Все публичные функции возвращают `anyhow::Result`. Типизированная ошибка
//! `SnapError` кладётся внутрь `anyhow::Error`, так что вызывающий код может
//! классифицировать сбой через `err.downcast_ref::<SnapError>()`.
//!
//! Ошибки коллабораторов (дамперы, кодек) оркестратор возвращает как есть.

use std::path::PathBuf;

use thiserror::Error;

/// Класс ошибки.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Не удалось определить путь архива / неверные значения конфигурации.
    Configuration,
    /// Файловая система: mkdir, stat, чтение/запись архива.
    Io,
    /// Сбой экспорта/импорта подсистемы (причина непрозрачна).
    Backend,
    /// Архив нечитаем или повреждён.
    Format,
}

#[derive(Debug, Error)]
pub enum SnapError {
    #[error("configuration: {0}")]
    Configuration(String),

    #[error("io: {op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("backend {store}: {message}")]
    Backend { store: String, message: String },

    #[error("format {}: {message}", path.display())]
    Format { path: PathBuf, message: String },
}

impl SnapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SnapError::Configuration(_) => ErrorKind::Configuration,
            SnapError::Io { .. } => ErrorKind::Io,
            SnapError::Backend { .. } => ErrorKind::Backend,
            SnapError::Format { .. } => ErrorKind::Format,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        SnapError::Configuration(msg.into())
    }

    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SnapError::Io {
            op,
            path: path.into(),
            source,
        }
    }

    pub fn backend(store: impl Into<String>, message: impl Into<String>) -> Self {
        SnapError::Backend {
            store: store.into(),
            message: message.into(),
        }
    }

    pub fn format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        SnapError::Format {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Класс ошибки из произвольного anyhow::Error (ищет SnapError по цепочке).
/// Голые std::io::Error считаются Io.
pub fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    for cause in err.chain() {
        if let Some(se) = cause.downcast_ref::<SnapError>() {
            return Some(se.kind());
        }
        if cause.downcast_ref::<std::io::Error>().is_some() {
            return Some(ErrorKind::Io);
        }
    }
    None
}
