//! Имена архивов: `{environment}.{YYYY-MM-DD@HHMMSS}.archive`.
//!
//! Метка времени сортируется лексикографически в порядке создания.
//! Гранулярность — секунда: два capture в одну секунду дадут одно имя.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::consts::{ARCHIVE_EXT, ARCHIVE_TS_FORMAT};

pub fn default_archive_name(environment: &str, at: NaiveDateTime) -> String {
    format!(
        "{}.{}.{}",
        environment,
        at.format(ARCHIVE_TS_FORMAT),
        ARCHIVE_EXT
    )
}

pub fn default_archive_path(working_dir: &Path, environment: &str, at: NaiveDateTime) -> PathBuf {
    working_dir.join(default_archive_name(environment, at))
}
