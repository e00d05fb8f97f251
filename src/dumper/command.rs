//! CommandDumper — экспорт/импорт через внешние команды оболочки.
//!
//! Шаблоны выполняются через `sh -c`, `{path}` заменяется на путь файла
//! (в одинарных кавычках). Пример:
//!   export: pg_dump --no-owner --clean mydb > {path}
//!   import: psql --quiet mydb < {path}
//!
//! Ненулевой код выхода → SnapError::Backend с хвостом stderr.

use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::Result;
use log::debug;

use super::StoreDumper;
use crate::error::SnapError;

const STDERR_TAIL: usize = 2048;
const SHELL: &str = "sh";

#[derive(Debug, Clone)]
pub struct CommandDumper {
    name: String,
    export_cmd: String,
    import_cmd: String,
}

impl CommandDumper {
    pub fn new<N, E, I>(name: N, export_cmd: E, import_cmd: I) -> Self
    where
        N: Into<String>,
        E: Into<String>,
        I: Into<String>,
    {
        Self {
            name: name.into(),
            export_cmd: export_cmd.into(),
            import_cmd: import_cmd.into(),
        }
    }

    fn run(&self, op: &str, template: &str, path: &Path) -> Result<()> {
        let script = render(template, path);
        debug!("{}: {} via `{}`", self.name, op, script);

        let out = Command::new(SHELL)
            .arg("-c")
            .arg(&script)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| SnapError::backend(&self.name, format!("spawn {}: {}", SHELL, e)))?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            let tail = tail_chars(stderr.trim(), STDERR_TAIL);
            return Err(SnapError::backend(
                &self.name,
                format!("{} failed ({}): {}", op, out.status, tail),
            )
            .into());
        }
        Ok(())
    }
}

impl StoreDumper for CommandDumper {
    fn name(&self) -> &str {
        &self.name
    }

    fn export(&self, dst: &Path) -> Result<()> {
        self.run("export", &self.export_cmd, dst)
    }

    fn import(&self, src: &Path) -> Result<()> {
        self.run("import", &self.import_cmd, src)
    }
}

/// Подставить путь в шаблон. Путь экранируется для POSIX shell.
fn render(template: &str, path: &Path) -> String {
    let quoted = shell_quote(&path.to_string_lossy());
    template.replace("{path}", &quoted)
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn tail_chars(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}
