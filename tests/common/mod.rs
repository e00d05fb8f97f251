// tests/common/mod.rs
//
// Общие хелперы интеграционных тестов:
// - unique_root(): уникальный каталог в temp_dir;
// - MemDumper: подсистема "в памяти" с журналом вызовов.

#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use statepack::{SnapError, StoreDumper};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let base = std::env::temp_dir();
    base.join(format!("sptest-{prefix}-{pid}-{t}-{id}"))
}

pub type Journal = Rc<RefCell<Vec<String>>>;

pub fn journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

type Hook = Box<dyn Fn(&Path)>;

/// Подсистема, чьё "состояние" — просто байты в памяти.
pub struct MemDumper {
    name: String,
    pub state: Rc<RefCell<Vec<u8>>>,
    journal: Journal,
    fail_export: bool,
    fail_import: bool,
    on_export: Option<Hook>,
}

impl MemDumper {
    pub fn new(name: &str, state: &[u8], journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            state: Rc::new(RefCell::new(state.to_vec())),
            journal: journal.clone(),
            fail_export: false,
            fail_import: false,
            on_export: None,
        }
    }

    pub fn failing_export(mut self) -> Self {
        self.fail_export = true;
        self
    }

    pub fn failing_import(mut self) -> Self {
        self.fail_import = true;
        self
    }

    pub fn on_export<F: Fn(&Path) + 'static>(mut self, f: F) -> Self {
        self.on_export = Some(Box::new(f));
        self
    }

    pub fn handle(&self) -> Rc<RefCell<Vec<u8>>> {
        self.state.clone()
    }
}

impl StoreDumper for MemDumper {
    fn name(&self) -> &str {
        &self.name
    }

    fn export(&self, dst: &Path) -> Result<()> {
        self.journal
            .borrow_mut()
            .push(format!("{}:export:{}", self.name, dst.display()));
        if let Some(hook) = &self.on_export {
            hook(dst);
        }
        if self.fail_export {
            return Err(SnapError::backend(&self.name, "export refused").into());
        }
        fs::write(dst, &*self.state.borrow())?;
        Ok(())
    }

    fn import(&self, src: &Path) -> Result<()> {
        self.journal
            .borrow_mut()
            .push(format!("{}:import:{}", self.name, src.display()));
        if self.fail_import {
            return Err(SnapError::backend(&self.name, "import refused").into());
        }
        *self.state.borrow_mut() = fs::read(src)?;
        Ok(())
    }
}
