//! dumper — экспорт/импорт полного состояния одной подсистемы в файл.
//!
//! Оркестратор держит два экземпляра: реляционное хранилище и поисковый индекс.
//! Реализации сами подключаются к своему бэкенду и непрозрачны для оркестратора.
//!
//! Готовые реализации:
//! - CommandDumper: внешние команды (pg_dump / psql, mysqldump, ...) по шаблону с `{path}`;
//! - FileDumper: однофайловое хранилище (встроенная SQL-база) — копия файла под локом;
//! - TreeDumper: каталог на диске (индекс поискового движка) — сериализация дерева в один файл.

use std::path::Path;

use anyhow::Result;

pub mod command;
pub mod file;
pub mod tree;

pub use command::CommandDumper;
pub use file::FileDumper;
pub use tree::TreeDumper;

pub trait StoreDumper {
    /// Короткое имя подсистемы для логов и ошибок ("relational", "search", ...).
    fn name(&self) -> &str;

    /// Выгрузить состояние подсистемы в `dst` (перезаписывая файл).
    fn export(&self, dst: &Path) -> Result<()>;

    /// Загрузить состояние подсистемы из `src`.
    fn import(&self, src: &Path) -> Result<()>;
}

impl<T: StoreDumper + ?Sized> StoreDumper for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn export(&self, dst: &Path) -> Result<()> {
        (**self).export(dst)
    }

    fn import(&self, src: &Path) -> Result<()> {
        (**self).import(src)
    }
}
