use std::{fs, io, path::{Path, PathBuf}};

/// Представление "сырого" шаблона.
/// Текст квитанции с плейсхолдерами вида `{{ title }}`, которые заменяются
/// на значения из записи для печати.
#[derive(Debug, Clone)]
pub struct Template {
    /// Откуда шаблон был загружен.
    pub path: PathBuf,

    pub source: String,
}

/// Загружает шаблон из файла.
pub fn load(path: &Path) -> LoadResult {
    let source = fs::read_to_string(path).map_err(|e| LoadError::ReadFile(path.to_owned(), e))?;

    Ok(Template {
        path: path.to_owned(),
        source,
    })
}

pub type LoadResult = std::result::Result<Template, LoadError>;

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("read template file {0:?}")]
    ReadFile(PathBuf, #[source] io::Error),
}
