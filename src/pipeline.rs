use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;
use log::{debug, info, warn};

use crate::config::Config;
use crate::executor::{CommandExecutor, Executor, ExecutorError};
use crate::filename::{self, GRAPHIC_EXTENSION, RECEIPT_EXTENSION};
use crate::record::PrintRecord;

/// Состояние обработки одной заявки.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum State {
    Idle,
    PreviewRequested,
    PreviewReady,
    PrintRequested,
    PrintSucceeded,
    PrintFailed,
    ArtifactsPersisted,
}

/// Результат построения предпросмотра.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    /// Вывод команды предпросмотра, обычно SVG.
    pub image: String,

    /// Команда завершилась с ошибкой, вывод может быть пустым или битым.
    pub degraded: bool,
}

/// Сохранённые файлы напечатанной квитанции.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub graphic: PathBuf,
    pub receipt: PathBuf,
}

/// Предпросмотр, печать и сохранение квитанций.
pub struct Pipeline {
    preview: Box<dyn Executor>,
    print: Box<dyn Executor>,
    output_dir: PathBuf,
    placeholder: String,
    state: State,
}

impl Pipeline {
    pub fn new(
        preview: Box<dyn Executor>,
        print: Box<dyn Executor>,
        output_dir: &Path,
        placeholder: &str,
    ) -> Self {
        Self {
            preview,
            print,
            output_dir: output_dir.to_owned(),
            placeholder: placeholder.to_owned(),
            state: State::Idle,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let timeout = cfg.command_timeout();
        Self::new(
            Box::new(CommandExecutor::new(cfg.preview_command.clone(), timeout)),
            Box::new(CommandExecutor::new(cfg.print_command.clone(), timeout)),
            &cfg.output_dir,
            &cfg.placeholder,
        )
    }

    pub fn state(&self) -> State {
        self.state
    }

    fn transition(&mut self, to: State) {
        debug!("Pipeline {} -> {}", self.state, to);
        self.state = to;
    }

    /// Строит предпросмотр документа.
    /// Ошибки команды только логируются, вывод возвращается в любом случае.
    pub fn preview(&mut self, document: &str) -> Preview {
        self.transition(State::PreviewRequested);

        let preview = match self.preview.run(document) {
            Ok(out) => {
                if !out.success() {
                    warn!("failed to create preview, code: {}, stderr: {}", out.code, out.stderr);
                }
                Preview {
                    degraded: !out.success(),
                    image: out.stdout,
                }
            }
            Err(e) => {
                warn!("failed to create preview: {:#}", anyhow::Error::from(e));
                Preview {
                    image: String::new(),
                    degraded: true,
                }
            }
        };

        self.transition(State::PreviewReady);

        preview
    }

    /// Печатает документ и сохраняет изображение и текст квитанции.
    /// Без заголовка печать не запускается.
    pub fn print(
        &mut self,
        record: &PrintRecord,
        document: &str,
        now: &NaiveDateTime,
    ) -> PrintResult<Artifacts> {
        if !record.is_printable() {
            self.transition(State::Idle);
            return Err(PrintError::MissingTitle);
        }

        self.transition(State::PrintRequested);
        info!("Печатаем \"{}\"", record.title);

        let out = match self.print.run(document) {
            Ok(out) => out,
            Err(e) => {
                self.transition(State::PrintFailed);
                return Err(e.into());
            }
        };

        if !out.success() {
            self.transition(State::PrintFailed);
            return Err(PrintError::Failed {
                code: out.code,
                stderr: out.stderr,
            });
        }

        self.transition(State::PrintSucceeded);

        let artifacts = self.persist(record, document, &out.stdout, now)?;

        self.transition(State::ArtifactsPersisted);

        Ok(artifacts)
    }

    fn persist(
        &self,
        record: &PrintRecord,
        document: &str,
        graphic: &str,
        now: &NaiveDateTime,
    ) -> PrintResult<Artifacts> {
        fs::create_dir_all(&self.output_dir)
            .map_err(|e| PrintError::Persist(self.output_dir.clone(), e))?;

        let base = filename::base_name(now, &record.project, &self.placeholder, &record.title);

        let artifacts = Artifacts {
            graphic: self.output_dir.join(format!("{}.{}", base, GRAPHIC_EXTENSION)),
            receipt: self.output_dir.join(format!("{}.{}", base, RECEIPT_EXTENSION)),
        };

        write(&artifacts.graphic, graphic)?;
        write(&artifacts.receipt, document)?;

        info!("Сохранили {:?} и {:?}", artifacts.graphic, artifacts.receipt);

        Ok(artifacts)
    }
}

fn write(path: &Path, content: &str) -> PrintResult<()> {
    fs::write(path, content).map_err(|e| PrintError::Persist(path.to_owned(), e))
}

pub type PrintResult<T> = std::result::Result<T, PrintError>;

#[derive(Debug, thiserror::Error)]
pub enum PrintError {
    #[error("title is required")]
    MissingTitle,

    #[error("print failed with code {code}: {stderr}")]
    Failed { code: i32, stderr: String },

    #[error("run print command")]
    Executor(#[from] ExecutorError),

    #[error("write {0:?}")]
    Persist(PathBuf, #[source] io::Error),
}
