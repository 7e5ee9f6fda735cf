use std::{collections::HashSet, path::{Path, PathBuf}, time::Duration};

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::deadline::DeadlineOption;
use crate::executor::CommandSpec;
use resolve_path::PathResolveExt;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Путь до шаблона квитанции.
    pub template_path: PathBuf,

    /// Куда сохранять напечатанные квитанции.
    pub output_dir: PathBuf,

    /// Чем заполнять невыбранные поля.
    pub placeholder: String,

    /// Час, на который выставляется срок по-умолчанию.
    pub deadline_hour: u32,

    /// Ключ варианта срока, выбранного по-умолчанию.
    pub default_deadline: Option<String>,

    /// Ширина предпросмотра в HTML странице.
    pub preview_width: String,

    /// Сколько секунд ждать внешние команды.
    /// Если не задано, ждём без ограничений.
    pub command_timeout_secs: Option<u64>,

    pub projects: Vec<String>,
    pub priorities: Vec<String>,
    pub durations: Vec<String>,

    /// Команда для построения предпросмотра.
    pub preview_command: CommandSpec,

    /// Команда для печати.
    pub print_command: CommandSpec,

    /// Каталог вариантов срока.
    pub deadlines: Vec<DeadlineOption>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from("templates/ticket.txt"),
            output_dir: PathBuf::from("prints"),
            placeholder: "********".to_owned(),
            deadline_hour: 19,
            default_deadline: Some("teiji".to_owned()),
            preview_width: "280px".to_owned(),
            command_timeout_secs: None,
            projects: labels(&["仕事", "家事", "趣味", "その他"]),
            priorities: labels(&["最優先", "高", "中", "低"]),
            durations: labels(&["10分", "30分", "2時間", "半日", "1日", "3日"]),
            preview_command: npm_script("preview"),
            print_command: npm_script("print"),
            deadlines: vec![
                DeadlineOption::new("today", "本日中", "本日中"),
                DeadlineOption::new("tomorrow", "明日中", "明日中"),
                DeadlineOption::new("week", "今週中", "今週中"),
                DeadlineOption::new("asa", "朝イチ", "%m/%d 朝イチ"),
                DeadlineOption::new("gogo", "午後イチ", "%m/%d 午後イチ"),
                DeadlineOption::new("teiji", "定時", "%m/%d 定時"),
            ],
        }
    }
}

impl Config {
    /// Таймаут для внешних команд.
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }
}

fn labels(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_owned()).collect()
}

fn npm_script(name: &str) -> CommandSpec {
    CommandSpec::new("npm", &["run", "--prefix", "../printer", "--silent", name, "--", "-"])
}

/// Загружает конфигурацию.
/// Если файла нет, он будет создан со значениями по-умолчанию.
pub fn load(path: &Path) -> anyhow::Result<Config> {
    let mut cfg: Config =
        confy::load_path(path).with_context(|| format!("load config {:?}", path))?;

    normalize(&mut cfg)?;

    Ok(cfg)
}

pub fn normalize(cfg: &mut Config) -> anyhow::Result<()> {
    // Чтобы правильно обработать относительные пути.
    cfg.template_path = cfg.template_path.try_resolve()?.into_owned();
    cfg.output_dir = cfg.output_dir.try_resolve()?.into_owned();

    validate(cfg)
}

fn validate(cfg: &Config) -> anyhow::Result<()> {
    if cfg.deadline_hour > 23 {
        return Err(anyhow!("deadline_hour should be in 0..=23, got {}", cfg.deadline_hour));
    }

    let mut keys = HashSet::with_capacity(cfg.deadlines.len());
    for option in cfg.deadlines.iter() {
        if !keys.insert(option.key.as_str()) {
            return Err(anyhow!("duplicate deadline key \"{}\"", option.key));
        }
        option
            .compile()
            .with_context(|| format!("deadline \"{}\"", option.key))?;
    }

    if let Some(key) = &cfg.default_deadline {
        if !keys.contains(key.as_str()) {
            return Err(anyhow!("default_deadline \"{}\" is not in deadlines", key));
        }
    }

    if cfg.preview_command.program.is_empty() {
        return Err(anyhow!("preview_command.program shouldn't be empty"));
    }

    if cfg.print_command.program.is_empty() {
        return Err(anyhow!("print_command.program shouldn't be empty"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn duplicate_deadline() {
        let mut cfg = Config::default();
        cfg.deadlines.push(DeadlineOption::new("teiji", "x", "x"));

        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn unknown_default_deadline() {
        let cfg = Config {
            default_deadline: Some("someday".to_owned()),
            ..Config::default()
        };

        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn invalid_hour() {
        let cfg = Config {
            deadline_hour: 24,
            ..Config::default()
        };

        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn empty_program() {
        let cfg = Config {
            print_command: CommandSpec::new("", &[]),
            ..Config::default()
        };

        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn partial_file_uses_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            placeholder = "----"
            projects = ["A"]

            [print_command]
            program = "cat"

            [[deadlines]]
            key = "teiji"
            label = "定時"
            expression = "%m/%d 定時"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.placeholder, "----");
        assert_eq!(cfg.projects, vec!["A".to_owned()]);
        assert_eq!(cfg.print_command, CommandSpec::new("cat", &[]));
        assert_eq!(cfg.deadline_hour, 19);
        assert_eq!(cfg.deadlines.len(), 1);
        assert!(validate(&cfg).is_ok());
    }
}
