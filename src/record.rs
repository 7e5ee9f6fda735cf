use std::str::FromStr;

use chrono::{NaiveDateTime, Timelike};
use enum_iterator::all;
use log::{debug, warn};
use serde::Serialize;

use crate::config::Config;
use crate::deadline::{self, DeadlineError, DeadlineOption};

/// Значение для пустых полей, когда маскирование отключено.
pub const BLANK: &str = " ";

/// Маркер выделения для срока.
pub const DEADLINE_EMPHASIS: &str = "`";

/// Маркер крупного текста для тела заявки.
pub const BODY_LARGE: &str = "^";

const RECEIPT_DATE_FORMAT: &str = "%m/%d %H:%M";

/// Флаги отображения.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayFlags {
    /// Не печатать дату приёма заявки.
    pub hide_receipt_date: bool,

    /// Вместо маски для пустых полей печатать пробел.
    pub no_placeholder: bool,

    /// Печатать тело заявки крупным шрифтом.
    pub body_large: bool,
}

/// Снимок введённых в форму данных.
/// Создаётся один раз на каждую отрисовку и после не меняется.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSnapshot {
    pub project: Option<String>,
    pub priority: Option<String>,
    pub duration: Option<String>,

    /// Ключ выбранного варианта срока.
    pub deadline: Option<String>,

    /// Дата, выбранная для срока.
    pub deadline_date: NaiveDateTime,

    /// Заголовок. Пустая строка означает что заголовок не задан.
    pub title: String,

    pub body: String,

    pub flags: DisplayFlags,
}

/// Все ключи записи для печати.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, std::hash::Hash, derive_more::Display, enum_iterator::Sequence,
)]
pub enum RecordKey {
    #[display(fmt = "project")]
    Project,
    #[display(fmt = "priority")]
    Priority,
    #[display(fmt = "priorityIndex")]
    PriorityIndex,
    #[display(fmt = "receiptDate")]
    ReceiptDate,
    #[display(fmt = "deadline")]
    Deadline,
    #[display(fmt = "deadlineFormat")]
    DeadlineFormat,
    #[display(fmt = "duration")]
    Duration,
    #[display(fmt = "title")]
    Title,
    #[display(fmt = "body")]
    Body,
    #[display(fmt = "bodyFormat")]
    BodyFormat,
}

impl FromStr for RecordKey {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        all::<RecordKey>()
            .find(|k| k.to_string() == s)
            .ok_or_else(|| RecordError::UnknownKey(s.to_owned()))
    }
}

/// Каноничная запись для печати.
/// Все поля всегда заполнены: вместо невыбранных значений стоит заглушка.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrintRecord {
    pub project: String,
    pub priority: String,
    pub priority_index: String,
    pub receipt_date: String,
    pub deadline: String,
    pub deadline_format: String,
    pub duration: String,
    pub title: String,
    pub body: String,
    pub body_format: String,
}

impl PrintRecord {
    /// Возвращает значение по ключу.
    pub fn get(&self, key: RecordKey) -> &str {
        match key {
            RecordKey::Project => &self.project,
            RecordKey::Priority => &self.priority,
            RecordKey::PriorityIndex => &self.priority_index,
            RecordKey::ReceiptDate => &self.receipt_date,
            RecordKey::Deadline => &self.deadline,
            RecordKey::DeadlineFormat => &self.deadline_format,
            RecordKey::Duration => &self.duration,
            RecordKey::Title => &self.title,
            RecordKey::Body => &self.body,
            RecordKey::BodyFormat => &self.body_format,
        }
    }

    /// Заявку можно печатать только с заголовком.
    /// Заголовок не обрезается, строка из пробелов считается заполненной.
    pub fn is_printable(&self) -> bool {
        !self.title.is_empty()
    }
}

/// Собирает записи для печати из снимков формы.
#[derive(Debug, Clone)]
pub struct RecordBuilder<'a> {
    deadlines: &'a [DeadlineOption],
    priorities: &'a [String],
    placeholder: &'a str,
}

impl<'a> From<&'a Config> for RecordBuilder<'a> {
    fn from(cfg: &'a Config) -> Self {
        Self::new(&cfg.deadlines, &cfg.priorities, &cfg.placeholder)
    }
}

impl<'a> RecordBuilder<'a> {
    pub fn new(deadlines: &'a [DeadlineOption], priorities: &'a [String], placeholder: &'a str) -> Self {
        Self {
            deadlines,
            priorities,
            placeholder,
        }
    }

    /// Ищет вариант срока по ключу.
    pub fn deadline_option(&self, key: &str) -> RecordResult<&'a DeadlineOption> {
        self.deadlines
            .iter()
            .find(|o| o.key == key)
            .ok_or_else(|| RecordError::UnknownDeadline(key.to_owned()))
    }

    /// Можно ли выбирать дату для варианта срока.
    /// Для вариантов без календарных токенов выбор даты отключён.
    pub fn is_date_editable(&self, key: Option<&str>) -> RecordResult<bool> {
        match key {
            Some(k) => Ok(self.deadline_option(k)?.compile()?.is_date_dependent()),
            None => Ok(false),
        }
    }

    /// Собирает запись для печати.
    pub fn build(&self, snapshot: &FormSnapshot, now: &NaiveDateTime) -> RecordResult<PrintRecord> {
        let placeholder = if snapshot.flags.no_placeholder {
            BLANK
        } else {
            self.placeholder
        };
        let or_placeholder =
            |v: &Option<String>| v.clone().unwrap_or_else(|| placeholder.to_owned());

        let receipt_date = if snapshot.flags.hide_receipt_date {
            placeholder.to_owned()
        } else {
            truncate_to_minute(now).format(RECEIPT_DATE_FORMAT).to_string()
        };

        let (deadline, deadline_format) = match &snapshot.deadline {
            Some(key) => {
                let option = self.deadline_option(key)?;
                let value = deadline::substitute(&option.expression, &snapshot.deadline_date)?;
                (value, DEADLINE_EMPHASIS.to_owned())
            }
            None => (placeholder.to_owned(), String::new()),
        };

        let priority_index = match &snapshot.priority {
            Some(p) => match self.priorities.iter().position(|x| x == p) {
                Some(idx) => (idx + 1).to_string(),
                None => {
                    warn!("Priority {:?} is not in the catalog", p);
                    placeholder.to_owned()
                }
            },
            None => placeholder.to_owned(),
        };

        let body_format = if snapshot.flags.body_large {
            BODY_LARGE.to_owned()
        } else {
            String::new()
        };

        let record = PrintRecord {
            project: or_placeholder(&snapshot.project),
            priority: or_placeholder(&snapshot.priority),
            priority_index,
            receipt_date,
            deadline,
            deadline_format,
            duration: or_placeholder(&snapshot.duration),
            title: snapshot.title.clone(),
            body: escape_newlines(&snapshot.body),
            body_format,
        };

        debug!("Built record {:?}", record);

        Ok(record)
    }
}

fn truncate_to_minute(t: &NaiveDateTime) -> NaiveDateTime {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(*t)
}

/// Экранирует переводы строк, чтобы тело шло в шаблон одной строкой.
fn escape_newlines(body: &str) -> String {
    body.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\n', "\\n")
}

pub type RecordResult<T> = std::result::Result<T, RecordError>;

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("unknown deadline option \"{0}\"")]
    UnknownDeadline(String),

    #[error("unknown record key \"{0}\"")]
    UnknownKey(String),

    #[error("deadline")]
    Deadline(#[from] DeadlineError),
}
