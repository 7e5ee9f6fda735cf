use chrono::{NaiveDate, NaiveDateTime};
use inquire::{Confirm, DateSelect, Select, Text};
use log::{debug, warn};

use crate::{
    config::Config,
    deadline,
    record::{DisplayFlags, FormSnapshot, RecordBuilder},
};

/// Поля формы, заданные флагами командной строки.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct FormArgs {
    /// Заполнить форму интерактивно.
    #[arg(short, long)]
    pub interactive: bool,

    #[arg(long)]
    pub project: Option<String>,

    #[arg(long)]
    pub priority: Option<String>,

    #[arg(long)]
    pub duration: Option<String>,

    /// Ключ варианта срока из конфигурации.
    #[arg(long, conflicts_with = "no_deadline")]
    pub deadline: Option<String>,

    /// Не выбирать срок, даже если в конфигурации есть вариант по-умолчанию.
    #[arg(long)]
    pub no_deadline: bool,

    /// Дата срока, по-умолчанию завтра.
    #[arg(long)]
    pub date: Option<NaiveDate>,

    #[arg(long, default_value = "")]
    pub title: String,

    #[arg(long, default_value = "")]
    pub body: String,

    #[arg(long)]
    pub hide_receipt_date: bool,

    #[arg(long)]
    pub no_placeholder: bool,

    #[arg(long)]
    pub body_large: bool,
}

/// Собирает снимок формы: интерактивно или из флагов.
pub fn snapshot(args: &FormArgs, cfg: &Config, now: &NaiveDateTime) -> anyhow::Result<FormSnapshot> {
    let snapshot = if args.interactive {
        ask(cfg, now)?
    } else {
        from_args(args, cfg, now)?
    };

    debug!("Form snapshot {:?}", snapshot);

    Ok(snapshot)
}

/// Собирает снимок формы из флагов командной строки.
pub fn from_args(args: &FormArgs, cfg: &Config, now: &NaiveDateTime) -> anyhow::Result<FormSnapshot> {
    let deadline = if args.no_deadline {
        None
    } else {
        args.deadline.clone().or_else(|| cfg.default_deadline.clone())
    };

    for (name, value, known) in [
        ("project", &args.project, &cfg.projects),
        ("priority", &args.priority, &cfg.priorities),
        ("duration", &args.duration, &cfg.durations),
    ] {
        if let Some(v) = value {
            if !known.contains(v) {
                warn!("{} {:?} is not in the config", name, v);
            }
        }
    }

    let deadline_date = deadline_date(cfg, deadline.as_deref(), args.date, now)?;

    Ok(FormSnapshot {
        project: args.project.clone(),
        priority: args.priority.clone(),
        duration: args.duration.clone(),
        deadline,
        deadline_date,
        title: args.title.clone(),
        body: args.body.clone(),
        flags: DisplayFlags {
            hide_receipt_date: args.hide_receipt_date,
            no_placeholder: args.no_placeholder,
            body_large: args.body_large,
        },
    })
}

/// Дата срока. Для вариантов без календарных токенов выбор даты
/// недоступен и всегда используется дата по-умолчанию.
fn deadline_date(
    cfg: &Config,
    key: Option<&str>,
    date: Option<NaiveDate>,
    now: &NaiveDateTime,
) -> anyhow::Result<NaiveDateTime> {
    let default = deadline::default_date(now, cfg.deadline_hour)?;

    if !RecordBuilder::from(cfg).is_date_editable(key)? {
        if date.is_some() {
            warn!("Дата игнорируется для срока {:?}", key);
        }
        return Ok(default);
    }

    Ok(date.map_or(default, |d| d.and_time(default.time())))
}

/// Запрашивает у пользователя все поля формы.
pub fn ask(cfg: &Config, now: &NaiveDateTime) -> anyhow::Result<FormSnapshot> {
    let project = select("プロジェクト", &cfg.projects)?;

    let title = Text::new("タイトル")
        .with_placeholder("○○さんのメールに返信する")
        .prompt()?;

    let priority = select("優先度", &cfg.priorities)?;
    let duration = select("所要時間", &cfg.durations)?;

    let deadline = if cfg.deadlines.is_empty() {
        None
    } else {
        let cursor = cfg
            .default_deadline
            .as_ref()
            .and_then(|k| cfg.deadlines.iter().position(|o| &o.key == k))
            .unwrap_or(0);

        Select::new("締切", cfg.deadlines.clone())
            .with_starting_cursor(cursor)
            .with_help_message("Esc: 締切なし")
            .prompt_skippable()?
            .map(|o| o.key)
    };

    let deadline_date = if RecordBuilder::from(cfg).is_date_editable(deadline.as_deref())? {
        let default = deadline::default_date(now, cfg.deadline_hour)?;
        let date = DateSelect::new("締切日")
            .with_default(default.date())
            .prompt()?;
        date.and_time(default.time())
    } else {
        deadline_date(cfg, None, None, now)?
    };

    let body = Text::new("本文")
        .with_placeholder("資料がどっかにあるはず")
        .prompt()?;

    let flags = DisplayFlags {
        hide_receipt_date: confirm("受付日時を隠す")?,
        no_placeholder: confirm("空欄を伏字にしない")?,
        body_large: confirm("本文を大きく")?,
    };

    Ok(FormSnapshot {
        project,
        priority,
        duration,
        deadline,
        deadline_date,
        title,
        body,
        flags,
    })
}

fn select(title: &str, options: &[String]) -> anyhow::Result<Option<String>> {
    if options.is_empty() {
        return Ok(None);
    }

    let value = Select::new(title, options.to_vec())
        .with_help_message("Esc: 未選択")
        .prompt_skippable()?;

    Ok(value)
}

fn confirm(title: &str) -> anyhow::Result<bool> {
    Ok(Confirm::new(title).with_default(false).prompt()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, 30)
            .unwrap()
            .and_hms_opt(10, 15, 0)
            .unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn default_deadline_is_selected() {
        let cfg = Config::default();
        let snapshot = from_args(&FormArgs::default(), &cfg, &now()).unwrap();

        assert_eq!(snapshot.deadline.as_deref(), Some("teiji"));
        assert_eq!(snapshot.deadline_date, at(2024, 5, 1, 19));
    }

    #[test]
    fn no_deadline() {
        let args = FormArgs {
            no_deadline: true,
            ..FormArgs::default()
        };
        let snapshot = from_args(&args, &Config::default(), &now()).unwrap();

        assert_eq!(snapshot.deadline, None);
    }

    #[test]
    fn picked_date_keeps_fixed_hour() {
        let args = FormArgs {
            deadline: Some("asa".to_owned()),
            date: NaiveDate::from_ymd_opt(2024, 5, 7),
            ..FormArgs::default()
        };
        let snapshot = from_args(&args, &Config::default(), &now()).unwrap();

        assert_eq!(snapshot.deadline_date, at(2024, 5, 7, 19));
    }

    #[test]
    fn date_is_ignored_for_date_independent_deadline() {
        let args = FormArgs {
            deadline: Some("week".to_owned()),
            date: NaiveDate::from_ymd_opt(2024, 5, 7),
            ..FormArgs::default()
        };
        let snapshot = from_args(&args, &Config::default(), &now()).unwrap();

        assert_eq!(snapshot.deadline_date, at(2024, 5, 1, 19));
    }

    #[test]
    fn unknown_deadline_is_an_error() {
        let args = FormArgs {
            deadline: Some("someday".to_owned()),
            ..FormArgs::default()
        };

        assert!(from_args(&args, &Config::default(), &now()).is_err());
    }

    #[test]
    fn flags_are_copied() {
        let args = FormArgs {
            title: " ".to_owned(),
            body: "a\nb".to_owned(),
            hide_receipt_date: true,
            body_large: true,
            ..FormArgs::default()
        };
        let snapshot = from_args(&args, &Config::default(), &now()).unwrap();

        assert_eq!(snapshot.title, " ");
        assert_eq!(snapshot.body, "a\nb");
        assert_eq!(
            snapshot.flags,
            DisplayFlags {
                hide_receipt_date: true,
                no_placeholder: false,
                body_large: true,
            }
        );
    }
}
