use chrono::{Days, NaiveDateTime, NaiveTime};
use log::debug;
use serde::{Deserialize, Serialize};

/// Вариант срока выполнения из каталога в конфигурации.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DeadlineOption {
    /// Идентификатор варианта, используется в командной строке.
    pub key: String,

    /// Название для отображения в форме.
    pub label: String,

    /// Выражение для печати. Может содержать календарные токены, например
    /// `%m/%d 定時`.
    pub expression: String,
}

impl DeadlineOption {
    pub fn new(key: &str, label: &str, expression: &str) -> Self {
        Self {
            key: key.to_owned(),
            label: label.to_owned(),
            expression: expression.to_owned(),
        }
    }

    /// Разбирает выражение варианта.
    pub fn compile(&self) -> DeadlineResult<Expression> {
        Expression::parse(&self.expression)
    }
}

impl std::fmt::Display for DeadlineOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Все поддерживаемые календарные токены.
#[derive(Debug, Clone, Copy, PartialEq, Eq, enum_iterator::Sequence)]
pub enum Token {
    Day,
    DayUnpadded,
    Month,
    MonthUnpadded,
    YearShort,
    Year,
    Hour,
    HourUnpadded,
    Hour12,
    Hour12Unpadded,
    AmPm,
    Minute,
    MinuteUnpadded,
    Second,
    SecondUnpadded,
    WeekdayAbbrev,
    WeekdayName,
    WeekdayNumber,
    IsoWeekdayNumber,
    MonthAbbrev,
    MonthName,
    DayOfYear,
    DayOfYearUnpadded,
    IsoYear,
    IsoWeek,
    Percent,
}

impl Token {
    /// Запись токена в выражении.
    ///
    /// Совпадает с директивой chrono, поэтому используется и для
    /// форматирования.
    pub fn pattern(&self) -> &'static str {
        match self {
            Self::Day => "%d",
            Self::DayUnpadded => "%-d",
            Self::Month => "%m",
            Self::MonthUnpadded => "%-m",
            Self::YearShort => "%y",
            Self::Year => "%Y",
            Self::Hour => "%H",
            Self::HourUnpadded => "%-H",
            Self::Hour12 => "%I",
            Self::Hour12Unpadded => "%-I",
            Self::AmPm => "%p",
            Self::Minute => "%M",
            Self::MinuteUnpadded => "%-M",
            Self::Second => "%S",
            Self::SecondUnpadded => "%-S",
            Self::WeekdayAbbrev => "%a",
            Self::WeekdayName => "%A",
            Self::WeekdayNumber => "%w",
            Self::IsoWeekdayNumber => "%u",
            Self::MonthAbbrev => "%b",
            Self::MonthName => "%B",
            Self::DayOfYear => "%j",
            Self::DayOfYearUnpadded => "%-j",
            Self::IsoYear => "%G",
            Self::IsoWeek => "%V",
            Self::Percent => "%%",
        }
    }

    /// Форматирует дату согласно токену.
    pub fn format(&self, at: &NaiveDateTime) -> String {
        at.format(self.pattern()).to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Token(Token),
}

/// Разобранное выражение срока.
///
/// Выражение разбирается один раз: в каждой позиции распознаётся самый
/// длинный токен, всё остальное остаётся литералом. Подставленные значения
/// повторно не сканируются.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    segments: Vec<Segment>,
}

impl Expression {
    pub fn parse(src: &str) -> DeadlineResult<Self> {
        let segments = expression::segments(src).map_err(|e| DeadlineError::Parse {
            expression: src.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self { segments })
    }

    /// Проверяет зависит ли результат от даты.
    /// `%%` не считается, так как всегда даёт `%`.
    pub fn is_date_dependent(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Token(t) if *t != Token::Percent))
    }

    /// Подставляет значения токенов для указанной даты.
    pub fn expand(&self, at: &NaiveDateTime) -> String {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(l) => l.clone(),
                Segment::Token(t) => t.format(at),
            })
            .collect()
    }
}

/// Подставляет в выражение значения для указанной даты.
pub fn substitute(src: &str, at: &NaiveDateTime) -> DeadlineResult<String> {
    let expr = Expression::parse(src)?;
    let value = expr.expand(at);
    debug!("Deadline {:?} at {} -> {:?}", src, at, value);
    Ok(value)
}

/// Дата по-умолчанию для выбора срока: завтра в указанный час.
pub fn default_date(now: &NaiveDateTime, hour: u32) -> DeadlineResult<NaiveDateTime> {
    let time = NaiveTime::from_hms_opt(hour, 0, 0).ok_or(DeadlineError::InvalidHour(hour))?;
    let date = now
        .date()
        .checked_add_days(Days::new(1))
        .ok_or(DeadlineError::OutOfRange)?;

    Ok(date.and_time(time))
}

pub type DeadlineResult<T> = std::result::Result<T, DeadlineError>;

#[derive(Debug, thiserror::Error)]
pub enum DeadlineError {
    #[error("parse expression \"{expression}\": {reason}")]
    Parse { expression: String, reason: String },

    #[error("invalid hour {0}")]
    InvalidHour(u32),

    #[error("date out of range")]
    OutOfRange,
}

peg::parser! {
    grammar expression() for str {
        pub rule segments() -> Vec<Segment>
            = s:(token() / literal())* { s }

        rule token() -> Segment
            = "%-" t:unpadded() { Segment::Token(t) }
            / "%" t:padded() { Segment::Token(t) }

        rule unpadded() -> Token
            = "d" { Token::DayUnpadded }
            / "m" { Token::MonthUnpadded }
            / "H" { Token::HourUnpadded }
            / "I" { Token::Hour12Unpadded }
            / "M" { Token::MinuteUnpadded }
            / "S" { Token::SecondUnpadded }
            / "j" { Token::DayOfYearUnpadded }

        rule padded() -> Token
            = "d" { Token::Day }
            / "m" { Token::Month }
            / "y" { Token::YearShort }
            / "Y" { Token::Year }
            / "H" { Token::Hour }
            / "I" { Token::Hour12 }
            / "p" { Token::AmPm }
            / "M" { Token::Minute }
            / "S" { Token::Second }
            / "a" { Token::WeekdayAbbrev }
            / "A" { Token::WeekdayName }
            / "w" { Token::WeekdayNumber }
            / "u" { Token::IsoWeekdayNumber }
            / "b" { Token::MonthAbbrev }
            / "B" { Token::MonthName }
            / "j" { Token::DayOfYear }
            / "G" { Token::IsoYear }
            / "V" { Token::IsoWeek }
            / "%" { Token::Percent }

        rule literal() -> Segment
            = l:$((!token() [_])+) { Segment::Literal(l.to_owned()) }
    }
}
