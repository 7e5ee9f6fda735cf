use std::str::FromStr;

use log::debug;

use crate::record::{PrintRecord, RecordKey};

use super::raw;

/// Скомпилированный шаблон.
#[derive(Debug, Clone)]
pub struct Template {
    parts: Vec<Part>,
}

/// Часть скомпилированного шаблона.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// Текст, который копируется как есть.
    Text(String),

    /// Значение из записи для печати.
    Field(RecordKey),
}

impl Template {
    /// Создаёт новый инстанс скомпилированного шаблона.
    /// Все плейсхолдеры должны ссылаться на известные ключи записи.
    pub fn new(raw: &raw::Template) -> CompileResult<Self> {
        debug!("Compile template {:?}", raw.path);

        let tokens = template::template(&raw.source).map_err(|e| CompileError::Parse(e.to_string()))?;

        let mut parts = Vec::with_capacity(tokens.len());
        for t in tokens {
            let part = match t {
                Token::Text(s) => Part::Text(s.to_owned()),
                Token::Placeholder(name) => Part::Field(
                    RecordKey::from_str(name).map_err(|_| CompileError::UnknownKey(name.to_owned()))?,
                ),
            };
            parts.push(part);
        }

        Ok(Self { parts })
    }

    /// Подставляет значения записи в шаблон.
    pub fn render(&self, record: &PrintRecord) -> String {
        let mut result = String::new();

        for part in self.parts.iter() {
            match part {
                Part::Text(s) => result.push_str(s),
                Part::Field(key) => result.push_str(record.get(*key)),
            }
        }

        result
    }
}

pub enum Token<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

pub type CompileResult<T> = std::result::Result<T, CompileError>;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("parse template: {0}")]
    Parse(String),

    #[error("unknown placeholder \"{0}\"")]
    UnknownKey(String),
}

peg::parser! {
    grammar template() for str {
        pub rule template() -> Vec<Token<'input>>
            = t:(placeholder() / text())* { t }

        rule placeholder() -> Token<'input>
            = "{{" space()* n:$(ident()) space()* "}}" {
                Token::Placeholder(n)
            }

        rule text() -> Token<'input>
            = t:$((!placeholder() [_])+) {
                Token::Text(t)
            }

        rule ident()
            = en_letter() (en_letter() / digit() / "_")*

        rule digit() = ['0'..='9']

        rule en_letter() = ['a'..='z'] / ['A'..='Z']

        rule space() = " " / "\t"
    }
}
