/// Правило стилей: ключ и текст правила.
pub type Rule = (&'static str, String);

/// Упорядоченный набор правил стилей.
/// Правила выводятся в порядке регистрации, повторная регистрация ключа
/// заменяет текст на прежнем месте.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stylesheet {
    rules: Vec<Rule>,
}

impl Stylesheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<I: IntoIterator<Item = Rule>>(&mut self, rules: I) -> &mut Self {
        for (key, text) in rules {
            match self.rules.iter_mut().find(|(k, _)| *k == key) {
                Some(rule) => rule.1 = text,
                None => self.rules.push((key, text)),
            }
        }
        self
    }

    /// Собирает все правила в одну таблицу стилей.
    pub fn render(&self) -> String {
        self.rules
            .iter()
            .map(|(_, text)| text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn page_rules() -> Vec<Rule> {
    vec![
        (
            "page",
            "body { margin: 0; padding: 16px; background: #f0f0f0; font-family: sans-serif; }".to_owned(),
        ),
        ("footer", "footer { color: #888; font-size: 12px; text-align: center; }".to_owned()),
    ]
}

fn preview_rules(width: &str) -> Vec<Rule> {
    vec![
        (
            "preview",
            format!(".preview {{ width: {}; margin: 0 auto; background: #fff; box-shadow: 0 1px 4px #999; }}", width),
        ),
        ("preview-svg", ".preview svg { display: block; width: 100%; }".to_owned()),
    ]
}

/// Таблица стилей для страницы предпросмотра.
pub fn preview_stylesheet(width: &str) -> Stylesheet {
    let mut sheet = Stylesheet::new();
    sheet.register(page_rules()).register(preview_rules(width));
    sheet
}
