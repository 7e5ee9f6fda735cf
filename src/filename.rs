use chrono::NaiveDateTime;

/// Замена для проекта, если он не выбран.
pub const NO_PROJECT: &str = "noproject";

/// Замена для пустого заголовка.
pub const UNTITLED: &str = "untitled";

/// Расширение файла с изображением квитанции.
pub const GRAPHIC_EXTENSION: &str = "svg";

/// Расширение файла с текстом квитанции.
pub const RECEIPT_EXTENSION: &str = "txt";

const TITLE_MAX_CHARS: usize = 48;

// Вместе с префиксом времени и расширением имя не превышает 255 байт.
const PROJECT_MAX_BYTES: usize = 64;
const TITLE_MAX_BYTES: usize = 144;

const SAFE_PUNCTUATION: &[char] = &['-', '_', '.', ',', '(', ')', '[', ']', '+', '=', '!', '@', '#', '&', '~'];

/// Строит базовое имя файлов для сохранения квитанции.
///
/// Формат: `print-<YYYYMMDD>-<HHMMSS>-<микросекунды>-<проект>-<заголовок>`.
/// Если проект пустой или равен заглушке, используется [`NO_PROJECT`].
pub fn base_name(at: &NaiveDateTime, project: &str, placeholder: &str, title: &str) -> String {
    let project = if project.trim().is_empty() || project == placeholder {
        NO_PROJECT
    } else {
        project
    };

    let title: String = title.chars().take(TITLE_MAX_CHARS).collect();
    let title = if title.is_empty() { UNTITLED } else { &title };

    format!(
        "print-{}-{}-{}",
        at.format("%Y%m%d-%H%M%S-%6f"),
        truncate(sanitize(project), PROJECT_MAX_BYTES),
        truncate(sanitize(title), TITLE_MAX_BYTES)
    )
}

/// Обрезает строку до `max_bytes` байт по границе символа.
fn truncate(mut value: String, max_bytes: usize) -> String {
    if value.len() > max_bytes {
        let mut end = max_bytes;
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        value.truncate(end);
    }
    value
}

/// Заменяет все небезопасные для файловой системы символы на `_`.
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| if is_safe(c) { c } else { '_' })
        .collect()
}

fn is_safe(c: char) -> bool {
    (c.is_alphanumeric() && !c.is_control()) || SAFE_PUNCTUATION.contains(&c)
}
