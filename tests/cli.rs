use assert_cmd::prelude::*;
use file_diff::diff;
use predicates::prelude::*;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Рабочая директория теста с конфигом.
struct Case {
    dir: PathBuf,
    config: PathBuf,
    output: PathBuf,
}

impl Case {
    fn new(name: &str, template: &str, preview: &str, print: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let dir = env::temp_dir().join(format!("yaruki-cli-{}-{}", name, std::process::id()));
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;

        let output = dir.join("prints");
        let config = dir.join("config.toml");

        fs::write(
            &config,
            format!(
                "template_path = {}\noutput_dir = {}\n\n[preview_command]\nprogram = \"sh\"\nargs = [\"-c\", {}]\n\n[print_command]\nprogram = \"sh\"\nargs = [\"-c\", {}]\n",
                toml_str(template),
                toml_str(output.to_str().unwrap()),
                toml_str(preview),
                toml_str(print),
            ),
        )?;

        Ok(Self { dir, config, output })
    }

    fn cmd(&self, subcommand: &str) -> Result<Command, Box<dyn std::error::Error>> {
        let mut cmd = Command::cargo_bin("yaruki")?;
        cmd.arg(subcommand).arg("--config-path").arg(&self.config);
        Ok(cmd)
    }

    fn outputs(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = match fs::read_dir(&self.output) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        };
        files.sort();
        files
    }
}

impl Drop for Case {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

fn toml_str(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn data(name: &str) -> PathBuf {
    env::current_dir().unwrap().join("tests").join("data").join(name)
}

fn default_template() -> String {
    env::current_dir()
        .unwrap()
        .join("templates")
        .join("ticket.txt")
        .to_str()
        .unwrap()
        .to_owned()
}

const PREVIEW_SVG: &str = r#"cat > /dev/null; printf '<svg width="576px" height="320px"><g/></svg>'"#;

#[test]
fn version() -> Result<(), Box<dyn std::error::Error>> {
    Command::cargo_bin("yaruki")?
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));

    Ok(())
}

#[test]
fn render_without_project_and_deadline() -> Result<(), Box<dyn std::error::Error>> {
    let case = Case::new("render", &default_template(), "cat", "cat")?;

    let expected = fs::read_to_string(data("reply_to_email.txt"))?;

    case.cmd("render")?
        .args(["--title", "Reply to email", "--no-deadline", "--hide-receipt-date"])
        .assert()
        .success()
        .stdout(predicate::str::diff(expected));

    Ok(())
}

#[test]
fn record_resolves_deadline_tokens() -> Result<(), Box<dyn std::error::Error>> {
    let case = Case::new("record", &default_template(), "cat", "cat")?;

    case.cmd("record")?
        .args(["--title", "x", "--deadline", "teiji", "--date", "2024-05-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""deadline": "05/01 定時""#))
        .stdout(predicate::str::contains(r#""deadlineFormat": "`""#));

    Ok(())
}

#[test]
fn unknown_deadline_fails() -> Result<(), Box<dyn std::error::Error>> {
    let case = Case::new("unknown-deadline", &default_template(), "cat", "cat")?;

    case.cmd("render")?
        .args(["--title", "x", "--deadline", "someday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("someday"));

    Ok(())
}

#[test]
fn unknown_template_key_fails() -> Result<(), Box<dyn std::error::Error>> {
    let template = data("unknown_key.txt");
    let case = Case::new("unknown-key", template.to_str().unwrap(), "cat", "cat")?;

    case.cmd("render")?
        .args(["--title", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("due_date"));

    Ok(())
}

#[test]
fn preview_html_page() -> Result<(), Box<dyn std::error::Error>> {
    let case = Case::new("preview-html", &default_template(), PREVIEW_SVG, "cat")?;
    let page = case.dir.join("preview.html");

    case.cmd("preview")?
        .args(["--title", "x", "--html"])
        .arg(&page)
        .assert()
        .success();

    let html = fs::read_to_string(&page)?;
    assert!(html.contains(r#"<svg width="280px" height="100%"><g/></svg>"#));
    assert!(html.contains(".preview svg"));

    Ok(())
}

#[test]
fn failed_preview_is_not_fatal() -> Result<(), Box<dyn std::error::Error>> {
    let case = Case::new(
        "preview-failed",
        &default_template(),
        "cat > /dev/null; echo broken >&2; exit 3",
        "cat",
    )?;

    case.cmd("preview")?
        .args(["--title", "x"])
        .assert()
        .success()
        .stdout("");

    Ok(())
}

#[test]
fn print_without_title_does_not_call_printer() -> Result<(), Box<dyn std::error::Error>> {
    let marker = env::temp_dir().join(format!("yaruki-cli-printer-called-{}", std::process::id()));
    let _ = fs::remove_file(&marker);
    let case = Case::new(
        "no-title",
        &default_template(),
        PREVIEW_SVG,
        &format!("touch {}", marker.to_str().unwrap()),
    )?;

    case.cmd("print")?
        .assert()
        .failure()
        .stderr(predicate::str::contains("タイトルを入力してください"));

    assert!(!marker.exists());
    assert!(case.outputs().is_empty());

    Ok(())
}

#[test]
fn failed_print_reports_code_and_stderr() -> Result<(), Box<dyn std::error::Error>> {
    let case = Case::new(
        "print-failed",
        &default_template(),
        PREVIEW_SVG,
        "cat > /dev/null; printf '<svg/>'; printf 'printer offline\\nretry later' >&2; exit 1",
    )?;

    case.cmd("print")?
        .args(["--title", "Reply to email"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("code: `1`"))
        .stderr(predicate::str::contains("printer offline\nretry later"))
        .stdout(predicate::str::contains("<svg/>").not());

    assert!(case.outputs().is_empty());

    Ok(())
}

#[test]
fn print_saves_graphic_and_receipt() -> Result<(), Box<dyn std::error::Error>> {
    let case = Case::new(
        "print",
        &default_template(),
        PREVIEW_SVG,
        "cat > /dev/null; printf '<svg>printed</svg>'",
    )?;

    case.cmd("print")?
        .args([
            "--title",
            "Reply to email",
            "--project",
            "家事",
            "--priority",
            "高",
            "--duration",
            "30分",
            "--deadline",
            "today",
            "--body",
            "資料は\n共有フォルダ",
            "--hide-receipt-date",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(fs::read_to_string(data("receipt.txt"))?))
        .stdout(predicate::str::contains("印刷しました"));

    let files = case.outputs();
    assert_eq!(files.len(), 2);

    let graphic = files.iter().find(|f| has_extension(f, "svg")).unwrap();
    let receipt = files.iter().find(|f| has_extension(f, "txt")).unwrap();

    assert_eq!(graphic.file_stem(), receipt.file_stem());
    let stem = receipt.file_stem().unwrap().to_str().unwrap();
    assert!(stem.starts_with("print-"));
    assert!(stem.ends_with("-家事-Reply_to_email"));

    assert_eq!(fs::read_to_string(graphic)?, "<svg>printed</svg>");
    assert!(diff(
        data("receipt.txt").to_str().unwrap(),
        receipt.to_str().unwrap(),
    ));

    Ok(())
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().map(|e| e == ext).unwrap_or_default()
}
