mod config;
mod deadline;
mod executor;
mod filename;
mod form;
mod pipeline;
mod preview;
mod record;
mod style;
mod template;

use std::{error::Error, fs, path::PathBuf};

use chrono::{Local, NaiveDateTime};
use clap::Parser;
use config::Config;
use form::FormArgs;
use inquire::Confirm;
use log::{debug, info, warn};
use pipeline::{Pipeline, PrintError};
use record::{PrintRecord, RecordBuilder};
use template::{compiled, raw};

#[derive(Parser)]
#[command(name = env!("CARGO_BIN_NAME"))]
#[command(bin_name = env!("CARGO_BIN_NAME"))]
enum Cli {
    #[command(about = "Prints tool version")]
    #[command(long_about = None)]
    Version,

    #[command(about = "Prints the ticket data as JSON")]
    #[command(long_about = None)]
    Record(TicketArgs),

    #[command(about = "Prints the rendered receipt document")]
    #[command(long_about = None)]
    Render(TicketArgs),

    #[command(about = "Builds a preview of the receipt")]
    #[command(long_about = None)]
    Preview(PreviewArgs),

    #[command(about = "Prints the receipt and saves it to the output directory")]
    #[command(long_about = None)]
    Print(PrintArgs),
}

#[derive(clap::Args)]
struct TicketArgs {
    #[arg(short = 'c', long, env = "YARUKI_CONFIG", default_value = Some("./config.toml"))]
    config_path: PathBuf,

    #[command(flatten)]
    form: FormArgs,
}

#[derive(clap::Args)]
struct PreviewArgs {
    #[command(flatten)]
    ticket: TicketArgs,

    /// Сохранить предпросмотр в HTML страницу вместо вывода SVG.
    #[arg(long)]
    html: Option<PathBuf>,
}

#[derive(clap::Args)]
struct PrintArgs {
    #[command(flatten)]
    ticket: TicketArgs,

    /// Сохранить предпросмотр в HTML страницу.
    #[arg(long)]
    html: Option<PathBuf>,

    /// Не спрашивать подтверждение в интерактивном режиме.
    #[arg(short, long)]
    yes: bool,
}

/// Заявка, готовая к предпросмотру и печати.
struct Ticket {
    cfg: Config,
    record: PrintRecord,
    document: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    match Cli::parse() {
        Cli::Version => {
            println!(env!("CARGO_PKG_VERSION"));
        }
        Cli::Record(args) => {
            let ticket = prepare(&args)?;
            println!("{}", serde_json::to_string_pretty(&ticket.record)?);
        }
        Cli::Render(args) => {
            let ticket = prepare(&args)?;
            print!("{}", ticket.document);
        }
        Cli::Preview(args) => {
            let ticket = prepare(&args.ticket)?;
            let mut pipeline = Pipeline::from_config(&ticket.cfg);

            let svg = preview(&mut pipeline, &ticket, args.html.as_ref())?;
            if args.html.is_none() {
                print!("{}", svg);
            }
        }
        Cli::Print(args) => {
            let ticket = prepare(&args.ticket)?;
            let mut pipeline = Pipeline::from_config(&ticket.cfg);

            preview(&mut pipeline, &ticket, args.html.as_ref())?;
            if args.html.is_none() {
                print!("{}", ticket.document);
            }

            if args.ticket.form.interactive && !args.yes && ticket.record.is_printable() {
                let confirmed = Confirm::new("印刷しますか？").with_default(true).prompt()?;
                if !confirmed {
                    println!("キャンセルしました");
                    return Ok(());
                }
            }

            let now = Local::now().naive_local();

            match pipeline.print(&ticket.record, &ticket.document, &now) {
                Ok(artifacts) => {
                    println!("印刷しました");
                    println!("{}", artifacts.graphic.display());
                    println!("{}", artifacts.receipt.display());
                }
                Err(PrintError::MissingTitle) => {
                    eprintln!("タイトルを入力してください");
                    std::process::exit(2);
                }
                Err(PrintError::Failed { code, stderr }) => {
                    eprintln!("印刷に失敗しました code: `{}`, stderr: ```{}```", code, stderr);
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }
    };

    Ok(())
}

/// Собирает заявку: конфиг, форма, запись и документ по шаблону.
fn prepare(args: &TicketArgs) -> anyhow::Result<Ticket> {
    debug!("Подгружаем конфиг из {:?}", args.config_path);
    let cfg = config::load(&args.config_path)?;

    let now: NaiveDateTime = Local::now().naive_local();

    let snapshot = form::snapshot(&args.form, &cfg, &now)?;

    let record = RecordBuilder::from(&cfg).build(&snapshot, &now)?;

    debug!("Подгружаем шаблон из {:?}", cfg.template_path);
    let raw_tmpl = raw::load(&cfg.template_path)?;
    let tmpl = compiled::Template::new(&raw_tmpl)?;

    let document = tmpl.render(&record);
    debug!("Документ:\n{}", document);

    Ok(Ticket {
        cfg,
        record,
        document,
    })
}

/// Строит предпросмотр и, если нужно, сохраняет его в HTML страницу.
fn preview(
    pipeline: &mut Pipeline,
    ticket: &Ticket,
    html: Option<&PathBuf>,
) -> anyhow::Result<String> {
    let p = pipeline.preview(&ticket.document);
    if p.degraded {
        warn!("Предпросмотр может быть неполным");
    }

    let svg = preview::fit_svg(&p.image, &ticket.cfg.preview_width)?;

    if let Some(path) = html {
        let style = style::preview_stylesheet(&ticket.cfg.preview_width);
        fs::write(path, preview::html_page(&ticket.record.title, &svg, &style))?;
        info!("Предпросмотр сохранён в {:?}", path);
    }

    if !ticket.record.is_printable() {
        info!("Заголовок не задан, печать недоступна");
    }

    Ok(svg)
}
