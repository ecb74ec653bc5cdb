//! # Quire CLI
//!
//! Usage:
//!   quire document.json -o document.pdf
//!   quire document.json --validate-only
//!   quire document.json --dry-run
//!   cat document.json | quire -o document.pdf

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use quire::backend::RecordingBackend;
use quire::{validate, Document, LayoutConfig, QuireError, Severity};

#[derive(Parser)]
#[command(name = "quire")]
#[command(version)]
#[command(about = "Paginate an area-based JSON document into PDF", long_about = None)]
struct Cli {
    /// Document description (JSON). Reads stdin when omitted or `-`.
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output PDF file
    #[arg(short, long, value_name = "FILE", default_value = "output.pdf")]
    output: PathBuf,

    /// Layout settings (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only print validation messages
    #[arg(long)]
    validate_only: bool,

    /// Lay out without writing a PDF and print a page summary
    #[arg(long, conflicts_with = "validate_only")]
    dry_run: bool,

    /// Log layout progress
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .parse_default_env()
        .init();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn read_input(input: Option<&PathBuf>) -> Result<String, QuireError> {
    match input {
        Some(path) if path.as_os_str() != "-" => Ok(fs::read_to_string(path)?),
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode, QuireError> {
    let document = Document::from_json(&read_input(cli.input.as_ref())?)?;
    let config = match &cli.config {
        Some(path) => LayoutConfig::from_json(&fs::read_to_string(path)?)?,
        None => LayoutConfig::default(),
    };

    let messages = validate(&document);
    for message in &messages {
        eprintln!("{message}");
    }
    if cli.validate_only {
        let failed = messages.iter().any(|m| m.severity == Severity::Error);
        return Ok(if failed {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        });
    }

    if cli.dry_run {
        let mut backend = RecordingBackend::new();
        let composition = quire::compose(&document, &config, &mut backend)?;
        println!("{} page(s)", composition.page_count());
        for page in composition.pages() {
            for record in &page.records {
                println!(
                    "  page {:>3}  {:<16} {} node(s)",
                    page.index + 1,
                    record.area,
                    record.placements.len()
                );
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    let pdf = quire::render_pdf(&document, &config)?;
    fs::write(&cli.output, &pdf)?;
    eprintln!("wrote {} bytes to {}", pdf.len(), cli.output.display());
    Ok(ExitCode::SUCCESS)
}
