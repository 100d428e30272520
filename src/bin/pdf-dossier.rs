//! PDF Dossier CLI tool
//!
//! Watermarks the PDFs found in one folder per person and combines them
//! into a single dossier with a title page, table of contents and bookmarks.

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;

use pdf_dossier::config::{BuildOptions, DEFAULT_TITLE, DEFAULT_WATERMARK_TEXT};
use pdf_dossier::pdf::WatermarkStyle;

/// PDF Dossier - Watermark PDFs and combine them into one navigable document
#[derive(Parser)]
#[command(name = "pdf-dossier")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Build the dossier from ./Docs (one subfolder per person)
    pdf-dossier -s ./Docs

    # Custom watermark and title
    pdf-dossier -s ./Docs -w \"RESERVE POUR LOCATION APPARTEMENT\" -t \"Dossier Dupont\"

    # Lighter, steeper watermark, four worker threads
    pdf-dossier -s ./Docs --opacity 0.2 --angle 45 -j 4

The dossier is written to <source>/Dossier Location/<title>.pdf.
An optional <source>/generation.json sets aliases and order per folder:
    { \"marie\": { \"alias\": \"Marie Dupont\", \"order\": 1 } }")]
struct Cli {
    /// Source folder containing one subfolder of PDF files per person
    #[arg(short, long)]
    source: PathBuf,

    /// Watermark text stamped on every page
    #[arg(short, long, default_value = DEFAULT_WATERMARK_TEXT)]
    watermark: String,

    /// Dossier title (title page and output file name)
    #[arg(short, long, default_value = DEFAULT_TITLE)]
    title: String,

    /// Watermark opacity, from 0 (invisible) to 1 (opaque)
    #[arg(long, default_value_t = 0.3, value_parser = parse_opacity)]
    opacity: f32,

    /// Watermark rotation in degrees, counter-clockwise
    #[arg(long, default_value_t = 30.0, allow_negative_numbers = true)]
    angle: f32,

    /// Number of worker threads used for watermarking
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    jobs: u16,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_opacity(value: &str) -> Result<f32, String> {
    let opacity: f32 = value.parse().map_err(|_| format!("'{}' is not a number", value))?;
    if (0.0..=1.0).contains(&opacity) {
        Ok(opacity)
    } else {
        Err(format!("opacity must be between 0 and 1, got {}", opacity))
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    log::info!("Source folder: {}", cli.source.display());
    log::info!("Watermark text: {}", cli.watermark);

    let options = BuildOptions {
        source: cli.source,
        watermark_text: cli.watermark,
        title: cli.title,
        style: WatermarkStyle {
            opacity: cli.opacity,
            angle_degrees: cli.angle,
            ..Default::default()
        },
        jobs: usize::from(cli.jobs),
    };

    let report = pdf_dossier::build(&options)
        .with_context(|| format!("Failed to build dossier from {}", options.source.display()))?;

    if !report.skipped.is_empty() {
        log::warn!(
            "{} document{} skipped",
            report.skipped.len(),
            if report.skipped.len() == 1 { " was" } else { "s were" }
        );
    }
    eprintln!(
        "Created {} ({} pages, {} documents)",
        report.output_path.display(),
        report.layout.total_pages(),
        report.document_count
    );

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_opacity() {
        assert_eq!(parse_opacity("0.5"), Ok(0.5));
        assert_eq!(parse_opacity("1"), Ok(1.0));
        assert!(parse_opacity("1.5").is_err());
        assert!(parse_opacity("abc").is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["pdf-dossier", "-s", "Docs"]).unwrap();
        assert_eq!(cli.watermark, DEFAULT_WATERMARK_TEXT);
        assert_eq!(cli.title, DEFAULT_TITLE);
        assert_eq!(cli.jobs, 1);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_cli_requires_source() {
        assert!(Cli::try_parse_from(["pdf-dossier"]).is_err());
        assert!(Cli::try_parse_from(["pdf-dossier", "-s", "Docs", "-j", "0"]).is_err());
    }
}
