use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info};

use pagetext::{ExtractionOptions, Page, PageExtractor, PageSource, PdfiumDocument};

#[derive(Parser, Debug)]
#[command(
    name = "pagetext",
    version,
    about = "Extract per-page text from a PDF, with OCR for pages lacking a text layer"
)]
struct Cli {
    /// PDF file to extract.
    pdf: PathBuf,

    /// Render resolution for OCR.
    #[arg(long)]
    dpi: Option<u32>,

    /// Directory holding `eng.traineddata`.
    #[arg(long)]
    tessdata: Option<PathBuf>,

    /// Pages with fewer native characters than this are OCR-ed.
    #[arg(long)]
    min_native_chars: Option<usize>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    pagetext::init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "extraction failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let options = resolve_options(&cli)?;
    validate_input(&cli.pdf)?;

    let document = PdfiumDocument::open(&cli.pdf)
        .with_context(|| format!("failed to open {}", cli.pdf.display()))?;
    info!(
        file = document.file_name().unwrap_or_default(),
        pages = document.page_count()?,
        "Parsing PDF"
    );
    let extractor = PageExtractor::new(options);
    let pages = extractor
        .extract_pages(&document)
        .with_context(|| format!("failed to extract {}", cli.pdf.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.format {
        OutputFormat::Text => write_text(&mut out, &pages)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &pages)?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// The input must be an existing regular file with a `.pdf` extension.
fn validate_input(path: &Path) -> Result<()> {
    ensure!(path.is_file(), "{} is not a file", path.display());
    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    ensure!(is_pdf, "{} is not a .pdf file", path.display());
    Ok(())
}

/// Environment first, then command-line flags.
fn resolve_options(cli: &Cli) -> Result<ExtractionOptions> {
    let mut builder = ExtractionOptions::from_env()
        .context("invalid options in environment")?
        .to_builder();
    if let Some(dpi) = cli.dpi {
        builder = builder.ocr_dpi(dpi);
    }
    if let Some(dir) = &cli.tessdata {
        builder = builder.tessdata_dir(dir);
    }
    if let Some(min) = cli.min_native_chars {
        builder = builder.min_native_text_length(min);
    }
    builder.build().context("invalid options")
}

fn write_text(out: &mut impl Write, pages: &[Page]) -> io::Result<()> {
    for page in pages {
        writeln!(out, "--- Page {} ---", page.page_number())?;
        writeln!(out, "{}", page.text())?;
    }
    Ok(())
}
