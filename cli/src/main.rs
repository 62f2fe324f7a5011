//! docport CLI - document import and export tool

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use docport::export::to_json;
use docport::{
    sanitize, sniff_file, DirectoryDownloader, Docport, DocumentTree, Downloader, ExportFormat,
    ImportOutcome, JsonFormat, NullNotifier,
};

#[derive(Parser)]
#[command(name = "docport")]
#[command(version)]
#[command(about = "Import and export documents as HTML, Markdown, RTF, DOCX and PDF", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a document and print its markup
    Import {
        /// Input file (txt, html, md, rtf, docx, doc, odt, pages, pdf)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// What to print
        #[arg(long, value_enum, default_value = "html")]
        format: ImportView,

        /// Fail on extractor errors instead of falling back
        #[arg(long)]
        strict: bool,

        /// Omit the conversion note on office imports
        #[arg(long)]
        no_note: bool,
    },

    /// Export an HTML or JSON tree file to another format
    Export {
        /// Input file holding HTML markup or a JSON tree
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Target format
        #[arg(short, long, value_enum)]
        to: Target,

        /// Output file (named after the title stem if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Document title
        #[arg(long)]
        title: Option<String>,
    },

    /// Import a document and export it in another format
    Convert {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Target format
        #[arg(short, long, value_enum)]
        to: Target,

        /// Output file (input stem with the new extension if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Fail on extractor errors instead of falling back
        #[arg(long)]
        strict: bool,
    },

    /// Convert many files in parallel
    Batch {
        /// Input files
        #[arg(value_name = "FILES", required = true)]
        inputs: Vec<PathBuf>,

        /// Target format
        #[arg(short, long, value_enum)]
        to: Target,

        /// Output directory
        #[arg(short = 'd', long, value_name = "DIR", default_value = ".")]
        output_dir: PathBuf,
    },

    /// Show how a document imports
    Info {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ImportView {
    /// Sanitized HTML markup
    Html,
    /// Document tree as JSON
    Json,
    /// Rendered plain text
    Text,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Target {
    /// Plain text with CRLF line endings
    Text,
    /// Standalone HTML document
    Html,
    /// Markdown (text only)
    #[value(alias = "md")]
    Markdown,
    /// Rich Text Format
    Rtf,
    /// Flattened text document
    Docx,
    /// PDF (needs a page renderer)
    Pdf,
    /// Document tree as JSON
    Json,
}

impl From<Target> for ExportFormat {
    fn from(target: Target) -> Self {
        match target {
            Target::Text => ExportFormat::Text,
            Target::Html => ExportFormat::Html,
            Target::Markdown => ExportFormat::Markdown,
            Target::Rtf => ExportFormat::Rtf,
            Target::Docx => ExportFormat::Docx,
            Target::Pdf => ExportFormat::Pdf,
            Target::Json => ExportFormat::Json,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Import {
            input,
            output,
            format,
            strict,
            no_note,
        }) => cmd_import(&input, output.as_deref(), format, strict, no_note),
        Some(Commands::Export {
            input,
            to,
            output,
            title,
        }) => cmd_export(&input, to, output.as_deref(), title),
        Some(Commands::Convert {
            input,
            to,
            output,
            strict,
        }) => cmd_convert(&input, to, output.as_deref(), strict),
        Some(Commands::Batch {
            inputs,
            to,
            output_dir,
        }) => cmd_batch(&inputs, to, &output_dir),
        Some(Commands::Info { input, json }) => cmd_info(&input, json),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            println!("{}", "Usage: docport <COMMAND> <FILE>".yellow());
            println!("       docport --help for more information");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn engine(strict: bool) -> Docport {
    let docport = Docport::new();
    if strict {
        docport.strict()
    } else {
        docport
    }
}

fn write_or_print(output: Option<&Path>, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = output {
        fs::write(path, content)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}

fn report_warnings(outcome: &ImportOutcome) {
    for warning in &outcome.warnings {
        eprintln!("{}: {}", "Warning".yellow().bold(), warning);
    }
}

fn cmd_import(
    input: &Path,
    output: Option<&Path>,
    view: ImportView,
    strict: bool,
    no_note: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut docport = engine(strict);
    if no_note {
        docport = docport.without_note();
    }

    let outcome = docport.import_file(input)?;
    report_warnings(&outcome);

    let content = match view {
        ImportView::Html => outcome.html.clone(),
        ImportView::Json => to_json(&outcome.tree, JsonFormat::Pretty)?,
        ImportView::Text => outcome.tree.plain_text(),
    };
    write_or_print(output, &content)
}

/// Load a tree from a JSON dump or from (sanitized) HTML markup.
fn load_tree(input: &Path) -> Result<DocumentTree, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(input)?;
    let is_json = input
        .extension()
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(DocumentTree::from_html(&sanitize(&content)))
    }
}

fn cmd_export(
    input: &Path,
    to: Target,
    output: Option<&Path>,
    title: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let tree = load_tree(input)?;

    let mut docport = Docport::new();
    if let Some(title) = title {
        docport = docport.with_title(title);
    }
    let payload = docport.export(&tree, to.into())?;

    let path = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(&payload.filename));
    fs::write(&path, &payload.bytes)?;
    println!("{} {}", "Saved to".green(), path.display());

    Ok(())
}

fn cmd_convert(
    input: &Path,
    to: Target,
    output: Option<&Path>,
    strict: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(2);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")?
            .progress_chars("#>-"),
    );

    let docport = engine(strict);

    pb.set_message("Importing...");
    let outcome = docport.import_file(input)?;
    pb.inc(1);

    pb.set_message(format!("Exporting {}...", ExportFormat::from(to)));
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "note".to_string());
    let exporter = docport.exporter();
    let options = exporter.options().clone().with_file_stem(stem);
    let payload = exporter.with_options(options).export(&outcome.tree, to.into())?;
    pb.inc(1);

    let path = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(&payload.filename));
    fs::write(&path, &payload.bytes)?;
    pb.finish_with_message("Done!");

    report_warnings(&outcome);
    println!("\n{} {}", "Saved to".green().bold(), path.display());
    println!("  {} imported with {}", "└─".dimmed(), outcome.strategy);

    Ok(())
}

fn cmd_batch(inputs: &[PathBuf], to: Target, output_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(output_dir)?;
    let downloader = DirectoryDownloader::new(output_dir);
    let docport = Docport::new().with_notifier(Arc::new(NullNotifier));
    let format = ExportFormat::from(to);

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let failures: Vec<(PathBuf, String)> = inputs
        .par_iter()
        .filter_map(|input| {
            let result = docport
                .convert(input, format)
                .and_then(|payload| downloader.deliver(&payload));
            pb.inc(1);
            result.err().map(|e| (input.clone(), e.to_string()))
        })
        .collect();

    pb.finish_with_message("Done!");

    let converted = inputs.len() - failures.len();
    println!(
        "\n{} {} of {} file(s) converted to {}",
        "Done!".green().bold(),
        converted,
        inputs.len(),
        format
    );
    for (path, error) in &failures {
        println!("  {} {}: {}", "✗".red(), path.display(), error);
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(format!("{} file(s) failed", failures.len()).into())
    }
}

fn cmd_info(input: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let sniffed = sniff_file(input)?;
    let outcome = Docport::new()
        .with_notifier(Arc::new(NullNotifier))
        .import_file(input)?;

    let text = outcome.tree.plain_text();
    let words = text.split_whitespace().count();
    let chars = text.chars().count();
    let elements = outcome.tree.element_count();

    if json {
        let info = serde_json::json!({
            "file": input.display().to_string(),
            "format": outcome.format,
            "sniffed": sniffed,
            "strategy": outcome.strategy,
            "states": outcome.states,
            "warnings": outcome.warnings,
            "words": words,
            "characters": chars,
            "elements": elements,
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Format".bold(), outcome.format.extension());
    if let Some(ref sniffed) = sniffed {
        println!("{}: {}", "Content looks like".bold(), sniffed.extension());
    }
    println!("{}: {}", "Imported with".bold(), outcome.strategy);
    println!(
        "{}: {}",
        "Fallback".bold(),
        if outcome.used_fallback() { "Yes" } else { "No" }
    );

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "Words".bold(), words);
    println!("{}: {}", "Characters".bold(), chars);
    println!("{}: {}", "Elements".bold(), elements);

    if !outcome.warnings.is_empty() {
        println!();
        println!("{}", "Warnings".yellow().bold());
        for warning in &outcome.warnings {
            println!("  {} {}", "•".dimmed(), warning);
        }
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "docport".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Document import and export tool");
    println!();
    println!("License: MIT");
}
