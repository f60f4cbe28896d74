use anyhow::Context;
use clap::{Parser, Subcommand};
use m2svg_render::{reverse, CommandRenderer};
use m2svg_scan::{scan, RenderOutcome};
use std::fs;
use std::path::{Path, PathBuf};

mod config;
mod convert;

use config::ConvertArgs;
use convert::Converter;

#[derive(Parser)]
#[command(name = "m2svg", version)]
#[command(about = "Replace TeX math in documents with MathJax SVG or MathML", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every \( \) and \[ \] region of a document
    Convert(ConvertArgs),
    /// Report delimiter faults without rendering anything
    Check {
        #[arg(value_name = "FILE")]
        path: PathBuf,
        /// Print the faults as JSON
        #[arg(long)]
        json: bool,
    },
    /// Turn a converted document back into TeX-delimited text
    Reverse {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },
}

fn read(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn write(path: &Path, contents: &str) -> anyhow::Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

fn convert(args: &ConvertArgs) -> anyhow::Result<()> {
    let config = args.resolve()?;
    let document = read(&args.input)?;

    let renderer = CommandRenderer::detect(config.renderer.as_deref(), config.format())?
        .with_args(config.renderer_args.clone());
    let root = args
        .output
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let mut converter = Converter::new(&renderer, &config, root).with_progress(!args.quiet);
    let result = converter.convert(&document)?;
    write(&args.output, &result.output)?;

    if let Some(path) = &args.diagnostics {
        write(path, &serde_json::to_string_pretty(&result.diagnostics)?)?;
    }
    if !args.quiet {
        println!();
        println!("Finished");
    }
    Ok(())
}

/// Returns whether the document is free of delimiter faults.
fn check(path: &Path, json: bool) -> anyhow::Result<bool> {
    let document = read(path)?;
    let result = scan(&document, |span| RenderOutcome::Rendered(span.source()));
    if json {
        println!("{}", serde_json::to_string_pretty(&result.diagnostics)?);
    } else {
        for diagnostic in &result.diagnostics {
            println!("{}", diagnostic);
        }
    }
    log::info!(
        "Checked {} math regions, {} faults",
        result.spans,
        result.diagnostics.len()
    );
    Ok(result.diagnostics.is_empty())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Convert(args) => convert(args)?,
        Commands::Check { path, json } => {
            if !check(path, *json)? {
                std::process::exit(1);
            }
        }
        Commands::Reverse { input, output } => {
            let document = read(input)?;
            write(output, &reverse(&document))?;
        }
    }
    Ok(())
}
