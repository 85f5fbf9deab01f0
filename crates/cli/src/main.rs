//! deckfix: grammar-correct the text of PowerPoint decks.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use deckfix_core::{proofread, Corrector};
use deckfix_grammar::{LanguageToolConfig, LanguageToolCorrector, ReplacementCorrector};
use deckfix_pptx::PptxDocument;
use deckfix_server::{Server, ServerConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Grammar-correct the text in PowerPoint decks.
#[derive(Parser, Debug)]
#[command(name = "deckfix")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the upload/correct/download HTTP service
    Serve {
        #[command(flatten)]
        server: ServerConfig,

        #[command(flatten)]
        corrector: CorrectorArgs,
    },

    /// Correct decks on disk
    Proofread {
        /// Input PowerPoint file(s) (.pptx)
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Output directory (default: same as input file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        corrector: CorrectorArgs,
    },

    /// List the slides and shapes of a deck
    Inspect {
        /// Input PowerPoint file (.pptx)
        input: PathBuf,

        /// Print the parsed presentation as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct CorrectorArgs {
    /// LanguageTool server to check text with
    #[arg(long, env = "DECKFIX_LANGUAGETOOL_URL", default_value = "http://localhost:8081")]
    languagetool_url: String,

    /// Language code sent to LanguageTool
    #[arg(long, env = "DECKFIX_LANGUAGE", default_value = "en-US")]
    language: String,

    /// Seconds to wait for each LanguageTool reply
    #[arg(long, default_value = "30")]
    languagetool_timeout: u64,

    /// Word list (`wrong = right` per line) to use instead of LanguageTool
    #[arg(long)]
    replacements: Option<PathBuf>,
}

impl CorrectorArgs {
    fn build(&self) -> Result<Arc<dyn Corrector>> {
        if let Some(path) = &self.replacements {
            let corrector = ReplacementCorrector::from_file(path)
                .with_context(|| format!("Failed to load replacements from {}", path.display()))?;
            return Ok(Arc::new(corrector));
        }

        log::info!(
            "Using LanguageTool at {} ({})",
            self.languagetool_url,
            self.language
        );
        let corrector = LanguageToolCorrector::new(LanguageToolConfig {
            base_url: self.languagetool_url.clone(),
            language: self.language.clone(),
            timeout: Duration::from_secs(self.languagetool_timeout),
        })?;
        Ok(Arc::new(corrector))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Command::Serve { server, corrector } => {
            let corrector = corrector.build()?;
            let address = server.address.clone();
            Server::new(server, corrector)
                .run()
                .await
                .with_context(|| format!("Server on {} failed", address))
        }
        Command::Proofread {
            input,
            output,
            corrector,
        } => {
            let corrector = corrector.build()?;
            let mut failed = 0;
            for input_path in &input {
                if let Err(e) =
                    proofread_file(input_path, output.as_deref(), corrector.as_ref(), cli.verbose)
                        .await
                {
                    eprintln!("Error processing {}: {:#}", input_path.display(), e);
                    failed += 1;
                }
            }
            if failed > 0 {
                anyhow::bail!("{} of {} file(s) failed", failed, input.len());
            }
            Ok(())
        }
        Command::Inspect { input, json } => inspect(&input, json),
    }
}

/// Correct a single deck and write `corrected_<name>` beside it or into
/// `output_dir`.
async fn proofread_file(
    input_path: &Path,
    output_dir: Option<&Path>,
    corrector: &dyn Corrector,
    verbose: bool,
) -> Result<()> {
    if verbose {
        eprintln!("Processing: {}", input_path.display());
    }

    let mut document = PptxDocument::open(input_path)
        .with_context(|| format!("Failed to open {}", input_path.display()))?;
    let report = proofread(document.presentation_mut(), corrector).await?;

    if verbose {
        for amendment in &report.amendments {
            eprintln!(
                "  slide {} / {}: {:?} -> {:?}",
                amendment.slide, amendment.shape, amendment.before, amendment.after
            );
        }
    }

    let output_path = get_output_path(input_path, output_dir)?;
    document
        .save(&output_path)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    println!(
        "{}: {} of {} text frame(s) amended -> {}",
        input_path.display(),
        report.amended(),
        report.examined,
        output_path.display()
    );
    Ok(())
}

/// Determine the output path for a corrected deck.
fn get_output_path(input_path: &Path, output_dir: Option<&Path>) -> Result<PathBuf> {
    let filename = input_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("presentation.pptx");
    let output_filename = deckfix_server::storage::output_name(filename);

    let output_path = match output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
            dir.join(output_filename)
        }
        None => match input_path.parent() {
            Some(parent) => parent.join(output_filename),
            None => PathBuf::from(output_filename),
        },
    };

    Ok(output_path)
}

fn inspect(input_path: &Path, json: bool) -> Result<()> {
    let document = PptxDocument::open(input_path)
        .with_context(|| format!("Failed to open {}", input_path.display()))?;
    let presentation = document.presentation();

    if json {
        println!("{}", serde_json::to_string_pretty(presentation)?);
        return Ok(());
    }

    println!(
        "{}: {} slide(s)",
        presentation.filename,
        presentation.slides.len()
    );
    for slide in &presentation.slides {
        println!("Slide {} ({})", slide.number, slide.part);
        for shape in &slide.shapes {
            match shape.text_frame() {
                Some(frame) => println!(
                    "  [{}] {}: {:?}",
                    shape.kind.label(),
                    shape.name,
                    frame.text()
                ),
                None => println!("  [{}] {}", shape.kind.label(), shape.name),
            }
        }
    }

    Ok(())
}
