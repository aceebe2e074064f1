use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lazytree_core::document::Document;
use lazytree_core::options::DiffMode;
use lazytree_core::path::Path as TreePath;
use lazytree_core::tree::VirtualTree;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "lazytree")]
#[command(about = "Navigate, validate, and diff JSON documents without fully parsing them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Navigate to a path and print its declaration
    Get {
        /// Input JSON document
        input: PathBuf,

        /// Path expression, e.g. `.items[0].name`
        path: String,

        /// Print the literal source declaration instead of a re-serialized value
        #[arg(long, default_value_t = false)]
        raw: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },

    /// Validate a document against a JSON-Schema-shaped schema file
    Validate {
        /// Input JSON document
        input: PathBuf,

        /// Schema file (standard `type`/`properties`/`required`/`items` keywords)
        #[arg(long)]
        schema: PathBuf,

        /// Output format for the error report
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },

    /// Diff two JSON documents
    Diff {
        /// Expected-side document
        expected: PathBuf,

        /// Actual-side document
        actual: PathBuf,

        /// Comparison strictness
        #[arg(long, value_enum, default_value_t = DiffModeArg::Strict)]
        mode: DiffModeArg,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormat {
    Pretty,
    Compact,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum DiffModeArg {
    Strict,
    Lenient,
}

impl From<DiffModeArg> for DiffMode {
    fn from(val: DiffModeArg) -> Self {
        match val {
            DiffModeArg::Strict => DiffMode::strict(),
            DiffModeArg::Lenient => DiffMode::lenient(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Get {
            input,
            path,
            raw,
            format,
        } => {
            let doc = read_document(&input)?;
            let tree = VirtualTree::at(doc, TreePath::of(&path));
            if raw {
                let declaration = tree
                    .declaration()
                    .with_context(|| format!("failed to navigate to {path}"))?;
                println!("{declaration}");
            } else {
                let value = tree
                    .value()
                    .with_context(|| format!("failed to navigate to {path}"))?;
                let json = serde_json::Value::from(&value);
                write_json(&json, None, format)?;
            }
        }
        Commands::Validate {
            input,
            schema,
            format,
        } => {
            let doc = read_document(&input)?;
            let tree = VirtualTree::root(doc);

            let raw_schema = read_json(&schema)?;
            let schema = lazytree_core::schema::from_json_schema(&raw_schema)
                .with_context(|| format!("failed to ingest schema from {}", schema.display()))?;

            match lazytree_core::validation::validate(&tree, &schema) {
                Ok(()) => {
                    eprintln!("valid");
                }
                Err(violation) => {
                    write_json(&violation.errors, None, format)?;
                    std::process::exit(1);
                }
            }
        }
        Commands::Diff {
            expected,
            actual,
            mode,
            format,
        } => {
            let expected_doc = read_document(&expected)?;
            let actual_doc = read_document(&actual)?;
            let expected_tree = VirtualTree::root(expected_doc);
            let actual_tree = VirtualTree::root(actual_doc);

            let differences = lazytree_core::diff::diff(&expected_tree, &actual_tree, &mode.into());
            if differences.is_empty() {
                eprintln!("no differences");
            } else {
                write_json(&differences, None, format)?;
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn read_document(input: &PathBuf) -> Result<std::sync::Arc<Document>> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read input file: {}", input.display()))?;
    Document::parse(&text)
        .with_context(|| format!("failed to parse document: {}", input.display()))
}

fn read_json(input: &PathBuf) -> Result<serde_json::Value> {
    let file = File::open(input)
        .with_context(|| format!("failed to open input file: {}", input.display()))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .with_context(|| format!("failed to parse JSON from: {}", input.display()))
}

fn write_json<T: serde::Serialize>(
    val: &T,
    path: Option<&PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let mut writer: Box<dyn Write> = if let Some(p) = path {
        let file = File::create(p)
            .with_context(|| format!("failed to create output file: {}", p.display()))?;
        Box::new(BufWriter::new(file))
    } else {
        Box::new(BufWriter::new(io::stdout()))
    };

    match format {
        OutputFormat::Pretty => {
            serde_json::to_writer_pretty(&mut writer, val).context("failed to write JSON")?;
        }
        OutputFormat::Compact => {
            serde_json::to_writer(&mut writer, val).context("failed to write JSON")?;
        }
    }

    writeln!(writer).context("failed to write trailing newline")?;
    Ok(())
}
