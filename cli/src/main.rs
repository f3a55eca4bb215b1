use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use formstate_core::{
    resolve_callback_tree, BuilderOptions, CallbackStateOptions, ConditionalKind,
    FormStateBuilder, Path, Reconciler, RootFormStateOptions, SchemaDescriptor, SchemaRegistry,
    StateTree, ValidationMarker, Value,
};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "formstate")]
#[command(about = "Inspect form-state trees derived from a schema and a document")]
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
    /// Build the form-state tree of a document
    Prepare {
        /// Schema descriptor file
        #[arg(long)]
        schema: PathBuf,

        /// Document JSON file
        #[arg(long)]
        document: PathBuf,

        /// Root type name (defaults to the first type in the descriptor)
        #[arg(long = "type")]
        type_name: Option<String>,

        /// Comparison document (e.g. the published version) for `changed` flags
        #[arg(long)]
        comparison: Option<PathBuf>,

        /// Validation markers JSON file
        #[arg(long)]
        validation: Option<PathBuf>,

        /// Focused path, e.g. `body[_key=="p1"].text`
        #[arg(long)]
        focus: Option<String>,

        /// Open path
        #[arg(long)]
        open: Option<String>,

        /// Selected field group of the root object
        #[arg(long)]
        group: Option<String>,

        /// Behave as if the review-changes panel were open
        #[arg(long)]
        changes_open: bool,

        /// Nesting level at which recursion stops
        #[arg(long, default_value_t = formstate_core::MAX_FIELD_DEPTH)]
        max_depth: usize,

        /// Output file (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },

    /// Reconcile two JSON documents and report which subtrees were reused
    Reconcile {
        /// Previous JSON document
        previous: PathBuf,

        /// Next JSON document
        next: PathBuf,

        /// Output file (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

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

#[derive(serde::Serialize)]
struct ReconcileReport {
    value: Value,
    /// Paths of the outermost subtrees carried over from the previous document.
    reused: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for JSON
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
        Commands::Prepare {
            schema,
            document,
            type_name,
            comparison,
            validation,
            focus,
            open,
            group,
            changes_open,
            max_depth,
            output,
            format,
        } => {
            let descriptor: SchemaDescriptor = read_json(&schema, "schema descriptor")?;
            let registry = SchemaRegistry::compile(&descriptor)
                .map_err(|e| anyhow::Error::from(e).context("Schema compilation failed"))?;
            let root_name = type_name
                .or_else(|| descriptor.types.first().and_then(|t| t.name.clone()))
                .context("Schema descriptor declares no types")?;
            let root_type = registry
                .get(&root_name)
                .with_context(|| format!("Unknown root type: {root_name}"))?;

            let doc: Value = read_json(&document, "document")?;
            let comparison: Option<Value> = comparison
                .map(|path| read_json(&path, "comparison document"))
                .transpose()?;
            let validation: Vec<ValidationMarker> = validation
                .map(|path| read_json(&path, "validation markers"))
                .transpose()?
                .unwrap_or_default();
            let focus_path = parse_path(focus.as_deref())?;
            let open_path = parse_path(open.as_deref())?;
            let group_state = group.map(StateTree::Leaf);

            let config = BuilderOptions {
                max_depth,
                ..BuilderOptions::default()
            };
            let callback_options = CallbackStateOptions {
                schema_type: root_type,
                document_value: Some(&doc),
                current_user: None,
                forced: false,
            };
            let hidden = resolve_callback_tree(ConditionalKind::Hidden, &callback_options, &config)
                .map_err(|e| anyhow::Error::from(e).context("Resolving hidden state failed"))?;
            let read_only =
                resolve_callback_tree(ConditionalKind::ReadOnly, &callback_options, &config)
                    .map_err(|e| {
                        anyhow::Error::from(e).context("Resolving read-only state failed")
                    })?;

            let options = RootFormStateOptions {
                comparison_value: comparison.as_ref(),
                hidden: hidden.as_deref(),
                read_only: read_only.as_deref(),
                open_path,
                focus_path,
                validation: &validation,
                field_group_state: group_state.as_ref(),
                changes_open,
                ..RootFormStateOptions::new(root_type, Some(&doc))
            };
            let node = FormStateBuilder::new()
                .with_options(config)
                .prepare(&options)
                .map_err(|e| anyhow::Error::from(e).context("Building form state failed"))?;

            if node.is_none() {
                eprintln!("Warning: Nothing to render; every member of the document is hidden.");
            }
            write_json(&node, output.as_ref(), format)?;
        }
        Commands::Reconcile {
            previous,
            next,
            output,
            format,
        } => {
            let previous_value: Value = read_json(&previous, "previous document")?;
            let next_value: Value = read_json(&next, "next document")?;

            let value = Reconciler::default().reconcile(Some(&previous_value), &next_value);
            let mut reused = Vec::new();
            collect_reused(&previous_value, &value, &Path::root(), &mut reused);
            tracing::debug!(reused = reused.len(), "reconciled documents");

            write_json(&ReconcileReport { value, reused }, output.as_ref(), format)?;
        }
    }

    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &PathBuf, what: &str) -> Result<T> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open {what} file: {}", path.display()))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse {what} from: {}", path.display()))
}

fn parse_path(raw: Option<&str>) -> Result<Path> {
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::Error::from(e).context("Invalid path argument")),
        None => Ok(Path::root()),
    }
}

/// Record the outermost containers of `result` that are `previous`'s own.
fn collect_reused(previous: &Value, result: &Value, path: &Path, out: &mut Vec<String>) {
    match (previous, result) {
        (Value::Array(_) | Value::Object(_), _) if result.ptr_eq(previous) => {
            out.push(path.to_string());
        }
        (Value::Object(prev), Value::Object(map)) => {
            for (key, value) in map.iter() {
                if let Some(p) = prev.get(key) {
                    collect_reused(p, value, &path.field(key), out);
                }
            }
        }
        (Value::Array(prev), Value::Array(items)) => {
            for (index, (p, item)) in prev.iter().zip(items.iter()).enumerate() {
                collect_reused(p, item, &path.index(index), out);
            }
        }
        _ => {}
    }
}

fn write_json<T: serde::Serialize>(
    val: &T,
    path: Option<&PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let mut writer: Box<dyn Write> = if let Some(p) = path {
        let file = File::create(p)
            .with_context(|| format!("Failed to create output file: {}", p.display()))?;
        Box::new(BufWriter::new(file))
    } else {
        Box::new(BufWriter::new(io::stdout()))
    };

    match format {
        OutputFormat::Pretty => {
            serde_json::to_writer_pretty(&mut writer, val).context("Failed to write JSON")?;
        }
        OutputFormat::Compact => {
            serde_json::to_writer(&mut writer, val).context("Failed to write JSON")?;
        }
    }

    // Ensure trailing newline
    writeln!(writer).context("Failed to write trailing newline")?;
    writer.flush().context("Failed to flush output")?;

    Ok(())
}
