use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use econci_core::{ConfigManager, EconCiConfig, LabeledVector, ObservationTable};
use econci_graph::{edges_nodes_to_csv, ComplexityEngine};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "econci")]
#[command(about = "econci - Economic complexity indexes and product space graphs", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (json, pretty, table)
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Config file; defaults to ./.econci.toml, then ~/.econci/config.toml
    #[arg(long, global = true, env = "ECONCI_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
    Table,
}

/// Column roles and M_cp threshold; unset flags fall back to the configuration.
#[derive(Args, Clone, Default)]
struct PipelineArgs {
    /// Observation CSV with a header row
    #[arg(short, long)]
    input: PathBuf,

    /// Entity column (e.g. country)
    #[arg(long)]
    entity: Option<String>,

    /// Item column (e.g. product)
    #[arg(long)]
    item: Option<String>,

    /// Numeric flow column (e.g. export)
    #[arg(long)]
    value: Option<String>,

    /// RCA at or above this marks a specialization
    #[arg(long)]
    m_cp_threshold: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute ECI and PCI
    Compute {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Also report diversity and ubiquity
        #[arg(long)]
        all: bool,
    },

    /// Build the complete graph, maximum spanning tree and product space, and export them as CSV
    ProductSpace {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Directory receiving the <name>_edges.csv / <name>_nodes.csv files
        #[arg(long)]
        out_dir: PathBuf,

        /// File prefix of the product space export
        #[arg(long, default_value = "product_space")]
        name: String,

        /// Non-tree edges heavier than this are kept
        #[arg(long)]
        edge_weight_threshold: Option<f64>,
    },

    /// Print the effective configuration as TOML
    Config,
}

// File prefixes of the two graphs exported next to the product space.
const COMPLETE_GRAPH_EXPORT: &str = "complete_graph";
const MAXST_EXPORT: &str = "maxst";

#[derive(Debug, Serialize)]
struct IndexEntry {
    label: String,
    value: f64,
}

#[derive(Tabled)]
struct TableRow {
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Debug, Serialize)]
struct ProductSpaceResult {
    items: usize,
    complete_graph_edges: usize,
    maxst_edges: usize,
    product_space_edges: usize,
    edge_weight_threshold: f64,
    out_dir: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let manager = match &cli.config {
        Some(path) => ConfigManager::load_from_path(path),
        None => ConfigManager::load(),
    }
    .context("Failed to load configuration")?;
    init_tracing(manager.config(), cli.verbose);

    if let Commands::Config = cli.command {
        print!("{}", toml::to_string_pretty(manager.config())?);
        return Ok(());
    }

    match execute_command(&cli.command, manager.config()) {
        Ok(output) => {
            print_output(&cli.output, &output)?;
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(config: &EconCiConfig, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format == "compact" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn execute_command(cmd: &Commands, config: &EconCiConfig) -> Result<serde_json::Value> {
    match cmd {
        Commands::Compute { pipeline, all } => execute_compute(pipeline, *all, config),
        Commands::ProductSpace {
            pipeline,
            out_dir,
            name,
            edge_weight_threshold,
        } => {
            let threshold =
                edge_weight_threshold.unwrap_or(config.product_space.edge_weight_threshold);
            execute_product_space(pipeline, out_dir, name, threshold, config)
        }
        Commands::Config => Ok(serde_json::to_value(config)?),
    }
}

/// Flags win over the loaded configuration.
fn effective_config(pipeline: &PipelineArgs, config: &EconCiConfig) -> EconCiConfig {
    let mut config = config.clone();
    if let Some(entity) = &pipeline.entity {
        config.columns.entity = entity.clone();
    }
    if let Some(item) = &pipeline.item {
        config.columns.item = item.clone();
    }
    if let Some(value) = &pipeline.value {
        config.columns.value = value.clone();
    }
    if let Some(threshold) = pipeline.m_cp_threshold {
        config.complexity.m_cp_threshold = threshold;
    }
    config
}

fn computed_engine(pipeline: &PipelineArgs, config: &EconCiConfig) -> Result<ComplexityEngine> {
    let config = effective_config(pipeline, config);
    let table = ObservationTable::from_csv_path(&pipeline.input)
        .with_context(|| format!("Failed to read {}", pipeline.input.display()))?;
    debug!(
        "Loaded {} observations from {}",
        table.num_rows(),
        pipeline.input.display()
    );

    let mut engine =
        ComplexityEngine::from_config(&table, &config).context("Invalid observation table")?;
    engine
        .calculate_indexes()
        .context("Failed to compute complexity indexes")?;
    Ok(engine)
}

fn entries(vector: &LabeledVector) -> Vec<IndexEntry> {
    vector
        .iter()
        .map(|(label, value)| IndexEntry {
            label: label.to_string(),
            value,
        })
        .collect()
}

fn execute_compute(
    pipeline: &PipelineArgs,
    all: bool,
    config: &EconCiConfig,
) -> Result<serde_json::Value> {
    let engine = computed_engine(pipeline, config)?;

    let mut result = serde_json::Map::new();
    result.insert("eci".into(), serde_json::to_value(entries(&engine.eci()?))?);
    result.insert("pci".into(), serde_json::to_value(entries(&engine.pci()?))?);
    if all {
        result.insert(
            "diversity".into(),
            serde_json::to_value(entries(&engine.diversity()?))?,
        );
        result.insert(
            "ubiquity".into(),
            serde_json::to_value(entries(&engine.ubiquity()?))?,
        );
    }
    Ok(serde_json::Value::Object(result))
}

fn execute_product_space(
    pipeline: &PipelineArgs,
    out_dir: &Path,
    name: &str,
    edge_weight_threshold: f64,
    config: &EconCiConfig,
) -> Result<serde_json::Value> {
    if name == COMPLETE_GRAPH_EXPORT || name == MAXST_EXPORT {
        bail!(
            "--name '{}' would overwrite the {} export; pick another prefix",
            name,
            name
        );
    }

    let mut engine = computed_engine(pipeline, config)?;
    engine
        .create_product_space(edge_weight_threshold)
        .context("Failed to build product space")?;

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let complete = engine.complete_graph()?;
    let maxst = engine.maxst()?;
    let space = engine.product_space()?;
    for (graph, graph_name) in [
        (&complete, COMPLETE_GRAPH_EXPORT),
        (&maxst, MAXST_EXPORT),
        (&space, name),
    ] {
        edges_nodes_to_csv(graph, graph_name, out_dir)
            .with_context(|| format!("Failed to export {}", graph_name))?;
    }

    let result = ProductSpaceResult {
        items: space.node_count(),
        complete_graph_edges: complete.edge_count(),
        maxst_edges: maxst.edge_count(),
        product_space_edges: space.edge_count(),
        edge_weight_threshold,
        out_dir: out_dir.display().to_string(),
    };
    Ok(serde_json::to_value(result)?)
}

fn print_output(format: &OutputFormat, value: &serde_json::Value) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Pretty => {
            print_pretty(value)?;
        }
        OutputFormat::Table => {
            print_table(value)?;
        }
    }
    Ok(())
}

fn print_pretty(value: &serde_json::Value) -> Result<()> {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                let key_colored = key.cyan().bold();
                match val {
                    serde_json::Value::String(s) => {
                        println!("{}: {}", key_colored, s.green());
                    }
                    serde_json::Value::Number(n) => {
                        println!("{}: {}", key_colored, n.to_string().yellow());
                    }
                    serde_json::Value::Array(items) => {
                        println!("{}:", key_colored);
                        for item in items {
                            print_entry(item);
                        }
                    }
                    _ => {
                        println!("{}: {}", key_colored, val);
                    }
                }
            }
        }
        _ => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
    }
    Ok(())
}

fn print_entry(item: &serde_json::Value) {
    let label = cell(item.get("label"));
    let value = item.get("value").and_then(|v| v.as_f64());
    let rendered = match value {
        Some(v) if v < 0.0 => format!("{:>10.4}", v).red(),
        Some(v) => format!("{:>10.4}", v).green(),
        None => format!("{:>10}", "NaN").dimmed(),
    };
    println!("  {:<24} {}", label, rendered);
}

fn print_table(value: &serde_json::Value) -> Result<()> {
    let serde_json::Value::Object(map) = value else {
        return print_pretty(value);
    };

    let mut scalars = Vec::new();
    for (key, val) in map {
        match val {
            serde_json::Value::Array(items) => {
                let rows: Vec<TableRow> = items
                    .iter()
                    .map(|item| TableRow {
                        label: cell(item.get("label")),
                        value: cell(item.get("value")),
                    })
                    .collect();
                println!("{}", key.cyan().bold());
                println!("{}", Table::new(rows).with(Style::rounded()));
            }
            other => scalars.push(TableRow {
                label: key.clone(),
                value: cell(Some(other)),
            }),
        }
    }

    if !scalars.is_empty() {
        println!("{}", Table::new(scalars).with(Style::rounded()));
    }
    Ok(())
}

/// serde_json writes non-finite floats as null; those render as NaN.
fn cell(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) if n.is_f64() => {
            format!("{:.4}", n.as_f64().unwrap_or(f64::NAN))
        }
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::Null) => "NaN".to_string(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}
