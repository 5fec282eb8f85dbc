use clap::{Args, Parser, Subcommand};
use pfb_fhir::*;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pfb-fhir")]
#[command(about = "Flatten FHIR resources into profile backed property maps")]
#[command(version)]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SchemaArgs {
    /// Entity model (yaml or json)
    #[arg(short, long)]
    model: PathBuf,
    /// Directory of StructureDefinition json files
    #[arg(short, long)]
    profiles: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one flat json object per record
    Transform {
        #[command(flatten)]
        schema: SchemaArgs,
        /// Records as ndjson, a json array or a Bundle
        #[arg(short, long)]
        input: PathBuf,
        /// Fold lists, extensions, codings and identifiers
        #[arg(long)]
        simplify: bool,
    },
    /// Describe the properties of the first record of each entity
    Describe {
        #[command(flatten)]
        schema: SchemaArgs,
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        simplify: bool,
        /// Directory of extension definitions and value sets
        #[arg(short, long)]
        terminology: Option<PathBuf>,
    },
    /// Print entities and their link edges
    Graph {
        #[command(flatten)]
        schema: SchemaArgs,
    },
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Transform {
            schema,
            input,
            simplify,
        } => {
            let transformer = Transformer::new(load_graph(&schema)?, transform_config(simplify));
            for record in read_records(&input).await? {
                if let Some(transformed) = transformer.transform(&record)? {
                    println!("{}", transformed.to_flat_json());
                }
            }
        }
        Commands::Describe {
            schema,
            input,
            simplify,
            terminology,
        } => {
            let store = match terminology {
                Some(dir) => TerminologyStore::from_dir(dir)?,
                None => TerminologyStore::new(),
            };
            let transformer = Transformer::new(load_graph(&schema)?, transform_config(simplify));
            let describer = PropertyDescriber::new(&store, transformer.seen_messages());
            let mut described: HashSet<String> = HashSet::new();

            for record in read_records(&input).await? {
                let Some(transformed) = transformer.transform(&record)? else {
                    continue;
                };
                if !described.insert(transformed.entity_id.clone()) {
                    continue;
                }
                let output = json!({
                    "entity": transformed.entity_id,
                    "properties": describer.describe_all(&transformed.properties),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
        }
        Commands::Graph { schema } => {
            let graph = load_graph(&schema)?;
            for entity in graph.entities() {
                println!("{} ({})", entity.id(), entity.category());
            }
            for edge in graph.edges() {
                let marker = if edge.link.required { "" } else { "?" };
                println!(
                    "{} -[{}{}]-> {}",
                    edge.source, edge.link.id, marker, edge.target
                );
            }
        }
    }

    Ok(())
}

fn transform_config(simplify: bool) -> TransformConfig {
    if simplify {
        TransformConfig::simplified()
    } else {
        TransformConfig::default()
    }
}

fn load_graph(schema: &SchemaArgs) -> Result<Arc<SchemaGraph>> {
    let model = ModelConfig::from_path(&schema.model)?;
    let profiles = ProfileSet::from_dir(&schema.profiles)?;
    Ok(Arc::new(SchemaGraph::load(&model, &profiles)?))
}

/// Records from a json array, a Bundle, a single resource or ndjson.
async fn read_records(path: &Path) -> Result<Vec<Value>> {
    let text = tokio::fs::read_to_string(path).await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Array(records)) => Ok(records),
        Ok(bundle) if bundle.get("resourceType").and_then(Value::as_str) == Some("Bundle") => {
            Ok(bundle
                .get("entry")
                .and_then(Value::as_array)
                .map(|entries| {
                    entries
                        .iter()
                        .filter_map(|entry| entry.get("resource").cloned())
                        .collect()
                })
                .unwrap_or_default())
        }
        Ok(record) => Ok(vec![record]),
        Err(_) => text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(PfbFhirError::from))
            .collect(),
    }
}
