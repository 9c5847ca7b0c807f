//! CLI entry point for the Kin family registry.
//!
//! Designed for subprocess invocation from a web or API layer: request
//! bodies are read as JSON from stdin, one JSON response envelope is written
//! to stdout, and logs go to stderr.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing_subscriber::{fmt, EnvFilter};

use kin_core::config::{self, Backend, RegistryConfig};
use kin_core::{KinError, NewPerson, PersonId, PersonUpdate};
use kin_graph::{GraphClient, GraphConfig};
use kin_registry::response::Response;
use kin_registry::{DeriveLimits, MemoryStore, Neo4jStore, PersonStore, RegistryService};

#[derive(Parser)]
#[command(name = "kin")]
#[command(about = "Family registry and relationship queries")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: kin).
    #[arg(short, long, default_value = config::DEFAULT_FILE_PREFIX, global = true)]
    config: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List everyone in registration order.
    List,
    /// Show one person with their siblings and parents.
    Get {
        #[arg(long)]
        id: PersonId,
    },
    /// Register a person (reads JSON from stdin).
    Register,
    /// Edit a person (reads a partial JSON update from stdin).
    Edit {
        #[arg(long)]
        id: PersonId,
    },
    /// Delete a person and every relation mentioning them.
    Delete {
        #[arg(long)]
        id: PersonId,
    },
    Siblings {
        #[arg(long)]
        id: PersonId,
    },
    Parents {
        #[arg(long)]
        id: PersonId,
    },
    /// Nested tree of descendants.
    Children {
        #[arg(long)]
        id: PersonId,
    },
    Grandparents {
        #[arg(long)]
        id: PersonId,
    },
    Cousins {
        #[arg(long)]
        id: PersonId,
    },
}

impl Command {
    fn is_mutation(&self) -> bool {
        matches!(self, Self::Register | Self::Edit { .. } | Self::Delete { .. })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if cli.log_json {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    }

    let registry_config = config::load_registry_config(&cli.config)?;
    let limits = DeriveLimits::from(&registry_config);

    let response = match registry_config.backend {
        Backend::Memory => run_memory(&cli.command, &registry_config, limits).await?,
        Backend::Neo4j => {
            let graph_config: GraphConfig = config::load_section(&cli.config, "neo4j")?;
            let graph = GraphClient::connect(&graph_config).await?;
            let service = RegistryService::new(Neo4jStore::new(graph)).with_limits(limits);
            dispatch(&service, &cli.command).await
        }
    };

    println!("{}", serde_json::to_string(&response)?);
    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Run against the JSON data file, writing it back after a successful
/// mutation.
async fn run_memory(
    command: &Command,
    registry_config: &RegistryConfig,
    limits: DeriveLimits,
) -> anyhow::Result<Response> {
    let store = MemoryStore::load(&registry_config.data_file).await?;
    let service = RegistryService::new(store).with_limits(limits);

    let response = dispatch(&service, command).await;
    if command.is_mutation() && response.is_success() {
        service.store().save(&registry_config.data_file).await?;
    }
    Ok(response)
}

async fn dispatch<S: PersonStore>(service: &RegistryService<S>, command: &Command) -> Response {
    match command {
        Command::List => Response::from_result(service.list_people().await, 200),
        Command::Get { id } => Response::from_result(service.get_person(id).await, 200),
        Command::Register => match read_body::<NewPerson>() {
            Ok(new) => Response::from_result(service.register_person(new).await, 201),
            Err(e) => Response::from_error(&e),
        },
        Command::Edit { id } => match read_body::<PersonUpdate>() {
            Ok(update) => Response::from_result(service.edit_person(id, update).await, 200),
            Err(e) => Response::from_error(&e),
        },
        Command::Delete { id } => Response::from_result(service.delete_person(id).await, 200),
        Command::Siblings { id } => Response::from_result(service.get_siblings(id).await, 200),
        Command::Parents { id } => Response::from_result(service.get_parents(id).await, 200),
        Command::Children { id } => Response::from_result(service.get_children(id).await, 200),
        Command::Grandparents { id } => {
            Response::from_result(service.get_grandparents(id).await, 200)
        }
        Command::Cousins { id } => Response::from_result(service.get_cousins(id).await, 200),
    }
}

/// Read a JSON request body from stdin. A malformed body is a validation
/// failure, not an internal one.
fn read_body<T: DeserializeOwned>() -> Result<T, KinError> {
    let input = std::io::read_to_string(std::io::stdin())?;
    serde_json::from_str(&input).map_err(|e| KinError::invalid("body", format!("Invalid JSON: {e}")))
}
