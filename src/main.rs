//! `layered-config`: inspect the merged configuration from the command line.
//!
//! # Usage
//! ```text
//! layered-config --file conf.d --env-prefix APP --set server.port=9000 get server.port
//! layered-config --file app.yaml dump
//! layered-config --file app.yaml watch
//! ```
//!
//! Sources are registered file → env → flag, so later layers win.

use clap::{Parser, Subcommand};

use layered_config::observability::logging;
use layered_config::source::{EnvSource, FileSource, FlagSource};
use layered_config::Config;

#[derive(Parser)]
#[command(name = "layered-config")]
#[command(about = "Merge and inspect layered configuration", long_about = None)]
struct Cli {
    /// Config file or directory; repeat to layer several
    #[arg(short, long = "file", value_name = "PATH")]
    files: Vec<std::path::PathBuf>,

    /// Read environment variables starting with this prefix
    #[arg(long, value_name = "PREFIX")]
    env_prefix: Option<String>,

    /// Override a single key, e.g. `--set server.port=9000`
    #[arg(short, long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved value at a dotted path
    Get { key: String },
    /// Print the whole resolved tree as JSON
    Dump,
    /// Print the tree on every change until Ctrl-C
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(&format!("layered_config={}", cli.log_level));

    let mut builder = Config::builder();
    for path in &cli.files {
        builder = builder.with_source(FileSource::new(path));
    }
    if let Some(prefix) = &cli.env_prefix {
        builder = builder.with_source(EnvSource::new(prefix));
    }
    if !cli.overrides.is_empty() {
        builder = builder.with_source(FlagSource::new(cli.overrides.iter().map(|o| format!("--{o}"))));
    }

    let config = builder.build();
    config.load().await?;

    match cli.command {
        Commands::Get { key } => {
            let node = config.get(&key).raw()?;
            match node {
                serde_json::Value::String(s) => println!("{s}"),
                other => println!("{}", serde_json::to_string_pretty(&other)?),
            }
        }
        Commands::Dump => print_tree(&config)?,
        Commands::Watch => {
            print_tree(&config)?;
            config.watch(|config| {
                if let Err(e) = print_tree(config) {
                    tracing::error!(error = %e, "Failed to print config");
                }
            })?;

            tokio::signal::ctrl_c().await?;
            tracing::info!("Shutting down");
            config.shutdown().await?;
        }
    }

    Ok(())
}

fn print_tree(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let tree: serde_json::Value = serde_json::from_slice(&config.source()?)?;
    println!("{}", serde_json::to_string_pretty(&tree)?);
    Ok(())
}
