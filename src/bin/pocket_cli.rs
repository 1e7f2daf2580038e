//! PocketDB CLI
//!
//! Command-line interface for poking at a pocket store.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pocketdb::{delete_store, list_stores, Pocket};
use tracing_subscriber::{fmt, EnvFilter};

/// PocketDB CLI
#[derive(Parser, Debug)]
#[command(name = "pocket-cli")]
#[command(about = "CLI for the PocketDB embedded key-value store")]
#[command(version)]
struct Args {
    /// Directory containing the pocket files
    #[arg(short, long, default_value = "./pocketdb_data")]
    dir: PathBuf,

    /// Name of the pocket to operate on
    #[arg(short, long, default_value = "default")]
    name: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key to a JSON value
    Set {
        /// The key to set
        key: String,

        /// The value to set (parsed as JSON, stored as a string otherwise)
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Check whether a key exists
    Has {
        /// The key to check
        key: String,
    },

    /// List every key in the pocket
    Keys,

    /// List every pocket in the directory
    Stores,

    /// Delete the pocket's backing files
    Drop,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pocketdb=debug"));

    fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();

    // Session-free commands first.
    match &args.command {
        Commands::Stores => {
            for name in list_stores(&args.dir) {
                println!("{name}");
            }
            return;
        }
        Commands::Drop => {
            let removed = delete_store(&args.name, &args.dir);
            if removed.complete() {
                println!("dropped \"{}\"", args.name);
            } else {
                eprintln!("could not fully drop \"{}\"", args.name);
                std::process::exit(1);
            }
            return;
        }
        _ => {}
    }

    if let Err(e) = std::fs::create_dir_all(&args.dir) {
        eprintln!("cannot create {}: {e}", args.dir.display());
        std::process::exit(1);
    }

    let mut pocket = Pocket::new();
    if let Err(e) = pocket.open(&args.name, &args.dir) {
        eprintln!("failed to open pocket: {e}");
        std::process::exit(1);
    }

    let result = run(&mut pocket, &args.command);

    if let Err(e) = pocket.close() {
        eprintln!("failed to close pocket: {e}");
    }
    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(pocket: &mut Pocket, command: &Commands) -> pocketdb::Result<()> {
    match command {
        Commands::Get { key } => {
            match pocket.get::<serde_json::Value>(key)? {
                Some(value) => println!("{value}"),
                None => println!("(nil)"),
            }
            Ok(())
        }
        Commands::Set { key, value } => {
            // Accept raw JSON; anything unparseable is stored as plain text.
            let value: serde_json::Value = serde_json::from_str(value)
                .unwrap_or_else(|_| serde_json::Value::String(value.clone()));
            pocket.set(key, &value)
        }
        Commands::Del { key } => pocket.delete(key),
        Commands::Has { key } => {
            println!("{}", pocket.has_key(key)?);
            Ok(())
        }
        Commands::Keys => {
            for key in pocket.list_keys()? {
                println!("{key}");
            }
            Ok(())
        }
        Commands::Stores | Commands::Drop => unreachable!("handled before opening"),
    }
}
