//! linkv CLI
//!
//! Local inspection and maintenance of a linkv data directory.

use std::process;

use clap::{Parser, Subcommand};
use linkv::{Config, Engine, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// linkv CLI
#[derive(Parser, Debug)]
#[command(name = "linkv-cli")]
#[command(about = "Inspect and edit a linkv store on local disk")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./linkv_data")]
    data_dir: String,

    /// Shard count; defaults to the existing directory's count
    #[arg(short, long)]
    shards: Option<usize>,

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

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Remove a key
    Remove {
        /// The key to remove
        key: String,
    },

    /// Print the number of entries
    Size,

    /// Print every entry
    Scan {
        /// Stop after this many entries
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print per-shard statistics
    Stats,

    /// Remove every entry
    Clear,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,linkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut builder = Config::builder().data_dir(&args.data_dir);
    let shards = match args.shards {
        Some(shards) => Some(shards),
        None => Some(Engine::existing_shard_count(&args.data_dir)?).filter(|&n| n != 0),
    };
    if let Some(shards) = shards {
        builder = builder.shards(shards);
    }
    let engine = Engine::open(builder.build())?;

    match args.command {
        Commands::Get { key } => match engine.get(key.as_bytes())? {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => println!("(nil)"),
        },
        Commands::Put { key, value } => {
            engine.put(key.as_bytes(), value.as_bytes())?;
            println!("OK");
        }
        Commands::Remove { key } => match engine.remove(key.as_bytes())? {
            Some(_) => println!("1"),
            None => println!("0"),
        },
        Commands::Size => println!("{}", engine.size()),
        Commands::Scan { limit } => {
            for entry in engine.iter().take(limit.unwrap_or(usize::MAX)) {
                let (key, value) = entry?;
                println!(
                    "{}\t{}",
                    String::from_utf8_lossy(&key),
                    String::from_utf8_lossy(&value)
                );
            }
        }
        Commands::Stats => {
            for (id, stats) in engine.stats().iter().enumerate() {
                println!(
                    "shard {}: size={} table_length={} rehash_index={} load={:.3} data_write_pos={} index_bytes={} data_bytes={}",
                    id,
                    stats.size,
                    stats.table_length,
                    stats.rehash_index,
                    stats.load(),
                    stats.data_write_pos,
                    stats.index_bytes,
                    stats.data_bytes,
                );
            }
        }
        Commands::Clear => {
            engine.clear()?;
            println!("OK");
        }
    }

    engine.close()
}
