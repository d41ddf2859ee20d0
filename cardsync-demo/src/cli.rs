use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "cardsync",
    about = "cardsync - drive a local/engine sync bridge against the in-memory engine",
    version = env!("CARGO_PKG_VERSION"),
    author,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Path to a cardsync.json config file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Local change poll interval (ms)")]
    pub poll_ms: Option<u64>,

    #[arg(long, global = true, help = "Breaker cooldown (ms)")]
    pub cooldown_ms: Option<u64>,

    #[arg(long, global = true, value_parser = ["poll", "notify"], help = "Local change detection")]
    pub detection: Option<String>,

    #[arg(
        long,
        global = true,
        value_parser = ["cooldown", "origin-tag", "origin_tag"],
        help = "Echo suppression strategy"
    )]
    pub echo_guard: Option<String>,

    #[arg(
        long,
        global = true,
        env = "CARDSYNC_CARDS_DIR",
        default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/cards"),
        help = "Directory holding the built-in cards"
    )]
    pub cards_dir: PathBuf,

    #[arg(short, long, global = true, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Attach a bridge and alternate local and engine-side toggles")]
    Run {
        #[arg(
            long,
            default_value = "module_a",
            help = "Card file, or a built-in name (baseline, module_a)"
        )]
        card: String,

        #[arg(long, default_value = "6", help = "Number of toggles to perform")]
        toggles: u32,
    },

    #[command(about = "Run one of the reference sync scenarios")]
    Scenario {
        #[arg(value_parser = ["a", "b", "c", "d"], help = "Scenario to run")]
        name: String,
    },

    #[command(about = "Show the resolved configuration")]
    Status {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Write the resolved configuration to the data directory")]
        save: bool,
    },
}
