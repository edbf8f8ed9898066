//! CLI for pingseed — every ping is a seed.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pingseed")]
#[command(about = "pingseed — harvest seeds from inbound ICMP/ICMPv6 traffic")]
#[command(version = pingseed_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen on raw ICMP and ICMPv6 sockets and print one seed per inbound
    /// message (needs root or CAP_NET_RAW)
    Listen {
        /// Output format
        #[arg(long, default_value = "decimal", value_parser = ["decimal", "hex", "json"])]
        format: String,

        /// Stop after this many seeds (0 = until both families stop)
        #[arg(long, default_value = "0")]
        count: u64,
    },

    /// Report platform support and whether raw endpoints can be opened
    Check {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Listen { format, count } => commands::listen::run(&format, count),
        Commands::Check { json } => commands::check::run(json),
    }
}
