mod commands;
mod context;

use clap::Parser;
use env_logger::Env;

use crate::context::{Cli, Commands};

fn main() {
    let args = Cli::parse();

    // RUST_LOG still takes precedence.
    let level = if args.debug {
        "trace"
    } else if args.verbose {
        "debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let code = match args.command {
        Commands::Scan(scan) => commands::cmd_scan(scan, args.verbose || args.debug),
        Commands::Frequencies {
            first_uhf_channel,
            last_uhf_channel,
            offset,
        } => commands::cmd_frequencies(first_uhf_channel, last_uhf_channel, offset),
    };
    std::process::exit(code);
}
