pub mod cli;

use anyhow::Result;
use clap::Parser;
use env_logger::Env;

const ENV_TIMELY_LOGLEVEL: &str = "TIMELY_LOGLEVEL";

/// Main entry point for the CLI
pub fn cli_main(args: Vec<String>) -> Result<()> {
    let _ = env_logger::try_init_from_env(Env::new().filter(ENV_TIMELY_LOGLEVEL));

    let cli = cli::Cli::parse_from(args);
    cli.run()
}
