pub mod commands;

use anyhow::Result;
use clap::Parser;
use timely_core::config::ConnectionConfig;
use timely_core::connection::Connection;

use commands::{Commands, Output};

#[derive(Parser, Debug)]
#[command(name = "timely", version, about = "Command-line client for the Timely time-series store")]
pub struct Cli {
    /// Store host
    #[arg(long, env = "TIMELY_HOST")]
    host: Option<String>,

    /// Store port
    #[arg(short, long, env = "TIMELY_PORT")]
    port: Option<u16>,

    /// Fail instead of reconnecting when the connection drops
    #[arg(long)]
    no_reconnect: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Environment configuration with the command-line flags applied on top.
    pub fn config(&self) -> Result<ConnectionConfig> {
        let mut config = ConnectionConfig::from_env()?;
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.no_reconnect {
            config.reconnect = false;
        }
        Ok(config)
    }

    pub fn run(&self) -> Result<()> {
        let config = self.config()?;
        log::debug!("using store at {}", config.address());
        let conn = Connection::open(&config);

        match self.command.execute(&conn)? {
            Output::Json(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            Output::Raw(payload) => println!("{payload}"),
        }
        Ok(())
    }
}
