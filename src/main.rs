use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use bank::config::{CommonConfig, PathSet};
use bank::logs;
use bank::server::config::ServerConfig;
use bank::server::factory::ServerFactory;
use clap::Parser;
use log::{debug, info};

/// Users and accounts over HTTP, guarded by token based ownership checks.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// The config directory, holding `server.toml`. Default is `$BANK_CONFIG`,
    /// `/etc/bank` for root or `~/.config/bank` otherwise.
    #[arg(long)]
    config_path: Option<PathBuf>,

    /// The data directory, holding the database file. Default is `$BANK_DATA`,
    /// `/var/lib/bank` for root or `~/.local/share/bank` otherwise.
    #[arg(long)]
    data_path: Option<PathBuf>,

    /// The log level, one of `error`, `warn`, `info` and `debug`.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print the completed server configuration (JSON) and exit.
    #[arg(long)]
    print_config: bool,
}

async fn run(args: Args) -> Result<()> {
    logs::init(&args.log_level)?;

    let ps = PathSet::new(args.config_path, args.data_path)?;
    let cfg: ServerConfig = ps
        .load_config("server", ServerConfig::default)
        .context("load server config")?;

    if args.print_config {
        let json = serde_json::to_string_pretty(&cfg).context("encode config")?;
        println!("{json}");
        return Ok(());
    }
    debug!("Use config: {:?}", cfg);

    info!("Starting bank server {}", env!("CARGO_PKG_VERSION"));
    let factory = ServerFactory::new(cfg)?;
    let srv = factory.build_server()?;
    srv.run().await
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            _ = writeln!(io::stderr(), "Fatal: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
