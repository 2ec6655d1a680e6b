use std::process;

use clap::Parser;
use console::style;
use log::{debug, error, info};

use startnotes::{App, Cli, Config, NoteBoard};

pub fn initialize_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .format_module_path(true)
        .init();

    debug!("Logger initialized");
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    initialize_logger(cli.verbose);

    info!("Application starting up");

    if let Err(e) = run(cli).await {
        error!("{}", e);
        eprintln!("{} {}", style("error:").red().bold(), e);
        process::exit(1);
    }

    info!("Application shutting down");
}

async fn run(cli: Cli) -> startnotes::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    debug!("Using data directory {}", config.data_dir.display());

    let board = NoteBoard::open_with_config(&config)?.into_shared();
    let app = App::new(board, config, cli.verbose);
    app.run(cli.command).await
}
