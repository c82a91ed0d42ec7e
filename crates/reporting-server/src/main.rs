use clap::Parser;
use clap::error::ErrorKind;
use reporting_okapi::{OkapiClient, fetch_db_info};
use reporting_server::{AppState, launch};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

/// Multi-tenant HTTP gateway to the FOLIO reporting databases.
#[derive(Debug, Parser)]
#[command(name = "mod-reporting")]
struct Args {
    /// Path to the JSON configuration file
    config_file: PathBuf,
}

#[tokio::main]
async fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
            return;
        }
        Err(err) => {
            let _ = err.print();
            process::exit(1);
        }
    };

    let cfg = match reporting_core::load_config(&args.config_file) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("mod-reporting: {err:#}");
            process::exit(2);
        }
    };
    reporting_core::init_logging(&cfg.logging);
    tracing::info!(target: "config", "{cfg:?}");

    // Resolve the reporting-database details once up front so a
    // misconfigured deployment fails at startup rather than on the first
    // request. The password is deliberately not logged.
    let okapi = match OkapiClient::from_env() {
        Ok(client) => client,
        Err(err) => {
            eprintln!("mod-reporting: FOLIO session creation failed: {err:#}");
            process::exit(2);
        }
    };
    match fetch_db_info(&okapi, None).await {
        Ok(info) => tracing::info!(target: "db", "url={}, user={}", info.url, info.user),
        Err(err) => {
            eprintln!("mod-reporting: cannot extract data from 'dbinfo': {err:#}");
            process::exit(2);
        }
    }

    let state = Arc::new(AppState::new());
    if let Err(err) = launch(&cfg, state).await {
        eprintln!("mod-reporting: cannot run HTTP server: {err:#}");
        process::exit(3);
    }
}
