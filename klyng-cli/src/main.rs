//  MAIN.rs
//    by Lut99
//
//  Created:
//    15 Feb 2023, 09:05:22
//  Last edited:
//    03 Mar 2023, 11:51:40
//  Auto updated?
//    Yes
//
//  Description:
//!   Entrypoint to the `klyng` binary.
//

#[macro_use]
extern crate human_panic;

use std::num::NonZeroU32;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use console::style;
use dotenvy::dotenv;
use log::{debug, info, warn, LevelFilter};
use tokio_util::sync::CancellationToken;

use klyng_cfg::beacon::BeaconConfig;

use klyng_cli::{beacon, run};
use klyng_cli::errors::CliError;
use klyng_cli::link::GrpcBeaconLink;
use klyng_cli::spec::JobOutcome;


/***** ARGUMENTS *****/
#[derive(Parser)]
#[clap(name = "klyng", about = "Launches distributed jobs through the klyng beacon.")]
struct Cli {
    #[clap(short, long, action, env = "DEBUG", help = "Enable debug mode")]
    debug  : bool,
    #[clap(short, long, env = "KLYNG_CONFIG", help = "Path to the YAML file that describes how to reach (and start) the beacon. Uses the defaults if omitted.")]
    config : Option<PathBuf>,

    #[clap(long, action, conflicts_with_all = &["beacon_down", "job_size"], help = "Starts the beacon if it isn't running yet")]
    beacon_up   : bool,
    #[clap(long, action, conflicts_with = "job_size", help = "Takes the beacon down if it's running")]
    beacon_down : bool,

    #[clap(short = 'n', long, requires = "entry", help = "The number of processes to run the application with")]
    job_size : Option<NonZeroU32>,
    #[clap(short, long, requires = "job_size", help = "Path to the JSON file that describes the machines to run on. Only runs locally if omitted.")]
    machines : Option<PathBuf>,
    #[clap(value_name = "KLYNG_APP_ENTRY", requires = "job_size", help = "Path to the application's entrypoint")]
    entry    : Option<PathBuf>,
}





/***** ENTRYPOINT *****/
#[tokio::main]
async fn main() {
    // Parse the CLI arguments
    dotenv().ok();
    let options = Cli::parse();

    // Prepare the logger
    let mut logger = env_logger::builder();
    logger.format_module_path(false);

    if options.debug {
        logger.filter_module("klyng", LevelFilter::Debug).init();
    } else {
        logger.filter_module("klyng", LevelFilter::Warn).init();

        setup_panic!(Metadata {
            name: "Klyng CLI".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            authors: env!("CARGO_PKG_AUTHORS").replace(":", ", ").into(),
            homepage: env!("CARGO_PKG_HOMEPAGE").into(),
        });
    }

    // Nothing to do is not an error, but it's worth a hint
    if !options.beacon_up && !options.beacon_down && options.job_size.is_none() {
        println!("You didn't specify any options.");
        println!("Run (klyng --help) for more info.");
        process::exit(0);
    }

    // The first interrupt aborts whatever we're doing; the second one doesn't wait for that
    let cancel: CancellationToken = CancellationToken::new();
    {
        let cancel: CancellationToken = cancel.clone();
        tokio::spawn(async move {
            loop {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    warn!("Failed to listen for interrupts: {}", err);
                    return;
                }
                if cancel.is_cancelled() {
                    eprintln!("[Aborted]: interrupted again; exiting without waiting for the beacon");
                    process::exit(130);
                }
                info!("Received interrupt");
                cancel.cancel();
            }
        });
    }

    // Run the command given
    match run(options, cancel).await {
        Ok(Some(JobOutcome::Aborted(_))) => process::exit(1),
        Ok(_)                            => process::exit(0),
        Err(err) => {
            eprintln!("{}: {}", style("error").bold().red(), err);
            process::exit(1);
        }
    }
}

/// Runs the command given on the Cli.
///
/// # Arguments
/// - `options`: The struct with (parsed) Cli-options.
/// - `cancel`: The CancellationToken that is cancelled when we're interrupted.
///
/// # Returns
/// How the job ended if we ran one, or `None` if we ran a beacon command.
///
/// # Errors
/// This function errors if the command failed.
async fn run(options: Cli, cancel: CancellationToken) -> Result<Option<JobOutcome>, CliError> {
    let config: BeaconConfig = match BeaconConfig::load(options.config.as_ref()) {
        Ok(config) => config,
        Err(err)   => { return Err(CliError::ConfigError{ err }); },
    };
    debug!("Using beacon at '{}'", config.address);

    if options.beacon_up {
        if let Err(err) = beacon::up(&mut GrpcBeaconLink::new(config)).await { return Err(CliError::BeaconError{ err }); }
        Ok(None)
    } else if options.beacon_down {
        if let Err(err) = beacon::down(&mut GrpcBeaconLink::new(config)).await { return Err(CliError::BeaconError{ err }); }
        Ok(None)
    } else if let (Some(size), Some(entry)) = (options.job_size, options.entry) {
        match run::handle(config, size, options.machines, entry, cancel).await {
            Ok(outcome) => Ok(Some(outcome)),
            Err(err)    => Err(CliError::RunError{ err }),
        }
    } else {
        // Clap requires an entry with a job size
        Ok(None)
    }
}
