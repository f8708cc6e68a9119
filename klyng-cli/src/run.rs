//  RUN.rs
//    by Lut99
//
//  Created:
//    16 Feb 2023, 16:50:31
//  Last edited:
//    03 Mar 2023, 11:44:27
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements running a single job on the beacon.
//

use std::num::NonZeroU32;
use std::path::PathBuf;

use log::debug;
use tokio_util::sync::CancellationToken;

use klyng_cfg::beacon::BeaconConfig;
use klyng_cfg::hosts::HostsTopology;

pub use crate::errors::RunError as Error;
use crate::launch::{JobLauncher, Launch};
use crate::link::{BeaconLink, GrpcBeaconLink};
use crate::spec::{AbortReason, JobDescriptor, JobOutcome};


/***** TESTS *****/





/***** LIBRARY *****/
/// Launches the given job over the given link and follows it until it's over.
///
/// # Arguments
/// - `link`: The BeaconLink to the beacon that should run the job.
/// - `job`: The JobDescriptor of the job to run.
/// - `cancel`: The CancellationToken that aborts the job if cancelled.
///
/// # Returns
/// How the job ended.
///
/// # Errors
/// This function errors if the job could not be launched or its monitoring failed.
pub async fn run_job<L: BeaconLink>(link: L, job: JobDescriptor, cancel: CancellationToken) -> Result<JobOutcome, Error> {
    let launch: Launch<L> = match JobLauncher::new(link, cancel).launch(job).await {
        Ok(launch) => launch,
        Err(err)   => { return Err(Error::LaunchError{ err }); },
    };

    match launch {
        Launch::Busy => {
            println!("The beacon is busy.");
            Ok(JobOutcome::Busy)
        },
        Launch::Aborted => {
            eprintln!("[Aborted]: {}", AbortReason::Local);
            Ok(JobOutcome::Aborted(AbortReason::Local))
        },
        Launch::Monitoring(monitor) => match monitor.run().await {
            Ok(outcome) => Ok(outcome),
            Err(err)    => Err(Error::MonitorError{ err }),
        },
    }
}



/// Handles running a job on the beacon described in the given config.
///
/// # Arguments
/// - `config`: The BeaconConfig that describes how to reach the beacon.
/// - `size`: The number of processes to run.
/// - `hosts`: The path to the hosts file that describes the machines to run on, if any. If omitted, only runs on the local machine.
/// - `entry`: The path to the application's entrypoint.
/// - `cancel`: The CancellationToken that aborts the job if cancelled.
///
/// # Returns
/// How the job ended.
///
/// # Errors
/// This function errors if the hosts file or entrypoint are invalid, or if the job could not be launched or monitored.
pub async fn handle(config: BeaconConfig, size: NonZeroU32, hosts: Option<PathBuf>, entry: PathBuf, cancel: CancellationToken) -> Result<JobOutcome, Error> {
    // Find out where to run
    let topology: HostsTopology = match hosts {
        Some(path) => match HostsTopology::from_path(&path) {
            Ok(topology) => topology,
            Err(err)     => { return Err(Error::HostsError{ err }); },
        },
        None => HostsTopology::local_only(),
    };
    debug!("Running on {} node(s)", topology.len());

    // The beacon may not share our working directory
    let entry: PathBuf = match std::fs::canonicalize(&entry) {
        Ok(entry) => entry,
        Err(err)  => { return Err(Error::EntryCanonicalizeError{ path: entry, err }); },
    };
    debug!("Application entrypoint: '{}'", entry.display());

    run_job(GrpcBeaconLink::new(config), JobDescriptor::new(size, entry, topology), cancel).await
}
