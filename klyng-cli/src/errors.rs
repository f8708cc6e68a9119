//  ERRORS.rs
//    by Lut99
//
//  Created:
//    15 Feb 2023, 09:18:30
//  Last edited:
//    03 Mar 2023, 11:47:02
//  Auto updated?
//    Yes
//
//  Description:
//!   File that contains file-spanning error definitions for the klyng-cli
//

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FResult};
use std::path::PathBuf;
use std::time::Duration;

use klyng_cfg::errors::{BeaconConfigError, HostsError};


/***** ERROR ENUMS *****/
/// Collects toplevel and uncategorized errors in the klyng-cli package.
#[derive(Debug)]
pub enum CliError {
    /// Failed to load the beacon configuration file.
    ConfigError{ err: BeaconConfigError },
    /// Errors that occur during `--beacon-up` or `--beacon-down`
    BeaconError{ err: BeaconError },
    /// Errors that occur while running a job
    RunError{ err: RunError },
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use CliError::*;
        match self {
            ConfigError{ err } => write!(f, "{}", err),
            BeaconError{ err } => write!(f, "{}", err),
            RunError{ err }    => write!(f, "{}", err),
        }
    }
}

impl Error for CliError {}



/// Collects errors that occur while talking to the beacon.
#[derive(Debug)]
pub enum LinkError {
    /// There is no connection to the beacon (yet).
    NotConnected,
    /// A request to the beacon failed.
    RequestError{ what: &'static str, address: String, err: tonic::Status },
    /// The beacon did not answer a request in time.
    RequestTimeout{ what: &'static str, address: String, timeout: Duration },
}

impl Display for LinkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use LinkError::*;
        match self {
            NotConnected                             => write!(f, "Not connected to the beacon"),
            RequestError{ what, address, err }       => write!(f, "Failed to send {} request to beacon '{}': remote returned status: {}", what, address, err),
            RequestTimeout{ what, address, timeout } => write!(f, "Beacon '{}' did not answer {} request within {}ms", address, what, timeout.as_millis()),
        }
    }
}

impl Error for LinkError {}



/// Collects errors that end an attempt to launch a job.
#[derive(Debug)]
pub enum LaunchError {
    /// The beacon was not running and we could not start it either.
    StartFailed,
    /// The beacon refused the job (for a reason other than being busy).
    Rejected{ reason: String },
}

impl Display for LaunchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use LaunchError::*;
        match self {
            StartFailed        => write!(f, "Failed to start or connect to beacon."),
            Rejected{ reason } => write!(f, "The beacon rejected the job: {}", reason),
        }
    }
}

impl Error for LaunchError {}



/// Collects errors that occur while monitoring a running job.
#[derive(Debug)]
pub enum MonitorError {
    /// The beacon disconnected before all processes exited.
    LinkClosed{ remaining: u32 },
    /// Failed to tell the beacon the job is done.
    SignalDoneError{ err: LinkError },
}

impl Display for MonitorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use MonitorError::*;
        match self {
            LinkClosed{ remaining } => write!(f, "Lost connection to the beacon while {} process{} still running", remaining, if *remaining == 1 { " was" } else { "es were" }),
            SignalDoneError{ err }  => write!(f, "Failed to notify the beacon that the job is done: {}", err),
        }
    }
}

impl Error for MonitorError {}



/// Collects errors during a job run.
#[derive(Debug)]
pub enum RunError {
    /// The given hosts file was not valid.
    HostsError{ err: HostsError },
    /// Could not resolve the path to the application's entrypoint.
    EntryCanonicalizeError{ path: PathBuf, err: std::io::Error },

    /// Failed to launch the job.
    LaunchError{ err: LaunchError },
    /// Failed to see the job through.
    MonitorError{ err: MonitorError },
}

impl Display for RunError {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use RunError::*;
        match self {
            HostsError{ err }                   => write!(f, "{}", err),
            EntryCanonicalizeError{ path, err } => write!(f, "Could not resolve application entrypoint '{}': {}", path.display(), err),

            LaunchError{ err }  => write!(f, "{}", err),
            MonitorError{ err } => write!(f, "{}", err),
        }
    }
}

impl Error for RunError {}



/// Collects errors during the beacon lifetime commands.
#[derive(Debug)]
pub enum BeaconError {
    /// The beacon could not be started (or connected to after starting).
    StartFailed,
    /// The beacon refused to go down or could not be reached to tell it so.
    StopFailed,
}

impl Display for BeaconError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use BeaconError::*;
        match self {
            StartFailed => write!(f, "Failed to start or connect to beacon."),
            StopFailed  => write!(f, "Failed to take beacon down."),
        }
    }
}

impl Error for BeaconError {}
