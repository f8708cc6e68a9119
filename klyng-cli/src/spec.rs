//  SPEC.rs
//    by Lut99
//
//  Created:
//    15 Feb 2023, 09:40:11
//  Last edited:
//    02 Mar 2023, 17:13:26
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the types that describe a job and what happens to it.
//

use std::fmt::{Display, Formatter, Result as FResult};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use klyng_cfg::hosts::HostsTopology;


/***** LIBRARY *****/
/// Describes a job to run. Cannot be changed once created.
#[derive(Clone, Debug)]
pub struct JobDescriptor {
    /// The number of processes in the job.
    size     : NonZeroU32,
    /// The path to the application's entrypoint.
    entry    : PathBuf,
    /// The machines on which the processes may run.
    topology : HostsTopology,
}

impl JobDescriptor {
    /// Constructor for the JobDescriptor.
    ///
    /// # Arguments
    /// - `size`: The number of processes in the job.
    /// - `entry`: The path to the application's entrypoint.
    /// - `topology`: The machines on which the processes may run.
    ///
    /// # Returns
    /// A new JobDescriptor instance.
    #[inline]
    pub fn new(size: NonZeroU32, entry: impl Into<PathBuf>, topology: HostsTopology) -> Self {
        Self {
            size,
            entry : entry.into(),
            topology,
        }
    }

    /// Returns the number of processes in the job.
    #[inline]
    pub fn size(&self) -> NonZeroU32 { self.size }

    /// Returns the path to the application's entrypoint.
    #[inline]
    pub fn entry(&self) -> &Path { &self.entry }

    /// Returns the machines on which the processes may run.
    #[inline]
    pub fn topology(&self) -> &HostsTopology { &self.topology }
}



/// The beacon's answer to a submitted job.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Ack {
    /// The beacon runs the job.
    Accepted,
    /// The beacon is already running another job.
    Busy,
    /// The beacon won't run the job.
    Rejected{ reason: String },
}



/// Something that happened in a running job.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MonitorEvent {
    /// A process wrote a line to its stdout.
    Stdout{ line: String },
    /// A process wrote a line to its stderr.
    Stderr{ line: String },
    /// One of the job's processes exited.
    ProcessExit,
    /// The beacon gave up on the job.
    JobAborted{ reason: String },
}



/// The states the launch of a job goes through.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LaunchState {
    Idle,
    CheckingAvailability,
    StartingBeacon,
    Submitting,
    Busy,
    Monitoring,
    Failed,
    Aborted,
}

impl Display for LaunchState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use LaunchState::*;
        match self {
            Idle                 => write!(f, "idle"),
            CheckingAvailability => write!(f, "checking availability"),
            StartingBeacon       => write!(f, "starting beacon"),
            Submitting           => write!(f, "submitting"),
            Busy                 => write!(f, "busy"),
            Monitoring           => write!(f, "monitoring"),
            Failed               => write!(f, "failed"),
            Aborted              => write!(f, "aborted"),
        }
    }
}



/// Why a job was aborted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AbortReason {
    /// The beacon aborted the job, for the given reason.
    Beacon(String),
    /// We were interrupted.
    Local,
}

impl Display for AbortReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        match self {
            AbortReason::Beacon(reason) => write!(f, "{}", reason),
            AbortReason::Local          => write!(f, "interrupted"),
        }
    }
}



/// How a job run ended, if it didn't end in an error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum JobOutcome {
    /// The beacon was running another job; ours was never started.
    Busy,
    /// All processes exited and the beacon knows it.
    Completed,
    /// The job was aborted.
    Aborted(AbortReason),
}
