//  MONITOR.rs
//    by Lut99
//
//  Created:
//    16 Feb 2023, 14:21:58
//  Last edited:
//    03 Mar 2023, 10:58:31
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the monitor that follows a running job until all of its
//!   processes have exited or it's aborted.
//

use std::io::Write;
use std::num::NonZeroU32;

use futures::StreamExt as _;
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

pub use crate::errors::MonitorError as Error;
use crate::link::{BeaconLink, EventStream};
use crate::spec::{AbortReason, JobOutcome, MonitorEvent};


/***** TESTS *****/





/***** LIBRARY *****/
/// The states a RunSession may be in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionState {
    /// Some processes are still running.
    Running,
    /// All processes have exited.
    Completed,
    /// The job was aborted, by us or by the beacon.
    Aborted,
}



/// Keeps track of how many processes of the active job are still running.
#[derive(Clone, Debug)]
pub struct RunSession {
    /// The number of processes that have not exited yet.
    remaining : u32,
    /// Whether the job is still going.
    state     : SessionState,
}

impl RunSession {
    /// Constructor for the RunSession.
    ///
    /// # Arguments
    /// - `size`: The number of processes in the job.
    ///
    /// # Returns
    /// A new, running RunSession.
    #[inline]
    pub fn new(size: NonZeroU32) -> Self {
        Self {
            remaining : size.get(),
            state     : SessionState::Running,
        }
    }

    /// Accounts for one exited process.
    ///
    /// # Returns
    /// True if this was the last process (which happens exactly once per session), false otherwise.
    pub fn process_exited(&mut self) -> bool {
        if self.state != SessionState::Running { return false; }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.state = SessionState::Completed;
            true
        } else {
            false
        }
    }

    /// Marks the session as aborted, regardless of how many processes remain.
    ///
    /// # Returns
    /// True if the session was running up to now, false if it was already over.
    #[inline]
    pub fn abort(&mut self) -> bool {
        if self.state != SessionState::Running { return false; }
        self.state = SessionState::Aborted;
        true
    }

    /// Returns the number of processes that have not exited yet.
    #[inline]
    pub fn remaining(&self) -> u32 { self.remaining }

    /// Returns the state of the session.
    #[inline]
    pub fn state(&self) -> SessionState { self.state }

    /// Returns whether the session is still going.
    #[inline]
    pub fn is_running(&self) -> bool { self.state == SessionState::Running }
}



/// Follows a single accepted job, relaying its output, until it completes or is aborted.
pub struct MonitorDispatcher<L> {
    /// The link to the beacon that runs the job.
    link    : L,
    /// The bookkeeping for the job.
    session : RunSession,
    /// If cancelled, we abort the job.
    cancel  : CancellationToken,

    /// Where the processes' stdout goes.
    stdout : Box<dyn Write + Send>,
    /// Where the processes' stderr (and the abort reason) goes.
    stderr : Box<dyn Write + Send>,
}

impl<L: BeaconLink> MonitorDispatcher<L> {
    /// Constructor for the MonitorDispatcher.
    ///
    /// # Arguments
    /// - `link`: The BeaconLink over which the job was accepted.
    /// - `size`: The number of processes in the job.
    /// - `cancel`: The CancellationToken that, once cancelled, aborts the job.
    ///
    /// # Returns
    /// A new MonitorDispatcher that writes to our own stdout and stderr.
    #[inline]
    pub fn new(link: L, size: NonZeroU32, cancel: CancellationToken) -> Self {
        Self {
            link,
            session : RunSession::new(size),
            cancel,

            stdout : Box::new(std::io::stdout()),
            stderr : Box::new(std::io::stderr()),
        }
    }

    /// Replaces where the job's output is written to.
    #[inline]
    pub fn with_output(mut self, stdout: impl 'static + Write + Send, stderr: impl 'static + Write + Send) -> Self {
        self.stdout = Box::new(stdout);
        self.stderr = Box::new(stderr);
        self
    }



    /// Aborts the job on our side, telling the beacon to do the same if the job is still going.
    async fn abort(&mut self) -> JobOutcome {
        if self.session.abort() {
            info!("Aborting job with {} process(es) remaining", self.session.remaining());
            self.link.signal_abort().await;
        }
        self.report_local_abort()
    }

    /// Tells the user we aborted and lets go of the beacon.
    fn report_local_abort(&mut self) -> JobOutcome {
        if let Err(err) = writeln!(self.stderr, "[Aborted]: {}", AbortReason::Local) { warn!("Failed to write abort reason to stderr: {}", err); }
        self.link.release();
        JobOutcome::Aborted(AbortReason::Local)
    }

    /// Handles a single event of the job.
    ///
    /// # Arguments
    /// - `event`: The MonitorEvent to handle.
    ///
    /// # Returns
    /// The JobOutcome if this event ended the job, or `None` if it's still going. Events for a job that is already over are ignored.
    ///
    /// # Errors
    /// This function errors if we failed to tell the beacon we're done.
    pub async fn dispatch(&mut self, event: MonitorEvent) -> Result<Option<JobOutcome>, Error> {
        if !self.session.is_running() {
            debug!("Ignoring {:?} for a job that is no longer running", event);
            return Ok(None);
        }

        match event {
            MonitorEvent::Stdout{ line } => {
                if let Err(err) = writeln!(self.stdout, "{}", line) { warn!("Failed to write job output to stdout: {}", err); }
                Ok(None)
            },

            MonitorEvent::Stderr{ line } => {
                if let Err(err) = writeln!(self.stderr, "{}", line) { warn!("Failed to write job output to stderr: {}", err); }
                Ok(None)
            },

            MonitorEvent::ProcessExit => {
                // An interrupt that arrived alongside this exit takes precedence
                if self.cancel.is_cancelled() { return Ok(Some(self.abort().await)); }
                if !self.session.process_exited() {
                    debug!("Process exited; {} remaining", self.session.remaining());
                    return Ok(None);
                }

                // An interrupt that arrives while the beacon is being told still wins
                debug!("All processes exited; notifying beacon");
                let done: Option<Result<(), Error>> = tokio::select! {
                    biased;
                    _   = self.cancel.cancelled()  => None,
                    res = self.link.signal_done()  => Some(res.map_err(|err| Error::SignalDoneError{ err })),
                };
                match done {
                    Some(res) => {
                        self.link.release();
                        res.map(|_| Some(JobOutcome::Completed))
                    },
                    None => {
                        info!("Interrupted while notifying the beacon that the job is done");
                        self.link.signal_abort().await;
                        Ok(Some(self.report_local_abort()))
                    },
                }
            },

            MonitorEvent::JobAborted{ reason } => {
                if let Err(err) = writeln!(self.stderr, "[Aborted]: {}", reason) { warn!("Failed to write abort reason to stderr: {}", err); }
                self.session.abort();
                self.link.release();
                Ok(Some(JobOutcome::Aborted(AbortReason::Beacon(reason))))
            },
        }
    }

    /// Follows the job until it's over.
    ///
    /// # Returns
    /// How the job ended.
    ///
    /// # Errors
    /// This function errors if the beacon disconnected before the job was over, or if we failed to tell it we're done.
    pub async fn run(mut self) -> Result<JobOutcome, Error> {
        let mut events: EventStream = self.link.events().await;
        loop {
            // Interrupts are always checked before the next event
            let next: Option<Option<MonitorEvent>> = tokio::select! {
                biased;
                _     = self.cancel.cancelled() => None,
                event = events.next()           => Some(event),
            };

            match next {
                Some(Some(event)) => if let Some(outcome) = self.dispatch(event).await? { return Ok(outcome); },
                Some(None)        => {
                    self.link.release();
                    return Err(Error::LinkClosed{ remaining: self.session.remaining() });
                },
                None => { return Ok(self.abort().await); },
            }
        }
    }
}
