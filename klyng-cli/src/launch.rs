//  LAUNCH.rs
//    by Lut99
//
//  Created:
//    16 Feb 2023, 10:12:09
//  Last edited:
//    03 Mar 2023, 11:02:56
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the handshake that gets a job running on the beacon:
//!   making sure it's there, starting it if not and submitting the job.
//

use log::{debug, info};
use tokio_util::sync::CancellationToken;

pub use crate::errors::LaunchError as Error;
use crate::link::BeaconLink;
use crate::monitor::MonitorDispatcher;
use crate::spec::{Ack, JobDescriptor, LaunchState};


/***** TESTS *****/
#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;
    use std::time::Duration;

    use klyng_cfg::hosts::HostsTopology;

    use super::*;
    use crate::dummy::{Call, DummyLink};


    fn job() -> JobDescriptor { JobDescriptor::new(NonZeroU32::new(2).unwrap(), "/apps/hello.js", HostsTopology::local_only()) }


    #[tokio::test]
    async fn running_beacon_gets_job() {
        let link = DummyLink::new();
        let calls = link.calls();

        let launch = JobLauncher::new(link, CancellationToken::new()).launch(job()).await;
        assert!(matches!(launch, Ok(Launch::Monitoring(_))));
        assert_eq!(calls.take(), vec![ Call::Probe, Call::Submit ]);
    }

    #[tokio::test]
    async fn missing_beacon_is_started_first() {
        let link = DummyLink::new().unreachable();
        let calls = link.calls();

        let launch = JobLauncher::new(link, CancellationToken::new()).launch(job()).await;
        assert!(matches!(launch, Ok(Launch::Monitoring(_))));
        assert_eq!(calls.take(), vec![ Call::Probe, Call::Start, Call::Submit ]);
    }

    #[tokio::test]
    async fn unstartable_beacon_fails() {
        let link = DummyLink::new().unreachable().unstartable();
        let calls = link.calls();

        let launch = JobLauncher::new(link, CancellationToken::new()).launch(job()).await;
        assert!(matches!(launch, Err(Error::StartFailed)));
        assert_eq!(calls.take(), vec![ Call::Probe, Call::Start, Call::Release ]);
    }

    #[tokio::test]
    async fn busy_beacon_releases_link() {
        let link = DummyLink::new().with_ack(Ack::Busy);
        let calls = link.calls();

        let launch = JobLauncher::new(link, CancellationToken::new()).launch(job()).await;
        assert!(matches!(launch, Ok(Launch::Busy)));
        assert_eq!(calls.take(), vec![ Call::Probe, Call::Submit, Call::Release ]);
    }

    #[tokio::test]
    async fn rejection_keeps_reason() {
        let link = DummyLink::new().with_ack(Ack::Rejected{ reason: "bad hosts".into() });
        let launch = JobLauncher::new(link, CancellationToken::new()).launch(job()).await;
        match launch {
            Err(Error::Rejected{ reason }) => assert_eq!(reason, "bad hosts"),
            _                              => panic!("Expected the job to be rejected"),
        }
    }

    #[tokio::test]
    async fn cancelled_before_start_touches_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let link = DummyLink::new();
        let calls = link.calls();

        let launch = JobLauncher::new(link, cancel).launch(job()).await;
        assert!(matches!(launch, Ok(Launch::Aborted)));
        assert!(calls.take().is_empty());
    }

    #[tokio::test]
    async fn cancelled_while_submitting_aborts_job() {
        let cancel = CancellationToken::new();
        let link = DummyLink::new().silent();
        let calls = link.calls();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let launch = JobLauncher::new(link, cancel).launch(job()).await;
        assert!(matches!(launch, Ok(Launch::Aborted)));
        assert_eq!(calls.take(), vec![ Call::Probe, Call::Submit, Call::SignalAbort, Call::Release ]);
    }
}





/***** LIBRARY *****/
/// What came out of launching a job, if it didn't fail.
pub enum Launch<L> {
    /// The beacon was running another job.
    Busy,
    /// We were interrupted before the job got going.
    Aborted,
    /// The job runs; the given MonitorDispatcher follows it.
    Monitoring(MonitorDispatcher<L>),
}



/// Gets a single job running on the beacon.
pub struct JobLauncher<L> {
    /// The link to the beacon.
    link   : L,
    /// If cancelled, we stop launching.
    cancel : CancellationToken,
    /// How far along we are.
    state  : LaunchState,
}

impl<L: BeaconLink> JobLauncher<L> {
    /// Constructor for the JobLauncher.
    ///
    /// # Arguments
    /// - `link`: The BeaconLink to launch the job over.
    /// - `cancel`: The CancellationToken that interrupts the launch (and the job, once it runs).
    ///
    /// # Returns
    /// A new JobLauncher in the idle state.
    #[inline]
    pub fn new(link: L, cancel: CancellationToken) -> Self {
        Self {
            link,
            cancel,
            state : LaunchState::Idle,
        }
    }



    /// Moves to the given state.
    #[inline]
    fn transition(&mut self, state: LaunchState) {
        debug!("Launch: {} -> {}", self.state, state);
        self.state = state;
    }

    /// Ends the launch because we were interrupted.
    fn aborted(mut self) -> Launch<L> {
        info!("Launch interrupted while {}", self.state);
        self.transition(LaunchState::Aborted);
        self.link.release();
        Launch::Aborted
    }

    /// Ends the launch in failure.
    fn failed(mut self, err: Error) -> Result<Launch<L>, Error> {
        self.transition(LaunchState::Failed);
        self.link.release();
        Err(err)
    }



    /// Launches the given job.
    ///
    /// # Arguments
    /// - `job`: The JobDescriptor of the job to launch.
    ///
    /// # Returns
    /// Whether the job runs (and a MonitorDispatcher to follow it if so), or if the beacon was busy or we got interrupted.
    ///
    /// # Errors
    /// This function errors if the beacon could not be started or rejected the job.
    pub async fn launch(mut self, job: JobDescriptor) -> Result<Launch<L>, Error> {
        // Don't bother anyone if we're already interrupted
        if self.cancel.is_cancelled() {
            self.transition(LaunchState::Aborted);
            return Ok(Launch::Aborted);
        }

        // See if the beacon is there
        self.transition(LaunchState::CheckingAvailability);
        let available: Option<bool> = tokio::select! {
            biased;
            _         = self.cancel.cancelled() => None,
            available = self.link.probe()       => Some(available),
        };
        let available: bool = match available {
            Some(available) => available,
            None            => { return Ok(self.aborted()); },
        };

        // Start it if it isn't
        if !available {
            self.transition(LaunchState::StartingBeacon);
            let started: Option<bool> = tokio::select! {
                biased;
                _       = self.cancel.cancelled() => None,
                started = self.link.start()       => Some(started),
            };
            match started {
                Some(true)  => {},
                Some(false) => { return self.failed(Error::StartFailed); },
                None        => { return Ok(self.aborted()); },
            }
        }

        // Hand it the job
        self.transition(LaunchState::Submitting);
        let ack: Option<Ack> = tokio::select! {
            biased;
            _   = self.cancel.cancelled() => None,
            ack = self.link.submit(&job)  => Some(ack),
        };
        match ack {
            Some(Ack::Accepted) => {
                self.transition(LaunchState::Monitoring);
                info!("Beacon accepted job of {} process(es)", job.size());
                Ok(Launch::Monitoring(MonitorDispatcher::new(self.link, job.size(), self.cancel)))
            },
            Some(Ack::Busy) => {
                self.transition(LaunchState::Busy);
                self.link.release();
                Ok(Launch::Busy)
            },
            Some(Ack::Rejected{ reason }) => self.failed(Error::Rejected{ reason }),

            None => {
                // The beacon may have taken the job already
                self.link.signal_abort().await;
                Ok(self.aborted())
            },
        }
    }
}
