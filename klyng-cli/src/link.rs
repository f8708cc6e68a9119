//  LINK.rs
//    by Lut99
//
//  Created:
//    15 Feb 2023, 10:05:37
//  Last edited:
//    03 Mar 2023, 11:40:18
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the connection to the beacon, both as a trait (so the
//!   launcher and monitor don't care how we talk to it) and as its gRPC
//!   implementation.
//

use std::process::{Command, Stdio};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use log::{debug, error, warn};
use tonic::codec::Streaming;

use klyng_cfg::beacon::BeaconConfig;
use specifications::beacon::{AbortRequest, BeaconServiceClient, DoneRequest, MonitorMessage, PingReply, PingRequest, RunReply, RunRequest, StopRequest};
use specifications::beacon::{ACK_ACCEPTED, ACK_BUSY, ACK_REJECTED, MONITOR_JOB_ABORTED, MONITOR_PROCESS_EXIT, MONITOR_STDERR, MONITOR_STDOUT};

pub use crate::errors::LinkError as Error;
use crate::spec::{Ack, JobDescriptor, MonitorEvent};


/***** TESTS *****/





/***** HELPER FUNCTIONS *****/
/// Classifies a monitor message as exactly one kind of MonitorEvent.
///
/// # Returns
/// The MonitorEvent, or `None` if the message is malformed (in which case it's logged).
fn classify(message: MonitorMessage) -> Option<MonitorEvent> {
    match message.kind {
        MONITOR_STDOUT       => match message.line {
            Some(line) => Some(MonitorEvent::Stdout{ line }),
            None       => { warn!("Ignoring stdout message without a line"); None },
        },
        MONITOR_STDERR       => match message.line {
            Some(line) => Some(MonitorEvent::Stderr{ line }),
            None       => { warn!("Ignoring stderr message without a line"); None },
        },
        MONITOR_PROCESS_EXIT => Some(MonitorEvent::ProcessExit),
        MONITOR_JOB_ABORTED  => Some(MonitorEvent::JobAborted{ reason: message.reason.unwrap_or_else(|| "no reason given".into()) }),

        kind => { warn!("Ignoring monitor message of unknown kind {}", kind); None },
    }
}





/***** LIBRARY *****/
/// The stream of events of the active job. Ends when the beacon disconnects.
pub type EventStream = BoxStream<'static, MonitorEvent>;



/// Defines everything the client needs from the beacon.
#[async_trait]
pub trait BeaconLink: Send {
    /// Checks whether the beacon is reachable, retrying as configured.
    async fn probe(&mut self) -> bool;

    /// Attempts to start the beacon.
    ///
    /// # Returns
    /// Whether the beacon is running (and reachable) afterwards.
    async fn start(&mut self) -> bool;

    /// Asks the beacon to run the given job.
    async fn submit(&mut self, job: &JobDescriptor) -> Ack;

    /// Returns the events of the job accepted by the last `submit()`. Only useful once per accepted job.
    async fn events(&mut self) -> EventStream;

    /// Tells the beacon that all processes of the active job have exited.
    ///
    /// # Errors
    /// This function errors if the beacon could not be told.
    async fn signal_done(&mut self) -> Result<(), Error>;

    /// Tells the beacon to kill the active job. Does not wait for it to do so, nor complains if it can't.
    async fn signal_abort(&mut self);

    /// Asks the beacon to shut down.
    ///
    /// # Returns
    /// Whether the beacon is going down.
    async fn stop(&mut self) -> bool;

    /// Drops the connection to the beacon (if any).
    fn release(&mut self);
}



/// Implements the BeaconLink over gRPC.
pub struct GrpcBeaconLink {
    /// How to reach (and start) the beacon.
    config  : BeaconConfig,
    /// The client, once connected.
    client  : Option<BeaconServiceClient>,
    /// The replies of the last accepted job, until they are taken by `events()`.
    replies : Option<Streaming<RunReply>>,
}

impl GrpcBeaconLink {
    /// Constructor for the GrpcBeaconLink. Doesn't connect yet; use `probe()` or `start()` for that.
    ///
    /// # Arguments
    /// - `config`: The BeaconConfig that describes how to reach (and start) the beacon.
    ///
    /// # Returns
    /// A new GrpcBeaconLink instance.
    #[inline]
    pub fn new(config: BeaconConfig) -> Self {
        Self {
            config,
            client  : None,
            replies : None,
        }
    }
}

#[async_trait]
impl BeaconLink for GrpcBeaconLink {
    async fn probe(&mut self) -> bool {
        let attempts: u32 = 1 + self.config.max_retries;
        for attempt in 1..=attempts {
            if attempt > 1 { tokio::time::sleep(self.config.retry_interval()).await; }

            // Connect, then see if there's actually a beacon on the other side
            let address: String = self.config.address.clone();
            let res = tokio::time::timeout(self.config.timeout(), async move {
                let mut client: BeaconServiceClient = BeaconServiceClient::connect(address).await.map_err(|err| err.to_string())?;
                let reply: PingReply = client.ping(PingRequest{}).await.map_err(|err| format!("beacon did not answer ping: {}", err))?.into_inner();
                Ok::<_, String>((client, reply.version))
            }).await;
            match res {
                Ok(Ok((client, version))) => {
                    debug!("Beacon v{} is listening on '{}'", version, self.config.address);
                    self.client = Some(client);
                    return true;
                },
                Ok(Err(err)) => { debug!("Attempt {}/{}: {}", attempt, attempts, err); },
                Err(_)       => { debug!("Attempt {}/{}: beacon '{}' did not answer within {}ms", attempt, attempts, self.config.address, self.config.timeout); },
            }
        }
        false
    }

    async fn start(&mut self) -> bool {
        debug!("Starting beacon '{}'...", self.config.executable.display());
        let mut cmd: Command = Command::new(&self.config.executable);
        cmd.args(&self.config.args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());
        match cmd.spawn() {
            Ok(child) => { debug!("Beacon runs as process {}", child.id()); },
            Err(err)  => { error!("Failed to launch beacon executable '{}': {}", self.config.executable.display(), err); return false; },
        }

        // It's only started once we can talk to it
        self.probe().await
    }

    async fn submit(&mut self, job: &JobDescriptor) -> Ack {
        let client: &mut BeaconServiceClient = match self.client.as_mut() {
            Some(client) => client,
            None         => { return Ack::Rejected{ reason: Error::NotConnected.to_string() }; },
        };

        // Send the job, then wait for the beacon's verdict
        let request = RunRequest {
            size  : job.size().get(),
            entry : job.entry().to_string_lossy().into(),
            hosts : job.topology().to_raw().to_string(),
        };
        debug!("Submitting job of {} process(es) running '{}'", request.size, request.entry);
        let mut replies: Streaming<RunReply> = match client.run(request).await {
            Ok(response) => response.into_inner(),
            Err(err)     => { return Ack::Rejected{ reason: Error::RequestError{ what: "run", address: self.config.address.clone(), err }.to_string() }; },
        };
        let reply: RunReply = match replies.message().await {
            Ok(Some(reply)) => reply,
            Ok(None)        => { return Ack::Rejected{ reason: "beacon closed the connection without answering".into() }; },
            Err(err)        => { return Ack::Rejected{ reason: Error::RequestError{ what: "run", address: self.config.address.clone(), err }.to_string() }; },
        };

        match reply.ack {
            Some(ACK_ACCEPTED) => {
                self.replies = Some(replies);
                Ack::Accepted
            },
            Some(ACK_BUSY)     => Ack::Busy,
            Some(ACK_REJECTED) => Ack::Rejected{ reason: reply.reason.unwrap_or_else(|| "no reason given".into()) },
            Some(ack)          => Ack::Rejected{ reason: format!("beacon sent unknown acknowledgement {}", ack) },
            None               => Ack::Rejected{ reason: "beacon did not acknowledge the job".into() },
        }
    }

    async fn events(&mut self) -> EventStream {
        let replies: Streaming<RunReply> = match self.replies.take() {
            Some(replies) => replies,
            None          => { return stream::empty().boxed(); },
        };

        stream::unfold(replies, |mut replies| async move {
            loop {
                match replies.message().await {
                    Ok(Some(reply)) => match reply.event {
                        Some(message) => if let Some(event) = classify(message) { return Some((event, replies)); },
                        None          => { warn!("Ignoring beacon reply without an event"); },
                    },
                    Ok(None) => { return None; },
                    Err(err) => {
                        warn!("Lost connection to beacon: {}", err);
                        return None;
                    },
                }
            }
        }).boxed()
    }

    async fn signal_done(&mut self) -> Result<(), Error> {
        let client: &mut BeaconServiceClient = match self.client.as_mut() {
            Some(client) => client,
            None         => { return Err(Error::NotConnected); },
        };
        match tokio::time::timeout(self.config.timeout(), client.done(DoneRequest{})).await {
            Ok(Ok(_))    => Ok(()),
            Ok(Err(err)) => Err(Error::RequestError{ what: "done", address: self.config.address.clone(), err }),
            Err(_)       => Err(Error::RequestTimeout{ what: "done", address: self.config.address.clone(), timeout: self.config.timeout() }),
        }
    }

    async fn signal_abort(&mut self) {
        let client: &mut BeaconServiceClient = match self.client.as_mut() {
            Some(client) => client,
            None         => { debug!("Not sending abort; not connected to a beacon"); return; },
        };
        // We're on our way out, so we don't wait for the beacon longer than we have to
        match tokio::time::timeout(self.config.timeout(), client.abort(AbortRequest{})).await {
            Ok(Ok(_))    => {},
            Ok(Err(err)) => { debug!("Failed to send abort to beacon '{}': {}", self.config.address, err); },
            Err(_)       => { debug!("Beacon '{}' did not acknowledge abort within {}ms", self.config.address, self.config.timeout); },
        }
    }

    async fn stop(&mut self) -> bool {
        let client: &mut BeaconServiceClient = match self.client.as_mut() {
            Some(client) => client,
            None         => { error!("{}", Error::NotConnected); return false; },
        };
        match tokio::time::timeout(self.config.timeout(), client.stop(StopRequest{})).await {
            Ok(Ok(reply)) => reply.into_inner().stopped,
            Ok(Err(err))  => { error!("{}", Error::RequestError{ what: "stop", address: self.config.address.clone(), err }); false },
            Err(_)        => { error!("{}", Error::RequestTimeout{ what: "stop", address: self.config.address.clone(), timeout: self.config.timeout() }); false },
        }
    }

    #[inline]
    fn release(&mut self) {
        self.replies = None;
        self.client  = None;
    }
}
