//  DUMMY.rs
//    by Lut99
//
//  Created:
//    17 Feb 2023, 11:02:40
//  Last edited:
//    03 Mar 2023, 10:31:15
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements a BeaconLink that doesn't talk to anything but follows a
//!   script instead, for testing the launcher and monitor.
//

use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, StreamExt as _};

pub use crate::errors::LinkError as Error;
use crate::link::{BeaconLink, EventStream};
use crate::spec::{Ack, JobDescriptor, MonitorEvent};


/***** LIBRARY *****/
/// The calls made to a DummyLink.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Call {
    Probe,
    Start,
    Submit,
    Events,
    SignalDone,
    SignalAbort,
    Stop,
    Release,
}



/// A shared view on the calls made to a DummyLink, which survives the link itself.
#[derive(Clone, Debug, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    /// Adds a call to the log.
    #[inline]
    fn push(&self, call: Call) { self.0.lock().unwrap().push(call); }

    /// Returns all calls logged up to now, clearing the log.
    #[inline]
    pub fn take(&self) -> Vec<Call> { std::mem::take(&mut *self.0.lock().unwrap()) }
}



/// A BeaconLink that plays a script.
#[derive(Debug)]
pub struct DummyLink {
    /// What was called on us.
    calls : CallLog,

    /// Whether `probe()` succeeds.
    reachable  : bool,
    /// Whether `start()` succeeds.
    startable  : bool,
    /// What `submit()` answers. If `None`, it never does.
    ack        : Option<Ack>,
    /// The events the job produces.
    events     : Vec<MonitorEvent>,
    /// If true, the event stream never ends after the events have been produced.
    hang       : bool,
    /// Whether `signal_done()` succeeds.
    done_works : bool,
    /// If true, `signal_done()` never returns.
    done_hangs : bool,
    /// Whether `stop()` succeeds.
    stoppable  : bool,
}

impl DummyLink {
    /// Constructor for a DummyLink that is reachable, accepts anything and produces no events.
    #[inline]
    pub fn new() -> Self {
        Self {
            calls : CallLog::default(),

            reachable  : true,
            startable  : true,
            ack        : Some(Ack::Accepted),
            events     : vec![],
            hang       : false,
            done_works : true,
            done_hangs : false,
            stoppable  : true,
        }
    }

    /// Makes `probe()` fail.
    #[inline]
    pub fn unreachable(mut self) -> Self { self.reachable = false; self }

    /// Makes `start()` fail.
    #[inline]
    pub fn unstartable(mut self) -> Self { self.startable = false; self }

    /// Sets what `submit()` answers.
    #[inline]
    pub fn with_ack(mut self, ack: Ack) -> Self { self.ack = Some(ack); self }

    /// Makes `submit()` never answer.
    #[inline]
    pub fn silent(mut self) -> Self { self.ack = None; self }

    /// Sets the events the job produces.
    #[inline]
    pub fn with_events(mut self, events: Vec<MonitorEvent>) -> Self { self.events = events; self }

    /// Keeps the event stream open after all events have been produced.
    #[inline]
    pub fn hanging(mut self) -> Self { self.hang = true; self }

    /// Makes `signal_done()` fail.
    #[inline]
    pub fn failing_done(mut self) -> Self { self.done_works = false; self }

    /// Makes `signal_done()` never return.
    #[inline]
    pub fn slow_done(mut self) -> Self { self.done_hangs = true; self }

    /// Makes `stop()` fail.
    #[inline]
    pub fn unstoppable(mut self) -> Self { self.stoppable = false; self }

    /// Returns a handle to the calls made to this link.
    #[inline]
    pub fn calls(&self) -> CallLog { self.calls.clone() }
}

#[async_trait]
impl BeaconLink for DummyLink {
    async fn probe(&mut self) -> bool {
        self.calls.push(Call::Probe);
        self.reachable
    }

    async fn start(&mut self) -> bool {
        self.calls.push(Call::Start);
        self.reachable = self.startable;
        self.startable
    }

    async fn submit(&mut self, _job: &JobDescriptor) -> Ack {
        self.calls.push(Call::Submit);
        match self.ack.clone() {
            Some(ack) => ack,
            None      => futures::future::pending::<Ack>().await,
        }
    }

    async fn events(&mut self) -> EventStream {
        self.calls.push(Call::Events);
        let events = stream::iter(std::mem::take(&mut self.events));
        if self.hang { events.chain(stream::pending()).boxed() } else { events.boxed() }
    }

    async fn signal_done(&mut self) -> Result<(), Error> {
        self.calls.push(Call::SignalDone);
        if self.done_hangs { futures::future::pending::<()>().await; }
        if self.done_works { Ok(()) } else { Err(Error::NotConnected) }
    }

    async fn signal_abort(&mut self) {
        self.calls.push(Call::SignalAbort);
    }

    async fn stop(&mut self) -> bool {
        self.calls.push(Call::Stop);
        self.stoppable
    }

    fn release(&mut self) {
        self.calls.push(Call::Release);
    }
}



/// A writer that keeps everything written to it, and can be inspected after handing it away.
#[derive(Clone, Debug, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Constructor for an empty SharedBuffer.
    #[inline]
    pub fn new() -> Self { Self::default() }

    /// Returns everything written so far.
    #[inline]
    pub fn contents(&self) -> String { String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned() }
}

impl Write for SharedBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    #[inline]
    fn flush(&mut self) -> std::io::Result<()> { Ok(()) }
}
