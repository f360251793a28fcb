//! The runner keeps a bounded window of requests in flight until its stop
//! condition is met.
//!
//! A [`Runner`] is driven by a single-threaded event loop. It starts up to
//! `limit` requests, and each time one finishes it starts another (a refill) until
//! either the configured number of requests has been dispatched
//! ([`StopCondition::Quantity`]) or the configured time has elapsed
//! ([`StopCondition::Duration`]). Everything that happens is announced as a
//! [`RunEvent`] to the [`Events`] registry passed to [`Runner::run`].
//!
//! With a quantity, every dispatched request is allowed to finish before `run`
//! returns. With a duration, the timer is authoritative: requests still in flight
//! when it fires are abandoned, unless draining is enabled with
//! [`Runner::set_drain`].

use futures::future::{self, BoxFuture};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior, Sleep};

use crate::clock::{Clock, SystemClock};
use crate::events::{Events, RequestHandle, RunEvent};
use crate::request::RequestFactory;
use crate::transport::{Chunk, ChunkSender, Completion, Transport};
use crate::util;

/// How often progress is reported while running, unless configured otherwise.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// When a run ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopCondition {
    /// Dispatch exactly this many requests, then wait for all of them to finish.
    Quantity(usize),
    /// Keep the window full for this many seconds.
    Duration(f64),
}

/// The runner operates in one (and only one) of the following states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// Not yet started.
    Idle,
    /// Dispatching requests, the only state in which requests are started.
    Running,
    /// No new requests will be started, waiting for requests in flight.
    Draining,
    /// The run is over.
    Stopped,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunOutcome {
    /// The stop condition was met.
    #[default]
    Completed,
    /// The run was stopped early through the interrupt handle.
    Interrupted,
}

/// What progress is being measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressUnit {
    Requests,
    Seconds,
}
impl fmt::Display for ProgressUnit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProgressUnit::Requests => write!(f, "requests"),
            ProgressUnit::Seconds => write!(f, "seconds"),
        }
    }
}

/// How far along a run is.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub unit: ProgressUnit,
    pub total: f64,
    pub current: f64,
    /// From 0 to 100.
    pub percentage: f64,
}
impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{:.1}/{:.1} {}] {:.1}%",
            self.current, self.total, self.unit, self.percentage
        )
    }
}

type InFlight = BoxFuture<'static, (RequestHandle, Completion)>;

/// Dispatches requests through a [`Transport`], never more than `limit` at a time.
pub struct Runner {
    transport: Arc<dyn Transport>,
    factory: Box<dyn RequestFactory>,
    clock: Arc<dyn Clock>,
    /// Maximum number of requests in flight.
    limit: usize,
    stop: StopCondition,
    /// Wait for requests in flight when a duration expires.
    drain: bool,
    progress_interval: Duration,
    state: RunnerState,
    outcome: RunOutcome,
    /// Requests not yet started, only used with a quantity.
    remaining: usize,
    started_at: Option<f64>,
    next_handle: u64,
    in_flight: FuturesUnordered<InFlight>,
    pending: HashSet<RequestHandle>,
    chunk_tx: flume::Sender<Chunk>,
    chunk_rx: flume::Receiver<Chunk>,
    interrupt_tx: flume::Sender<()>,
    interrupt_rx: flume::Receiver<()>,
}
impl Runner {
    /// Create a runner making requests produced by `factory`.
    ///
    /// # Example
    /// ```rust,no_run
    /// use gosling::prelude::*;
    /// use http::Method;
    /// use std::sync::Arc;
    ///
    /// let url = url::Url::parse("http://localhost/").unwrap();
    /// let template = RequestTemplate::new(GoslingRequest::new(Method::GET, url));
    /// let transport = ReqwestTransport::new(4, None).unwrap();
    ///
    /// let mut runner = Runner::new(
    ///     Arc::new(transport),
    ///     Box::new(template),
    ///     4,
    ///     StopCondition::Quantity(100),
    /// );
    /// let mut tracker = Tracker::new();
    /// let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    /// rt.block_on(async {
    ///     let mut events = Events::new();
    ///     events.subscribe(&mut tracker);
    ///     runner.run(&mut events).await;
    /// });
    /// assert_eq!(tracker.records().len(), 100);
    /// ```
    pub fn new(
        transport: Arc<dyn Transport>,
        factory: Box<dyn RequestFactory>,
        limit: usize,
        stop: StopCondition,
    ) -> Self {
        let limit = if limit == 0 {
            warn!("concurrency limit must be at least 1, using 1");
            1
        } else {
            limit
        };
        let remaining = match stop {
            StopCondition::Quantity(requests) => requests,
            StopCondition::Duration(_) => 0,
        };
        let (chunk_tx, chunk_rx) = flume::unbounded();
        let (interrupt_tx, interrupt_rx) = flume::unbounded();
        Runner {
            transport,
            factory,
            clock: Arc::new(SystemClock),
            limit,
            stop,
            drain: false,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            state: RunnerState::Idle,
            outcome: RunOutcome::Completed,
            remaining,
            started_at: None,
            next_handle: 0,
            in_flight: FuturesUnordered::new(),
            pending: HashSet::new(),
            chunk_tx,
            chunk_rx,
            interrupt_tx,
            interrupt_rx,
        }
    }

    /// Use a different [`Clock`] to timestamp requests.
    pub fn set_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// When a duration expires, stop starting requests but wait for those in flight.
    pub fn set_drain(mut self, drain: bool) -> Self {
        self.drain = drain;
        self
    }

    /// How often to emit [`RunEvent::Progress`] while running.
    pub fn set_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Returns a sender that stops the run when anything is sent through it.
    pub fn interrupt_handle(&self) -> flume::Sender<()> {
        self.interrupt_tx.clone()
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn stop_condition(&self) -> StopCondition {
        self.stop
    }

    /// Number of requests currently in flight.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// How far along the run is.
    ///
    /// With a quantity, progress counts requests dispatched rather than finished.
    pub fn progress(&self) -> Progress {
        match self.stop {
            StopCondition::Quantity(total) => {
                let current = total.saturating_sub(self.remaining) as f64;
                Progress {
                    unit: ProgressUnit::Requests,
                    total: total as f64,
                    current,
                    percentage: percentage(current, total as f64),
                }
            }
            StopCondition::Duration(total) => {
                let current = match self.started_at {
                    Some(started_at) => self.clock.now() - started_at,
                    None => 0.0,
                };
                Progress {
                    unit: ProgressUnit::Seconds,
                    total,
                    current,
                    percentage: percentage(current, total),
                }
            }
        }
    }

    /// Run until the stop condition is met or the run is interrupted.
    ///
    /// A runner can be run more than once, each run starts from scratch.
    pub async fn run(&mut self, events: &mut Events<'_>) -> RunOutcome {
        self.reset();
        self.set_state(RunnerState::Running);
        let now = self.clock.now();
        self.started_at = Some(now);
        events.emit(&RunEvent::TestsStarted { at: now });

        let initial = match self.stop {
            StopCondition::Quantity(requests) => requests.min(self.limit),
            StopCondition::Duration(_) => self.limit,
        };
        info!("starting {} requests", util::format_number(initial));
        for _ in 0..initial {
            self.start_request(events);
        }
        if self.stop == StopCondition::Quantity(0) {
            self.set_state(RunnerState::Stopped);
        }

        let mut deadline: Option<Pin<Box<Sleep>>> = match self.stop {
            StopCondition::Duration(seconds) => Some(Box::pin(time::sleep(
                Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX),
            ))),
            StopCondition::Quantity(_) => None,
        };
        let mut ticker = time::interval(self.progress_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let chunk_rx = self.chunk_rx.clone();
        let interrupt_rx = self.interrupt_rx.clone();

        while self.state != RunnerState::Stopped {
            tokio::select! {
                biased;

                _ = interrupt_rx.recv_async() => {
                    warn!("run interrupted");
                    self.outcome = RunOutcome::Interrupted;
                    self.set_state(RunnerState::Stopped);
                }
                _ = expire(&mut deadline) => {
                    deadline = None;
                    self.on_deadline();
                }
                _ = ticker.tick() => {
                    events.emit(&RunEvent::Progress(self.progress()));
                }
                Some((handle, completion)) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    // Deliver everything received before announcing completion.
                    self.forward_queued_chunks(events);
                    self.on_request_finished(handle, completion, events);
                }
                Ok(chunk) = chunk_rx.recv_async() => {
                    self.forward_chunk(chunk, events);
                }
            }
        }

        self.abandon_in_flight();
        events.emit(&RunEvent::Progress(self.progress()));
        events.emit(&RunEvent::TestsFinished {
            at: self.clock.now(),
            outcome: self.outcome,
        });
        self.outcome
    }

    // Change from one state to another.
    fn set_state(&mut self, state: RunnerState) {
        // There's nothing to do if already in the specified state.
        if self.state == state {
            return;
        }
        info!("entering runner state: {:?}", &state);
        self.state = state;
    }

    fn reset(&mut self) {
        self.in_flight = FuturesUnordered::new();
        self.pending.clear();
        self.outcome = RunOutcome::Completed;
        self.remaining = match self.stop {
            StopCondition::Quantity(requests) => requests,
            StopCondition::Duration(_) => 0,
        };
        let stale = self.chunk_rx.try_iter().count();
        if stale > 0 {
            debug!("discarded {} chunks from a previous run", stale);
        }
        if self.interrupt_rx.try_iter().count() > 0 {
            debug!("discarded interrupt received before the run started");
        }
    }

    /// Fill one request slot.
    fn start_request(&mut self, events: &mut Events<'_>) {
        if let StopCondition::Quantity(_) = self.stop {
            self.remaining = self.remaining.saturating_sub(1);
        }

        let request = self.factory.make_request();
        let handle = RequestHandle(self.next_handle);
        self.next_handle += 1;
        events.emit(&RunEvent::RequestReady {
            handle,
            request: &request,
        });

        let transport = Arc::clone(&self.transport);
        let chunks = ChunkSender::new(handle, self.chunk_tx.clone());
        self.in_flight.push(Box::pin(async move {
            let completion = transport.fetch(request, chunks).await;
            (handle, completion)
        }));
        self.pending.insert(handle);
        trace!("started request {}", handle);
        events.emit(&RunEvent::RequestStarted {
            handle,
            at: self.clock.now(),
        });

        if let StopCondition::Quantity(_) = self.stop {
            if self.remaining == 0 {
                self.set_state(RunnerState::Draining);
            }
        }
    }

    fn on_request_finished(
        &mut self,
        handle: RequestHandle,
        completion: Completion,
        events: &mut Events<'_>,
    ) {
        if !self.pending.contains(&handle) {
            debug!("ignoring completion of unknown request {}", handle);
            return;
        }
        if let Completion::Failed { error } = &completion {
            debug!("request {} failed: {}", handle, error);
        }
        events.emit(&RunEvent::RequestFinished {
            handle,
            at: self.clock.now(),
            code: completion.code(),
        });
        self.pending.remove(&handle);

        match self.stop {
            StopCondition::Quantity(_) => {
                if self.pending.is_empty() && self.remaining == 0 {
                    self.set_state(RunnerState::Stopped);
                } else if self.remaining > 0 {
                    self.refill(events);
                }
            }
            StopCondition::Duration(_) => {
                if self.state == RunnerState::Draining {
                    if self.pending.is_empty() {
                        self.set_state(RunnerState::Stopped);
                    }
                } else {
                    self.refill(events);
                }
            }
        }
    }

    fn refill(&mut self, events: &mut Events<'_>) {
        if self.state == RunnerState::Running && self.pending.len() < self.limit {
            self.start_request(events);
        }
    }

    fn on_deadline(&mut self) {
        if self.drain && !self.pending.is_empty() {
            info!(
                "duration elapsed, waiting for {} requests in flight",
                util::format_number(self.pending.len())
            );
            self.set_state(RunnerState::Draining);
        } else {
            self.set_state(RunnerState::Stopped);
        }
    }

    fn forward_chunk(&mut self, chunk: Chunk, events: &mut Events<'_>) {
        if self.pending.contains(&chunk.handle) {
            events.emit(&RunEvent::RequestReceived {
                handle: chunk.handle,
                bytes: chunk.bytes,
            });
        } else {
            trace!("ignoring chunk of unknown request {}", chunk.handle);
        }
    }

    fn forward_queued_chunks(&mut self, events: &mut Events<'_>) {
        while let Ok(chunk) = self.chunk_rx.try_recv() {
            self.forward_chunk(chunk, events);
        }
    }

    // Drop requests still in flight, their records are kept without a finish time.
    fn abandon_in_flight(&mut self) {
        if !self.pending.is_empty() {
            info!(
                "abandoning {} requests in flight",
                util::format_number(self.pending.len())
            );
        }
        self.in_flight = FuturesUnordered::new();
        self.pending.clear();
    }
}

fn percentage(current: f64, total: f64) -> f64 {
    if total > 0.0 {
        (current / total * 100.0).min(100.0)
    } else {
        100.0
    }
}

// Resolves when the deadline expires, never if there is none.
async fn expire(deadline: &mut Option<Pin<Box<Sleep>>>) {
    match deadline {
        Some(sleep) => sleep.as_mut().await,
        None => future::pending().await,
    }
}
