//! Lifecycle events emitted while a load test runs.
//!
//! The [`Runner`](../runner/struct.Runner.html) announces everything that happens
//! during a run as a [`RunEvent`]. Any number of [`RunObserver`]s can be subscribed
//! to an [`Events`] registry, and every event is delivered to each of them in
//! subscription order before the runner does anything else.
//!
//! For a single request the order is always:
//! `RequestReady`, `RequestStarted`, zero or more `RequestReceived`, then at most
//! one `RequestFinished`.

use std::fmt;

use crate::request::GoslingRequest;
use crate::runner::{Progress, RunOutcome};

/// Identifies one request for the duration of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestHandle(pub u64);
impl fmt::Display for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something that happened during a run.
#[derive(Debug)]
pub enum RunEvent<'a> {
    /// The run has begun, emitted before any request is dispatched.
    TestsStarted {
        at: f64,
    },
    /// The run is over, emitted after the last event of every request.
    TestsFinished {
        at: f64,
        outcome: RunOutcome,
    },
    /// A request slot was filled and the request is about to be handed to the transport.
    RequestReady {
        handle: RequestHandle,
        request: &'a GoslingRequest,
    },
    /// The request was handed to the transport.
    RequestStarted {
        handle: RequestHandle,
        at: f64,
    },
    /// Part of the response body arrived.
    RequestReceived {
        handle: RequestHandle,
        bytes: usize,
    },
    /// The transport reported completion, `code` is the response status or the
    /// transport error code.
    RequestFinished {
        handle: RequestHandle,
        at: f64,
        code: u16,
    },
    /// Periodic progress of the run.
    Progress(Progress),
}

/// Receives every [`RunEvent`] of a run.
pub trait RunObserver {
    fn on_event(&mut self, event: &RunEvent<'_>);
}

/// An ordered list of [`RunObserver`]s.
///
/// Observers are borrowed for the duration of the run, so they can be inspected
/// once the registry is dropped.
///
/// # Example
/// ```rust
/// use gosling::events::{Events, RunEvent, RunObserver};
///
/// #[derive(Default)]
/// struct Counter(usize);
/// impl RunObserver for Counter {
///     fn on_event(&mut self, _event: &RunEvent<'_>) {
///         self.0 += 1;
///     }
/// }
///
/// let mut counter = Counter::default();
/// {
///     let mut events = Events::new();
///     events.subscribe(&mut counter);
///     events.emit(&RunEvent::TestsStarted { at: 0.0 });
/// }
/// assert_eq!(counter.0, 1);
/// ```
#[derive(Default)]
pub struct Events<'a> {
    observers: Vec<&'a mut dyn RunObserver>,
}
impl<'a> Events<'a> {
    pub fn new() -> Self {
        Events {
            observers: Vec::new(),
        }
    }

    /// Add an observer, it receives events after all previously subscribed observers.
    pub fn subscribe(&mut self, observer: &'a mut dyn RunObserver) {
        self.observers.push(observer);
    }

    /// Deliver an event to every observer, in subscription order.
    pub fn emit(&mut self, event: &RunEvent<'_>) {
        for observer in self.observers.iter_mut() {
            observer.on_event(event);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}
