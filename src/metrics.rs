//! Measurements collected for every request of a load test.
//!
//! Every request dispatched by the [`Runner`](../runner/struct.Runner.html) gets a
//! [`Record`], kept by the [`Tracker`] in the order requests were dispatched. The
//! tracker only listens to [`RunEvent`]s; statistics are computed once the run is
//! over with [`get_time_stats`] and [`get_error_counts`].

use chrono::prelude::*;
use itertools::Itertools;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::events::{RequestHandle, RunEvent, RunObserver};
use crate::request::GoslingRequest;
use crate::runner::{Progress, RunOutcome};
use crate::util;

/// The measurements of a single request.
///
/// A record is created when its request is ready to be dispatched, and is kept for
/// the rest of the run even if the request never finishes. Only records with a
/// `finished` time are included in statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    /// When the request was handed to the transport, in seconds since the Unix epoch.
    pub started: f64,
    /// When the transport reported completion, if it has.
    pub finished: Option<f64>,
    /// The response status code, set together with `finished`.
    pub code: Option<u16>,
    /// Size of the request body in bytes.
    pub sent: usize,
    /// Bytes of response body received so far.
    pub received: usize,
}
impl Record {
    pub fn new(sent: usize) -> Self {
        Record {
            sent,
            ..Default::default()
        }
    }

    /// Stamp the time the request was handed to the transport.
    pub fn start(&mut self, at: f64) {
        self.started = at;
    }

    /// Account for a received chunk of response body.
    pub fn on_received(&mut self, bytes: usize) {
        self.received += bytes;
    }

    /// Stamp completion. A record completes at most once, later calls are ignored
    /// and return `false`.
    pub fn complete(&mut self, at: f64, code: u16) -> bool {
        if self.finished.is_some() {
            return false;
        }
        self.finished = Some(at);
        self.code = Some(code);
        true
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    /// Seconds between start and completion, if completed.
    pub fn duration(&self) -> Option<f64> {
        self.finished.map(|finished| finished - self.started)
    }
}

/// Timing statistics over all finished records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeStats {
    /// How many requests finished.
    pub count: usize,
    /// Seconds from the first start to the last completion.
    pub dur: f64,
    /// Average request duration in seconds.
    pub avg: f64,
    /// Fastest request duration in seconds.
    pub min: f64,
    /// Slowest request duration in seconds.
    pub max: f64,
    /// Population standard deviation of request durations.
    pub dev: f64,
    /// Total bytes of response body received.
    pub received: usize,
    /// Finished requests per second, infinite if `dur` is zero.
    pub rps: f64,
}
impl fmt::Display for TimeStats {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        writeln!(fmt, "Requests    {:>10}", self.count)?;
        writeln!(fmt, "Duration    {:>15.4}s", self.dur)?;
        writeln!(fmt, "Average     {:>15.4}s", self.avg)?;
        writeln!(fmt, "Fastest     {:>15.4}s", self.min)?;
        writeln!(fmt, "Slowest     {:>15.4}s", self.max)?;
        writeln!(fmt, "Deviation   {:>15.4}", self.dev)?;
        writeln!(fmt, "Received    {:>10}B", self.received)?;
        writeln!(fmt, "RPS         {:>13.2}", self.rps)
    }
}

/// Compute [`TimeStats`] over the finished records, returning `None` if no record
/// has finished.
///
/// # Example
/// ```rust
/// use gosling::metrics::{get_time_stats, Record};
///
/// let records = vec![
///     Record { started: 0.0, finished: Some(2.0), code: Some(200), sent: 0, received: 10 },
///     Record { started: 1.0, finished: Some(2.0), code: Some(200), sent: 0, received: 10 },
///     Record { started: 1.5, finished: None, code: None, sent: 0, received: 0 },
/// ];
/// let stats = get_time_stats(&records).unwrap();
/// assert_eq!(stats.count, 2);
/// assert_eq!(stats.avg, 1.5);
/// assert_eq!(stats.received, 20);
///
/// assert!(get_time_stats(&[]).is_none());
/// ```
pub fn get_time_stats(records: &[Record]) -> Option<TimeStats> {
    let finished: Vec<&Record> = records.iter().filter(|r| r.is_finished()).collect();
    let times: Vec<f64> = finished.iter().filter_map(|r| r.duration()).collect();

    let (min, max) = times
        .iter()
        .copied()
        .minmax_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .into_option()?;

    let count = times.len();
    let avg = times.iter().sum::<f64>() / count as f64;
    let dev = (times.iter().map(|t| (t - avg).powi(2)).sum::<f64>() / count as f64).sqrt();
    let received = finished.iter().map(|r| r.received).sum();

    let first_started = finished
        .iter()
        .map(|r| r.started)
        .fold(f64::INFINITY, f64::min);
    let last_finished = finished
        .iter()
        .filter_map(|r| r.finished)
        .fold(f64::NEG_INFINITY, f64::max);
    let dur = last_finished - first_started;
    let rps = if dur > 0.0 {
        count as f64 / dur
    } else {
        f64::INFINITY
    };

    Some(TimeStats {
        count,
        dur,
        avg,
        min,
        max,
        dev,
        received,
        rps,
    })
}

/// Count records by status code, keeping only codes of 300 and above.
pub fn get_error_counts(records: &[Record]) -> BTreeMap<u16, usize> {
    records
        .iter()
        .filter_map(|r| r.code)
        .filter(|code| *code >= 300)
        .counts()
        .into_iter()
        .collect()
}

/// Summary of a set of records, as displayed at the end of a load test.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub stats: Option<TimeStats>,
    pub errors: BTreeMap<u16, usize>,
}
impl Summary {
    pub fn from_records(records: &[Record]) -> Self {
        Summary {
            stats: get_time_stats(records),
            errors: get_error_counts(records),
        }
    }
}
impl fmt::Display for Summary {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match &self.stats {
            Some(stats) => write!(fmt, "{}", stats)?,
            None => writeln!(fmt, "**No completed requests**")?,
        }
        for (code, count) in &self.errors {
            writeln!(fmt, "[{}] responses: {}", code, count)?;
        }
        Ok(())
    }
}

/// Collects a [`Record`] for every request of a run.
#[derive(Debug, Default)]
pub struct Tracker {
    /// All records, in dispatch order.
    records: Vec<Record>,
    /// Index into `records` of each request still in flight.
    pending: HashMap<RequestHandle, usize>,
    started: Option<DateTime<Local>>,
    finished: Option<DateTime<Local>>,
    outcome: Option<RunOutcome>,
    progress: Option<Progress>,
}
impl Tracker {
    pub fn new() -> Self {
        Tracker::default()
    }

    pub fn tests_started(&mut self) {
        // Requests abandoned by an earlier run can never finish.
        self.pending.clear();
        self.started = Some(Local::now());
        self.finished = None;
        self.outcome = None;
    }

    pub fn tests_finished(&mut self, outcome: RunOutcome) {
        self.finished = Some(Local::now());
        self.outcome = Some(outcome);
        if !self.pending.is_empty() {
            info!(
                "{} requests still in flight were abandoned",
                util::format_number(self.pending.len())
            );
        }
        info!(
            "tracked {} requests",
            util::format_number(self.records.len())
        );
    }

    pub fn request_ready(&mut self, handle: RequestHandle, request: &GoslingRequest) {
        self.pending.insert(handle, self.records.len());
        self.records.push(Record::new(request.body_len()));
    }

    pub fn request_started(&mut self, handle: RequestHandle, at: f64) {
        if let Some(index) = self.pending.get(&handle) {
            self.records[*index].start(at);
        }
    }

    pub fn request_received(&mut self, handle: RequestHandle, bytes: usize) {
        if let Some(index) = self.pending.get(&handle) {
            self.records[*index].on_received(bytes);
        }
    }

    /// Complete the record of a pending request, returning it. Unknown handles are
    /// ignored.
    pub fn request_finished(&mut self, handle: RequestHandle, at: f64, code: u16) -> Option<&Record> {
        match self.pending.remove(&handle) {
            Some(index) => {
                let record = &mut self.records[index];
                record.complete(at, code);
                Some(&*record)
            }
            None => {
                debug!("ignoring completion of unknown request {}", handle);
                None
            }
        }
    }

    /// All records so far, in dispatch order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// How many requests are still in flight.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// The most recent progress seen.
    pub fn progress(&self) -> Option<&Progress> {
        self.progress.as_ref()
    }

    pub fn summary(&self) -> Summary {
        Summary::from_records(&self.records)
    }

    pub fn into_metrics(self) -> GoslingMetrics {
        GoslingMetrics {
            outcome: self.outcome.unwrap_or_default(),
            started: self.started,
            finished: self.finished,
            progress: self.progress,
            records: self.records,
        }
    }
}
impl RunObserver for Tracker {
    fn on_event(&mut self, event: &RunEvent<'_>) {
        match event {
            RunEvent::TestsStarted { .. } => self.tests_started(),
            RunEvent::TestsFinished { outcome, .. } => self.tests_finished(*outcome),
            RunEvent::RequestReady { handle, request } => self.request_ready(*handle, request),
            RunEvent::RequestStarted { handle, at } => self.request_started(*handle, *at),
            RunEvent::RequestReceived { handle, bytes } => {
                self.request_received(*handle, *bytes)
            }
            RunEvent::RequestFinished { handle, at, code } => {
                self.request_finished(*handle, *at, *code);
            }
            RunEvent::Progress(progress) => self.progress = Some(progress.clone()),
        }
    }
}

/// Everything measured during a load test, returned by
/// [`GoslingAttack::execute`](../struct.GoslingAttack.html#method.execute).
#[derive(Debug, Clone, Default)]
pub struct GoslingMetrics {
    /// Whether the run completed or was interrupted.
    pub outcome: RunOutcome,
    /// When the run started.
    pub started: Option<DateTime<Local>>,
    /// When the run finished.
    pub finished: Option<DateTime<Local>>,
    /// The final progress of the run.
    pub progress: Option<Progress>,
    /// One record per dispatched request, in dispatch order.
    pub records: Vec<Record>,
}
impl GoslingMetrics {
    pub fn time_stats(&self) -> Option<TimeStats> {
        get_time_stats(&self.records)
    }

    pub fn error_counts(&self) -> BTreeMap<u16, usize> {
        get_error_counts(&self.records)
    }

    /// How many requests finished.
    pub fn finished_requests(&self) -> usize {
        self.records.iter().filter(|r| r.is_finished()).count()
    }

    pub fn summary(&self) -> Summary {
        Summary::from_records(&self.records)
    }
}
impl fmt::Display for GoslingMetrics {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        if let (Some(started), Some(finished)) = (self.started, self.finished) {
            writeln!(
                fmt,
                " Started: {}, finished: {}",
                started.format("%Y-%m-%d %H:%M:%S"),
                finished.format("%Y-%m-%d %H:%M:%S"),
            )?;
        }
        write!(fmt, "{}", self.summary())
    }
}
