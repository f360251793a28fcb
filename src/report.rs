//! Reporters display the progress and results of a load test.
//!
//! Three formats are available, selected with `--reporter`:
//!  - `term` (default): a live progress line when writing to a terminal, followed
//!    by a summary of timings and error responses.
//!  - `csv`: one `started,finished,code,sent,received` row per finished request.
//!  - `json`: one JSON object per finished request, one per line.

use regex::RegexSet;
use serde::{Deserialize, Serialize};
use std::io::{self, IsTerminal, Write};
use std::str::FromStr;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

use crate::events::{RunEvent, RunObserver};
use crate::metrics::{Record, Summary, Tracker};
use crate::runner::Progress;
use crate::GoslingError;

/// Supported report formats.
#[derive(Debug, Clone, Copy, Default, EnumIter, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    /// Live progress and a summary, for humans.
    #[default]
    Term,
    /// Comma separated values, one row per request.
    Csv,
    /// JSON lines, one object per request.
    Json,
}
impl ReportFormat {
    // Regular expression matching this format and its abbreviations.
    fn regex(&self) -> &'static str {
        match self {
            ReportFormat::Term => r"(?i)^(term|terminal|text|txt|tty)$",
            ReportFormat::Csv => r"(?i)^(csv|comma)$",
            ReportFormat::Json => r"(?i)^(json|jsonl|js)$",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReportFormat::Term => "term",
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
        }
    }

    /// Build a reporter writing this format to standard out.
    pub fn reporter(&self) -> Box<dyn Reporter> {
        match self {
            ReportFormat::Term => Box::new(TerminalReporter::stdout()),
            ReportFormat::Csv => Box::new(CsvReporter::new(io::stdout())),
            ReportFormat::Json => Box::new(JsonReporter::new(io::stdout())),
        }
    }
}
/// Allow `--reporter` from the command line using text variations on supported
/// `ReportFormat`s by implementing [`FromStr`].
impl FromStr for ReportFormat {
    type Err = GoslingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let formats: Vec<ReportFormat> = ReportFormat::iter().collect();
        let regex_set = RegexSet::new(formats.iter().map(|f| f.regex()))
            .expect("failed to compile ReportFormat RegexSet");
        match regex_set.matches(s).into_iter().next() {
            Some(index) => Ok(formats[index]),
            None => Err(GoslingError::InvalidOption {
                option: "--reporter".to_string(),
                value: s.to_string(),
                detail: format!(
                    "Invalid reporter, expected: {}",
                    formats
                        .iter()
                        .map(|f| f.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            }),
        }
    }
}

/// Turns progress and records into a report.
///
/// Every hook defaults to doing nothing.
pub trait Reporter {
    /// Display how far along the run is.
    fn progress(&mut self, _progress: &Progress) -> io::Result<()> {
        Ok(())
    }

    /// Add a finished request to the report.
    fn record(&mut self, _record: &Record) -> io::Result<()> {
        Ok(())
    }

    /// Display a summary of all records once the run is over.
    fn summarize(&mut self, _records: &[Record]) -> io::Result<()> {
        Ok(())
    }
}

/// Human readable progress and summary.
pub struct TerminalReporter<W: Write> {
    stream: W,
    /// Progress is only displayed on a terminal.
    is_tty: bool,
}
impl TerminalReporter<io::Stdout> {
    pub fn stdout() -> Self {
        let stream = io::stdout();
        let is_tty = stream.is_terminal();
        TerminalReporter { stream, is_tty }
    }
}
impl<W: Write> TerminalReporter<W> {
    pub fn new(stream: W, is_tty: bool) -> Self {
        TerminalReporter { stream, is_tty }
    }

    pub fn into_inner(self) -> W {
        self.stream
    }
}
impl<W: Write> Reporter for TerminalReporter<W> {
    fn progress(&mut self, progress: &Progress) -> io::Result<()> {
        if self.is_tty {
            write!(self.stream, "\r{}", progress)?;
            self.stream.flush()?;
        }
        Ok(())
    }

    fn summarize(&mut self, records: &[Record]) -> io::Result<()> {
        write!(self.stream, "\n{}", Summary::from_records(records))?;
        self.stream.flush()
    }
}

/// One CSV row per finished request, without a header.
pub struct CsvReporter<W: Write> {
    stream: W,
}
impl<W: Write> CsvReporter<W> {
    pub fn new(stream: W) -> Self {
        CsvReporter { stream }
    }

    pub fn into_inner(self) -> W {
        self.stream
    }
}
impl<W: Write> Reporter for CsvReporter<W> {
    fn record(&mut self, record: &Record) -> io::Result<()> {
        writeln!(self.stream, "{}", csv_row(record))
    }

    fn summarize(&mut self, _records: &[Record]) -> io::Result<()> {
        self.stream.flush()
    }
}

// Fields in order: started, finished, code, sent, received. Missing values are empty.
fn csv_row(record: &Record) -> String {
    format!(
        "{},{},{},{},{}",
        record.started,
        record.finished.map_or_else(String::new, |f| f.to_string()),
        record.code.map_or_else(String::new, |c| c.to_string()),
        record.sent,
        record.received,
    )
}

/// One JSON object per finished request.
pub struct JsonReporter<W: Write> {
    stream: W,
}
impl<W: Write> JsonReporter<W> {
    pub fn new(stream: W) -> Self {
        JsonReporter { stream }
    }

    pub fn into_inner(self) -> W {
        self.stream
    }
}
impl<W: Write> Reporter for JsonReporter<W> {
    fn record(&mut self, record: &Record) -> io::Result<()> {
        writeln!(self.stream, "{}", serde_json::to_string(record)?)
    }

    fn summarize(&mut self, _records: &[Record]) -> io::Result<()> {
        self.stream.flush()
    }
}

/// A [`Tracker`] that also feeds a [`Reporter`].
///
/// Progress updates and finished records are passed on as they happen, and the
/// summary is written once the run finishes.
pub struct ReportingTracker {
    tracker: Tracker,
    reporter: Box<dyn Reporter>,
}
impl ReportingTracker {
    pub fn new(reporter: Box<dyn Reporter>) -> Self {
        ReportingTracker {
            tracker: Tracker::new(),
            reporter,
        }
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn into_tracker(self) -> Tracker {
        self.tracker
    }
}
impl RunObserver for ReportingTracker {
    fn on_event(&mut self, event: &RunEvent<'_>) {
        let result = match event {
            RunEvent::RequestFinished { handle, at, code } => {
                match self.tracker.request_finished(*handle, *at, *code) {
                    Some(record) => self.reporter.record(record),
                    None => Ok(()),
                }
            }
            RunEvent::Progress(progress) => {
                self.tracker.on_event(event);
                self.reporter.progress(progress)
            }
            RunEvent::TestsFinished { .. } => {
                self.tracker.on_event(event);
                self.reporter.summarize(self.tracker.records())
            }
            _ => {
                self.tracker.on_event(event);
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!("failed to write report: {}", e);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::events::RequestHandle;
    use crate::request::GoslingRequest;
    use crate::runner::{ProgressUnit, RunOutcome};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn finished(started: f64, finished: f64, code: u16, received: usize) -> Record {
        Record {
            started,
            finished: Some(finished),
            code: Some(code),
            sent: 0,
            received,
        }
    }

    fn progress() -> Progress {
        Progress {
            unit: ProgressUnit::Requests,
            total: 20.0,
            current: 10.0,
            percentage: 50.0,
        }
    }

    #[test]
    fn report_format_from_str() {
        assert_eq!(ReportFormat::from_str("term").unwrap(), ReportFormat::Term);
        assert_eq!(ReportFormat::from_str("TERMINAL").unwrap(), ReportFormat::Term);
        assert_eq!(ReportFormat::from_str("csv").unwrap(), ReportFormat::Csv);
        assert_eq!(ReportFormat::from_str("Json").unwrap(), ReportFormat::Json);
        assert_eq!(ReportFormat::from_str("jsonl").unwrap(), ReportFormat::Json);
        assert_eq!(ReportFormat::default(), ReportFormat::Term);
        match ReportFormat::from_str("xml") {
            Err(GoslingError::InvalidOption { detail, .. }) => {
                assert_eq!(detail, "Invalid reporter, expected: term, csv, json")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn terminal_progress_only_on_tty() {
        let mut reporter = TerminalReporter::new(Vec::new(), true);
        reporter.progress(&progress()).unwrap();
        assert_eq!(
            String::from_utf8(reporter.into_inner()).unwrap(),
            "\r[10.0/20.0 requests] 50.0%"
        );

        let mut reporter = TerminalReporter::new(Vec::new(), false);
        reporter.progress(&progress()).unwrap();
        assert!(reporter.into_inner().is_empty());
    }

    #[test]
    fn terminal_summary() {
        let mut reporter = TerminalReporter::new(Vec::new(), false);
        reporter.summarize(&[]).unwrap();
        assert_eq!(
            String::from_utf8(reporter.into_inner()).unwrap(),
            "\n**No completed requests**\n"
        );

        let records = vec![
            finished(0.0, 1.0, 200, 10),
            finished(0.5, 1.0, 404, 10),
            finished(0.5, 2.0, 404, 10),
        ];
        let mut reporter = TerminalReporter::new(Vec::new(), false);
        reporter.summarize(&records).unwrap();
        let output = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(output.starts_with("\nRequests             3\n"));
        assert!(output.contains("Received            30B\n"));
        assert!(output.ends_with("[404] responses: 2\n"));
    }

    #[test]
    fn csv_rows() {
        let mut reporter = CsvReporter::new(Vec::new());
        reporter.record(&finished(0.0, 100.0, 200, 0)).unwrap();
        reporter
            .record(&Record {
                started: 1.5,
                finished: Some(2.25),
                code: Some(404),
                sent: 3,
                received: 12,
            })
            .unwrap();
        reporter.record(&Record::new(0)).unwrap();
        reporter.progress(&progress()).unwrap();
        reporter.summarize(&[]).unwrap();
        assert_eq!(
            String::from_utf8(reporter.into_inner()).unwrap(),
            "0,100,200,0,0\n1.5,2.25,404,3,12\n0,,,0,0\n"
        );
    }

    #[test]
    fn json_lines() {
        let mut reporter = JsonReporter::new(Vec::new());
        reporter.record(&finished(0.0, 100.5, 200, 7)).unwrap();
        reporter.record(&Record::new(2)).unwrap();
        reporter.summarize(&[]).unwrap();
        let output = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"started":0.0,"finished":100.5,"code":200,"sent":0,"received":7}"#,
                r#"{"started":0.0,"finished":null,"code":null,"sent":2,"received":0}"#,
            ]
        );
    }

    // Shares everything written with the test.
    #[derive(Clone, Default)]
    struct SharedReporter {
        lines: Rc<RefCell<Vec<String>>>,
    }
    impl Reporter for SharedReporter {
        fn progress(&mut self, progress: &Progress) -> io::Result<()> {
            self.lines.borrow_mut().push(format!("progress {}", progress));
            Ok(())
        }
        fn record(&mut self, record: &Record) -> io::Result<()> {
            self.lines.borrow_mut().push(format!("record {}", csv_row(record)));
            Ok(())
        }
        fn summarize(&mut self, records: &[Record]) -> io::Result<()> {
            self.lines
                .borrow_mut()
                .push(format!("summary {}", records.len()));
            Ok(())
        }
    }

    #[test]
    fn reporting_tracker_forwards() {
        let reporter = SharedReporter::default();
        let lines = reporter.lines.clone();
        let mut reporting = ReportingTracker::new(Box::new(reporter));
        let request = GoslingRequest::new(
            http::Method::GET,
            url::Url::parse("http://localhost/").unwrap(),
        );

        reporting.on_event(&RunEvent::TestsStarted { at: 0.0 });
        reporting.on_event(&RunEvent::RequestReady {
            handle: RequestHandle(0),
            request: &request,
        });
        reporting.on_event(&RunEvent::RequestStarted {
            handle: RequestHandle(0),
            at: 1.0,
        });
        reporting.on_event(&RunEvent::RequestReceived {
            handle: RequestHandle(0),
            bytes: 4,
        });
        reporting.on_event(&RunEvent::RequestFinished {
            handle: RequestHandle(0),
            at: 2.0,
            code: 200,
        });
        // Finishing twice doesn't report twice.
        reporting.on_event(&RunEvent::RequestFinished {
            handle: RequestHandle(0),
            at: 3.0,
            code: 500,
        });
        reporting.on_event(&RunEvent::Progress(progress()));
        reporting.on_event(&RunEvent::TestsFinished {
            at: 4.0,
            outcome: RunOutcome::Completed,
        });

        assert_eq!(
            *lines.borrow(),
            vec![
                "record 1,2,200,0,4".to_string(),
                "progress [10.0/20.0 requests] 50.0%".to_string(),
                "summary 1".to_string(),
            ]
        );
        assert_eq!(reporting.tracker().records().len(), 1);
        let tracker = reporting.into_tracker();
        assert_eq!(tracker.records()[0].code, Some(200));
    }
}
