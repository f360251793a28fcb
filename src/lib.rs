//! # Gosling
//!
//! Gosling is a simple HTTP load generator. It sends the same request to a single
//! endpoint over and over, keeping a fixed number of requests in flight, until either
//! a number of requests has been made or a length of time has passed. Every request
//! is timed, and the results are reported as a summary, as CSV, or as JSON lines.
//!
//! Gosling uses [`reqwest`](https://docs.rs/reqwest/) to make requests, and
//! [`tokio`](https://docs.rs/tokio/) to run them concurrently.
//!
//! ## Running a load test from the command line
//!
//! Make 1,000 requests, 10 at a time:
//!
//! ```bash
//! $ gosling http://localhost:8080/ -n 1000 -c 10
//! ```
//!
//! Keep 4 POST requests in flight for 30 seconds, writing one JSON object per request:
//!
//! ```bash
//! $ gosling http://localhost:8080/api -m POST -b '{"id": 1}' \
//!     -H 'Content-Type: application/json' -c 4 -d 30s --reporter json
//! ```
//!
//! When the duration expires, requests still in flight are abandoned and not
//! reported. Pass `--drain` to wait for them instead.
//!
//! The terminal reporter displays a summary such as the following once the load
//! test finishes:
//!
//! ```bash
//!
//! Requests          1000
//! Duration            0.4817s
//! Average             0.0047s
//! Fastest             0.0011s
//! Slowest             0.0309s
//! Deviation           0.0032
//! Received          612000B
//! RPS            2075.98
//! [404] responses: 12
//! ```
//!
//! ## Embedding Gosling
//!
//! A [`GoslingAttack`] can be configured programmatically with custom defaults,
//! which are used when the matching option isn't passed on the command line:
//!
//! ```rust,no_run
//! use gosling::prelude::*;
//!
//! fn main() -> Result<(), GoslingError> {
//!     let metrics = GoslingAttack::initialize()?
//!         .set_default(GoslingDefault::Url, "http://localhost:8080/")?
//!         .set_default(GoslingDefault::Concurrency, 8)?
//!         .set_default(GoslingDefault::Duration, "1m")?
//!         .execute()?;
//!
//!     println!("{}", metrics);
//!     Ok(())
//! }
//! ```
//!
//! The engine can also be driven directly with a [`Runner`](runner/struct.Runner.html),
//! any [`RequestFactory`](request/trait.RequestFactory.html), and any number of
//! [`RunObserver`](events/trait.RunObserver.html)s.
//!
//! ## License
//!
//! Copyright 2020-21 Jeremy Andrews
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! you may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//! <http://www.apache.org/licenses/LICENSE-2.0>
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

#[macro_use]
extern crate log;

pub mod clock;
pub mod config;
pub mod events;
pub mod metrics;
pub mod prelude;
pub mod report;
pub mod request;
pub mod runner;
pub mod transport;
pub mod util;

use gumdrop::Options;
use std::sync::Arc;
use std::{fmt, io};
use tokio::runtime::Runtime;

use crate::config::{GoslingConfiguration, GoslingDefaults};
use crate::events::Events;
use crate::metrics::GoslingMetrics;
use crate::report::{Reporter, ReportingTracker};
use crate::runner::Runner;
use crate::transport::{ReqwestTransport, Transport};

/// Gosling identifies itself with this user agent.
pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// An enumeration of all errors a [`GoslingAttack`](./struct.GoslingAttack.html) can return.
#[derive(Debug)]
pub enum GoslingError {
    /// Wraps a [`std::io::Error`](https://doc.rust-lang.org/std/io/struct.Error.html).
    Io(io::Error),
    /// Wraps a [`reqwest::Error`](https://docs.rs/reqwest/*/reqwest/struct.Error.html).
    Reqwest(reqwest::Error),
    /// Failed to parse the url to load test.
    InvalidHost {
        /// The invalid url that caused this error.
        host: String,
        /// An optional explanation of the error.
        detail: String,
        /// Wraps a [`url::ParseError`](https://docs.rs/url/*/url/enum.ParseError.html).
        parse_error: url::ParseError,
    },
    /// Invalid option or value specified, may only be invalid in context.
    InvalidOption {
        /// The invalid option that caused this error, may be only invalid in context.
        option: String,
        /// The invalid value that caused this error, may be only invalid in context.
        value: String,
        /// An optional explanation of the error.
        detail: String,
    },
}
/// Implement a helper to provide a text description of all possible types of errors.
impl GoslingError {
    fn describe(&self) -> &str {
        match *self {
            GoslingError::Io(_) => "io::Error",
            GoslingError::Reqwest(_) => "reqwest::Error",
            GoslingError::InvalidHost { .. } => "failed to parse url",
            GoslingError::InvalidOption { .. } => "invalid option or value specified",
        }
    }
}

/// Implement format trait to allow displaying errors.
impl fmt::Display for GoslingError {
    // Implement display of error with `{}` marker.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            GoslingError::Io(ref source) => {
                write!(f, "GoslingError: {} ({})", self.describe(), source)
            }
            GoslingError::Reqwest(ref source) => {
                write!(f, "GoslingError: {} ({})", self.describe(), source)
            }
            GoslingError::InvalidHost {
                ref host,
                ref parse_error,
                ..
            } => write!(
                f,
                "GoslingError: {} {} ({})",
                self.describe(),
                host,
                parse_error
            ),
            GoslingError::InvalidOption { ref detail, .. } => {
                write!(f, "GoslingError: {} ({})", self.describe(), detail)
            }
        }
    }
}

// Define the lower level source of this error, if any.
impl std::error::Error for GoslingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            GoslingError::Io(ref source) => Some(source),
            GoslingError::Reqwest(ref source) => Some(source),
            GoslingError::InvalidHost {
                ref parse_error, ..
            } => Some(parse_error),
            _ => None,
        }
    }
}

/// Auto-convert Reqwest errors.
impl From<reqwest::Error> for GoslingError {
    fn from(err: reqwest::Error) -> GoslingError {
        GoslingError::Reqwest(err)
    }
}

/// Auto-convert IO errors.
impl From<io::Error> for GoslingError {
    fn from(err: io::Error) -> GoslingError {
        GoslingError::Io(err)
    }
}

/// Global internal state for the load test.
pub struct GoslingAttack {
    /// Optional default values for run-time options.
    defaults: GoslingDefaults,
    /// Configuration object holding options set when launching the load test.
    configuration: GoslingConfiguration,
    /// Optional transport, otherwise requests are made with reqwest.
    transport: Option<Arc<dyn Transport>>,
    /// Optional reporter, otherwise one is built for `--reporter`.
    reporter: Option<Box<dyn Reporter>>,
}
/// Gosling's internal global state.
impl GoslingAttack {
    /// Load configuration and initialize a [`GoslingAttack`](./struct.GoslingAttack.html).
    ///
    /// # Example
    /// ```rust
    /// use gosling::prelude::*;
    ///
    /// let mut gosling_attack = GoslingAttack::initialize();
    /// ```
    pub fn initialize() -> Result<GoslingAttack, GoslingError> {
        Ok(GoslingAttack {
            defaults: GoslingDefaults::default(),
            configuration: GoslingConfiguration::parse_args_default_or_exit(),
            transport: None,
            reporter: None,
        })
    }

    /// Initialize a [`GoslingAttack`](./struct.GoslingAttack.html) with an already loaded
    /// configuration.
    ///
    /// This is generally used by tests.
    ///
    /// # Example
    /// ```rust
    /// use gosling::GoslingAttack;
    /// use gosling::config::GoslingConfiguration;
    /// use gumdrop::Options;
    ///
    /// let configuration = GoslingConfiguration::parse_args_default_or_exit();
    /// let mut gosling_attack = GoslingAttack::initialize_with_config(configuration);
    /// ```
    pub fn initialize_with_config(
        configuration: GoslingConfiguration,
    ) -> Result<GoslingAttack, GoslingError> {
        Ok(GoslingAttack {
            defaults: GoslingDefaults::default(),
            configuration,
            transport: None,
            reporter: None,
        })
    }

    /// Make requests through a custom [`Transport`] instead of reqwest.
    pub fn set_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Report with a custom [`Reporter`], ignoring `--reporter`.
    pub fn set_reporter(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Execute the [`GoslingAttack`](./struct.GoslingAttack.html) load test.
    ///
    /// # Example
    /// ```rust,no_run
    /// use gosling::prelude::*;
    ///
    /// fn main() -> Result<(), GoslingError> {
    ///     let gosling_metrics: GoslingMetrics = GoslingAttack::initialize()?
    ///         .set_default(GoslingDefault::Url, "http://localhost/")?
    ///         .set_default(GoslingDefault::Requests, 10)?
    ///         .execute()?;
    ///
    ///     // It's now possible to do something with the metrics produced by the load test.
    ///     assert_eq!(gosling_metrics.records.len(), 10);
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn execute(mut self) -> Result<GoslingMetrics, GoslingError> {
        // If version flag is set, display package name and version and exit.
        if self.configuration.version {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            std::process::exit(0);
        }

        // Configure GoslingConfiguration.
        self.configuration.configure(&self.defaults);

        // Validate GoslingConfiguration.
        self.configuration.validate()?;

        let rt = Runtime::new()?;
        rt.block_on(self.start_attack())
    }

    // Run the load test until the stop condition is met, or until interrupted.
    async fn start_attack(self) -> Result<GoslingMetrics, GoslingError> {
        let stop = self.configuration.stop_condition()?;
        let template = self.configuration.request_template()?;
        let concurrency = self.configuration.concurrency();

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(
                concurrency,
                self.configuration.timeout_duration(),
            )?),
        };
        let reporter = match self.reporter {
            Some(reporter) => reporter,
            None => self.configuration.reporter.unwrap_or_default().reporter(),
        };

        info!(
            "load testing {} {} with {} concurrent requests until {:?}",
            template.request().method,
            template.request().url,
            concurrency,
            stop
        );

        let mut runner = Runner::new(transport, Box::new(template), concurrency, stop)
            .set_drain(self.configuration.drain);
        util::setup_ctrlc_handler(runner.interrupt_handle());

        let mut tracker = ReportingTracker::new(reporter);
        let outcome = {
            let mut events = Events::new();
            events.subscribe(&mut tracker);
            runner.run(&mut events).await
        };
        info!("load test {:?}", outcome);

        Ok(tracker.into_tracker().into_metrics())
    }
}
