//! Functions and structures related to configuring a Gosling load test.
//!
//! Gosling can be configured at run time by passing in the options and flags defined by
//! the [`GoslingConfiguration`] structure.
//!
//! Gosling can be configured programmatically with [`GoslingDefaultType::set_default`].

use gumdrop::Options;
use http::Method;
use serde::{Deserialize, Serialize};
use simplelog::*;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::report::ReportFormat;
use crate::request::{GoslingRequest, RequestTemplate};
use crate::runner::StopCondition;
use crate::util;
use crate::{GoslingAttack, GoslingError};

/// HTTP methods that can be load tested.
const METHODS: [&str; 7] = ["DELETE", "GET", "HEAD", "OPTIONS", "PATCH", "POST", "PUT"];

/// HTTP methods that can send a request body.
const BODY_METHODS: [&str; 3] = ["PATCH", "POST", "PUT"];

/// Runtime options available when launching a Gosling load test.
///
/// Custom defaults can be programmatically set for most of these options using the
/// `GoslingDefaults` structure.
///
/// Help is generated for all of these options by passing a `-h` flag.
///
/// Gosling leverages [`gumdrop`](https://docs.rs/gumdrop/) to derive the above help from
/// the the below structure.
#[derive(Options, Debug, Clone, Default, Serialize, Deserialize)]
#[options(
    help = r#"Gosling is a simple HTTP load generator, written in Rust.

Usage: gosling [OPTIONS] URL (-n REQUESTS | -d TIME)

The following runtime options are available:"#
)]
pub struct GoslingConfiguration {
    /// Displays this help
    #[options(short = "h")]
    pub help: bool,
    /// Prints version information
    #[options(short = "V")]
    pub version: bool,

    /// URL to load test
    #[options(free)]
    pub url: Vec<String>,
    /// HTTP method to use for requests (default: GET)
    #[options(short = "m", meta = "METHOD")]
    pub method: String,
    /// Request body, prefix with '@' to read it from a file
    #[options(short = "b", meta = "BODY")]
    pub body: Vec<String>,
    /// Number of requests to make concurrently (default: 1)
    #[options(short = "c", meta = "COUNT")]
    pub concurrency: Option<usize>,
    /// Custom request header (name:value), can be repeated
    #[options(short = "H", meta = "HEADER")]
    pub header: Vec<String>,
    /// Number of requests to make
    #[options(short = "n", meta = "REQUESTS")]
    pub requests: Option<usize>,
    /// Runs load test for (2.5, 30s, 20m, 1h30m, etc)
    #[options(short = "d", meta = "TIME")]
    pub duration: String,
    /// Sets report format (term, csv, json)
    #[options(no_short, meta = "FORMAT")]
    pub reporter: Option<ReportFormat>,
    /// Sets per-request timeout, in seconds
    #[options(no_short, meta = "VALUE")]
    pub timeout: Option<String>,
    /// Waits for requests in flight when the duration expires
    // Add a blank line and then a 'Logging:' header after this option
    #[options(
        no_short,
        help = "Waits for requests in flight when the duration expires\n\nLogging:"
    )]
    pub drain: bool,

    /// Enables Gosling log file and sets name
    #[options(short = "G", meta = "NAME")]
    pub gosling_log: String,
    /// Increases Gosling log level (-g, -gg, etc)
    #[options(short = "g", count)]
    pub log_level: u8,
    /// Decreases Gosling verbosity (-q, -qq, etc)
    #[options(count, short = "q", help = "Decreases Gosling verbosity (-q, -qq, etc)")]
    pub quiet: u8,
    /// Increases Gosling verbosity (-v, -vv, etc)
    #[options(count, short = "v", help = "Increases Gosling verbosity (-v, -vv, etc)")]
    pub verbose: u8,
}

/// Optional default values for Gosling run-time options.
///
/// These custom defaults can be configured using [`GoslingDefaultType::set_default()`].
#[derive(Clone, Debug, Default)]
pub(crate) struct GoslingDefaults {
    /// An optional default url to load test.
    pub url: Option<String>,
    /// An optional default HTTP method.
    pub method: Option<String>,
    /// An optional default request body.
    pub body: Option<String>,
    /// An optional default number of concurrent requests.
    pub concurrency: Option<usize>,
    /// An optional default number of requests to make.
    pub requests: Option<usize>,
    /// An optional default duration of the load test.
    pub duration: Option<String>,
    /// An optional default report format.
    pub reporter: Option<ReportFormat>,
    /// An optional default number of seconds to timeout requests.
    pub timeout: Option<String>,
    /// An optional default for waiting for requests in flight when the duration expires.
    pub drain: Option<bool>,
    /// An optional default for the Gosling log file name.
    pub gosling_log: Option<String>,
    /// An optional default log level.
    pub log_level: Option<u8>,
    /// An optional default value for quiet level.
    pub quiet: Option<u8>,
    /// An optional default value for verbosity level.
    pub verbose: Option<u8>,
}

/// Defines all [`GoslingConfiguration`] options that can be programmatically configured with
/// a custom default.
///
/// These custom defaults can be configured using [`GoslingDefaultType::set_default()`].
#[derive(Debug)]
pub enum GoslingDefault {
    /// An optional default url to load test.
    Url,
    /// An optional default HTTP method.
    Method,
    /// An optional default request body.
    Body,
    /// An optional default number of concurrent requests.
    Concurrency,
    /// An optional default number of requests to make.
    Requests,
    /// An optional default duration of the load test.
    Duration,
    /// An optional default report format.
    Reporter,
    /// An optional default number of seconds to timeout requests.
    Timeout,
    /// An optional default for waiting for requests in flight when the duration expires.
    Drain,
    /// An optional default for the Gosling log file name.
    GoslingLog,
    /// An optional default log level.
    LogLevel,
    /// An optional default value for quiet level.
    Quiet,
    /// An optional default value for verbosity level.
    Verbose,
}

/// Most run-time options can be programmatically configured with custom defaults.
///
/// The following run-time options can be configured with a custom default using a
/// borrowed string slice ([`&str`]):
///  - [`GoslingDefault::Url`]
///  - [`GoslingDefault::Method`]
///  - [`GoslingDefault::Body`]
///  - [`GoslingDefault::Duration`]
///  - [`GoslingDefault::Timeout`]
///  - [`GoslingDefault::GoslingLog`]
///
/// The following run-time options can be configured with a custom default using a
/// [`usize`] integer:
///  - [`GoslingDefault::Concurrency`]
///  - [`GoslingDefault::Requests`]
///  - [`GoslingDefault::Duration`] (in seconds)
///  - [`GoslingDefault::LogLevel`]
///  - [`GoslingDefault::Quiet`]
///  - [`GoslingDefault::Verbose`]
///
/// The following run-time flags can be configured with a custom default using a
/// [`bool`] (and otherwise default to [`false`]).
///  - [`GoslingDefault::Drain`]
///
/// The following run-time options can be configured with a custom default using a
/// [`ReportFormat`].
///  - [`GoslingDefault::Reporter`]
pub trait GoslingDefaultType<T> {
    /// Sets a [`GoslingDefault`] to the provided value. The required type of each option
    /// is documented in [`GoslingDefaultType`].
    ///
    /// # Example
    /// ```rust
    /// use gosling::prelude::*;
    ///
    /// fn main() -> Result<(), GoslingError> {
    ///     GoslingAttack::initialize()?
    ///         // Make 4 requests at a time.
    ///         .set_default(GoslingDefault::Concurrency, 4)?
    ///         // Do not display info level logs while the test runs.
    ///         .set_default(GoslingDefault::Quiet, 1)?
    ///         // Write results as JSON lines.
    ///         .set_default(GoslingDefault::Reporter, ReportFormat::Json)?;
    ///
    ///     Ok(())
    /// }
    /// ```
    fn set_default(self, key: GoslingDefault, value: T) -> Result<Box<Self>, GoslingError>;
}
impl GoslingDefaultType<&str> for GoslingAttack {
    /// Sets [`GoslingDefault`] to a [`&str`] value.
    fn set_default(mut self, key: GoslingDefault, value: &str) -> Result<Box<Self>, GoslingError> {
        match key {
            // Set valid defaults.
            GoslingDefault::Url => {
                self.defaults.url = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            }
            GoslingDefault::Method => self.defaults.method = Some(value.to_string()),
            GoslingDefault::Body => self.defaults.body = Some(value.to_string()),
            GoslingDefault::Duration => self.defaults.duration = Some(value.to_string()),
            GoslingDefault::Timeout => self.defaults.timeout = Some(value.to_string()),
            GoslingDefault::GoslingLog => self.defaults.gosling_log = Some(value.to_string()),
            // Otherwise display a helpful and explicit error.
            GoslingDefault::Concurrency
            | GoslingDefault::Requests
            | GoslingDefault::LogLevel
            | GoslingDefault::Quiet
            | GoslingDefault::Verbose => {
                return Err(invalid_default(&key, value, "usize", "&str"));
            }
            GoslingDefault::Drain => {
                return Err(invalid_default(&key, value, "bool", "&str"));
            }
            GoslingDefault::Reporter => {
                return Err(invalid_default(&key, value, "ReportFormat", "&str"));
            }
        }
        Ok(Box::new(self))
    }
}
impl GoslingDefaultType<usize> for GoslingAttack {
    /// Sets [`GoslingDefault`] to a [`usize`] value.
    fn set_default(mut self, key: GoslingDefault, value: usize) -> Result<Box<Self>, GoslingError> {
        match key {
            GoslingDefault::Concurrency => self.defaults.concurrency = Some(value),
            GoslingDefault::Requests => self.defaults.requests = Some(value),
            GoslingDefault::Duration => self.defaults.duration = Some(value.to_string()),
            GoslingDefault::LogLevel => self.defaults.log_level = Some(value as u8),
            GoslingDefault::Quiet => self.defaults.quiet = Some(value as u8),
            GoslingDefault::Verbose => self.defaults.verbose = Some(value as u8),
            // Otherwise display a helpful and explicit error.
            GoslingDefault::Url
            | GoslingDefault::Method
            | GoslingDefault::Body
            | GoslingDefault::Timeout
            | GoslingDefault::GoslingLog => {
                return Err(invalid_default(&key, value, "&str", "usize"));
            }
            GoslingDefault::Drain => {
                return Err(invalid_default(&key, value, "bool", "usize"));
            }
            GoslingDefault::Reporter => {
                return Err(invalid_default(&key, value, "ReportFormat", "usize"));
            }
        }
        Ok(Box::new(self))
    }
}
impl GoslingDefaultType<bool> for GoslingAttack {
    /// Sets [`GoslingDefault`] to a [`bool`] value.
    fn set_default(mut self, key: GoslingDefault, value: bool) -> Result<Box<Self>, GoslingError> {
        match key {
            GoslingDefault::Drain => self.defaults.drain = Some(value),
            // Otherwise display a helpful and explicit error.
            GoslingDefault::Url
            | GoslingDefault::Method
            | GoslingDefault::Body
            | GoslingDefault::Duration
            | GoslingDefault::Timeout
            | GoslingDefault::GoslingLog => {
                return Err(invalid_default(&key, value, "&str", "bool"));
            }
            GoslingDefault::Concurrency
            | GoslingDefault::Requests
            | GoslingDefault::LogLevel
            | GoslingDefault::Quiet
            | GoslingDefault::Verbose => {
                return Err(invalid_default(&key, value, "usize", "bool"));
            }
            GoslingDefault::Reporter => {
                return Err(invalid_default(&key, value, "ReportFormat", "bool"));
            }
        }
        Ok(Box::new(self))
    }
}
impl GoslingDefaultType<ReportFormat> for GoslingAttack {
    /// Sets [`GoslingDefault`] to a [`ReportFormat`] value.
    fn set_default(
        mut self,
        key: GoslingDefault,
        value: ReportFormat,
    ) -> Result<Box<Self>, GoslingError> {
        match key {
            GoslingDefault::Reporter => self.defaults.reporter = Some(value),
            // Otherwise display a helpful and explicit error.
            GoslingDefault::Url
            | GoslingDefault::Method
            | GoslingDefault::Body
            | GoslingDefault::Duration
            | GoslingDefault::Timeout
            | GoslingDefault::GoslingLog => {
                return Err(invalid_default(&key, value.name(), "&str", "ReportFormat"));
            }
            GoslingDefault::Concurrency
            | GoslingDefault::Requests
            | GoslingDefault::LogLevel
            | GoslingDefault::Quiet
            | GoslingDefault::Verbose => {
                return Err(invalid_default(&key, value.name(), "usize", "ReportFormat"));
            }
            GoslingDefault::Drain => {
                return Err(invalid_default(&key, value.name(), "bool", "ReportFormat"));
            }
        }
        Ok(Box::new(self))
    }
}

// Error returned when set_default() is called with the wrong type of value.
fn invalid_default<V: fmt::Display>(
    key: &GoslingDefault,
    value: V,
    expected: &str,
    received: &str,
) -> GoslingError {
    GoslingError::InvalidOption {
        option: format!("GoslingDefault::{:?}", key),
        value: value.to_string(),
        detail: format!(
            "set_default(GoslingDefault::{:?}, {}) expected {} value, received {}",
            key, value, expected, received
        ),
    }
}

/// Used internally to configure [`GoslingConfiguration`] values based on precedence rules.
#[derive(Debug, Clone)]
pub(crate) struct GoslingValue<'a, T> {
    /// The optional value to set.
    pub(crate) value: Option<T>,
    /// Filter using this value if true.
    pub(crate) filter: bool,
    /// An optional INFO level Gosling log message.
    pub(crate) message: &'a str,
}

pub(crate) trait GoslingConfigure<T> {
    /// Set [`GoslingValue`] with supported type.
    fn get_value(&self, values: Vec<GoslingValue<T>>) -> Option<T>;
}
impl<T: fmt::Debug> GoslingConfigure<T> for GoslingConfiguration {
    /// Use [`GoslingValue`] to set a value, the first unfiltered value wins.
    fn get_value(&self, values: Vec<GoslingValue<T>>) -> Option<T> {
        for value in values {
            if let Some(v) = value.value {
                if value.filter {
                    continue;
                } else {
                    if !value.message.is_empty() {
                        info!("{} = {:?}", value.message, v)
                    }
                    return Some(v);
                }
            }
        }
        None
    }
}

impl GoslingConfiguration {
    /// Implement precedence rules for all [`GoslingConfiguration`] values.
    pub(crate) fn configure(&mut self, defaults: &GoslingDefaults) {
        // Configure `quiet`.
        self.quiet = self
            .get_value(vec![
                // Use --quiet if set.
                GoslingValue {
                    value: Some(self.quiet),
                    filter: self.quiet == 0,
                    message: "",
                },
                // Otherwise use GoslingDefault if set.
                GoslingValue {
                    value: defaults.quiet,
                    filter: defaults.quiet.is_none(),
                    message: "",
                },
            ])
            .unwrap_or(0);

        // Configure `verbose`.
        self.verbose = self
            .get_value(vec![
                // Use --verbose if set.
                GoslingValue {
                    value: Some(self.verbose),
                    filter: self.verbose == 0,
                    message: "",
                },
                // Otherwise use GoslingDefault if set.
                GoslingValue {
                    value: defaults.verbose,
                    filter: defaults.verbose.is_none(),
                    message: "",
                },
            ])
            .unwrap_or(0);

        // Configure `log_level`.
        self.log_level = self
            .get_value(vec![
                // Use --log-level if set.
                GoslingValue {
                    value: Some(self.log_level),
                    filter: self.log_level == 0,
                    message: "",
                },
                // Otherwise use GoslingDefault if set.
                GoslingValue {
                    value: defaults.log_level,
                    filter: defaults.log_level.is_none(),
                    message: "",
                },
            ])
            .unwrap_or(0);

        // Configure `gosling_log`.
        self.gosling_log = self
            .get_value(vec![
                // Use --gosling-log if set.
                GoslingValue {
                    value: Some(self.gosling_log.to_string()),
                    filter: self.gosling_log.is_empty(),
                    message: "",
                },
                // Otherwise use GoslingDefault if set.
                GoslingValue {
                    value: defaults.gosling_log.clone(),
                    filter: defaults.gosling_log.is_none(),
                    message: "",
                },
            ])
            .unwrap_or_default();

        // Initialize the Gosling logger.
        self.initialize_gosling_logger();

        // Configure `url`, only the default is configured here, validate() confirms
        // exactly one url is set.
        if self.url.is_empty() {
            if let Some(url) = defaults.url.as_ref() {
                info!("url = {}", url);
                self.url.push(url.to_string());
            }
        }

        // Configure `method`.
        self.method = self
            .get_value(vec![
                // Use --method if set.
                GoslingValue {
                    value: Some(self.method.to_uppercase()),
                    filter: self.method.is_empty(),
                    message: "method",
                },
                // Otherwise use GoslingDefault if set.
                GoslingValue {
                    value: defaults.method.as_ref().map(|m| m.to_uppercase()),
                    filter: defaults.method.is_none(),
                    message: "method",
                },
                // Otherwise default to GET.
                GoslingValue {
                    value: Some("GET".to_string()),
                    filter: false,
                    message: "",
                },
            ])
            .unwrap_or_default();

        // Configure `body`.
        if self.body.is_empty() {
            if let Some(body) = defaults.body.as_ref() {
                self.body.push(body.to_string());
            }
        }

        // Configure `concurrency`.
        self.concurrency = self.get_value(vec![
            // Use --concurrency if set.
            GoslingValue {
                value: self.concurrency,
                filter: self.concurrency.is_none(),
                message: "concurrency",
            },
            // Otherwise use GoslingDefault if set.
            GoslingValue {
                value: defaults.concurrency,
                filter: defaults.concurrency.is_none(),
                message: "concurrency",
            },
            // Otherwise make one request at a time.
            GoslingValue {
                value: Some(1),
                filter: false,
                message: "concurrency",
            },
        ]);

        // Configure the stop condition. Defaults are only used if neither --requests
        // nor --duration were set on the command line.
        if self.requests.is_none() && self.duration.is_empty() {
            self.requests = self.get_value(vec![GoslingValue {
                value: defaults.requests,
                filter: defaults.requests.is_none(),
                message: "requests",
            }]);
            self.duration = self
                .get_value(vec![GoslingValue {
                    value: defaults.duration.clone(),
                    filter: defaults.duration.is_none(),
                    message: "duration",
                }])
                .unwrap_or_default();
        }

        // Configure `reporter`.
        self.reporter = self.get_value(vec![
            // Use --reporter if set.
            GoslingValue {
                value: self.reporter,
                filter: self.reporter.is_none(),
                message: "reporter",
            },
            // Otherwise use GoslingDefault if set.
            GoslingValue {
                value: defaults.reporter,
                filter: defaults.reporter.is_none(),
                message: "reporter",
            },
            // Otherwise default to the terminal.
            GoslingValue {
                value: Some(ReportFormat::Term),
                filter: false,
                message: "",
            },
        ]);

        // Configure `timeout`.
        self.timeout = self.get_value(vec![
            // Use --timeout if set.
            GoslingValue {
                value: self.timeout.clone(),
                filter: self.timeout.is_none(),
                message: "timeout",
            },
            // Otherwise use GoslingDefault if set.
            GoslingValue {
                value: defaults.timeout.clone(),
                filter: defaults.timeout.is_none(),
                message: "timeout",
            },
        ]);

        // Configure `drain`.
        self.drain = self
            .get_value(vec![
                // Use --drain if set.
                GoslingValue {
                    value: Some(self.drain),
                    filter: !self.drain,
                    message: "drain",
                },
                // Otherwise use GoslingDefault if set.
                GoslingValue {
                    value: defaults.drain,
                    filter: defaults.drain.is_none(),
                    message: "drain",
                },
            ])
            .unwrap_or(false);
    }

    /// Validate configured [`GoslingConfiguration`] values.
    pub(crate) fn validate(&self) -> Result<(), GoslingError> {
        // Can't set both --verbose and --quiet.
        if self.verbose > 0 && self.quiet > 0 {
            return Err(GoslingError::InvalidOption {
                option: "`configuration.verbose`".to_string(),
                value: self.verbose.to_string(),
                detail: "`configuration.verbose` can not be set with `configuration.quiet`."
                    .to_string(),
            });
        }

        // If set, concurrency must be non-zero.
        if self.concurrency == Some(0) {
            return Err(GoslingError::InvalidOption {
                option: "-c/--concurrency".to_string(),
                value: "0".to_string(),
                detail: "-c/--concurrency must be set to at least 1.".to_string(),
            });
        }

        // If set, timeout must be greater than zero.
        if self.timeout.is_some() && self.timeout_duration().is_none() {
            return Err(GoslingError::InvalidOption {
                option: "--timeout".to_string(),
                value: self.timeout.clone().unwrap_or_default(),
                detail: "--timeout must be a number greater than 0.".to_string(),
            });
        }

        // Building the stop condition and the request validates everything else.
        self.stop_condition()?;
        self.request_template()?;

        Ok(())
    }

    /// The number of requests to make concurrently.
    pub(crate) fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or(1)
    }

    /// The optional per-request timeout.
    pub(crate) fn timeout_duration(&self) -> Option<Duration> {
        let timeout = util::get_float_from_string(self.timeout.clone())?;
        if timeout > 0.0 {
            Duration::try_from_secs_f32(timeout).ok()
        } else {
            None
        }
    }

    /// Exactly one of --requests and --duration must be set.
    pub(crate) fn stop_condition(&self) -> Result<StopCondition, GoslingError> {
        match (self.requests, self.duration.is_empty()) {
            (Some(requests), true) => Ok(StopCondition::Quantity(requests)),
            (None, false) => match util::parse_duration(&self.duration) {
                Some(seconds) => Ok(StopCondition::Duration(seconds)),
                None => Err(GoslingError::InvalidOption {
                    option: "-d/--duration".to_string(),
                    value: self.duration.to_string(),
                    detail: "-d/--duration must be a number of seconds or a time span such as 1m30s."
                        .to_string(),
                }),
            },
            (Some(requests), false) => Err(GoslingError::InvalidOption {
                option: "-n/--requests".to_string(),
                value: requests.to_string(),
                detail: "-n/--requests can not be set with -d/--duration.".to_string(),
            }),
            (None, true) => Err(GoslingError::InvalidOption {
                option: "-n/--requests".to_string(),
                value: "".to_string(),
                detail: "One of -n/--requests or -d/--duration is required.".to_string(),
            }),
        }
    }

    /// Build the request made over and over during the load test.
    pub(crate) fn request_template(&self) -> Result<RequestTemplate, GoslingError> {
        let url = match self.url.as_slice() {
            [url] => util::is_valid_host(url)?,
            [] => {
                return Err(GoslingError::InvalidOption {
                    option: "url".to_string(),
                    value: "".to_string(),
                    detail: "A url to load test is required.".to_string(),
                })
            }
            urls => {
                return Err(GoslingError::InvalidOption {
                    option: "url".to_string(),
                    value: urls.join(" "),
                    detail: "Only one url can be load tested.".to_string(),
                })
            }
        };

        let method = self.method.to_uppercase();
        if !METHODS.contains(&method.as_str()) {
            return Err(GoslingError::InvalidOption {
                option: "-m/--method".to_string(),
                value: self.method.to_string(),
                detail: format!("-m/--method must be one of: {}.", METHODS.join(", ")),
            });
        }
        let mut request = GoslingRequest::new(
            Method::from_bytes(method.as_bytes()).unwrap_or(Method::GET),
            url,
        );

        for header in &self.header {
            match header.split_once(':') {
                Some((name, value)) if !name.trim().is_empty() => {
                    request = request.header(name.trim(), value.trim());
                }
                _ => {
                    return Err(GoslingError::InvalidOption {
                        option: "-H/--header".to_string(),
                        value: header.to_string(),
                        detail: "Headers must be of the form 'name:value'".to_string(),
                    })
                }
            }
        }

        match self.body.as_slice() {
            [] => (),
            [body] => {
                if !BODY_METHODS.contains(&method.as_str()) {
                    return Err(GoslingError::InvalidOption {
                        option: "-b/--body".to_string(),
                        value: body.to_string(),
                        detail: format!("Cannot specify -b/--body with {}.", method),
                    });
                }
                request = request.body(&load_body(body)?);
            }
            bodies => {
                return Err(GoslingError::InvalidOption {
                    option: "-b/--body".to_string(),
                    value: bodies.join(" "),
                    detail: "Cannot specify -b/--body more than once.".to_string(),
                })
            }
        }

        Ok(RequestTemplate::new(request))
    }

    /// Optionally initialize the Gosling logger which writes to standard out and/or to
    /// a configurable log file.
    pub(crate) fn initialize_gosling_logger(&self) {
        // Configure debug output level.
        let debug_level = match self.verbose {
            0 => match self.quiet {
                0 => LevelFilter::Info,
                _ => LevelFilter::Warn,
            },
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Configure Gosling log level.
        let log_level = match self.log_level {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Open the log file if configured.
        let gosling_log: Option<PathBuf> = if !self.gosling_log.is_empty() {
            Some(PathBuf::from(&self.gosling_log))
        // Otherwise disable the log.
        } else {
            None
        };

        let mut loggers: Vec<Box<dyn SharedLogger>> =
            vec![SimpleLogger::new(debug_level, Config::default())];
        if let Some(log_to_file) = gosling_log.as_ref() {
            match std::fs::File::create(log_to_file) {
                Ok(file) => loggers.push(WriteLogger::new(log_level, Config::default(), file)),
                Err(e) => eprintln!(
                    "failed to create log file {}: {}",
                    log_to_file.display(),
                    e
                ),
            }
        }
        match CombinedLogger::init(loggers) {
            Ok(_) => (),
            Err(e) => {
                info!("failed to initialize CombinedLogger: {}", e);
            }
        }
        if let Some(log_to_file) = gosling_log {
            info!("Writing to log file: {}", log_to_file.display());
        }

        info!("Output verbosity level: {}", debug_level);
        info!("Logfile verbosity level: {}", log_level);
    }
}

// A body starting with '@' is read from the named file.
fn load_body(body: &str) -> Result<String, GoslingError> {
    match body.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).map_err(|e| GoslingError::InvalidOption {
            option: "-b/--body".to_string(),
            value: body.to_string(),
            detail: format!("Failed to read request body from {}: {}", path, e),
        }),
        None => Ok(body.to_string()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(args: &[&str]) -> GoslingConfiguration {
        let mut configuration = GoslingConfiguration::parse_args_default(args).unwrap();
        configuration.configure(&GoslingDefaults::default());
        configuration
    }

    fn detail(result: Result<(), GoslingError>) -> String {
        match result {
            Err(GoslingError::InvalidOption { detail, .. }) => detail,
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn set_defaults() {
        let url = "http://example.com/".to_string();
        let body = "hello".to_string();
        let duration = "1m".to_string();
        let timeout = "2.5".to_string();
        let gosling_log = "custom-gosling.log".to_string();

        let gosling_attack = GoslingAttack::initialize_with_config(GoslingConfiguration::default())
            .unwrap()
            .set_default(GoslingDefault::Url, url.as_str())
            .unwrap()
            .set_default(GoslingDefault::Method, "post")
            .unwrap()
            .set_default(GoslingDefault::Body, body.as_str())
            .unwrap()
            .set_default(GoslingDefault::Concurrency, 8)
            .unwrap()
            .set_default(GoslingDefault::Requests, 100)
            .unwrap()
            .set_default(GoslingDefault::Duration, duration.as_str())
            .unwrap()
            .set_default(GoslingDefault::Timeout, timeout.as_str())
            .unwrap()
            .set_default(GoslingDefault::Reporter, ReportFormat::Csv)
            .unwrap()
            .set_default(GoslingDefault::Drain, true)
            .unwrap()
            .set_default(GoslingDefault::GoslingLog, gosling_log.as_str())
            .unwrap()
            .set_default(GoslingDefault::LogLevel, 1)
            .unwrap()
            .set_default(GoslingDefault::Quiet, 1)
            .unwrap()
            .set_default(GoslingDefault::Verbose, 0)
            .unwrap();

        assert!(gosling_attack.defaults.url == Some(url));
        assert!(gosling_attack.defaults.method == Some("post".to_string()));
        assert!(gosling_attack.defaults.body == Some(body));
        assert!(gosling_attack.defaults.concurrency == Some(8));
        assert!(gosling_attack.defaults.requests == Some(100));
        assert!(gosling_attack.defaults.duration == Some(duration));
        assert!(gosling_attack.defaults.timeout == Some(timeout));
        assert!(gosling_attack.defaults.reporter == Some(ReportFormat::Csv));
        assert!(gosling_attack.defaults.drain == Some(true));
        assert!(gosling_attack.defaults.gosling_log == Some(gosling_log));
        assert!(gosling_attack.defaults.log_level == Some(1));
        assert!(gosling_attack.defaults.quiet == Some(1));
        assert!(gosling_attack.defaults.verbose == Some(0));
    }

    #[test]
    fn set_default_wrong_type() {
        let gosling_attack =
            GoslingAttack::initialize_with_config(GoslingConfiguration::default()).unwrap();
        match gosling_attack.set_default(GoslingDefault::Concurrency, "4") {
            Err(GoslingError::InvalidOption { option, detail, .. }) => {
                assert_eq!(option, "GoslingDefault::Concurrency");
                assert_eq!(
                    detail,
                    "set_default(GoslingDefault::Concurrency, 4) expected usize value, received &str"
                );
            }
            _ => panic!("expected an InvalidOption error"),
        }
    }

    #[test]
    fn configure_precedence() {
        let mut defaults = GoslingDefaults {
            url: Some("http://example.com/default".to_string()),
            concurrency: Some(4),
            requests: Some(50),
            reporter: Some(ReportFormat::Json),
            ..Default::default()
        };

        // Defaults fill in what wasn't set on the command line.
        let mut configuration = GoslingConfiguration::parse_args_default(&["-c", "2"]).unwrap();
        configuration.configure(&defaults);
        assert_eq!(configuration.url, vec!["http://example.com/default"]);
        assert_eq!(configuration.concurrency(), 2);
        assert_eq!(configuration.requests, Some(50));
        assert_eq!(configuration.reporter, Some(ReportFormat::Json));
        assert_eq!(configuration.method, "GET");
        assert_eq!(
            configuration.stop_condition().unwrap(),
            StopCondition::Quantity(50)
        );

        // A duration on the command line replaces the default stop condition.
        defaults.duration = Some("10".to_string());
        let mut configuration =
            GoslingConfiguration::parse_args_default(&["http://localhost/", "-d", "3"]).unwrap();
        configuration.configure(&defaults);
        assert_eq!(configuration.url, vec!["http://localhost/"]);
        assert_eq!(configuration.requests, None);
        assert_eq!(
            configuration.stop_condition().unwrap(),
            StopCondition::Duration(3.0)
        );

        // Without any defaults.
        let configuration = parse(&["http://localhost/", "-n", "1"]);
        assert_eq!(configuration.concurrency(), 1);
        assert_eq!(configuration.reporter, Some(ReportFormat::Term));
        assert!(!configuration.drain);
        assert_eq!(configuration.timeout_duration(), None);
    }

    #[test]
    fn build_request() {
        let configuration = parse(&[
            "http://127.0.0.1:5000/api?x=1",
            "-n",
            "10",
            "-m",
            "put",
            "-b",
            "{\"a\": 1}",
            "-H",
            "Content-Type: application/json",
            "-H",
            "X-Url:http://example.com",
        ]);
        assert!(configuration.validate().is_ok());
        let template = configuration.request_template().unwrap();
        let request = template.request();
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.url.as_str(), "http://127.0.0.1:5000/api?x=1");
        assert_eq!(
            request.headers,
            vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("X-Url".to_string(), "http://example.com".to_string()),
            ]
        );
        assert_eq!(request.body.as_deref(), Some("{\"a\": 1}"));
    }

    #[test]
    fn body_from_file() {
        let path = std::env::temp_dir().join("gosling-config-body.txt");
        std::fs::write(&path, "from a file").unwrap();
        let body = format!("@{}", path.display());
        let configuration = parse(&["http://localhost/", "-n", "1", "-m", "POST", "-b", &body]);
        let template = configuration.request_template().unwrap();
        assert_eq!(template.request().body.as_deref(), Some("from a file"));
        std::fs::remove_file(&path).unwrap();

        let configuration = parse(&[
            "http://localhost/",
            "-n",
            "1",
            "-m",
            "POST",
            "-b",
            "@/nonexistent/gosling/body",
        ]);
        assert!(detail(configuration.validate()).starts_with("Failed to read request body"));
    }

    #[test]
    fn validate_options() {
        assert!(parse(&["http://localhost/", "-n", "0"]).validate().is_ok());
        assert!(parse(&["http://localhost/", "-d", "1m30s", "--timeout", "5"])
            .validate()
            .is_ok());

        assert_eq!(
            detail(parse(&["-n", "1"]).validate()),
            "A url to load test is required."
        );
        assert_eq!(
            detail(parse(&["http://a/", "http://b/", "-n", "1"]).validate()),
            "Only one url can be load tested."
        );
        assert_eq!(
            detail(parse(&["http://localhost/"]).validate()),
            "One of -n/--requests or -d/--duration is required."
        );
        assert_eq!(
            detail(parse(&["http://localhost/", "-n", "1", "-d", "1"]).validate()),
            "-n/--requests can not be set with -d/--duration."
        );
        assert!(detail(parse(&["http://localhost/", "-d", "later"]).validate())
            .starts_with("-d/--duration must be"));
        assert!(detail(parse(&["http://localhost/", "-d", "1e20"]).validate())
            .starts_with("-d/--duration must be"));
        assert!(
            detail(parse(&["http://localhost/", "-d", "99999999999999999999h"]).validate())
                .starts_with("-d/--duration must be")
        );
        assert_eq!(
            detail(parse(&["http://localhost/", "-n", "1", "-c", "0"]).validate()),
            "-c/--concurrency must be set to at least 1."
        );
        assert_eq!(
            detail(parse(&["http://localhost/", "-n", "1", "--timeout", "0"]).validate()),
            "--timeout must be a number greater than 0."
        );
        assert_eq!(
            detail(parse(&["http://localhost/", "-n", "1", "--timeout", "1e20"]).validate()),
            "--timeout must be a number greater than 0."
        );
        assert!(detail(parse(&["http://localhost/", "-n", "1", "-m", "TRACE"]).validate())
            .starts_with("-m/--method must be one of"));
        assert_eq!(
            detail(parse(&["http://localhost/", "-n", "1", "-H", "no-separator"]).validate()),
            "Headers must be of the form 'name:value'"
        );
        assert_eq!(
            detail(parse(&["http://localhost/", "-n", "1", "-b", "data"]).validate()),
            "Cannot specify -b/--body with GET."
        );
        assert_eq!(
            detail(
                parse(&["http://localhost/", "-n", "1", "-m", "POST", "-b", "a", "-b", "b"])
                    .validate()
            ),
            "Cannot specify -b/--body more than once."
        );
        assert_eq!(
            detail(parse(&["http://localhost/", "-n", "1", "-v", "-q"]).validate()),
            "`configuration.verbose` can not be set with `configuration.quiet`."
        );
        assert!(matches!(
            parse(&["localhost", "-n", "1"]).validate(),
            Err(GoslingError::InvalidHost { .. })
        ));
    }

    #[test]
    fn reporter_option() {
        let configuration = parse(&["http://localhost/", "-n", "1", "--reporter", "csv"]);
        assert_eq!(configuration.reporter, Some(ReportFormat::Csv));
        assert!(GoslingConfiguration::parse_args_default(&["--reporter", "xml"]).is_err());
    }
}
