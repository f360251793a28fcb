//! Utility functions used by Gosling, and available when embedding it.

use num_format::{Locale, ToFormattedString};
use regex::Regex;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

use crate::GoslingError;

// Set after the first ctrl-c, a second ctrl-c exits immediately.
static CANCELED: AtomicBool = AtomicBool::new(false);
// Where the ctrl-c handler delivers interrupts.
static INTERRUPT: Mutex<Option<flume::Sender<()>>> = Mutex::new(None);

/// Parse a string representing a time span and return the number of seconds.
///
/// Can be specified as an integer, indicating seconds. Or can use integers
/// together with one or more of "h", "m", and "s", in that order, indicating
/// "hours", "minutes", and "seconds".
///
/// Valid formats include: 20, 20s, 3m, 2h, 1h20m, 3h30m10s, etc.
///
/// # Example
/// ```rust
/// use gosling::util;
///
/// // 1 hour 2 minutes and 3 seconds is 3,723 seconds.
/// assert_eq!(util::parse_timespan("1h2m3s"), 3_723);
///
/// // 45 seconds is 45 seconds.
/// assert_eq!(util::parse_timespan("45"), 45);
///
/// // Invalid value is 0 seconds.
/// assert_eq!(util::parse_timespan("foo"), 0);
/// ```
pub fn parse_timespan(time_str: &str) -> usize {
    if let Ok(t) = usize::from_str(time_str) {
        // If an integer is passed in, assume it's seconds
        trace!("{} is integer: {} seconds", time_str, t);
        return t;
    }

    // Otherwise use a regex to extract hours, minutes and seconds from string.
    let re = match Regex::new(r"((?P<hours>\d+?)h)?((?P<minutes>\d+?)m)?((?P<seconds>\d+?)s)?") {
        Ok(re) => re,
        Err(e) => {
            warn!("failed to compile timespan regex: {}", e);
            return 0;
        }
    };
    let time_matches = match re.captures(time_str) {
        Some(time_matches) => time_matches,
        None => return 0,
    };
    let component = |name: &str| {
        time_matches
            .name(name)
            .and_then(|m| usize::from_str(m.as_str()).ok())
            .unwrap_or(0)
    };
    let hours = component("hours");
    let minutes = component("minutes");
    let seconds = component("seconds");
    let total = match timespan_seconds(hours, minutes, seconds) {
        Some(total) => total,
        None => {
            warn!("{} is too long, using 0 seconds", time_str);
            return 0;
        }
    };
    trace!(
        "{} hours {} minutes {} seconds: {} seconds",
        hours,
        minutes,
        seconds,
        total
    );
    total
}

// Total seconds of a time span, None on overflow.
fn timespan_seconds(hours: usize, minutes: usize, seconds: usize) -> Option<usize> {
    hours
        .checked_mul(60 * 60)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)
}

/// Parse a run duration in seconds.
///
/// Accepts a non-negative number of seconds, including fractions, or a time span
/// made only of hours, minutes and seconds as accepted by [`parse_timespan`].
/// Returns `None` if the string is neither, or if the duration is too long to
/// be timed.
///
/// # Example
/// ```rust
/// use gosling::util;
///
/// assert_eq!(util::parse_duration("2.5"), Some(2.5));
/// assert_eq!(util::parse_duration("1m30s"), Some(90.0));
/// assert_eq!(util::parse_duration("0"), Some(0.0));
///
/// assert_eq!(util::parse_duration("-1"), None);
/// assert_eq!(util::parse_duration("soon"), None);
/// ```
pub fn parse_duration(duration: &str) -> Option<f64> {
    let seconds = match f64::from_str(duration) {
        Ok(seconds) => seconds,
        Err(_) => {
            let re = Regex::new(r"^((?P<hours>\d+)h)?((?P<minutes>\d+)m)?((?P<seconds>\d+)s)?$")
                .ok()?;
            if duration.is_empty() {
                return None;
            }
            let time_matches = re.captures(duration)?;
            // Every component that is present must fit, a missing one is 0.
            let component = |name: &str| match time_matches.name(name) {
                Some(m) => usize::from_str(m.as_str()).ok(),
                None => Some(0),
            };
            timespan_seconds(
                component("hours")?,
                component("minutes")?,
                component("seconds")?,
            )? as f64
        }
    };
    if seconds < 0.0 || Duration::try_from_secs_f64(seconds).is_err() {
        return None;
    }
    Some(seconds)
}

/// Convert optional string to f32, otherwise return None.
///
/// # Example
/// ```rust
/// use gosling::util;
///
/// // No decimal returns a proper float.
/// assert_eq!(util::get_float_from_string(Some("1".to_string())), Some(1.0));
///
/// // Leading decimal returns a proper float.
/// assert_eq!(util::get_float_from_string(Some(".1".to_string())), Some(0.1));
///
/// // Valid float string returns a proper float.
/// assert_eq!(util::get_float_from_string(Some("1.1".to_string())), Some(1.1));
///
/// // Invalid number with too many decimals returns None.
/// assert_eq!(util::get_float_from_string(Some("1.1.1".to_string())), None);
///
/// // No number returns None.
/// assert_eq!(util::get_float_from_string(None), None);
/// ```
pub fn get_float_from_string(string: Option<String>) -> Option<f32> {
    match string {
        Some(s) => match s.parse::<f32>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("failed to convert {} to float: {}", s, e);
                None
            }
        },
        None => None,
    }
}

/// Helper function to determine if a url can be load tested, returning the parsed
/// [`Url`].
///
/// # Example
/// ```rust
/// use gosling::util;
///
/// // Hostname is a valid URL.
/// assert_eq!(util::is_valid_host("http://localhost/").is_ok(), true);
///
/// // IP is a valid URL.
/// assert_eq!(util::is_valid_host("http://127.0.0.1").is_ok(), true);
///
/// // URL with path is a valid URL.
/// assert_eq!(util::is_valid_host("https://example.com/foo").is_ok(), true);
///
/// // Protocol is required
/// assert_eq!(util::is_valid_host("example.com/").is_ok(), false);
///
/// // Only http and https can be load tested.
/// assert_eq!(util::is_valid_host("ftp://example.com/").is_ok(), false);
/// ```
pub fn is_valid_host(host: &str) -> Result<Url, GoslingError> {
    let url = Url::parse(host).map_err(|parse_error| GoslingError::InvalidHost {
        host: host.to_string(),
        detail: "Invalid url.".to_string(),
        parse_error,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(GoslingError::InvalidOption {
            option: "url".to_string(),
            value: host.to_string(),
            detail: format!("Unsupported scheme '{}', expected http or https.", scheme),
        }),
    }
}

/// Format large number in locale appropriate style.
///
/// # Example
/// ```rust
/// use gosling::util;
///
/// assert_eq!(util::format_number(1_234_567), "1,234,567");
/// ```
pub fn format_number(number: usize) -> String {
    (number).to_formatted_string(&Locale::en)
}

// Internal helper to configure the control-c handler. Interrupt the run on the
// first ctrl-c. Exit abruptly on the second ctrl-c.
pub(crate) fn setup_ctrlc_handler(interrupt: flume::Sender<()>) {
    CANCELED.store(false, Ordering::SeqCst);
    match INTERRUPT.lock() {
        Ok(mut current) => *current = Some(interrupt),
        Err(e) => warn!("failed to register interrupt handle: {}", e),
    }

    match ctrlc::set_handler(move || {
        // We've caught a ctrl-c, determine if it's the first time or an additional time.
        if CANCELED.swap(true, Ordering::SeqCst) {
            warn!("caught another ctrl-c, exiting immediately...");
            std::process::exit(1);
        }
        warn!("caught ctrl-c, stopping...");
        if let Ok(current) = INTERRUPT.lock() {
            if let Some(interrupt) = current.as_ref() {
                // The run may already be over.
                let _ = interrupt.send(());
            }
        }
    }) {
        Ok(_) => (),
        Err(e) => {
            // The handler can only be set once per process, later load tests (such as
            // in tests) reuse it with the interrupt handle registered above.
            info!("reset ctrl-c handler: {}", e);
        }
    }
}
