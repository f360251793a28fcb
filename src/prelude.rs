pub use crate::config::{GoslingConfiguration, GoslingDefault, GoslingDefaultType};
pub use crate::events::{Events, RequestHandle, RunEvent, RunObserver};
pub use crate::metrics::{get_error_counts, get_time_stats, GoslingMetrics, Record, Tracker};
pub use crate::report::{ReportFormat, Reporter};
pub use crate::request::{GoslingRequest, RequestFactory, RequestTemplate};
pub use crate::runner::{Progress, RunOutcome, Runner, StopCondition};
pub use crate::transport::{Completion, ReqwestTransport, Transport};
pub use crate::{GoslingAttack, GoslingError};
