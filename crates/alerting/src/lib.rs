//! Alerting System
//!
//! Turns classifier verdicts into alerts: confidence thresholding, alert
//! messages and severity labels, and throttling of repeat announcements.

mod alert;
mod evaluator;
mod manager;

pub use alert::{Alert, AlertKind, Severity};
pub use evaluator::{Assessment, RiskEvaluator, DEFAULT_MIN_CONFIDENCE};
pub use manager::{AlertThrottle, ThrottleConfig, ThrottleState};
