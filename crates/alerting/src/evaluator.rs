//! Risk evaluation: verdict + fixed threshold -> risk and optional alert

use tracing::debug;
use vision_classifier::{RiskKind, RiskVerdict};

use crate::alert::{Alert, Severity};

/// Minimum confidence for a verdict to raise an alert
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.7;

/// Result of evaluating one verdict
#[derive(Debug, Clone)]
pub struct Assessment {
    pub risk: RiskKind,
    pub alert: Option<Alert>,
}

impl Assessment {
    /// Explicit clear signal: the risk resolved to NONE after a non-NONE risk
    pub fn clears(&self, previous: RiskKind) -> bool {
        self.risk.is_none() && !previous.is_none()
    }
}

/// Applies the confidence threshold.
///
/// Performs no arbitration between risk kinds; the verdict already carries
/// exactly one.
#[derive(Debug, Clone, Copy)]
pub struct RiskEvaluator {
    threshold: f64,
}

impl Default for RiskEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CONFIDENCE)
    }
}

impl RiskEvaluator {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn evaluate(&self, verdict: &RiskVerdict) -> Assessment {
        if verdict.kind().is_none() || verdict.confidence() < self.threshold {
            debug!(
                "No alert: {} at {:.2} (threshold {:.2})",
                verdict.kind(),
                verdict.confidence(),
                self.threshold
            );
            return Assessment {
                risk: RiskKind::None,
                alert: None,
            };
        }

        let kind = verdict.kind();
        let message = format!("{}: {} {}", kind, headline(kind), verdict.description());
        let alert = Alert::risk(
            kind,
            message.trim_end(),
            Some(verdict.description().to_string()),
            Severity::from_confidence(verdict.confidence(), self.threshold),
        );

        Assessment {
            risk: kind,
            alert: Some(alert),
        }
    }
}

fn headline(kind: RiskKind) -> &'static str {
    match kind {
        RiskKind::Fall => "possible fall detected.",
        RiskKind::Fire => "possible fire detected.",
        RiskKind::Unknown => "unrecognized risk reported.",
        RiskKind::None => "no immediate risk detected.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_kind() -> impl Strategy<Value = RiskKind> {
        prop_oneof![
            Just(RiskKind::None),
            Just(RiskKind::Fall),
            Just(RiskKind::Fire),
            Just(RiskKind::Unknown),
        ]
    }

    #[test]
    fn test_fire_scenario() {
        let evaluator = RiskEvaluator::new(0.7);
        let assessment = evaluator.evaluate(&RiskVerdict::new(RiskKind::Fire, "smoke visible", 0.82));

        assert_eq!(assessment.risk, RiskKind::Fire);
        let alert = assessment.alert.unwrap();
        assert!(alert.message.contains("FIRE"));
        assert!(alert.message.contains("smoke visible"));
        assert_eq!(alert.details.as_deref(), Some("smoke visible"));
        assert_eq!(alert.severity, Severity::Medium);
    }

    #[test]
    fn test_low_confidence_fall_is_ignored() {
        let evaluator = RiskEvaluator::new(0.7);
        let assessment =
            evaluator.evaluate(&RiskVerdict::new(RiskKind::Fall, "person on floor", 0.5));

        assert_eq!(assessment.risk, RiskKind::None);
        assert!(assessment.alert.is_none());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let evaluator = RiskEvaluator::new(0.7);
        let assessment = evaluator.evaluate(&RiskVerdict::new(RiskKind::Fall, "on floor", 0.7));
        assert_eq!(assessment.risk, RiskKind::Fall);
    }

    #[test]
    fn test_clear_signal() {
        let evaluator = RiskEvaluator::default();
        let clear = evaluator.evaluate(&RiskVerdict::new(RiskKind::None, "all quiet", 0.95));

        assert!(clear.clears(RiskKind::Fire));
        assert!(clear.clears(RiskKind::Unknown));
        assert!(!clear.clears(RiskKind::None));

        let fire = evaluator.evaluate(&RiskVerdict::new(RiskKind::Fire, "flames", 0.9));
        assert!(!fire.clears(RiskKind::Fall));
    }

    proptest! {
        #[test]
        fn prop_below_threshold_or_none_never_alerts(
            kind in any_kind(),
            confidence in 0.0f64..=1.0,
            threshold in 0.0f64..=1.0,
        ) {
            prop_assume!(kind == RiskKind::None || confidence < threshold);
            let assessment = RiskEvaluator::new(threshold)
                .evaluate(&RiskVerdict::new(kind, "desc", confidence));
            prop_assert_eq!(assessment.risk, RiskKind::None);
            prop_assert!(assessment.alert.is_none());
        }

        #[test]
        fn prop_confident_risk_always_alerts(
            kind in prop_oneof![Just(RiskKind::Fall), Just(RiskKind::Fire), Just(RiskKind::Unknown)],
            confidence in 0.0f64..=1.0,
            threshold in 0.0f64..=1.0,
            description in "[a-z ]{1,30}",
        ) {
            prop_assume!(confidence >= threshold);
            let assessment = RiskEvaluator::new(threshold)
                .evaluate(&RiskVerdict::new(kind, description.clone(), confidence));
            prop_assert_eq!(assessment.risk, kind);
            let alert = assessment.alert.unwrap();
            prop_assert!(alert.message.contains(kind.as_str()));
            prop_assert!(alert.message.contains(description.trim_end()));
            prop_assert_eq!(alert.risk_kind(), Some(kind));
        }
    }
}
