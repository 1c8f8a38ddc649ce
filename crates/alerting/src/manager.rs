//! Repeat-announcement throttle
//!
//! A persisting risk is re-evaluated on every frame. The displayed alert
//! refreshes each time, but the announcement (warn log, alert counter) for a
//! given risk kind fires at most once per cooldown window.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use vision_classifier::RiskKind;

/// Throttle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Cooldown between announcements of the same risk kind (seconds)
    pub cooldown_seconds: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: 30,
        }
    }
}

/// Announcement history for one risk kind
#[derive(Debug, Clone)]
pub struct ThrottleState {
    /// Last time this kind was announced
    pub last_announced: Instant,
    /// Number of announcements
    pub announce_count: usize,
}

/// Per-kind announcement throttle
pub struct AlertThrottle {
    config: ThrottleConfig,
    states: HashMap<RiskKind, ThrottleState>,
}

impl AlertThrottle {
    pub fn new(config: ThrottleConfig) -> Self {
        info!("Creating alert throttle with config: {:?}", config);
        Self {
            config,
            states: HashMap::new(),
        }
    }

    /// Check whether `kind` may be announced now
    pub fn should_announce(&self, kind: RiskKind) -> bool {
        self.should_announce_at(kind, Instant::now())
    }

    fn should_announce_at(&self, kind: RiskKind, now: Instant) -> bool {
        match self.states.get(&kind) {
            Some(state) => {
                let cooldown = Duration::from_secs(self.config.cooldown_seconds);
                let quiet = now.saturating_duration_since(state.last_announced) >= cooldown;
                if !quiet {
                    debug!("Announcement of {} suppressed: in cooldown", kind);
                }
                quiet
            }
            None => true,
        }
    }

    /// Record that `kind` was announced
    pub fn record(&mut self, kind: RiskKind) {
        self.record_at(kind, Instant::now());
    }

    fn record_at(&mut self, kind: RiskKind, now: Instant) {
        let state = self.states.entry(kind).or_insert(ThrottleState {
            last_announced: now,
            announce_count: 0,
        });
        state.last_announced = now;
        state.announce_count += 1;
    }

    /// Announce if allowed; returns whether the announcement happened
    pub fn try_announce(&mut self, kind: RiskKind) -> bool {
        if self.should_announce(kind) {
            self.record(kind);
            true
        } else {
            false
        }
    }

    pub fn announce_count(&self, kind: RiskKind) -> usize {
        self.states.get(&kind).map(|s| s.announce_count).unwrap_or(0)
    }

    /// Forget all history (on source change)
    pub fn clear(&mut self) {
        self.states.clear();
    }
}

impl Default for AlertThrottle {
    fn default() -> Self {
        Self::new(ThrottleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_announcement_passes() {
        let throttle = AlertThrottle::default();
        assert!(throttle.should_announce(RiskKind::Fire));
    }

    #[test]
    fn test_deduplication_within_cooldown() {
        let mut throttle = AlertThrottle::new(ThrottleConfig {
            cooldown_seconds: 60,
        });

        assert!(throttle.try_announce(RiskKind::Fire));
        assert!(!throttle.try_announce(RiskKind::Fire));
        assert_eq!(throttle.announce_count(RiskKind::Fire), 1);

        // Other kinds are tracked independently
        assert!(throttle.try_announce(RiskKind::Fall));
    }

    #[test]
    fn test_cooldown_expires() {
        let mut throttle = AlertThrottle::new(ThrottleConfig {
            cooldown_seconds: 30,
        });
        let start = Instant::now();
        throttle.record_at(RiskKind::Fall, start);

        assert!(!throttle.should_announce_at(RiskKind::Fall, start + Duration::from_secs(29)));
        assert!(throttle.should_announce_at(RiskKind::Fall, start + Duration::from_secs(30)));
    }

    #[test]
    fn test_clear_resets_history() {
        let mut throttle = AlertThrottle::default();
        throttle.record(RiskKind::Fire);
        throttle.clear();
        assert!(throttle.should_announce(RiskKind::Fire));
        assert_eq!(throttle.announce_count(RiskKind::Fire), 0);
    }
}
