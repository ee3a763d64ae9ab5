//! Roll-up health enumeration (§3 "ResourceStatus", §4.5).

use serde::{Deserialize, Serialize};

/// Health of a single observed resource, or the roll-up over several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Health {
    /// Fully up and serving.
    Healthy,
    /// Degraded but still serving.
    Degraded,
    /// Not serving.
    Unhealthy,
    /// Not yet ready to classify (e.g. still starting).
    Pending,
    /// Could not be determined.
    Unknown,
}

impl Health {
    /// Roll-up rule from §4.5: any `Unhealthy` wins; else all-`Pending` wins;
    /// else all-`Healthy` wins; mixed resolves to `Pending`.
    pub fn rollup(statuses: impl IntoIterator<Item = Health>) -> Health {
        let mut any = false;
        let mut any_unhealthy = false;
        let mut all_pending = true;
        let mut all_healthy = true;

        for h in statuses {
            any = true;
            if h == Health::Unhealthy {
                any_unhealthy = true;
            }
            if h != Health::Pending {
                all_pending = false;
            }
            if h != Health::Healthy {
                all_healthy = false;
            }
        }

        if !any {
            return Health::Unknown;
        }
        if any_unhealthy {
            Health::Unhealthy
        } else if all_healthy {
            Health::Healthy
        } else if all_pending {
            Health::Pending
        } else {
            Health::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_unhealthy_wins() {
        assert_eq!(
            Health::rollup([Health::Healthy, Health::Unhealthy, Health::Pending]),
            Health::Unhealthy
        );
    }

    #[test]
    fn all_pending() {
        assert_eq!(Health::rollup([Health::Pending, Health::Pending]), Health::Pending);
    }

    #[test]
    fn all_healthy() {
        assert_eq!(Health::rollup([Health::Healthy, Health::Healthy]), Health::Healthy);
    }

    #[test]
    fn mixed_without_unhealthy_is_pending() {
        assert_eq!(Health::rollup([Health::Healthy, Health::Pending]), Health::Pending);
    }

    #[test]
    fn empty_is_unknown() {
        assert_eq!(Health::rollup(std::iter::empty()), Health::Unknown);
    }
}
