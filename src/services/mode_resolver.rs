// src/services/mode_resolver.rs
use serde::{Deserialize, Serialize};

use crate::models::ride::RideRecord;
use crate::models::status::{ParsedStatus, RideStatus};
use crate::utils::status_vocabulary::StatusVocabulary;

/// Which "My Rides" surface the account should see.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    User,      // Account is not a driver
    Passenger, // Driver account without an unsettled ride
    Driver,    // Driver account with an active or unpaid ride
}

impl Mode {
    pub fn shows_driver_features(&self) -> bool {
        matches!(self, Mode::Driver)
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModeResolution {
    pub mode: Mode,
    pub has_active_ride: bool,
    pub active_ride: Option<RideRecord>,
}

/// Status and payment facts about one ride, read through a vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct RideAssessment {
    pub status: ParsedStatus<RideStatus>,
    pub is_cancelled: bool,
    pub is_completed: bool,
    pub has_pending_payment: bool,
}

impl RideAssessment {
    pub fn of(ride: &RideRecord, vocabulary: &StatusVocabulary) -> Self {
        let status = vocabulary.ride_status(ride.raw_status());
        let payment = vocabulary.payment_status(ride.payment_status.as_deref());

        let is_cancelled = status.is(RideStatus::Cancelled);
        let is_completed = status.is(RideStatus::Completed);

        let explicitly_outstanding = payment.known().is_some_and(|p| p.is_outstanding());
        let explicitly_settled = payment.known().is_some_and(|p| p.is_settled())
            || ride.all_payments_completed == Some(true);

        // A finished ride keeps collecting until something says it is settled.
        let has_pending_payment = explicitly_outstanding
            || ride.all_payments_completed == Some(false)
            || (is_completed && !explicitly_settled);

        Self {
            status,
            is_cancelled,
            is_completed,
            has_pending_payment,
        }
    }

    /// Scheduled, in progress, or completed but still unpaid.
    pub fn is_active(&self) -> bool {
        !self.is_cancelled && (!self.is_completed || self.has_pending_payment)
    }
}

/// Resolve the mode with the built-in status vocabulary.
pub fn resolve_mode(is_driver: bool, current_ride: Option<&RideRecord>) -> ModeResolution {
    resolve_mode_with(StatusVocabulary::builtin_ref(), is_driver, current_ride)
}

pub fn resolve_mode_with(
    vocabulary: &StatusVocabulary,
    is_driver: bool,
    current_ride: Option<&RideRecord>,
) -> ModeResolution {
    if !is_driver {
        return ModeResolution {
            mode: Mode::User,
            has_active_ride: false,
            active_ride: None,
        };
    }

    let active_ride = current_ride.filter(|ride| RideAssessment::of(ride, vocabulary).is_active());
    let has_active_ride = active_ride.is_some();

    tracing::debug!(
        "Driver mode resolution: current ride {:?}, active: {}",
        current_ride.map(|r| r.raw_status()),
        has_active_ride
    );

    ModeResolution {
        mode: if has_active_ride { Mode::Driver } else { Mode::Passenger },
        has_active_ride,
        active_ride: active_ride.cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ride(status: &str) -> RideRecord {
        RideRecord::with_id("r1").with_status(status)
    }

    #[test]
    fn test_non_driver_is_always_user() {
        let candidates = [
            None,
            Some(ride("in_progress")),
            Some(ride("completed").with_all_payments_completed(false)),
            Some(ride("cancelled")),
        ];
        for current in &candidates {
            let resolution = resolve_mode(false, current.as_ref());
            assert_eq!(resolution.mode, Mode::User);
            assert!(!resolution.has_active_ride);
            assert!(resolution.active_ride.is_none());
        }
    }

    #[test]
    fn test_in_progress_ride_is_driver_mode() {
        let current = ride("in_progress");
        let resolution = resolve_mode(true, Some(&current));
        assert_eq!(resolution.mode, Mode::Driver);
        assert!(resolution.has_active_ride);
        assert_eq!(resolution.active_ride, Some(current));
    }

    #[test]
    fn test_unpaid_completed_ride_keeps_driver_mode() {
        let unpaid = ride("completed").with_all_payments_completed(false);
        let resolution = resolve_mode(true, Some(&unpaid));
        assert_eq!(resolution.mode, Mode::Driver);
        assert!(resolution.has_active_ride);

        let paid = ride("completed").with_all_payments_completed(true);
        let resolution = resolve_mode(true, Some(&paid));
        assert_eq!(resolution.mode, Mode::Passenger);
        assert!(!resolution.has_active_ride);
    }

    #[test]
    fn test_no_current_ride_is_passenger_mode() {
        let resolution = resolve_mode(true, None);
        assert_eq!(resolution.mode, Mode::Passenger);
        assert!(!resolution.has_active_ride);
        assert!(resolution.active_ride.is_none());
    }

    #[test]
    fn test_cancelled_ride_never_active() {
        let cancelled = ride("CANCELLED").with_payment_status("pending");
        assert_eq!(resolve_mode(true, Some(&cancelled)).mode, Mode::Passenger);
    }

    #[test]
    fn test_completed_ride_payment_markers() {
        let vocab = StatusVocabulary::builtin();

        let no_marker = RideAssessment::of(&ride("COMPLETED"), &vocab);
        assert!(no_marker.has_pending_payment);
        assert!(no_marker.is_active());

        let paid = RideAssessment::of(&ride("completed").with_payment_status("PAID"), &vocab);
        assert!(!paid.has_pending_payment);
        assert!(!paid.is_active());

        let settled = RideAssessment::of(&ride("completed").with_payment_status("completed"), &vocab);
        assert!(!settled.is_active());

        let explicit_pending =
            RideAssessment::of(&ride("completed").with_payment_status("PENDING"), &vocab);
        assert!(explicit_pending.has_pending_payment);
    }

    #[test]
    fn test_legacy_statuses_are_active() {
        for status in ["CREATED", "ONGOING", "PAYMENT_PENDING", "scheduled"] {
            let current = ride(status);
            assert_eq!(resolve_mode(true, Some(&current)).mode, Mode::Driver, "{}", status);
        }
    }

    #[test]
    fn test_status_free_ride_counts_as_active() {
        let unknown = RideRecord::with_id("r9");
        assert_eq!(resolve_mode(true, Some(&unknown)).mode, Mode::Driver);
    }
}
