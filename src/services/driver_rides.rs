// src/services/driver_rides.rs
use serde::Serialize;

use crate::models::identity::Identified;
use crate::models::ride::RideRecord;
use crate::models::status::{ParsedStatus, RideStatus};
use crate::services::mode_resolver::RideAssessment;
use crate::utils::dedup::merge_unique;
use crate::utils::status_vocabulary::StatusVocabulary;

const ACTIVE_STATUSES: &[RideStatus] = &[
    RideStatus::Scheduled,
    RideStatus::InProgress,
    RideStatus::PaymentPending,
];

/// Where a single driver ride lands.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DriverBucket {
    Active,
    /// Completed with money still outstanding; listed under history too.
    PendingPayment,
    History,
}

/// Driver rides split for the "My Rides" tabs.
///
/// `active` and `history` are disjoint; `pending_payment` is a subset of
/// `history`.
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriverRideBuckets {
    pub active: Vec<RideRecord>,
    pub pending_payment: Vec<RideRecord>,
    pub history: Vec<RideRecord>,
}

impl DriverRideBuckets {
    pub fn total(&self) -> usize {
        self.active.len() + self.history.len()
    }
}

pub fn driver_bucket(vocabulary: &StatusVocabulary, ride: &RideRecord) -> DriverBucket {
    let assessment = RideAssessment::of(ride, vocabulary);

    match &assessment.status {
        ParsedStatus::Known(status) if ACTIVE_STATUSES.contains(status) => DriverBucket::Active,
        ParsedStatus::Known(RideStatus::Completed) if assessment.has_pending_payment => {
            DriverBucket::PendingPayment
        }
        ParsedStatus::Known(RideStatus::Completed) => DriverBucket::History,
        // Unknown rides stay visible unless the backend explicitly retired them.
        ParsedStatus::Missing => {
            if ride.is_active == Some(false) {
                DriverBucket::History
            } else {
                DriverBucket::Active
            }
        }
        // cancelled
        ParsedStatus::Known(_) => DriverBucket::History,
        ParsedStatus::Unrecognized(raw) => {
            tracing::debug!(
                "Ride {:?} ({}) has unrecognized status '{}', filing under history",
                ride.identity(),
                ride.route_label(),
                raw
            );
            DriverBucket::History
        }
    }
}

/// Classify with the built-in status vocabulary.
pub fn classify_driver_rides(offered: &[RideRecord], history: &[RideRecord]) -> DriverRideBuckets {
    classify_driver_rides_with(StatusVocabulary::builtin_ref(), offered, history)
}

/// Union `offered` and `history` (offered copy wins on duplicate ids) and
/// split the result into active, pending-payment and history lists.
pub fn classify_driver_rides_with(
    vocabulary: &StatusVocabulary,
    offered: &[RideRecord],
    history: &[RideRecord],
) -> DriverRideBuckets {
    let rides = merge_unique([offered, history]);
    let mut buckets = DriverRideBuckets::default();

    for ride in rides {
        match driver_bucket(vocabulary, ride) {
            DriverBucket::Active => buckets.active.push(ride.clone()),
            DriverBucket::PendingPayment => {
                buckets.pending_payment.push(ride.clone());
                buckets.history.push(ride.clone());
            }
            DriverBucket::History => buckets.history.push(ride.clone()),
        }
    }

    tracing::debug!(
        "Classified {} offered + {} history rides: {} active, {} pending payment, {} history",
        offered.len(),
        history.len(),
        buckets.active.len(),
        buckets.pending_payment.len(),
        buckets.history.len()
    );

    buckets
}
