// src/models/ride.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::{Identified, RecordId, lenient};

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Place {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Snapshot of a ride as returned by the backend.
///
/// Status fields are kept raw; they are only interpreted through a
/// [`StatusVocabulary`](crate::utils::status_vocabulary::StatusVocabulary).
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RideRecord {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(
        rename = "_id",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub object_id: Option<RecordId>,

    // Route
    #[serde(default, deserialize_with = "lenient")]
    pub from: Option<Place>,
    #[serde(default, deserialize_with = "lenient")]
    pub to: Option<Place>,

    // Status (newer payloads use `rideStatus`, older ones `status`)
    #[serde(default, deserialize_with = "lenient")]
    pub ride_status: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub is_active: Option<bool>,

    // Payment aggregate over all passengers
    #[serde(default, deserialize_with = "lenient")]
    pub payment_status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub all_payments_completed: Option<bool>,

    // Seats
    #[serde(default, deserialize_with = "lenient")]
    pub total_seats: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub booked_seats: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub available_seats: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub price_per_seat: Option<f64>,

    // Timing
    #[serde(default, deserialize_with = "lenient")]
    pub departure_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<serde_json::Value>,
}

impl Identified for RideRecord {
    fn identity(&self) -> Option<&RecordId> {
        self.id.as_ref().or(self.object_id.as_ref())
    }
}

impl RideRecord {
    pub fn with_id(id: impl Into<RecordId>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.ride_status = Some(status.to_string());
        self
    }

    pub fn with_payment_status(mut self, status: &str) -> Self {
        self.payment_status = Some(status.to_string());
        self
    }

    pub fn with_all_payments_completed(mut self, done: bool) -> Self {
        self.all_payments_completed = Some(done);
        self
    }

    /// First non-blank of `rideStatus` and `status`.
    pub fn raw_status(&self) -> Option<&str> {
        [self.ride_status.as_deref(), self.status.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
    }

    /// Seats still open: `availableSeats` when reported, otherwise derived
    /// from `totalSeats - bookedSeats`.
    pub fn seats_left(&self) -> Option<u32> {
        self.available_seats.or_else(|| {
            let total = self.total_seats?;
            Some(total.saturating_sub(self.booked_seats.unwrap_or(0)))
        })
    }

    pub fn route_label(&self) -> String {
        let city = |p: &Option<Place>| {
            p.as_ref()
                .and_then(|p| p.city.clone())
                .unwrap_or_else(|| "?".to_string())
        };
        format!("{} -> {}", city(&self.from), city(&self.to))
    }
}
