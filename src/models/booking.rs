// src/models/booking.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::{Identified, RecordId, lenient};
use super::ride::RideRecord;

/// The ride a booking points at: either embedded or referenced by id.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum RideRef {
    Id(RecordId),
    Embedded(Box<RideRecord>),
}

/// Snapshot of a passenger booking (or booking request).
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingRecord {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(
        rename = "_id",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub object_id: Option<RecordId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passenger: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub ride: Option<RideRef>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub ride_id: Option<RecordId>,

    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub payment_status: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub seats: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub total_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// `GET` my-bookings envelope.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserBookings {
    #[serde(default)]
    pub as_passenger: Vec<BookingRecord>,
}

/// `GET` pending-requests envelope.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PendingBookingRequests {
    #[serde(default)]
    pub booking_requests: Vec<BookingRecord>,
}

impl Identified for BookingRecord {
    fn identity(&self) -> Option<&RecordId> {
        self.id.as_ref().or(self.object_id.as_ref())
    }
}

impl BookingRecord {
    pub fn with_id(id: impl Into<RecordId>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn with_payment_status(mut self, status: &str) -> Self {
        self.payment_status = Some(status.to_string());
        self
    }

    pub fn with_ride(mut self, ride: RideRecord) -> Self {
        self.ride = Some(RideRef::Embedded(Box::new(ride)));
        self
    }

    pub fn embedded_ride(&self) -> Option<&RideRecord> {
        match &self.ride {
            Some(RideRef::Embedded(ride)) => Some(ride.as_ref()),
            _ => None,
        }
    }

    /// Identity of the underlying ride, from the embedded record, the bare
    /// reference or `rideId`, in that order.
    pub fn ride_identity(&self) -> Option<&RecordId> {
        match &self.ride {
            Some(RideRef::Embedded(ride)) => ride.identity().or(self.ride_id.as_ref()),
            Some(RideRef::Id(id)) => Some(id),
            None => self.ride_id.as_ref(),
        }
    }

    /// Raw status of the underlying ride; unknown when the ride is only
    /// referenced by id.
    pub fn ride_raw_status(&self) -> Option<&str> {
        self.embedded_ride().and_then(RideRecord::raw_status)
    }
}
