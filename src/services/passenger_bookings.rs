// src/services/passenger_bookings.rs
use serde::Serialize;

use crate::models::booking::BookingRecord;
use crate::models::identity::{Identified, RecordId};
use crate::models::status::{BookingStatus, ParsedStatus, RideStatus};
use crate::utils::dedup::SeenIds;
use crate::utils::status_vocabulary::StatusVocabulary;

/// Which feed a booking came from. Bookings are processed before requests,
/// and the first copy of a booking wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingSource {
    MyBookings,
    PendingRequests,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PassengerBucket {
    Active,
    PendingRequest,
    History,
}

/// Presentation state of a single booking.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingUiState {
    AwaitingDriver,
    Confirmed,
    InProgress,
    AwaitingPayment,
    Completed,
    Rejected,
    Cancelled,
    Unknown,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PassengerBookingBuckets {
    pub active: Vec<BookingRecord>,
    pub pending_requests: Vec<BookingRecord>,
    pub history: Vec<BookingRecord>,
    /// Drives refresh polling only, never classification.
    pub has_ride_in_progress: bool,
}

pub fn passenger_bucket(
    vocabulary: &StatusVocabulary,
    booking: &BookingRecord,
    source: BookingSource,
) -> PassengerBucket {
    let ride_status = vocabulary.ride_status(booking.ride_raw_status());

    match vocabulary.booking_status(booking.status.as_deref()) {
        ParsedStatus::Known(BookingStatus::Pending) => {
            if source == BookingSource::MyBookings {
                tracing::debug!(
                    "Booking {:?} still pending in my-bookings feed, treating as request",
                    booking.identity()
                );
            }
            PassengerBucket::PendingRequest
        }
        ParsedStatus::Known(status) if status.is_confirmed() => {
            if ride_status.is_any(&[RideStatus::Completed, RideStatus::Cancelled]) {
                PassengerBucket::History
            } else {
                PassengerBucket::Active
            }
        }
        // rejected, cancelled, completed, missing or unrecognized
        _ => PassengerBucket::History,
    }
}

/// Dedup key for active and completed rides: the underlying ride, else the booking.
fn ride_key(booking: &BookingRecord) -> Option<&RecordId> {
    booking.ride_identity().or(booking.identity())
}

/// Confirmed or accepted seat on a ride that has finished.
fn rode_to_completion(vocabulary: &StatusVocabulary, booking: &BookingRecord) -> bool {
    vocabulary
        .booking_status(booking.status.as_deref())
        .known()
        .is_some_and(|status| status.is_confirmed())
        && vocabulary
            .ride_status(booking.ride_raw_status())
            .is(RideStatus::Completed)
}

/// Classify with the built-in status vocabulary.
pub fn classify_passenger_bookings(
    bookings: &[BookingRecord],
    requests: &[BookingRecord],
) -> PassengerBookingBuckets {
    classify_passenger_bookings_with(StatusVocabulary::builtin_ref(), bookings, requests)
}

/// Merge the my-bookings and pending-requests feeds into active, pending
/// and history lists.
///
/// The two feeds come from different endpoints and may disagree for a
/// while after a request is accepted. A booking already seen in the first
/// feed is ignored in the second. Active entries, and history entries for
/// completed rides, are unique per underlying ride.
pub fn classify_passenger_bookings_with(
    vocabulary: &StatusVocabulary,
    bookings: &[BookingRecord],
    requests: &[BookingRecord],
) -> PassengerBookingBuckets {
    let mut buckets = PassengerBookingBuckets::default();
    let mut seen_bookings = SeenIds::new();
    let mut active_rides = SeenIds::new();
    let mut completed_rides = SeenIds::new();

    let feeds = bookings
        .iter()
        .map(|b| (b, BookingSource::MyBookings))
        .chain(requests.iter().map(|b| (b, BookingSource::PendingRequests)));

    for (booking, source) in feeds {
        if !seen_bookings.first_sighting(booking.identity()) {
            continue;
        }

        match passenger_bucket(vocabulary, booking, source) {
            PassengerBucket::Active => {
                if active_rides.first_sighting(ride_key(booking)) {
                    buckets.active.push(booking.clone());
                } else {
                    tracing::debug!(
                        "Booking {:?} duplicates an active ride, skipping",
                        booking.identity()
                    );
                }
            }
            PassengerBucket::PendingRequest => buckets.pending_requests.push(booking.clone()),
            // Only completed rides collapse per ride; a cancelled or rejected
            // booking on the same ride is a separate history entry.
            PassengerBucket::History => {
                if !rode_to_completion(vocabulary, booking)
                    || completed_rides.first_sighting(ride_key(booking))
                {
                    buckets.history.push(booking.clone());
                }
            }
        }
    }

    buckets.has_ride_in_progress = buckets.active.iter().any(|booking| {
        vocabulary
            .ride_status(booking.ride_raw_status())
            .is(RideStatus::InProgress)
    });

    tracing::debug!(
        "Classified {} bookings + {} requests: {} active, {} pending, {} history (in progress: {})",
        bookings.len(),
        requests.len(),
        buckets.active.len(),
        buckets.pending_requests.len(),
        buckets.history.len(),
        buckets.has_ride_in_progress
    );

    buckets
}

/// Presentation state with the built-in status vocabulary.
pub fn booking_ui_state(booking: &BookingRecord) -> BookingUiState {
    booking_ui_state_with(StatusVocabulary::builtin_ref(), booking)
}

pub fn booking_ui_state_with(vocabulary: &StatusVocabulary, booking: &BookingRecord) -> BookingUiState {
    let status = match vocabulary.booking_status(booking.status.as_deref()) {
        ParsedStatus::Known(status) => status,
        _ => return BookingUiState::Unknown,
    };

    match status {
        BookingStatus::Pending => BookingUiState::AwaitingDriver,
        BookingStatus::Rejected => BookingUiState::Rejected,
        BookingStatus::Cancelled => BookingUiState::Cancelled,
        BookingStatus::Completed => BookingUiState::Completed,
        BookingStatus::Confirmed | BookingStatus::Accepted => {
            let paid = vocabulary
                .payment_status(booking.payment_status.as_deref())
                .known()
                .is_some_and(|p| p.is_settled());

            match vocabulary.ride_status(booking.ride_raw_status()).known() {
                Some(RideStatus::Cancelled) => BookingUiState::Cancelled,
                Some(RideStatus::InProgress) => BookingUiState::InProgress,
                Some(RideStatus::Completed | RideStatus::PaymentPending) if paid => {
                    BookingUiState::Completed
                }
                Some(RideStatus::Completed | RideStatus::PaymentPending) => {
                    BookingUiState::AwaitingPayment
                }
                Some(RideStatus::Scheduled) | None => BookingUiState::Confirmed,
            }
        }
    }
}
