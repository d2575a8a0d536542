// src/services/my_rides_service.rs
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use tracing;

use crate::{
    errors::RideResult,
    models::{booking::BookingRecord, identity::RecordId},
    services::{
        driver_rides::{DriverRideBuckets, classify_driver_rides_with},
        mode_resolver::{ModeResolution, resolve_mode_with},
        passenger_bookings::{
            BookingUiState, PassengerBookingBuckets, booking_ui_state_with,
            classify_passenger_bookings_with,
        },
        rides_backend::{RidesBackend, Session},
        snapshot_cache::{CacheKey, Feed, SnapshotCache},
    },
    utils::status_vocabulary::StatusVocabulary,
};

/// A booking together with its presentation state.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: BookingRecord,
    pub ui_state: BookingUiState,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PassengerOverview {
    pub active: Vec<BookingView>,
    pub pending_requests: Vec<BookingView>,
    pub history: Vec<BookingView>,
    pub has_ride_in_progress: bool,
}

impl PassengerOverview {
    fn from_buckets(vocabulary: &StatusVocabulary, buckets: PassengerBookingBuckets) -> Self {
        let view = |bookings: Vec<BookingRecord>| -> Vec<BookingView> {
            bookings
                .into_iter()
                .map(|booking| BookingView {
                    ui_state: booking_ui_state_with(vocabulary, &booking),
                    booking,
                })
                .collect()
        };

        Self {
            active: view(buckets.active),
            pending_requests: view(buckets.pending_requests),
            history: view(buckets.history),
            has_ride_in_progress: buckets.has_ride_in_progress,
        }
    }
}

/// Badge counts for the "My Rides" tabs.
#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TabCounts {
    pub driver_active: usize,
    pub driver_pending_payment: usize,
    pub driver_history: usize,
    pub passenger_active: usize,
    pub passenger_pending_requests: usize,
    pub passenger_history: usize,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MyRidesOverview {
    pub user_id: RecordId,
    pub is_driver: bool,
    pub mode: ModeResolution,
    pub driver: DriverRideBuckets,
    pub passenger: PassengerOverview,
    /// Feeds served from the last snapshot (or empty) because the fetch failed.
    pub degraded_feeds: Vec<Feed>,
    pub refreshed_at: DateTime<Utc>,
}

impl MyRidesOverview {
    pub fn tab_counts(&self) -> TabCounts {
        TabCounts {
            driver_active: self.driver.active.len(),
            driver_pending_payment: self.driver.pending_payment.len(),
            driver_history: self.driver.history.len(),
            passenger_active: self.passenger.active.len(),
            passenger_pending_requests: self.passenger.pending_requests.len(),
            passenger_history: self.passenger.history.len(),
        }
    }

    /// Whether the overview is worth refreshing on a timer.
    pub fn should_poll(&self) -> bool {
        self.mode.mode.shows_driver_features() || self.passenger.has_ride_in_progress
    }
}

pub struct MyRidesService {
    backend: Arc<dyn RidesBackend>,
    cache: Arc<SnapshotCache>,
    vocabulary: Arc<StatusVocabulary>,
}

impl MyRidesService {
    pub fn new(
        backend: Arc<dyn RidesBackend>,
        cache: Arc<SnapshotCache>,
        vocabulary: Arc<StatusVocabulary>,
    ) -> Self {
        Self {
            backend,
            cache,
            vocabulary,
        }
    }

    pub fn vocabulary(&self) -> &StatusVocabulary {
        &self.vocabulary
    }

    /// Fetch every feed for the session and classify from scratch.
    ///
    /// Only the account lookup can fail the call. Any other feed that fails
    /// is replaced by its last snapshot, or by an empty collection.
    pub async fn overview(&self, session: &Session) -> RideResult<MyRidesOverview> {
        let profile = self.backend.current_user(session).await?;
        let user_id = profile.id.clone();
        let is_driver = profile.is_driver();
        tracing::info!("Building ride overview for user {} (driver: {})", user_id, is_driver);

        let backend = &self.backend;
        let (current_ride, offered, history, bookings, requests) = futures::join!(
            async {
                if is_driver {
                    backend.driver_current_ride(session).await
                } else {
                    Ok(None)
                }
            },
            async {
                if is_driver {
                    backend.driver_offered_rides(session).await
                } else {
                    Ok(Vec::new())
                }
            },
            async {
                if is_driver {
                    backend.driver_ride_history(session).await
                } else {
                    Ok(Vec::new())
                }
            },
            async { backend.user_bookings(session).await.map(|b| b.as_passenger) },
            async {
                backend
                    .pending_booking_requests(session)
                    .await
                    .map(|r| r.booking_requests)
            },
        );

        let mut degraded = Vec::new();
        let uid = user_id.as_str();
        let current_ride = self.settle(uid, Feed::DriverCurrentRide, current_ride, &mut degraded).await;
        let offered = self.settle(uid, Feed::DriverOfferedRides, offered, &mut degraded).await;
        let history = self.settle(uid, Feed::DriverRideHistory, history, &mut degraded).await;
        let bookings = self.settle(uid, Feed::PassengerBookings, bookings, &mut degraded).await;
        let requests = self.settle(uid, Feed::PassengerRequests, requests, &mut degraded).await;

        let vocabulary = self.vocabulary.as_ref();
        let mode = resolve_mode_with(vocabulary, is_driver, current_ride.as_ref());
        let driver = classify_driver_rides_with(vocabulary, &offered, &history);
        let passenger = PassengerOverview::from_buckets(
            vocabulary,
            classify_passenger_bookings_with(vocabulary, &bookings, &requests),
        );

        let overview = MyRidesOverview {
            user_id,
            is_driver,
            mode,
            driver,
            passenger,
            degraded_feeds: degraded,
            refreshed_at: Utc::now(),
        };

        tracing::info!(
            "Overview for user {}: mode {:?}, tabs {:?}",
            overview.user_id,
            overview.mode.mode,
            overview.tab_counts()
        );

        Ok(overview)
    }

    /// Keep a successful fetch as the feed's snapshot, or recover from one.
    async fn settle<T>(&self, user_id: &str, feed: Feed, fetched: RideResult<T>, degraded: &mut Vec<Feed>) -> T
    where
        T: Serialize + DeserializeOwned + Default,
    {
        let key = CacheKey::snapshot(user_id, feed);

        match fetched {
            Ok(value) => {
                if let Err(e) = self.cache.set(&key, &value, None).await {
                    tracing::warn!("Failed to store {} snapshot: {}", feed.as_str(), e);
                }
                value
            }
            Err(e) => {
                degraded.push(feed);
                match self.cache.get::<T>(&key).await {
                    Ok(Some(snapshot)) => {
                        tracing::warn!("Fetching {} failed ({}), serving last snapshot", feed.as_str(), e);
                        snapshot
                    }
                    Ok(None) => {
                        tracing::warn!("Fetching {} failed ({}), no snapshot, serving empty", feed.as_str(), e);
                        T::default()
                    }
                    Err(cache_err) => {
                        tracing::warn!(
                            "Fetching {} failed ({}) and snapshot unreadable ({})",
                            feed.as_str(),
                            e,
                            cache_err
                        );
                        T::default()
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RideError;
    use crate::models::{ride::RideRecord, user::UserProfile};
    use crate::services::mode_resolver::Mode;
    use crate::services::rides_backend::{BackendFixture, Endpoint, InMemoryRidesBackend};
    use serde_json::json;

    fn profile(is_driver: bool) -> UserProfile {
        serde_json::from_value(json!({"_id": "u1", "isDriver": is_driver})).unwrap()
    }

    fn service(backend: Arc<InMemoryRidesBackend>) -> MyRidesService {
        MyRidesService::new(
            backend,
            Arc::new(SnapshotCache::default()),
            Arc::new(StatusVocabulary::builtin()),
        )
    }

    fn booking(id: &str, status: &str, ride_id: &str, ride_status: &str) -> BookingRecord {
        BookingRecord::with_id(id)
            .with_status(status)
            .with_ride(RideRecord::with_id(ride_id).with_status(ride_status))
    }

    #[tokio::test]
    async fn test_driver_overview() {
        let mut fixture = BackendFixture::for_user(profile(true));
        fixture.current_ride = Some(RideRecord::with_id("r1").with_status("in_progress"));
        fixture.offered_rides = vec![
            RideRecord::with_id("r1").with_status("in_progress"),
            RideRecord::with_id("r2").with_status("completed").with_all_payments_completed(false),
        ];
        fixture.ride_history = vec![RideRecord::with_id("r2").with_status("completed")];
        fixture.bookings = vec![booking("b1", "confirmed", "r9", "scheduled")];

        let overview = service(Arc::new(InMemoryRidesBackend::new(fixture)))
            .overview(&Session::bearer("t"))
            .await
            .unwrap();

        assert_eq!(overview.mode.mode, Mode::Driver);
        assert!(overview.should_poll());
        assert!(overview.degraded_feeds.is_empty());
        assert_eq!(
            overview.tab_counts(),
            TabCounts {
                driver_active: 1,
                driver_pending_payment: 1,
                driver_history: 1,
                passenger_active: 1,
                passenger_pending_requests: 0,
                passenger_history: 0,
            }
        );
        assert_eq!(overview.passenger.active[0].ui_state, BookingUiState::Confirmed);
    }

    #[tokio::test]
    async fn test_non_driver_skips_driver_feeds() {
        let mut fixture = BackendFixture::for_user(profile(false));
        fixture.current_ride = Some(RideRecord::with_id("r1").with_status("in_progress"));
        fixture.offered_rides = vec![RideRecord::with_id("r1").with_status("in_progress")];

        let backend = Arc::new(InMemoryRidesBackend::new(fixture));
        backend.fail(Endpoint::DriverOfferedRides).await;

        let overview = service(backend).overview(&Session::bearer("t")).await.unwrap();
        assert_eq!(overview.mode.mode, Mode::User);
        assert_eq!(overview.driver, DriverRideBuckets::default());
        assert!(overview.degraded_feeds.is_empty());
        assert!(!overview.should_poll());
    }

    #[tokio::test]
    async fn test_passenger_in_progress_keeps_polling() {
        let mut fixture = BackendFixture::for_user(profile(false));
        fixture.bookings = vec![booking("b1", "confirmed", "r1", "ONGOING")];

        let overview = service(Arc::new(InMemoryRidesBackend::new(fixture)))
            .overview(&Session::bearer("t"))
            .await
            .unwrap();
        assert!(overview.passenger.has_ride_in_progress);
        assert_eq!(overview.passenger.active[0].ui_state, BookingUiState::InProgress);
        assert!(overview.should_poll());
    }

    #[tokio::test]
    async fn test_failed_feed_falls_back_to_snapshot() {
        let mut fixture = BackendFixture::for_user(profile(true));
        fixture.offered_rides = vec![RideRecord::with_id("r1").with_status("scheduled")];

        let backend = Arc::new(InMemoryRidesBackend::new(fixture));
        let service = service(backend.clone());
        let session = Session::bearer("t");

        let first = service.overview(&session).await.unwrap();
        assert_eq!(first.driver.active.len(), 1);

        backend.fail(Endpoint::DriverOfferedRides).await;
        backend.update(|f| f.offered_rides.clear()).await;

        let second = service.overview(&session).await.unwrap();
        assert_eq!(second.degraded_feeds, vec![Feed::DriverOfferedRides]);
        assert_eq!(second.driver.active, first.driver.active);
    }

    #[tokio::test]
    async fn test_failed_feed_without_snapshot_is_empty() {
        let mut fixture = BackendFixture::for_user(profile(false));
        fixture.requests = vec![booking("q1", "pending", "r1", "scheduled")];

        let backend = Arc::new(InMemoryRidesBackend::new(fixture));
        backend.fail(Endpoint::PendingBookingRequests).await;

        let overview = service(backend).overview(&Session::bearer("t")).await.unwrap();
        assert_eq!(overview.degraded_feeds, vec![Feed::PassengerRequests]);
        assert!(overview.passenger.pending_requests.is_empty());
    }

    #[tokio::test]
    async fn test_account_lookup_failure_fails_overview() {
        let backend = Arc::new(InMemoryRidesBackend::new(BackendFixture::for_user(profile(true))));
        backend.fail(Endpoint::CurrentUser).await;

        let result = service(backend).overview(&Session::bearer("t")).await;
        assert!(matches!(result, Err(RideError::BackendStatus { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_overview_serializes_camel_case() {
        let mut fixture = BackendFixture::for_user(profile(false));
        fixture.requests = vec![booking("q1", "pending", "r1", "scheduled")];

        let overview = service(Arc::new(InMemoryRidesBackend::new(fixture)))
            .overview(&Session::bearer("t"))
            .await
            .unwrap();
        let value = serde_json::to_value(&overview).unwrap();

        assert_eq!(value["userId"], "u1");
        assert_eq!(value["mode"]["mode"], "user");
        assert_eq!(value["passenger"]["pendingRequests"][0]["uiState"], "awaiting_driver");
        assert_eq!(value["passenger"]["pendingRequests"][0]["id"], "q1");
    }
}
