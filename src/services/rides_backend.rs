// src/services/rides_backend.rs
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing;

use crate::{
    errors::{RideError as AppError, RideResult},
    models::{
        booking::{BookingRecord, PendingBookingRequests, UserBookings},
        identity::Identified,
        ride::RideRecord,
        user::UserProfile,
    },
};

/// Caller credentials forwarded to the backend.
#[derive(Clone)]
pub struct Session {
    token: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("token", &"<redacted>").finish()
    }
}

impl Session {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    /// Parse an `Authorization: Bearer <token>` header value.
    pub fn from_authorization(header: &str) -> RideResult<Self> {
        let token = header
            .trim()
            .strip_prefix("Bearer ")
            .or_else(|| header.trim().strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::TokenMissing)?;
        Ok(Self::bearer(token))
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Read endpoints of the rides backend that feed classification.
#[async_trait]
pub trait RidesBackend: Send + Sync {
    async fn current_user(&self, session: &Session) -> RideResult<UserProfile>;
    async fn driver_current_ride(&self, session: &Session) -> RideResult<Option<RideRecord>>;
    async fn driver_offered_rides(&self, session: &Session) -> RideResult<Vec<RideRecord>>;
    async fn driver_ride_history(&self, session: &Session) -> RideResult<Vec<RideRecord>>;
    async fn user_bookings(&self, session: &Session) -> RideResult<UserBookings>;
    async fn pending_booking_requests(&self, session: &Session) -> RideResult<PendingBookingRequests>;
}

#[derive(Debug, Clone)]
pub struct BackendRoutes {
    pub current_user: String,
    pub driver_current_ride: String,
    pub driver_offered_rides: String,
    pub driver_ride_history: String,
    pub user_bookings: String,
    pub pending_booking_requests: String,
}

impl Default for BackendRoutes {
    fn default() -> Self {
        Self {
            current_user: "/auth/me".to_string(),
            driver_current_ride: "/rides/driver/current".to_string(),
            driver_offered_rides: "/rides/my-rides".to_string(),
            driver_ride_history: "/rides/history".to_string(),
            user_bookings: "/bookings/my-bookings".to_string(),
            pending_booking_requests: "/bookings/requests/pending".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub routes: BackendRoutes,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            timeout: Duration::from_secs(10),
            routes: BackendRoutes::default(),
        }
    }
}

pub struct HttpRidesBackend {
    config: BackendConfig,
    client: reqwest::Client,
}

impl HttpRidesBackend {
    pub fn new(config: BackendConfig) -> RideResult<Self> {
        reqwest::Url::parse(&config.base_url)
            .map_err(|e| AppError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::ConfigurationError(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), route)
    }

    async fn get_json(&self, session: &Session, route: &str) -> RideResult<Option<Value>> {
        let url = self.url(route);
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(session.token())
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => return Err(AppError::TokenExpired),
            StatusCode::FORBIDDEN => {
                return Err(AppError::unauthorized(format!("backend refused {}", route)));
            }
            StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                tracing::error!("Backend request {} failed: {} {}", route, status, error_text);
                return Err(AppError::backend_status(status.as_u16(), error_text));
            }
            _ => {}
        }

        Ok(Some(response.json::<Value>().await?))
    }
}

#[async_trait]
impl RidesBackend for HttpRidesBackend {
    async fn current_user(&self, session: &Session) -> RideResult<UserProfile> {
        let value = self
            .get_json(session, &self.config.routes.current_user)
            .await?
            .ok_or_else(|| AppError::unauthorized("no account for session"))?;
        parse_one(unwrap_envelope(value, &["user"]))
    }

    async fn driver_current_ride(&self, session: &Session) -> RideResult<Option<RideRecord>> {
        let value = self
            .get_json(session, &self.config.routes.driver_current_ride)
            .await?;
        parse_current_ride(value.unwrap_or(Value::Null))
    }

    async fn driver_offered_rides(&self, session: &Session) -> RideResult<Vec<RideRecord>> {
        let value = self
            .get_json(session, &self.config.routes.driver_offered_rides)
            .await?;
        parse_list(unwrap_envelope(value.unwrap_or(Value::Null), &["rides"]))
    }

    async fn driver_ride_history(&self, session: &Session) -> RideResult<Vec<RideRecord>> {
        let value = self
            .get_json(session, &self.config.routes.driver_ride_history)
            .await?;
        parse_list(unwrap_envelope(value.unwrap_or(Value::Null), &["rides", "history"]))
    }

    async fn user_bookings(&self, session: &Session) -> RideResult<UserBookings> {
        let value = unwrap_envelope(
            self.get_json(session, &self.config.routes.user_bookings)
                .await?
                .unwrap_or(Value::Null),
            &[],
        );
        match value {
            Value::Array(_) | Value::Null => Ok(UserBookings {
                as_passenger: parse_list(value)?,
            }),
            other => parse_one(other),
        }
    }

    async fn pending_booking_requests(&self, session: &Session) -> RideResult<PendingBookingRequests> {
        let value = unwrap_envelope(
            self.get_json(session, &self.config.routes.pending_booking_requests)
                .await?
                .unwrap_or(Value::Null),
            &[],
        );
        match value {
            Value::Array(_) | Value::Null => Ok(PendingBookingRequests {
                booking_requests: parse_list(value)?,
            }),
            other => parse_one(other),
        }
    }
}

/// Strip a `{"data": ...}` wrapper, then the first of `keys` present.
fn unwrap_envelope(value: Value, keys: &[&str]) -> Value {
    let value = match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };

    match value {
        Value::Object(mut map) => {
            for key in keys {
                if let Some(inner) = map.remove(*key) {
                    return inner;
                }
            }
            Value::Object(map)
        }
        other => other,
    }
}

fn parse_one<T: DeserializeOwned>(value: Value) -> RideResult<T> {
    Ok(serde_json::from_value(value)?)
}

fn parse_list<T: DeserializeOwned>(value: Value) -> RideResult<Vec<T>> {
    match value {
        Value::Null => Ok(Vec::new()),
        other => parse_one(other),
    }
}

fn parse_current_ride(value: Value) -> RideResult<Option<RideRecord>> {
    let value = unwrap_envelope(value, &["ride", "currentRide"]);
    if value.is_null() {
        return Ok(None);
    }

    let ride: RideRecord = parse_one(value)?;
    // `{"message": "no active ride"}` and friends carry neither id nor status.
    if ride.identity().is_none() && ride.raw_status().is_none() {
        return Ok(None);
    }
    Ok(Some(ride))
}

/// Backend endpoints, used to inject failures into [`InMemoryRidesBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    CurrentUser,
    DriverCurrentRide,
    DriverOfferedRides,
    DriverRideHistory,
    UserBookings,
    PendingBookingRequests,
}

#[derive(Debug, Clone)]
pub struct BackendFixture {
    pub profile: UserProfile,
    pub current_ride: Option<RideRecord>,
    pub offered_rides: Vec<RideRecord>,
    pub ride_history: Vec<RideRecord>,
    pub bookings: Vec<BookingRecord>,
    pub requests: Vec<BookingRecord>,
}

impl BackendFixture {
    pub fn for_user(profile: UserProfile) -> Self {
        Self {
            profile,
            current_ride: None,
            offered_rides: Vec::new(),
            ride_history: Vec::new(),
            bookings: Vec::new(),
            requests: Vec::new(),
        }
    }
}

/// Backend served from memory, for development and tests.
pub struct InMemoryRidesBackend {
    fixture: RwLock<BackendFixture>,
    failing: RwLock<HashSet<Endpoint>>,
    user_fetches: AtomicUsize,
}

impl InMemoryRidesBackend {
    pub fn new(fixture: BackendFixture) -> Self {
        Self {
            fixture: RwLock::new(fixture),
            failing: RwLock::new(HashSet::new()),
            user_fetches: AtomicUsize::new(0),
        }
    }

    pub async fn update<F>(&self, change: F)
    where
        F: FnOnce(&mut BackendFixture),
    {
        let mut fixture = self.fixture.write().await;
        change(&mut fixture);
    }

    pub async fn fail(&self, endpoint: Endpoint) {
        self.failing.write().await.insert(endpoint);
    }

    pub async fn recover(&self, endpoint: Endpoint) {
        self.failing.write().await.remove(&endpoint);
    }

    /// Number of `current_user` calls, i.e. refresh rounds.
    pub fn refresh_count(&self) -> usize {
        self.user_fetches.load(Ordering::SeqCst)
    }

    async fn read<T>(&self, endpoint: Endpoint, pick: impl FnOnce(&BackendFixture) -> T) -> RideResult<T> {
        if self.failing.read().await.contains(&endpoint) {
            tracing::info!("[MOCK] Failing {:?}", endpoint);
            return Err(AppError::backend_status(503, format!("{:?} unavailable", endpoint)));
        }
        Ok(pick(&*self.fixture.read().await))
    }
}

#[async_trait]
impl RidesBackend for InMemoryRidesBackend {
    async fn current_user(&self, _session: &Session) -> RideResult<UserProfile> {
        self.user_fetches.fetch_add(1, Ordering::SeqCst);
        self.read(Endpoint::CurrentUser, |f| f.profile.clone()).await
    }

    async fn driver_current_ride(&self, _session: &Session) -> RideResult<Option<RideRecord>> {
        self.read(Endpoint::DriverCurrentRide, |f| f.current_ride.clone()).await
    }

    async fn driver_offered_rides(&self, _session: &Session) -> RideResult<Vec<RideRecord>> {
        self.read(Endpoint::DriverOfferedRides, |f| f.offered_rides.clone()).await
    }

    async fn driver_ride_history(&self, _session: &Session) -> RideResult<Vec<RideRecord>> {
        self.read(Endpoint::DriverRideHistory, |f| f.ride_history.clone()).await
    }

    async fn user_bookings(&self, _session: &Session) -> RideResult<UserBookings> {
        self.read(Endpoint::UserBookings, |f| UserBookings {
            as_passenger: f.bookings.clone(),
        })
        .await
    }

    async fn pending_booking_requests(&self, _session: &Session) -> RideResult<PendingBookingRequests> {
        self.read(Endpoint::PendingBookingRequests, |f| PendingBookingRequests {
            booking_requests: f.requests.clone(),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::HeaderMap, routing::get};
    use serde_json::json;

    #[test]
    fn test_session_from_authorization() {
        assert_eq!(Session::from_authorization("Bearer abc").unwrap().token(), "abc");
        assert_eq!(Session::from_authorization("  bearer  xyz ").unwrap().token(), "xyz");
        assert!(matches!(Session::from_authorization("Basic abc"), Err(AppError::TokenMissing)));
        assert!(matches!(Session::from_authorization("Bearer   "), Err(AppError::TokenMissing)));
        assert!(!format!("{:?}", Session::bearer("secret")).contains("secret"));
    }

    #[test]
    fn test_unwrap_envelope() {
        assert_eq!(unwrap_envelope(json!({"data": {"rides": [1]}}), &["rides"]), json!([1]));
        assert_eq!(unwrap_envelope(json!({"rides": []}), &["rides"]), json!([]));
        assert_eq!(unwrap_envelope(json!([1, 2]), &["rides"]), json!([1, 2]));
        assert_eq!(unwrap_envelope(json!({"x": 1}), &["rides"]), json!({"x": 1}));
    }

    #[test]
    fn test_parse_current_ride_variants() {
        assert_eq!(parse_current_ride(Value::Null).unwrap(), None);
        assert_eq!(parse_current_ride(json!({"ride": null})).unwrap(), None);
        assert_eq!(parse_current_ride(json!({"message": "No active ride"})).unwrap(), None);

        let ride = parse_current_ride(json!({"success": true, "ride": {"_id": "r1", "rideStatus": "ONGOING"}}))
            .unwrap()
            .unwrap();
        assert_eq!(ride.raw_status(), Some("ONGOING"));
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let config = BackendConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(HttpRidesBackend::new(config), Err(AppError::InvalidUrl(_))));
    }

    fn require_token(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "Bearer t0k")
    }

    async fn spawn_fake_backend() -> String {
        let app = Router::new()
            .route(
                "/api/auth/me",
                get(|headers: HeaderMap| async move {
                    if require_token(&headers) {
                        Ok(Json(json!({"user": {"_id": "u1", "isDriver": true}})))
                    } else {
                        Err(axum::http::StatusCode::UNAUTHORIZED)
                    }
                }),
            )
            .route(
                "/api/rides/driver/current",
                get(|| async { axum::http::StatusCode::NOT_FOUND }),
            )
            .route(
                "/api/rides/my-rides",
                get(|| async { Json(json!({"data": {"rides": [{"id": 1, "status": "scheduled"}]}})) }),
            )
            .route(
                "/api/rides/history",
                get(|| async { Json(json!([{"id": 2, "rideStatus": "completed"}])) }),
            )
            .route(
                "/api/bookings/my-bookings",
                get(|| async { Json(json!({"asPassenger": [{"id": "b1", "status": "confirmed"}]})) }),
            )
            .route(
                "/api/bookings/requests/pending",
                get(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "db down") }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/api", addr)
    }

    #[tokio::test]
    async fn test_http_backend_against_fake_server() {
        let base_url = spawn_fake_backend().await;
        let backend = HttpRidesBackend::new(BackendConfig {
            base_url,
            ..Default::default()
        })
        .unwrap();
        let session = Session::bearer("t0k");

        let profile = backend.current_user(&session).await.unwrap();
        assert!(profile.is_driver());

        assert!(matches!(
            backend.current_user(&Session::bearer("wrong")).await,
            Err(AppError::TokenExpired)
        ));

        assert_eq!(backend.driver_current_ride(&session).await.unwrap(), None);
        assert_eq!(backend.driver_offered_rides(&session).await.unwrap().len(), 1);
        assert_eq!(backend.driver_ride_history(&session).await.unwrap().len(), 1);
        assert_eq!(backend.user_bookings(&session).await.unwrap().as_passenger.len(), 1);
        assert!(matches!(
            backend.pending_booking_requests(&session).await,
            Err(AppError::BackendStatus { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_in_memory_backend_failures() {
        let profile: UserProfile = serde_json::from_value(json!({"id": "u1"})).unwrap();
        let backend = InMemoryRidesBackend::new(BackendFixture::for_user(profile));
        let session = Session::bearer("t");

        backend.fail(Endpoint::DriverOfferedRides).await;
        assert!(backend.driver_offered_rides(&session).await.is_err());

        backend.recover(Endpoint::DriverOfferedRides).await;
        backend
            .update(|f| f.offered_rides.push(RideRecord::with_id("r1")))
            .await;
        assert_eq!(backend.driver_offered_rides(&session).await.unwrap().len(), 1);

        backend.current_user(&session).await.unwrap();
        assert_eq!(backend.refresh_count(), 1);
    }
}
