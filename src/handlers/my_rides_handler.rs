// src/handlers/my_rides_handler.rs
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header::AUTHORIZATION},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;

use crate::{
    errors::{RideError as AppError, RideResult},
    services::{
        driver_rides::DriverRideBuckets,
        mode_resolver::ModeResolution,
        my_rides_service::{MyRidesOverview, PassengerOverview, TabCounts},
        rides_backend::Session,
    },
    state::AppState,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollHint {
    pub should_poll: bool,
    pub interval_secs: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResponse {
    #[serde(flatten)]
    pub overview: MyRidesOverview,
    pub tab_counts: TabCounts,
    pub poll: PollHint,
}

fn session(headers: &HeaderMap) -> RideResult<Session> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AppError::TokenMissing)?
        .to_str()
        .map_err(|_| AppError::bad_request("authorization header is not valid text"))?;
    Session::from_authorization(header)
}

async fn load_overview(state: &AppState, headers: &HeaderMap) -> RideResult<MyRidesOverview> {
    let session = session(headers)?;
    state.my_rides_service.overview(&session).await
}

pub async fn get_overview(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> RideResult<Json<OverviewResponse>> {
    let overview = load_overview(&state, &headers).await?;

    Ok(Json(OverviewResponse {
        tab_counts: overview.tab_counts(),
        poll: PollHint {
            should_poll: overview.should_poll(),
            interval_secs: state.ride_poller.interval().as_secs(),
        },
        overview,
    }))
}

pub async fn get_mode(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> RideResult<Json<ModeResolution>> {
    Ok(Json(load_overview(&state, &headers).await?.mode))
}

pub async fn get_driver_rides(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> RideResult<Json<DriverRideBuckets>> {
    Ok(Json(load_overview(&state, &headers).await?.driver))
}

pub async fn get_passenger_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> RideResult<Json<PassengerOverview>> {
    Ok(Json(load_overview(&state, &headers).await?.passenger))
}

/// Server-sent overview updates, one `overview` event per refresh.
///
/// Backed by a [`RidePoller`](crate::services::ride_poller::RidePoller) per
/// connection: the stream ends when polling goes idle, and a client
/// disconnect drops the handle, which cancels polling.
pub async fn stream_overview(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> RideResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let session = session(&headers)?;
    let handle = state.ride_poller.start(session);
    let updates = handle.subscribe();
    tracing::info!("Streaming ride overview every {:?}", state.ride_poller.interval());

    let events = stream::unfold((handle, updates), |(handle, mut updates)| async move {
        // Err once the poller has stopped and its last value was delivered.
        updates.changed().await.ok()?;
        let overview = { updates.borrow_and_update().clone() }?;
        let event = match Event::default().event("overview").json_data(&overview) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Failed to encode overview event: {}", e);
                return None;
            }
        };
        Some((Ok(event), (handle, updates)))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
