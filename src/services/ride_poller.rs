// src/services/ride_poller.rs
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing;

use crate::errors::{RideError as AppError, RideResult};
use crate::services::my_rides_service::{MyRidesOverview, MyRidesService};
use crate::services::rides_backend::Session;

/// Why a polling task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStop {
    /// Nothing in progress and driver features hidden.
    Idle,
    /// Cancelled explicitly, or the handle was dropped.
    Cancelled,
    /// The backend no longer accepts the session.
    Unauthorized,
}

/// Periodic refresh of a session's overview.
#[derive(Clone)]
pub struct RidePoller {
    service: Arc<MyRidesService>,
    interval: Duration,
}

impl RidePoller {
    pub fn new(service: Arc<MyRidesService>, interval: Duration) -> Self {
        Self { service, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start polling right away. The task runs until the overview no longer
    /// needs refreshing, or until the returned handle is cancelled or dropped.
    pub fn start(&self, session: Session) -> PollHandle {
        let (updates_tx, updates_rx) = watch::channel(None);
        let (cancel_tx, cancel_rx) = oneshot::channel();

        let task = tokio::spawn(poll_loop(
            self.service.clone(),
            session,
            self.interval,
            updates_tx,
            cancel_rx,
        ));

        PollHandle {
            updates: updates_rx,
            cancel: Some(cancel_tx),
            task,
        }
    }
}

async fn poll_loop(
    service: Arc<MyRidesService>,
    session: Session,
    interval: Duration,
    updates: watch::Sender<Option<MyRidesOverview>>,
    mut cancel: oneshot::Receiver<()>,
) -> PollStop {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            // Fires on explicit cancel and when the handle is dropped.
            _ = &mut cancel => {
                tracing::info!("Ride polling cancelled");
                return PollStop::Cancelled;
            }
            _ = ticker.tick() => {}
        }

        match service.overview(&session).await {
            Ok(overview) => {
                let keep_polling = overview.should_poll();
                updates.send_replace(Some(overview));
                if !keep_polling {
                    tracing::info!("No ride in progress, polling stopped");
                    return PollStop::Idle;
                }
            }
            Err(e) if e.is_auth_failure() => {
                tracing::warn!("Session rejected while polling: {}", e);
                return PollStop::Unauthorized;
            }
            Err(e) => {
                tracing::warn!("Ride refresh failed, retrying next tick: {}", e);
            }
        }
    }
}

/// Owner side of a running poll. Dropping it stops the task.
pub struct PollHandle {
    updates: watch::Receiver<Option<MyRidesOverview>>,
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<PollStop>,
}

impl PollHandle {
    pub fn subscribe(&self) -> watch::Receiver<Option<MyRidesOverview>> {
        self.updates.clone()
    }

    pub fn latest(&self) -> Option<MyRidesOverview> {
        self.updates.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn cancel(mut self) -> RideResult<PollStop> {
        if let Some(cancel) = self.cancel.take() {
            // Err means the task already ended on its own.
            let _ = cancel.send(());
        }
        self.finished().await
    }

    /// Wait for the task to end on its own.
    pub async fn finished(mut self) -> RideResult<PollStop> {
        (&mut self.task)
            .await
            .map_err(|e| AppError::internal_error(format!("ride poller task failed: {}", e)))
    }
}
