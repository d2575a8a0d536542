// src/services/snapshot_cache.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing;

use crate::errors::RideResult;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub default_ttl_seconds: u64,
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_seconds: 300, // 5 minutes
            enabled: true,
        }
    }
}

/// Backend feeds kept as last-known-good snapshots.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Feed {
    DriverCurrentRide,
    DriverOfferedRides,
    DriverRideHistory,
    PassengerBookings,
    PassengerRequests,
}

impl Feed {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feed::DriverCurrentRide => "driver_current_ride",
            Feed::DriverOfferedRides => "driver_offered_rides",
            Feed::DriverRideHistory => "driver_ride_history",
            Feed::PassengerBookings => "passenger_bookings",
            Feed::PassengerRequests => "passenger_requests",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn snapshot(user_id: &str, feed: Feed) -> Self {
        Self(format!("snapshot:{}:{}", user_id, feed.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// In-memory JSON snapshots with per-entry expiry.
pub struct SnapshotCache {
    store: RwLock<HashMap<String, (String, Option<DateTime<Utc>>)>>,
    config: CacheConfig,
}

impl SnapshotCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
            config,
        }
    }

    fn is_expired(expires_at: Option<DateTime<Utc>>) -> bool {
        match expires_at {
            Some(expiry) => Utc::now() > expiry,
            None => false,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> RideResult<Option<T>> {
        if !self.config.enabled {
            return Ok(None);
        }

        let store = self.store.read().await;
        match store.get(key.as_str()) {
            Some((_, expiry)) if Self::is_expired(*expiry) => {
                tracing::debug!("Snapshot {} expired", key.as_str());
                Ok(None)
            }
            Some((json, _)) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    /// Store `value`; `ttl_seconds == Some(0)` keeps it forever.
    pub async fn set<T: Serialize>(&self, key: &CacheKey, value: &T, ttl_seconds: Option<u64>) -> RideResult<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let json = serde_json::to_string(value)?;
        let ttl = ttl_seconds.unwrap_or(self.config.default_ttl_seconds);
        let expires_at = (ttl > 0).then(|| Utc::now() + Duration::seconds(ttl as i64));

        self.store
            .write()
            .await
            .insert(key.as_str().to_string(), (json, expires_at));
        Ok(())
    }

    /// Remove expired entries, returning how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let mut store = self.store.write().await;
        let before = store.len();
        store.retain(|_, (_, expiry)| !Self::is_expired(*expiry));
        before - store.len()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ride::RideRecord;

    #[tokio::test]
    async fn test_set_and_get_snapshot() {
        let cache = SnapshotCache::default();
        let key = CacheKey::snapshot("u1", Feed::DriverOfferedRides);
        let rides = vec![RideRecord::with_id("r1").with_status("scheduled")];

        cache.set(&key, &rides, None).await.unwrap();
        let cached: Option<Vec<RideRecord>> = cache.get(&key).await.unwrap();
        assert_eq!(cached, Some(rides));

        let other = CacheKey::snapshot("u2", Feed::DriverOfferedRides);
        let missing: Option<Vec<RideRecord>> = cache.get(&other).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_expired_snapshot_is_ignored() {
        let cache = SnapshotCache::default();
        let key = CacheKey::snapshot("u1", Feed::PassengerBookings);

        {
            let mut store = cache.store.write().await;
            store.insert(
                key.as_str().to_string(),
                ("[]".to_string(), Some(Utc::now() - Duration::seconds(1))),
            );
        }

        let cached: Option<Vec<RideRecord>> = cache.get(&key).await.unwrap();
        assert!(cached.is_none());
        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_zero_ttl_never_expires() {
        let cache = SnapshotCache::default();
        let key = CacheKey::snapshot("u1", Feed::DriverCurrentRide);
        cache.set(&key, &Option::<RideRecord>::None, Some(0)).await.unwrap();

        assert_eq!(cache.purge_expired().await, 0);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_disabled_cache_stores_nothing() {
        let cache = SnapshotCache::new(CacheConfig {
            enabled: false,
            ..Default::default()
        });
        let key = CacheKey::snapshot("u1", Feed::DriverOfferedRides);
        cache.set(&key, &vec![RideRecord::with_id("r1")], None).await.unwrap();

        let cached: Option<Vec<RideRecord>> = cache.get(&key).await.unwrap();
        assert!(cached.is_none());
    }
}
