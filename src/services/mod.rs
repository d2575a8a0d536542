// src/services/mod.rs
pub mod driver_rides;
pub mod mode_resolver;
pub mod my_rides_service;
pub mod passenger_bookings;
pub mod ride_poller;
pub mod rides_backend;
pub mod snapshot_cache;
