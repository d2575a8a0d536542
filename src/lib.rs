pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

// Re-export commonly used types
pub use errors::{RideError, RideResult};
pub use services::driver_rides::{DriverRideBuckets, classify_driver_rides};
pub use services::mode_resolver::{Mode, ModeResolution, resolve_mode};
pub use services::passenger_bookings::{
    BookingUiState, PassengerBookingBuckets, booking_ui_state, classify_passenger_bookings,
};
pub use utils::status_vocabulary::StatusVocabulary;
