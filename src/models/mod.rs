// src/models/mod.rs
pub mod booking;
pub mod identity;
pub mod ride;
pub mod status;
pub mod user;

pub use booking::*;
pub use identity::{Identified, RecordId};
pub use ride::*;
pub use status::*;
pub use user::*;
