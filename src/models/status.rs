// src/models/status.rs
use serde::{Deserialize, Serialize};

/// Canonical ride lifecycle states.
///
/// Legacy backend values (`CREATED`, `ONGOING`, `PAYMENT_PENDING`, ...) are
/// folded onto these by the status vocabulary.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Scheduled,      // Published, not started
    InProgress,     // Driver has started the trip
    PaymentPending, // Trip over, backend still collecting payments
    Completed,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,   // Waiting for the driver to accept or reject
    Confirmed,
    Accepted,
    Rejected,
    Cancelled,
    Completed,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Failed,
    Paid,
    Completed,
    Refunded,
}

/// Result of reading a raw status string through the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedStatus<T> {
    /// Field absent, null or blank.
    Missing,
    Known(T),
    /// Present but not in the vocabulary; carries the normalized text.
    Unrecognized(String),
}

impl<T: Copy + PartialEq> ParsedStatus<T> {
    pub fn known(&self) -> Option<T> {
        match self {
            ParsedStatus::Known(status) => Some(*status),
            _ => None,
        }
    }

    pub fn is(&self, status: T) -> bool {
        self.known() == Some(status)
    }

    pub fn is_any(&self, statuses: &[T]) -> bool {
        self.known().is_some_and(|s| statuses.contains(&s))
    }
}

impl BookingStatus {
    /// Confirmed and accepted are used interchangeably by the backend.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Accepted)
    }
}

impl PaymentStatus {
    /// Marks an explicitly outstanding payment.
    pub fn is_outstanding(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Pending | PaymentStatus::Partial | PaymentStatus::Failed
        )
    }

    /// Marks an explicitly settled payment.
    pub fn is_settled(&self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::Completed)
    }
}

/// Canonical form used for vocabulary lookups: trimmed, lowercase, with
/// `-` and spaces folded to `_`. Blank input yields `None`.
pub fn normalize_status(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    Some(
        trimmed
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect(),
    )
}
