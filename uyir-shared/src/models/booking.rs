use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::fleet::VehicleClass;
use super::geo::GeoPoint;

/// Booking status in the trip lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Requested,
    Accepted,
    Enroute,
    AtPickup,
    ToHospital,
    Completed,
    Canceled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 7] = [
        BookingStatus::Requested,
        BookingStatus::Accepted,
        BookingStatus::Enroute,
        BookingStatus::AtPickup,
        BookingStatus::ToHospital,
        BookingStatus::Completed,
        BookingStatus::Canceled,
    ];

    /// Statuses counted as a trip in progress on the dashboard.
    pub const ACTIVE_TRIP: [BookingStatus; 3] = [
        BookingStatus::Enroute,
        BookingStatus::AtPickup,
        BookingStatus::ToHospital,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Requested => "REQUESTED",
            BookingStatus::Accepted => "ACCEPTED",
            BookingStatus::Enroute => "ENROUTE",
            BookingStatus::AtPickup => "AT_PICKUP",
            BookingStatus::ToHospital => "TO_HOSPITAL",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Canceled => "CANCELED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Canceled)
    }

    /// The single forward successor, `None` for terminal states.
    pub fn next(&self) -> Option<BookingStatus> {
        match self {
            BookingStatus::Requested => Some(BookingStatus::Accepted),
            BookingStatus::Accepted => Some(BookingStatus::Enroute),
            BookingStatus::Enroute => Some(BookingStatus::AtPickup),
            BookingStatus::AtPickup => Some(BookingStatus::ToHospital),
            BookingStatus::ToHospital => Some(BookingStatus::Completed),
            BookingStatus::Completed | BookingStatus::Canceled => None,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized booking status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for BookingStatus {
    type Err = ParseStatusError;

    /// Case-insensitive; driver clients send the lowercase forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// A single transport request from pickup to hospital
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub code: String,
    pub pickup: GeoPoint,
    pub destination: GeoPoint,
    pub hospital_id: Option<Uuid>,
    pub vehicle_class: VehicleClass,
    pub status: BookingStatus,
    pub vehicle_id: Option<Uuid>,
    pub distance_m: i64,
    pub duration_s: i64,
    pub eta_mins: i64,
    pub fare: i64,
    pub route_polyline: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!("accepted".parse::<BookingStatus>().unwrap(), BookingStatus::Accepted);
        assert_eq!("AT_PICKUP".parse::<BookingStatus>().unwrap(), BookingStatus::AtPickup);
        assert_eq!(" to_hospital ".parse::<BookingStatus>().unwrap(), BookingStatus::ToHospital);
        assert!("teleported".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&BookingStatus::ToHospital).unwrap();
        assert_eq!(json, "\"TO_HOSPITAL\"");
        for status in BookingStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json.trim_matches('"'), status.as_str());
        }
    }

    #[test]
    fn test_forward_chain_ends_in_completed() {
        let mut status = BookingStatus::Requested;
        let mut steps = 0;
        while let Some(next) = status.next() {
            status = next;
            steps += 1;
        }
        assert_eq!(status, BookingStatus::Completed);
        assert_eq!(steps, 5);
        assert!(BookingStatus::Canceled.next().is_none());
    }
}
