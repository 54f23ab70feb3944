use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::booking::BookingStatus;
use super::geo::GeoPoint;

/// Events fanned out to the subscribers of one booking
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackingEvent {
    LocationUpdate {
        booking_id: Uuid,
        location: GeoPoint,
        eta_mins: Option<i64>,
        /// Direction of travel since the previous ping, degrees from north
        #[serde(default, skip_serializing_if = "Option::is_none")]
        heading_deg: Option<f64>,
        ts: DateTime<Utc>,
    },
    StatusChanged {
        booking_id: Uuid,
        status: BookingStatus,
        ts: DateTime<Utc>,
    },
}

impl TrackingEvent {
    pub fn booking_id(&self) -> Uuid {
        match self {
            TrackingEvent::LocationUpdate { booking_id, .. } => *booking_id,
            TrackingEvent::StatusChanged { booking_id, .. } => *booking_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tagging() {
        let event = TrackingEvent::StatusChanged {
            booking_id: Uuid::nil(),
            status: BookingStatus::Enroute,
            ts: Utc::now(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "status_changed");
        assert_eq!(value["status"], "ENROUTE");
    }

    #[test]
    fn test_location_update_omits_unknown_heading() {
        let event = TrackingEvent::LocationUpdate {
            booking_id: Uuid::nil(),
            location: GeoPoint::new(13.05, 80.25),
            eta_mins: Some(4),
            heading_deg: None,
            ts: Utc::now(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "location_update");
        assert_eq!(value["eta_mins"], 4);
        assert!(value.get("heading_deg").is_none());
    }
}
