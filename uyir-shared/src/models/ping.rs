use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::geo::GeoPoint;

/// A driver location report scoped to a booking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ping {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub location: GeoPoint,
    pub eta_mins: Option<i64>,
    pub recorded_at: DateTime<Utc>,
}

impl Ping {
    pub fn new(booking_id: Uuid, location: GeoPoint, eta_mins: Option<i64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            location,
            eta_mins,
            recorded_at: Utc::now(),
        }
    }
}
