use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Offer status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Sent,
    Accepted,
    Rejected,
    Expired,
}

impl OfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Sent => "sent",
            OfferStatus::Accepted => "accepted",
            OfferStatus::Rejected => "rejected",
            OfferStatus::Expired => "expired",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "sent" => Some(OfferStatus::Sent),
            "accepted" => Some(OfferStatus::Accepted),
            "rejected" => Some(OfferStatus::Rejected),
            "expired" => Some(OfferStatus::Expired),
            _ => None,
        }
    }
}

/// A booking proposed to one candidate ambulance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Offer {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub vehicle_id: Uuid,
    pub status: OfferStatus,
    /// Vehicle distance from pickup when the offer was issued
    pub distance_km: f64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Offer {
    /// Create a new `sent` offer valid for `ttl` from `now`
    pub fn new(booking_id: Uuid, vehicle_id: Uuid, distance_km: f64, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            vehicle_id,
            status: OfferStatus::Sent,
            distance_km,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Check if the validity window has passed
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Still awaiting a driver response and inside its window
    pub fn is_pending_at(&self, now: DateTime<Utc>) -> bool {
        self.status == OfferStatus::Sent && !self.is_expired_at(now)
    }
}
