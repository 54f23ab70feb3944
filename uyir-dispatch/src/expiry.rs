use chrono::{DateTime, Duration, Utc};
use uyir_shared::Offer;

/// How offers are issued: validity window, fan-out, class matching
#[derive(Debug, Clone)]
pub struct OfferPolicy {
    pub ttl: Duration,
    pub candidates: usize,
    /// Only offer vehicles of the booked class
    pub match_class: bool,
}

impl OfferPolicy {
    pub const DEFAULT_TTL_SECONDS: i64 = 15;
    pub const DEFAULT_CANDIDATES: usize = 5;

    pub fn new(ttl_seconds: u64, candidates: usize) -> Self {
        Self {
            ttl: Duration::seconds(ttl_seconds.min(86_400) as i64),
            candidates,
            match_class: false,
        }
    }

    pub fn with_class_matching(mut self, match_class: bool) -> Self {
        self.match_class = match_class;
        self
    }
}

impl Default for OfferPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::seconds(Self::DEFAULT_TTL_SECONDS),
            candidates: Self::DEFAULT_CANDIDATES,
            match_class: false,
        }
    }
}

/// Offers still awaiting a response at `now`
pub fn pending_at(offers: Vec<Offer>, now: DateTime<Utc>) -> Vec<Offer> {
    offers.into_iter().filter(|o| o.is_pending_at(now)).collect()
}

/// `sent` offers whose window has closed at `now`
pub fn lapsed_at(offers: &[Offer], now: DateTime<Utc>) -> Vec<&Offer> {
    offers
        .iter()
        .filter(|o| o.status == uyir_shared::OfferStatus::Sent && o.is_expired_at(now))
        .collect()
}
