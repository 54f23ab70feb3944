//! Offer issue and first-accept-wins resolution.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use uyir_booking::BookingError;
use uyir_core::RecordStore;
use uyir_shared::{Booking, BookingStatus, Offer, OfferStatus, VehicleStatus};

use crate::error::{DispatchError, DispatchResult};
use crate::expiry::{lapsed_at, pending_at, OfferPolicy};
use crate::locks::BookingLocks;
use crate::selector::select_candidates;

/// Outcome of a winning accept
#[derive(Debug, Clone, Serialize)]
pub struct AcceptedOffer {
    pub offer: Offer,
    pub booking: Booking,
}

#[derive(Clone)]
pub struct OfferArbitrator {
    store: Arc<dyn RecordStore>,
    locks: BookingLocks,
    policy: OfferPolicy,
}

impl OfferArbitrator {
    pub fn new(store: Arc<dyn RecordStore>, policy: OfferPolicy) -> Self {
        Self {
            store,
            locks: BookingLocks::new(),
            policy,
        }
    }

    /// Offer the booking to the nearest dispatchable vehicles.
    /// No candidates is not an error; the booking just waits with no offers.
    pub async fn issue_offers(&self, booking: &Booking) -> DispatchResult<Vec<Offer>> {
        let vehicles = self.store.list_vehicles().await?;
        let class = self.policy.match_class.then_some(booking.vehicle_class);
        let candidates = select_candidates(vehicles, booking.pickup, self.policy.candidates, class);

        let now = Utc::now();
        let offers: Vec<Offer> = candidates
            .iter()
            .map(|c| Offer::new(booking.id, c.vehicle.id, c.distance_km, now, self.policy.ttl))
            .collect();

        if offers.is_empty() {
            warn!(booking_id = %booking.id, "No dispatchable ambulance for booking");
            return Ok(offers);
        }

        self.store.insert_offers(&offers).await?;
        info!(booking_id = %booking.id, offers = offers.len(), "Offers issued");
        Ok(offers)
    }

    /// Resolve a driver's accept. At most one accept per booking succeeds.
    ///
    /// Steps run under the booking's lock. Every write is a compare-and-set,
    /// so a second process sharing the store still cannot produce two winners.
    /// Accepting an offer that already won returns the same result again.
    pub async fn accept(&self, offer_id: Uuid) -> DispatchResult<AcceptedOffer> {
        let booking_id = self.find_offer(offer_id).await?.booking_id;
        let _guard = self.locks.acquire(booking_id).await;

        // 1. Re-read under the lock
        let offer = self.find_offer(offer_id).await?;
        if offer.status == OfferStatus::Accepted {
            return self.previous_win(offer).await;
        }
        let siblings = self.store.list_offers_for_booking(booking_id).await?;

        // 2. Someone else already won
        if siblings
            .iter()
            .any(|o| o.id != offer.id && o.status == OfferStatus::Accepted)
        {
            self.withdraw(&offer).await?;
            warn!(%offer_id, %booking_id, "Accept lost, booking already taken");
            return Err(DispatchError::AlreadyTaken(booking_id));
        }

        // 3. Caller's own offer must still be open
        let now = Utc::now();
        if offer.status != OfferStatus::Sent || offer.is_expired_at(now) {
            self.withdraw(&offer).await?;
            return Err(DispatchError::OfferExpired(offer_id));
        }

        // 4. Claim the vehicle, the offer, then the booking
        let claimed = self
            .store
            .transition_vehicle(offer.vehicle_id, VehicleStatus::Idle, VehicleStatus::OnTrip)
            .await?;
        if !claimed {
            self.withdraw(&offer).await?;
            warn!(%offer_id, vehicle_id = %offer.vehicle_id, "Vehicle no longer idle");
            return Err(DispatchError::VehicleUnavailable(offer.vehicle_id));
        }

        let offer_won = self
            .store
            .transition_offer(offer.id, OfferStatus::Sent, OfferStatus::Accepted)
            .await?;
        if !offer_won {
            self.release_vehicle(offer.vehicle_id).await?;
            warn!(%offer_id, "Offer closed before it could be accepted");
            return Err(DispatchError::OfferExpired(offer_id));
        }

        let booking = match self
            .store
            .transition_booking(
                booking_id,
                BookingStatus::Requested,
                BookingStatus::Accepted,
                Some(offer.vehicle_id),
                now,
            )
            .await?
        {
            Some(booking) => booking,
            None => {
                self.store
                    .transition_offer(offer.id, OfferStatus::Accepted, OfferStatus::Expired)
                    .await?;
                self.release_vehicle(offer.vehicle_id).await?;
                return Err(self.lost_booking(booking_id).await?);
            }
        };

        // 5. Close the rest
        let expired = self.store.expire_sibling_offers(booking_id, offer.id).await?;

        info!(
            %booking_id,
            %offer_id,
            vehicle_id = %offer.vehicle_id,
            expired,
            "Offer accepted"
        );

        let offer = Offer {
            status: OfferStatus::Accepted,
            ..offer
        };
        Ok(AcceptedOffer { offer, booking })
    }

    /// Decline an offer. Offers that are already resolved are returned as-is.
    pub async fn reject(&self, offer_id: Uuid) -> DispatchResult<Offer> {
        let booking_id = self.find_offer(offer_id).await?.booking_id;
        let _guard = self.locks.acquire(booking_id).await;

        let offer = self.find_offer(offer_id).await?;
        if offer.status != OfferStatus::Sent {
            return Ok(offer);
        }

        if self
            .store
            .transition_offer(offer.id, OfferStatus::Sent, OfferStatus::Rejected)
            .await?
        {
            info!(%offer_id, %booking_id, "Offer rejected");
        }
        self.find_offer(offer_id).await
    }

    /// Offers a driver may still act on at `now`
    pub async fn list_pending(&self, now: DateTime<Utc>) -> DispatchResult<Vec<Offer>> {
        let sent = self.store.list_offers_by_status(OfferStatus::Sent).await?;
        Ok(pending_at(sent, now))
    }

    pub async fn offers_for_booking(&self, booking_id: Uuid) -> DispatchResult<Vec<Offer>> {
        Ok(self.store.list_offers_for_booking(booking_id).await?)
    }

    /// Mark every `sent` offer past its window as `expired`.
    pub async fn expire_lapsed(&self, now: DateTime<Utc>) -> DispatchResult<usize> {
        let sent = self.store.list_offers_by_status(OfferStatus::Sent).await?;
        let mut expired = 0;
        for offer in lapsed_at(&sent, now) {
            let _guard = self.locks.acquire(offer.booking_id).await;
            if self
                .store
                .transition_offer(offer.id, OfferStatus::Sent, OfferStatus::Expired)
                .await?
            {
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn find_offer(&self, offer_id: Uuid) -> DispatchResult<Offer> {
        self.store
            .get_offer(offer_id)
            .await?
            .ok_or(DispatchError::OfferNotFound(offer_id))
    }

    async fn withdraw(&self, offer: &Offer) -> DispatchResult<()> {
        if offer.status == OfferStatus::Sent {
            self.store
                .transition_offer(offer.id, OfferStatus::Sent, OfferStatus::Expired)
                .await?;
        }
        Ok(())
    }

    async fn release_vehicle(&self, vehicle_id: Uuid) -> DispatchResult<()> {
        self.store
            .transition_vehicle(vehicle_id, VehicleStatus::OnTrip, VehicleStatus::Idle)
            .await?;
        Ok(())
    }

    /// An offer that already won stays won while its booking holds the vehicle.
    async fn previous_win(&self, offer: Offer) -> DispatchResult<AcceptedOffer> {
        let booking = self
            .store
            .get_booking(offer.booking_id)
            .await?
            .ok_or(DispatchError::Booking(BookingError::NotFound(offer.booking_id)))?;
        if booking.vehicle_id != Some(offer.vehicle_id) {
            return Err(DispatchError::OfferExpired(offer.id));
        }
        if booking.status.is_terminal() {
            return Err(DispatchError::BookingTerminal {
                id: booking.id,
                status: booking.status,
            });
        }
        Ok(AcceptedOffer { offer, booking })
    }

    /// Why the booking compare-and-set failed
    async fn lost_booking(&self, booking_id: Uuid) -> DispatchResult<DispatchError> {
        let current = self.store.get_booking(booking_id).await?;
        Ok(match current {
            None => DispatchError::Booking(BookingError::NotFound(booking_id)),
            Some(b) if b.status.is_terminal() => DispatchError::BookingTerminal {
                id: booking_id,
                status: b.status,
            },
            Some(_) => DispatchError::AlreadyTaken(booking_id),
        })
    }
}
