//! Client holds on event seats and service time slots

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::errors::DomainError;
use crate::domain::farm_event::FarmEvent;
use crate::domain::identifiers::{EventId, ReservationId, ServiceId, UserId};
use crate::domain::service_listing::ServiceListing;
use crate::domain::types::{Money, Quantity};

/// Half-open interval `[starts_at, ends_at)` occupied by a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl TimeSlot {
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.starts_at < other.ends_at && other.starts_at < self.ends_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReservationTarget {
    Event { event_id: EventId, seats: Quantity },
    Service { service_id: ServiceId, slot: TimeSlot },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    #[display("confirmed")]
    Confirmed,
    #[display("cancelled")]
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown reservation status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub client_id: UserId,
    pub vendor_id: UserId,
    pub target: ReservationTarget,
    pub total: Money,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Reserve seats on an event
    ///
    /// The event's seat count is updated in place; the caller persists both.
    pub fn for_event(
        client_id: UserId,
        event: &mut FarmEvent,
        seats: Quantity,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let total = event
            .price_per_seat
            .times(seats.into_inner())
            .ok_or(DomainError::AmountOverflow)?;
        event.reserve_seats(seats, now)?;

        Ok(Self {
            id: ReservationId::generate(),
            client_id,
            vendor_id: event.vendor_id,
            target: ReservationTarget::Event {
                event_id: event.id,
                seats,
            },
            total,
            status: ReservationStatus::Confirmed,
            created_at: now,
            updated_at: now,
        })
    }

    /// Book a service slot, given the confirmed slots already taken for it
    pub fn for_service<'a>(
        client_id: UserId,
        service: &ServiceListing,
        starts_at: DateTime<Utc>,
        booked: impl IntoIterator<Item = &'a TimeSlot>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if starts_at <= now {
            return Err(DomainError::StartsInPast);
        }

        let slot = service.slot_for(starts_at)?;
        if booked.into_iter().any(|taken| taken.overlaps(&slot)) {
            return Err(DomainError::SlotUnavailable);
        }

        Ok(Self {
            id: ReservationId::generate(),
            client_id,
            vendor_id: service.vendor_id,
            target: ReservationTarget::Service {
                service_id: service.id,
                slot,
            },
            total: service.price,
            status: ReservationStatus::Confirmed,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_participant(&self, user_id: &UserId) -> bool {
        &self.client_id == user_id || &self.vendor_id == user_id
    }

    pub fn can_be_cancelled_by(&self, user_id: &UserId) -> bool {
        self.is_participant(user_id)
    }

    pub fn cancel(&mut self) -> Result<(), DomainError> {
        match self.status {
            ReservationStatus::Confirmed => {
                self.status = ReservationStatus::Cancelled;
                self.updated_at = Utc::now();
                Ok(())
            }
            ReservationStatus::Cancelled => Err(DomainError::invalid_transition(
                "reservation",
                self.status,
                ReservationStatus::Cancelled,
            )),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == ReservationStatus::Confirmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::farm_event::test_support::draft as event_draft;
    use crate::domain::service_listing::ServiceDraft;
    use crate::domain::types::{Description, DurationMinutes, Location, Title};
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn service() -> ServiceListing {
        ServiceListing::new(
            UserId::generate(),
            ServiceDraft {
                name: Title::try_new("Cheese workshop".to_string()).unwrap(),
                description: Description::default(),
                price: Money::try_new(Decimal::new(4000, 2)).unwrap(),
                duration_minutes: DurationMinutes::try_new(60).unwrap(),
                location: Location::try_new("Dairy".to_string()).unwrap(),
            },
        )
    }

    #[test]
    fn test_slots_overlap_only_when_intervals_intersect() {
        let start = Utc::now();
        let a = TimeSlot {
            starts_at: start,
            ends_at: start + Duration::minutes(60),
        };
        let touching = TimeSlot {
            starts_at: start + Duration::minutes(60),
            ends_at: start + Duration::minutes(120),
        };
        let inside = TimeSlot {
            starts_at: start + Duration::minutes(15),
            ends_at: start + Duration::minutes(30),
        };

        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&inside));
        assert!(inside.overlaps(&a));
    }

    #[test]
    fn test_event_reservation_totals_and_takes_seats() {
        let mut event =
            FarmEvent::new(UserId::generate(), event_draft(10, Duration::days(2))).unwrap();
        let client = UserId::generate();
        let reservation =
            Reservation::for_event(client, &mut event, Quantity::try_new(3).unwrap(), Utc::now())
                .unwrap();

        assert_eq!(event.seats_reserved, 3);
        assert_eq!(reservation.total.into_inner(), Decimal::new(3000, 2));
        assert_eq!(reservation.vendor_id, event.vendor_id);
        assert!(reservation.is_participant(&client));
    }

    #[test]
    fn test_overlapping_service_booking_is_rejected() {
        let service = service();
        let now = Utc::now();
        let start = now + Duration::days(1);
        let existing = service.slot_for(start + Duration::minutes(30)).unwrap();

        let result =
            Reservation::for_service(UserId::generate(), &service, start, [&existing], now);
        assert_eq!(result, Err(DomainError::SlotUnavailable));

        let later = Reservation::for_service(
            UserId::generate(),
            &service,
            start + Duration::minutes(90),
            [&existing],
            now,
        );
        assert!(later.is_ok());
    }

    #[test]
    fn test_past_service_booking_is_rejected() {
        let service = service();
        let now = Utc::now();
        let result = Reservation::for_service(
            UserId::generate(),
            &service,
            now - Duration::hours(1),
            std::iter::empty::<&TimeSlot>(),
            now,
        );
        assert_eq!(result, Err(DomainError::StartsInPast));
    }

    #[test]
    fn test_reservation_cancels_once() {
        let service = service();
        let now = Utc::now();
        let mut reservation =
            Reservation::for_service(
            UserId::generate(),
            &service,
            now + Duration::days(1),
            std::iter::empty::<&TimeSlot>(),
            now,
        )
        .unwrap();

        reservation.cancel().unwrap();
        assert!(!reservation.is_confirmed());
        assert!(reservation.cancel().is_err());
    }
}
