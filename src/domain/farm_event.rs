//! Dated, capacity-limited gatherings hosted by vendors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::identifiers::{EventId, UserId};
use crate::domain::types::{Capacity, Description, Location, Money, Quantity, Title};

#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub name: Title,
    pub description: Description,
    pub location: Location,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: Capacity,
    pub price_per_seat: Money,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    pub name: Option<Title>,
    pub description: Option<Description>,
    pub location: Option<Location>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub capacity: Option<Capacity>,
    pub price_per_seat: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmEvent {
    pub id: EventId,
    pub vendor_id: UserId,
    pub name: Title,
    pub description: Description,
    pub location: Location,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: Capacity,
    pub seats_reserved: u32,
    pub price_per_seat: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FarmEvent {
    pub fn new(vendor_id: UserId, draft: EventDraft) -> Result<Self, DomainError> {
        if draft.ends_at <= draft.starts_at {
            return Err(DomainError::InvalidSchedule);
        }

        let now = Utc::now();
        Ok(Self {
            id: EventId::generate(),
            vendor_id,
            name: draft.name,
            description: draft.description,
            location: draft.location,
            starts_at: draft.starts_at,
            ends_at: draft.ends_at,
            capacity: draft.capacity,
            seats_reserved: 0,
            price_per_seat: draft.price_per_seat,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.vendor_id == user_id
    }

    pub fn seats_available(&self) -> u32 {
        self.capacity.into_inner().saturating_sub(self.seats_reserved)
    }

    /// Apply a partial update, keeping the schedule and capacity invariants
    ///
    /// Nothing is changed when the result would be invalid.
    pub fn apply_update(&mut self, patch: EventPatch) -> Result<(), DomainError> {
        let starts_at = patch.starts_at.unwrap_or(self.starts_at);
        let ends_at = patch.ends_at.unwrap_or(self.ends_at);
        if ends_at <= starts_at {
            return Err(DomainError::InvalidSchedule);
        }

        let capacity = patch.capacity.unwrap_or(self.capacity);
        if capacity.into_inner() < self.seats_reserved {
            return Err(DomainError::CapacityBelowReserved {
                capacity: capacity.into_inner(),
                reserved: self.seats_reserved,
            });
        }

        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(price) = patch.price_per_seat {
            self.price_per_seat = price;
        }
        self.starts_at = starts_at;
        self.ends_at = ends_at;
        self.capacity = capacity;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn reserve_seats(
        &mut self,
        seats: Quantity,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.starts_at <= now {
            return Err(DomainError::StartsInPast);
        }

        let requested = seats.into_inner();
        let available = self.seats_available();
        if requested > available {
            return Err(DomainError::CapacityExceeded {
                requested,
                available,
            });
        }

        self.seats_reserved += requested;
        self.updated_at = now;
        Ok(())
    }

    pub fn release_seats(&mut self, seats: Quantity) {
        self.seats_reserved = self.seats_reserved.saturating_sub(seats.into_inner());
        self.updated_at = Utc::now();
    }
}
