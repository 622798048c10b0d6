//! Bookable, time-based services offered by vendors (farm tours, workshops)

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::identifiers::{ServiceId, UserId};
use crate::domain::reservation::TimeSlot;
use crate::domain::types::{Description, DurationMinutes, Location, Money, Title};

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDraft {
    pub name: Title,
    pub description: Description,
    pub price: Money,
    pub duration_minutes: DurationMinutes,
    pub location: Location,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServicePatch {
    pub name: Option<Title>,
    pub description: Option<Description>,
    pub price: Option<Money>,
    pub duration_minutes: Option<DurationMinutes>,
    pub location: Option<Location>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceListing {
    pub id: ServiceId,
    pub vendor_id: UserId,
    pub name: Title,
    pub description: Description,
    pub price: Money,
    pub duration_minutes: DurationMinutes,
    pub location: Location,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceListing {
    pub fn new(vendor_id: UserId, draft: ServiceDraft) -> Self {
        let now = Utc::now();
        Self {
            id: ServiceId::generate(),
            vendor_id,
            name: draft.name,
            description: draft.description,
            price: draft.price,
            duration_minutes: draft.duration_minutes,
            location: draft.location,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.vendor_id == user_id
    }

    /// The time slot a booking starting at `starts_at` would occupy
    ///
    /// Fails with `InvalidSchedule` when the slot would end past the last
    /// representable instant.
    pub fn slot_for(&self, starts_at: DateTime<Utc>) -> Result<TimeSlot, DomainError> {
        let minutes = i64::from(self.duration_minutes.into_inner());
        let ends_at = starts_at
            .checked_add_signed(Duration::minutes(minutes))
            .ok_or(DomainError::InvalidSchedule)?;
        Ok(TimeSlot { starts_at, ends_at })
    }

    pub fn apply_update(&mut self, patch: ServicePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(duration_minutes) = patch.duration_minutes {
            self.duration_minutes = duration_minutes;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        self.updated_at = Utc::now();
    }
}
