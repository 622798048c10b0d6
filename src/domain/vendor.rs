use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::identifiers::UserId;
use crate::domain::types::{Description, Location, Title};

/// Public storefront details for a vendor's farm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorProfile {
    pub vendor_id: UserId,
    pub farm_name: Title,
    pub description: Description,
    pub location: Location,
    pub updated_at: DateTime<Utc>,
}

impl VendorProfile {
    pub fn new(
        vendor_id: UserId,
        farm_name: Title,
        description: Description,
        location: Location,
    ) -> Self {
        Self {
            vendor_id,
            farm_name,
            description,
            location,
            updated_at: Utc::now(),
        }
    }
}
