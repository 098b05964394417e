//! Order record — the finalized, immutable intake result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Initial status of every appended record. Mutated out-of-band later,
/// never by this service.
pub const STATUS_PENDING: &str = "Pending";

/// A finalized intake, appended to the record store exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,
    /// Pickup date (ISO `YYYY-MM-DD`): the date carried on the booking
    /// button, or the booking day when none was selected.
    pub pickup_date: String,
    pub name: String,
    pub mobile: String,
    pub address: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl OrderRecord {
    pub fn new(
        order_id: impl Into<String>,
        pickup_date: impl Into<String>,
        name: impl Into<String>,
        mobile: impl Into<String>,
        address: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            pickup_date: pickup_date.into(),
            name: name.into(),
            mobile: mobile.into(),
            address: address.into(),
            status: STATUS_PENDING.to_string(),
            created_at,
        }
    }

    /// The ordered field tuple matching the destination table schema.
    pub fn as_row(&self) -> [String; 7] {
        [
            self.order_id.clone(),
            self.pickup_date.clone(),
            self.name.clone(),
            self.mobile.clone(),
            self.address.clone(),
            self.status.clone(),
            self.created_at.to_rfc3339(),
        ]
    }
}
