//! Intake session — tracks which field the user is expected to send next.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The next expected input within an intake session.
///
/// Progresses linearly: AwaitingName → AwaitingMobile → AwaitingAddress.
/// There is no terminal state: finalizing the address step destroys the
/// session and the address becomes eligible for a brand-new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    AwaitingName,
    AwaitingMobile,
    AwaitingAddress,
}

impl Step {
    /// Get the next step in the linear progression, if any.
    pub fn next(&self) -> Option<Step> {
        match self {
            Step::AwaitingName => Some(Step::AwaitingMobile),
            Step::AwaitingMobile => Some(Step::AwaitingAddress),
            Step::AwaitingAddress => None,
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Step::AwaitingName => "awaiting_name",
            Step::AwaitingMobile => "awaiting_mobile",
            Step::AwaitingAddress => "awaiting_address",
        };
        write!(f, "{s}")
    }
}

/// One user's in-progress intake.
///
/// Exists iff the user is mid-intake; at most one per address. Fields are
/// populated incrementally; only those for steps already passed are set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Sender address (unique key in the session store).
    pub address: String,
    pub step: Step,
    /// Pickup date carried on the booking button, when one was selected.
    pub pickup_date: Option<String>,
    pub name: Option<String>,
    pub mobile: Option<String>,
    /// Bumped on every accepted input; consulted by the idle sweep.
    pub last_activity: DateTime<Utc>,
}

impl Session {
    /// Create a fresh session at the name step.
    pub fn new(address: impl Into<String>, pickup_date: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            address: address.into(),
            step: Step::AwaitingName,
            pickup_date,
            name: None,
            mobile: None,
            last_activity: now,
        }
    }
}
