//! Delivery-status state machine for mapped messages.
//!
//! Transport status codes are numeric and may replay or arrive out of order;
//! transitions apply only when strictly increasing, so replays and
//! reorderings degrade to no-ops instead of regressions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `DeliveryStatus` values.
pub enum DeliveryStatus {
    Pending,
    Sending,
    Delivered,
    Read,
}

impl DeliveryStatus {
    /// Numeric transport status code.
    pub fn code(self) -> u8 {
        match self {
            Self::Pending => 1,
            Self::Sending => 2,
            Self::Delivered => 3,
            Self::Read => 4,
        }
    }

    /// Decodes a transport status code; unknown codes yield `None` and are
    /// logged and ignored by callers.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Pending),
            2 => Some(Self::Sending),
            3 => Some(Self::Delivered),
            4 => Some(Self::Read),
            _ => None,
        }
    }

    /// Label pushed to the helpdesk status endpoint.
    pub fn helpdesk_label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sending => "sending",
            Self::Delivered => "delivered",
            Self::Read => "read",
        }
    }

    /// Strictly-greater transition rule.
    pub fn can_advance_to(self, next: DeliveryStatus) -> bool {
        next.code() > self.code()
    }
}

#[cfg(test)]
mod tests {
    use super::DeliveryStatus;

    #[test]
    fn unit_codes_round_trip_and_unknown_codes_are_rejected() {
        for status in [
            DeliveryStatus::Pending,
            DeliveryStatus::Sending,
            DeliveryStatus::Delivered,
            DeliveryStatus::Read,
        ] {
            assert_eq!(DeliveryStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(DeliveryStatus::from_code(0), None);
        assert_eq!(DeliveryStatus::from_code(5), None);
    }

    #[test]
    fn unit_transitions_are_strictly_increasing() {
        assert!(DeliveryStatus::Pending.can_advance_to(DeliveryStatus::Read));
        assert!(DeliveryStatus::Delivered.can_advance_to(DeliveryStatus::Read));
        assert!(!DeliveryStatus::Read.can_advance_to(DeliveryStatus::Read));
        assert!(!DeliveryStatus::Delivered.can_advance_to(DeliveryStatus::Sending));
    }

    #[test]
    fn unit_helpdesk_labels_are_lowercase() {
        assert_eq!(DeliveryStatus::Sending.helpdesk_label(), "sending");
        assert_eq!(DeliveryStatus::Read.helpdesk_label(), "read");
    }
}
