use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Order lifecycle status
///
/// ```text
/// Submitting ──► Accepted ──► PartialFilled ──► Filled
///     │              │              │
///     └──────────────┴──────────────┴──► Canceled | Rejected | Expired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Order intent created locally, not yet acknowledged by the broker
    Submitting,
    /// Broker acknowledged the order
    Accepted,
    /// Some but not all of the requested volume has traded
    PartialFilled,
    /// Requested volume fully traded
    Filled,
    /// Canceled on request
    Canceled,
    /// Vetoed by the risk gate or refused by the broker
    Rejected,
    /// Expired at session end
    Expired,
}

impl OrderStatus {
    /// Returns true if the order is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Canceled
                | OrderStatus::Rejected
                | OrderStatus::Expired
        )
    }

    /// Returns true if the order is still working at the broker
    pub fn is_active(&self) -> bool {
        matches!(self, OrderStatus::Accepted | OrderStatus::PartialFilled)
    }

    /// Whether `next` is a legal successor of this status.
    ///
    /// Repeated partial fills are legal (`PartialFilled -> PartialFilled`),
    /// any other self-transition is not.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (Submitting, Accepted) => true,
            (Accepted | PartialFilled, PartialFilled | Filled) => true,
            (_, Canceled | Rejected | Expired) => true,
            _ => false,
        }
    }
}

/// Illegal order state change
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderTransitionError {
    #[error("Order {order_id}: illegal transition {from:?} -> {to:?}")]
    IllegalTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Order {order_id}: fill of {fill} exceeds remaining volume {remaining}")]
    Overfill {
        order_id: String,
        fill: u32,
        remaining: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_accept_nothing() {
        for terminal in [
            OrderStatus::Filled,
            OrderStatus::Canceled,
            OrderStatus::Rejected,
            OrderStatus::Expired,
        ] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(OrderStatus::Accepted));
            assert!(!terminal.can_transition_to(OrderStatus::Canceled));
        }
    }

    #[test]
    fn test_happy_path() {
        assert!(OrderStatus::Submitting.can_transition_to(OrderStatus::Accepted));
        assert!(OrderStatus::Accepted.can_transition_to(OrderStatus::PartialFilled));
        assert!(OrderStatus::PartialFilled.can_transition_to(OrderStatus::PartialFilled));
        assert!(OrderStatus::PartialFilled.can_transition_to(OrderStatus::Filled));
    }

    #[test]
    fn test_fill_requires_acknowledgment() {
        assert!(!OrderStatus::Submitting.can_transition_to(OrderStatus::Filled));
        assert!(!OrderStatus::Accepted.can_transition_to(OrderStatus::Accepted));
    }

    #[test]
    fn test_reject_from_any_live_state() {
        assert!(OrderStatus::Submitting.can_transition_to(OrderStatus::Rejected));
        assert!(OrderStatus::Accepted.can_transition_to(OrderStatus::Rejected));
        assert!(OrderStatus::PartialFilled.can_transition_to(OrderStatus::Canceled));
    }
}
