use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{booking_errors::BookingError, enums::booking_statuses::BookingStatus};

/// The single balance mutation a transition performs, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "amount", rename_all = "snake_case")]
pub enum LedgerMove {
    None,
    Debit(i64),
    Credit(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementPlan {
    pub from: BookingStatus,
    pub to: BookingStatus,
    pub ledger: LedgerMove,
}

impl SettlementPlan {
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }

    pub fn balance_after(&self, balance: i64) -> i64 {
        match self.ledger {
            LedgerMove::None => balance,
            LedgerMove::Debit(amount) => balance - amount,
            LedgerMove::Credit(amount) => balance + amount,
        }
    }
}

/// Decides what a status transition must do to the ledger.
///
/// - `x -> x` is a no-op and never touches the ledger.
/// - nothing leaves `cancelled`.
/// - entering `active` debits `total_price` and needs `balance >= total_price`.
/// - leaving `active` credits `total_price` back.
pub fn plan_transition(
    from: BookingStatus,
    to: BookingStatus,
    total_price: i64,
    balance: i64,
) -> Result<SettlementPlan, BookingError> {
    if from == to {
        return Ok(SettlementPlan {
            from,
            to,
            ledger: LedgerMove::None,
        });
    }

    let ledger = match (from, to) {
        (BookingStatus::Cancelled, _) => {
            return Err(BookingError::TransitionNotAllowed { from, to });
        }
        (_, BookingStatus::Active) => {
            if balance < total_price {
                return Err(BookingError::insufficient_funds(balance, total_price));
            }
            LedgerMove::Debit(total_price)
        }
        (BookingStatus::Active, _) => LedgerMove::Credit(total_price),
        _ => LedgerMove::None,
    };

    Ok(SettlementPlan { from, to, ledger })
}

/// Outcome of a committed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionReceipt {
    pub booking_id: Uuid,
    pub place_id: Uuid,
    pub user_id: Uuid,
    pub from: BookingStatus,
    pub to: BookingStatus,
    pub ledger: LedgerMove,
    pub balance_after: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;

    #[test]
    fn same_status_is_a_noop_without_ledger_move() {
        for status in [Pending, Active, Cancelled] {
            let plan = plan_transition(status, status, 20_000, 0).unwrap();
            assert!(plan.is_noop());
            assert_eq!(plan.ledger, LedgerMove::None);
        }
    }

    #[test]
    fn activation_debits_the_price() {
        let plan = plan_transition(Pending, Active, 20_000, 25_000).unwrap();
        assert_eq!(plan.ledger, LedgerMove::Debit(20_000));
        assert_eq!(plan.balance_after(25_000), 5_000);
    }

    #[test]
    fn activation_with_exact_balance_is_allowed() {
        let plan = plan_transition(Pending, Active, 20_000, 20_000).unwrap();
        assert_eq!(plan.balance_after(20_000), 0);
    }

    #[test]
    fn activation_without_funds_reports_the_shortfall() {
        let err = plan_transition(Pending, Active, 20_000, 15_000).unwrap_err();
        assert!(matches!(
            err,
            BookingError::InsufficientFunds {
                balance: 15_000,
                required: 20_000,
                deficit: 5_000
            }
        ));
    }

    #[test]
    fn leaving_active_credits_the_price() {
        let cancel = plan_transition(Active, Cancelled, 20_000, 5_000).unwrap();
        assert_eq!(cancel.ledger, LedgerMove::Credit(20_000));
        assert_eq!(cancel.balance_after(5_000), 25_000);

        let back_to_pending = plan_transition(Active, Pending, 20_000, 5_000).unwrap();
        assert_eq!(back_to_pending.ledger, LedgerMove::Credit(20_000));
    }

    #[test]
    fn cancelling_pending_moves_no_money() {
        let plan = plan_transition(Pending, Cancelled, 20_000, 0).unwrap();
        assert_eq!(plan.ledger, LedgerMove::None);
    }

    #[test]
    fn cancelled_is_terminal() {
        for to in [Pending, Active] {
            let err = plan_transition(Cancelled, to, 20_000, 1_000_000).unwrap_err();
            assert!(matches!(
                err,
                BookingError::TransitionNotAllowed { from: Cancelled, .. }
            ));
        }
    }
}
