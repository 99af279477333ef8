//! Admin override of a room's status.
//!
//! Each (current status, requested target) pair maps to the status stored on
//! the room and the effect on the room's contract. Pairs not listed simply
//! relabel the room.

use shared::RoomStatus;
use std::str::FromStr;

/// Status an admin can put a room into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTarget {
    Available,
    Deposited,
    Rented,
    /// The current monthly bill was paid in cash
    MonthlyPayment,
    /// The tenant moved in; bill the rest of the check-in month
    RoomedPayment,
}

impl FromStr for StatusTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "available" => Ok(StatusTarget::Available),
            "deposited" => Ok(StatusTarget::Deposited),
            "rented" => Ok(StatusTarget::Rented),
            "monthlyPayment" => Ok(StatusTarget::MonthlyPayment),
            "roomedPayment" => Ok(StatusTarget::RoomedPayment),
            other => Err(format!("Trạng thái phòng không hợp lệ: {}", other)),
        }
    }
}

/// What happens to the room's latest contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEffect {
    None,
    /// Deposit confirmed: contract complete, waiting for activation, current order paid in cash
    ConfirmDeposit,
    /// Deposit withdrawn: contract back to waiting for the deposit payment
    RevertDeposit,
    /// Contract complete, active and paid up, with the room password
    ConfirmRental,
    /// Current monthly order paid in cash
    SettleMonthly,
    /// Current order paid, new order for the remaining check-in month rent
    BillCheckInMonth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub room_status: RoomStatus,
    pub job_effect: JobEffect,
}

/// Resolve an override. `Err` carries the message shown to the admin.
pub fn transition(current: RoomStatus, target: StatusTarget) -> Result<Transition, &'static str> {
    use JobEffect as E;
    use RoomStatus as R;
    use StatusTarget as T;

    let (room_status, job_effect) = match (current, target) {
        (R::Available, T::Deposited) => (R::Deposited, E::ConfirmDeposit),
        (R::Deposited, T::Deposited) => (R::Deposited, E::RevertDeposit),
        (R::Available, T::Rented) => (R::Rented, E::ConfirmRental),
        (_, T::MonthlyPayment) => (R::Rented, E::SettleMonthly),
        (R::Rented, T::RoomedPayment) => (R::Rented, E::BillCheckInMonth),
        (_, T::RoomedPayment) => return Err("Phòng chưa được thuê"),
        (_, T::Available) => (R::Available, E::None),
        (_, T::Deposited) => (R::Deposited, E::None),
        (_, T::Rented) => (R::Rented, E::None),
    };
    Ok(Transition { room_status, job_effect })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_target_is_rejected() {
        assert!("monthlyPayment".parse::<StatusTarget>().is_ok());
        assert!("soonExpireContract".parse::<StatusTarget>().is_err());
        assert!("".parse::<StatusTarget>().is_err());
    }

    #[test]
    fn test_deposit_transitions() {
        let t = transition(RoomStatus::Available, StatusTarget::Deposited).unwrap();
        assert_eq!(t, Transition { room_status: RoomStatus::Deposited, job_effect: JobEffect::ConfirmDeposit });

        let t = transition(RoomStatus::Deposited, StatusTarget::Deposited).unwrap();
        assert_eq!(t.job_effect, JobEffect::RevertDeposit);

        let t = transition(RoomStatus::Rented, StatusTarget::Deposited).unwrap();
        assert_eq!(t.job_effect, JobEffect::None);
    }

    #[test]
    fn test_payment_targets_store_rented() {
        let t = transition(RoomStatus::Deposited, StatusTarget::MonthlyPayment).unwrap();
        assert_eq!(t.room_status, RoomStatus::Rented);
        assert_eq!(t.job_effect, JobEffect::SettleMonthly);

        let t = transition(RoomStatus::Rented, StatusTarget::RoomedPayment).unwrap();
        assert_eq!(t.room_status, RoomStatus::Rented);
        assert_eq!(t.job_effect, JobEffect::BillCheckInMonth);

        assert!(transition(RoomStatus::Available, StatusTarget::RoomedPayment).is_err());
    }

    #[test]
    fn test_available_releases_room_without_touching_contract() {
        let t = transition(RoomStatus::Rented, StatusTarget::Available).unwrap();
        assert_eq!(t, Transition { room_status: RoomStatus::Available, job_effect: JobEffect::None });
    }
}
