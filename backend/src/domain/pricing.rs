//! Contract and monthly billing arithmetic. Everything here is pure; the
//! services load rooms and readings and persist the results.

use chrono::{Datelike, NaiveDate};
use shared::{BillItem, ElectricityReading, EnergyUsage, MonthlyCharges, Room};

use crate::domain::calendar::{days_in_month, first_day_of_month, format_month, last_day_of_month};

/// Amounts fixed when a contract is signed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepositBreakdown {
    pub price: f64,
    pub bail: f64,
    pub deposit: f64,
    pub after_check_in_cost: f64,
    pub total: f64,
}

pub fn deposit_breakdown(room: &Room) -> DepositBreakdown {
    let price = room.price;
    let bail = if room.deposit_price != 0.0 { room.deposit_price } else { price };
    DepositBreakdown {
        price,
        bail,
        deposit: price / 2.0,
        after_check_in_cost: price * 0.5 + bail,
        total: price + bail,
    }
}

/// Part of the month containing `month_of` covered by the contract, if any
pub fn billing_period(
    month_of: NaiveDate,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Option<(NaiveDate, NaiveDate)> {
    let start = first_day_of_month(month_of).max(check_in);
    let end = last_day_of_month(month_of).min(check_out);
    (start <= end).then_some((start, end))
}

/// Consumption between consecutive cumulative meter readings
pub fn electricity_usage(readings: &[ElectricityReading]) -> EnergyUsage {
    let mut usage = EnergyUsage::default();
    for pair in readings.windows(2) {
        usage.labels.push(pair[1].reading_date.format("%d/%m").to_string());
        usage.data.push((pair[1].value - pair[0].value).max(0.0));
    }
    usage
}

/// Charges for `[start, end]`, which must lie within a single month. Rent
/// covers the whole month except in the check-in month, which is counted
/// from check-in to month end.
pub fn monthly_charges(
    room: &Room,
    check_in: NaiveDate,
    start: NaiveDate,
    end: NaiveDate,
    energy: EnergyUsage,
) -> MonthlyCharges {
    let month_days = f64::from(days_in_month(start.year(), start.month()));
    let number_day_stay = days_stayed(check_in, start);
    let electric_number: f64 = energy.data.iter().sum();
    let person = room.person as f64;

    MonthlyCharges {
        start_date: start,
        end_date: end,
        number_day_stay,
        electric_number,
        electric_price: electric_number * room.electricity_price,
        water_price: room.water_price * person,
        service_price: room.garbage_price,
        vehicle_price: room.vehicle_price * room.vehicle as f64,
        room_price: room.price / month_days * number_day_stay as f64,
        wifi_price: room.wifi_price * person,
        energy,
    }
}

fn days_stayed(check_in: NaiveDate, start: NaiveDate) -> i64 {
    if (check_in.year(), check_in.month()) == (start.year(), start.month()) {
        (last_day_of_month(check_in) - check_in).num_days() + 1
    } else {
        i64::from(days_in_month(start.year(), start.month()))
    }
}

pub fn monthly_description(start: NaiveDate) -> String {
    format!("Tiền phòng tháng {}", format_month(start))
}

/// Line items printed on a monthly bill, in display order
pub fn monthly_bill_items(room: &Room, charges: &MonthlyCharges) -> Vec<BillItem> {
    let person = room.person as f64;
    vec![
        item("Chi Phí Điện", charges.electric_number, room.electricity_price, charges.electric_price),
        item("Chi Dịch Vụ", 1.0, room.garbage_price, charges.service_price),
        item("Chi Phí Nước", person, room.water_price, charges.water_price),
        item("Chi Phí Xe", room.vehicle as f64, room.vehicle_price, charges.vehicle_price),
        item("Chi Phí Wifi", person, room.wifi_price, charges.wifi_price),
        item("Chi Phí Khác", 0.0, 0.0, 0.0),
        // Unit price is the full monthly rent; the total carries the proration
        item("Chi Phí Phòng", charges.number_day_stay as f64, room.price, charges.room_price),
    ]
}

/// Rent owed for the rest of the check-in month, billed when an admin marks
/// a rented room as "roomed payment"
pub fn check_in_month_rent(price: f64, check_in: NaiveDate) -> f64 {
    let month_days = days_in_month(check_in.year(), check_in.month());
    let remaining = month_days - check_in.day();
    (price / f64::from(month_days) * f64::from(remaining)).floor()
}

fn item(expense: &str, quantity: f64, unit_price: f64, total: f64) -> BillItem {
    BillItem {
        expense: expense.to_string(),
        quantity,
        unit_price,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::RoomStatus;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn room(price: f64, deposit_price: f64) -> Room {
        Room {
            id: "r1".to_string(),
            floor_id: "f1".to_string(),
            key: "B1-F1-R1".to_string(),
            name: "101".to_string(),
            status: RoomStatus::Available,
            price,
            deposit_price,
            electricity_price: 3_500.0,
            water_price: 100_000.0,
            vehicle_price: 150_000.0,
            wifi_price: 50_000.0,
            garbage_price: 30_000.0,
            acreage: 20.0,
            minimum_months: 3,
            person: 2,
            vehicle: 1,
            utilities: vec![],
            description: String::new(),
            room_password: None,
            electric_meter_id: None,
            link_video: None,
            available_date: None,
            unavailable_date: None,
            electric_number: 0.0,
            water_number: 0.0,
            is_completed: true,
            rented_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_bail_falls_back_to_price() {
        let breakdown = deposit_breakdown(&room(3_000_000.0, 0.0));
        assert_eq!(breakdown.bail, 3_000_000.0);
        assert_eq!(breakdown.deposit, 1_500_000.0);
        assert_eq!(breakdown.after_check_in_cost, 4_500_000.0);
        assert_eq!(breakdown.total, 6_000_000.0);

        let breakdown = deposit_breakdown(&room(3_000_000.0, 2_000_000.0));
        assert_eq!(breakdown.bail, 2_000_000.0);
        assert_eq!(breakdown.after_check_in_cost, 3_500_000.0);
        assert_eq!(breakdown.total, 5_000_000.0);
    }

    #[test]
    fn test_billing_period_clips_to_contract() {
        let check_in = date(2024, 1, 20);
        let check_out = date(2024, 7, 19);
        assert_eq!(billing_period(date(2024, 1, 1), check_in, check_out), Some((date(2024, 1, 20), date(2024, 1, 31))));
        assert_eq!(billing_period(date(2024, 2, 15), check_in, check_out), Some((date(2024, 2, 1), date(2024, 2, 29))));
        assert_eq!(billing_period(date(2024, 7, 1), check_in, check_out), Some((date(2024, 7, 1), date(2024, 7, 19))));
        assert_eq!(billing_period(date(2024, 8, 1), check_in, check_out), None);
    }

    #[test]
    fn test_first_month_is_prorated() {
        let room = room(3_100_000.0, 0.0);
        let charges = monthly_charges(&room, date(2024, 1, 20), date(2024, 1, 20), date(2024, 1, 31), EnergyUsage::default());
        assert_eq!(charges.number_day_stay, 12);
        assert_eq!(charges.room_price, 1_200_000.0);
        assert_eq!(charges.water_price, 200_000.0);
        assert_eq!(charges.wifi_price, 100_000.0);
        assert_eq!(charges.vehicle_price, 150_000.0);
        assert_eq!(charges.service_price, 30_000.0);
        assert_eq!(charges.total(), 1_680_000.0);
    }

    #[test]
    fn test_check_out_month_is_not_prorated() {
        let room = room(2_900_000.0, 0.0);
        let charges = monthly_charges(&room, date(2023, 11, 15), date(2024, 2, 1), date(2024, 2, 9), EnergyUsage::default());
        assert_eq!(charges.start_date, date(2024, 2, 1));
        assert_eq!(charges.end_date, date(2024, 2, 9));
        assert_eq!(charges.number_day_stay, 29);
        assert_eq!(charges.room_price, 2_900_000.0);
    }

    #[test]
    fn test_check_in_month_rent_is_not_rounded() {
        let room = room(3_000_000.0, 0.0);
        let charges = monthly_charges(&room, date(2024, 3, 10), date(2024, 3, 10), date(2024, 3, 31), EnergyUsage::default());
        assert_eq!(charges.number_day_stay, 22);
        assert_eq!(charges.room_price, 3_000_000.0 / 31.0 * 22.0);
        assert!(charges.room_price.fract() > 0.0);
    }

    #[test]
    fn test_electricity_from_readings() {
        let reading = |d: u32, value: f64| ElectricityReading {
            id: format!("e{}", d),
            room_id: "r1".to_string(),
            reading_date: date(2024, 2, d),
            value,
        };
        let usage = electricity_usage(&[reading(1, 100.0), reading(10, 140.0), reading(29, 190.0)]);
        assert_eq!(usage.data, vec![40.0, 50.0]);
        assert_eq!(usage.labels, vec!["10/02".to_string(), "29/02".to_string()]);

        let charges = monthly_charges(&room(2_900_000.0, 0.0), date(2023, 11, 15), date(2024, 2, 1), date(2024, 2, 29), usage);
        assert_eq!(charges.electric_number, 90.0);
        assert_eq!(charges.electric_price, 315_000.0);
        assert_eq!(charges.room_price, 2_900_000.0);
    }

    #[test]
    fn test_bill_items_order_and_totals() {
        let room = room(3_000_000.0, 0.0);
        let charges = monthly_charges(&room, date(2024, 3, 10), date(2024, 4, 1), date(2024, 4, 30), EnergyUsage::default());
        let items = monthly_bill_items(&room, &charges);
        let names: Vec<&str> = items.iter().map(|i| i.expense.as_str()).collect();
        assert_eq!(
            names,
            vec!["Chi Phí Điện", "Chi Dịch Vụ", "Chi Phí Nước", "Chi Phí Xe", "Chi Phí Wifi", "Chi Phí Khác", "Chi Phí Phòng"]
        );
        let sum: f64 = items.iter().map(|i| i.total).sum();
        assert_eq!(sum, charges.total());
        let rent = &items[6];
        assert_eq!(rent.quantity, 30.0);
        assert_eq!(rent.unit_price, 3_000_000.0);
        assert_eq!(rent.total, 3_000_000.0);
        assert_eq!(monthly_description(date(2024, 4, 1)), "Tiền phòng tháng 04/2024");
    }

    #[test]
    fn test_check_in_month_rent_rounds_down() {
        // 31-day month, checked in on the 10th: 21 days remain
        assert_eq!(check_in_month_rent(3_000_000.0, date(2024, 3, 10)), 2_032_258.0);
    }
}
