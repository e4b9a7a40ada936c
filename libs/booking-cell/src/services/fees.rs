//! Fee totals: mode base fee plus optional service fee. Pure functions so
//! the wizard's displayed total and the persisted total can never drift.

use directory_cell::models::{ConsultationMode, FeeSchedule, Service};

use crate::models::BookingError;

/// Round to two decimal places, half-up. Input is a non-negative amount.
pub fn round_half_up(amount: f64) -> f64 {
    (amount * 100.0 + 0.5).floor() / 100.0
}

pub fn compute_fee(
    mode: ConsultationMode,
    fee_schedule: &FeeSchedule,
    service: Option<&Service>,
) -> Result<f64, BookingError> {
    let base = fee_schedule
        .base_fee(mode)
        .ok_or(BookingError::InvalidMode(mode))?;
    let total = base + service.map(|s| s.fee).unwrap_or(0.0);
    Ok(round_half_up(total.max(0.0)))
}
