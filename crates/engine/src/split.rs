//! Split allocator: divides an expense amount evenly across participants.
//!
//! Shares are whole cents, rounded half-up. Even division can lose or gain
//! cents against the total, so the leftover is spread one cent at a time
//! over the leading participants; the returned shares always sum exactly to
//! the total and are never negative.

use crate::{EngineError, MoneyCents, ResultEngine};

/// Computes the per-participant owed amounts for an even split of `total`.
///
/// Returns one `(user_id, share)` pair per participant, in input order.
/// The leading participants absorb the rounding remainder one cent each, so
/// any two shares differ by at most one cent.
///
/// Errors with [`EngineError::InvalidSplit`] when `participants` is empty
/// and [`EngineError::InvalidAmount`] when `total` is not strictly positive.
pub fn allocate_even(
    total: MoneyCents,
    participants: &[String],
) -> ResultEngine<Vec<(String, MoneyCents)>> {
    if participants.is_empty() {
        return Err(EngineError::InvalidSplit(
            "at least one participant is required".to_string(),
        ));
    }
    if !total.is_positive() {
        return Err(EngineError::InvalidAmount(
            "amount must be > 0".to_string(),
        ));
    }

    let n = participants.len() as i64;
    // Round-half-up of total/n in integer cents: floor((2*total + n) / (2*n)).
    let share = (total.cents() * 2 + n) / (2 * n);
    let remainder = total.cents() - share * n;

    // |remainder| < n, so spreading it one cent per participant never drives
    // a share below zero.
    let adjustment = remainder.signum();
    let adjusted = remainder.unsigned_abs() as usize;

    let shares = participants
        .iter()
        .enumerate()
        .map(|(i, user_id)| {
            let cents = if i < adjusted { share + adjustment } else { share };
            (user_id.clone(), MoneyCents::new(cents))
        })
        .collect();

    Ok(shares)
}
