//! Debt ledger: interest, repayments and emergency loans.

use crate::entities::Player;
use crate::error::GameError;
use crate::types::Credits;

/// Add one turn of interest to outstanding debt. Returns the interest charged.
pub fn accrue_interest(player: &mut Player, rate: f64) -> Credits {
    if player.debt <= 0 {
        return 0;
    }
    let interest = (player.debt as f64 * rate).round() as Credits;
    player.debt += interest;

    #[cfg(feature = "instrument")]
    tracing::info!(target: "debt", action = "interest", amount = interest, debt = player.debt);

    interest
}

/// Pay down debt. Requests above the outstanding debt are clamped to it.
/// Returns the amount actually repaid.
pub fn repay(player: &mut Player, amount: Credits) -> Result<Credits, GameError> {
    if amount <= 0 {
        return Err(GameError::InvalidAmount { amount });
    }
    let amount = amount.min(player.debt.max(0));
    if amount > player.credits {
        return Err(GameError::InsufficientCredits {
            needed: amount,
            available: player.credits,
        });
    }

    player.credits -= amount;
    player.debt -= amount;

    #[cfg(feature = "instrument")]
    tracing::info!(target: "debt", action = "repay", amount = amount, debt = player.debt);

    Ok(amount)
}

/// Hand the player a loan: credits and debt both grow by `amount`.
pub fn issue_loan(player: &mut Player, amount: Credits) {
    player.credits += amount;
    player.debt += amount;

    #[cfg(feature = "instrument")]
    tracing::info!(target: "debt", action = "loan", amount = amount, debt = player.debt);
}
