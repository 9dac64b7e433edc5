//! Budget reconciliation
//!
//! Payments plus non-bidder contributions rarely add up to the target. The
//! difference is split equally (per participant or per head) and the cents
//! that do not divide evenly go to the first allocation winner.
use super::{Amount, ClearingError, Participant, Position};
use serde::{Deserialize, Serialize};

/// What a participant without bids is charged before adjustment
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "rule", content = "amount")]
pub enum NonBidderContribution {
    #[default]
    HalfOfLowestPayment,
    /// Half of the lowest second price over all assigned positions
    HalfOfCheapestPosition,
    Fixed(Amount),
}

impl NonBidderContribution {
    pub fn amount(self, payments: &[Amount], second_prices: &[Amount]) -> Amount {
        match self {
            NonBidderContribution::HalfOfLowestPayment => {
                payments.iter().min().copied().unwrap_or(0) / 2
            }
            NonBidderContribution::HalfOfCheapestPosition => {
                second_prices.iter().min().copied().unwrap_or(0) / 2
            }
            NonBidderContribution::Fixed(amount) => amount,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentSplit {
    #[default]
    PerParticipant,
    PerHead,
}

impl AdjustmentSplit {
    pub fn weight(self, participant: &Participant) -> i64 {
        match self {
            AdjustmentSplit::PerParticipant => 1,
            AdjustmentSplit::PerHead => i64::from(participant.headcount.max(1)),
        }
    }
}

/// One participant's charge before adjustment
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Charge {
    pub weight: i64,
    pub base: Amount,
    /// `None` for non-bidders
    pub position: Option<Position>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconciliation {
    /// One per charge, same order
    pub adjustments: Vec<Amount>,
    pub residual: Amount,
    /// Index of the charge that absorbed `residual`
    pub residual_holder: Option<usize>,
}

pub fn reconcile(charges: &[Charge], target: Amount) -> Result<Reconciliation, ClearingError> {
    let total_weight: i64 = charges.iter().map(|c| c.weight).sum();
    if charges.is_empty() || total_weight <= 0 {
        return Err(ClearingError::NoParticipants);
    }

    let collected: Amount = charges.iter().map(|c| c.base).sum();
    let delta = target - collected;
    let per_unit = delta.div_euclid(total_weight);
    let residual = delta.rem_euclid(total_weight);

    let mut adjustments: Vec<Amount> = charges.iter().map(|c| per_unit * c.weight).collect();

    let residual_holder = if residual == 0 {
        None
    } else {
        let first_winner = charges
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.position.map(|p| (p, i)))
            .min()
            .map_or(0, |(_, i)| i);
        adjustments[first_winner] += residual;
        Some(first_winner)
    };

    let actual: Amount = charges
        .iter()
        .zip(&adjustments)
        .map(|(c, a)| c.base + a)
        .sum();
    if actual != target {
        return Err(ClearingError::BudgetPrecision {
            expected: target,
            actual,
        });
    }

    Ok(Reconciliation {
        adjustments,
        residual,
        residual_holder,
    })
}
