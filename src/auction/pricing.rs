//! Payment rules
//!
//! Exactly one rule prices a clearing run; which one is configuration and
//! ends up in the outcome.
use super::{assignment, Amount};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingRule {
    /// Pay the best competing bid for the position you won
    #[default]
    SecondPrice,
    /// Pay the welfare your presence costs everybody else
    Vcg,
}

impl PricingRule {
    pub fn engine(self) -> &'static dyn PaymentRule {
        match self {
            PricingRule::SecondPrice => &SecondPricePayments,
            PricingRule::Vcg => &VcgPayments,
        }
    }
}

impl fmt::Display for PricingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PricingRule::SecondPrice => "second_price",
            PricingRule::Vcg => "vcg",
        })
    }
}

pub trait PaymentRule: Sync {
    /// Payment of every row of `values` under `assignment`, in row order
    fn payments(
        &self,
        values: &[Vec<Amount>],
        positions: usize,
        assignment: &[usize],
    ) -> Vec<Amount>;
}

pub struct SecondPricePayments;

impl PaymentRule for SecondPricePayments {
    fn payments(
        &self,
        values: &[Vec<Amount>],
        _positions: usize,
        assignment: &[usize],
    ) -> Vec<Amount> {
        assignment
            .iter()
            .enumerate()
            .map(|(winner, &col)| {
                let runner_up = values
                    .iter()
                    .enumerate()
                    .filter(|(row, _)| *row != winner)
                    .map(|(_, bids)| bids[col])
                    .max()
                    .unwrap_or(0);
                // the welfare-maximizing winner is not always the top bidder
                // for its own position
                runner_up.min(values[winner][col])
            })
            .collect()
    }
}

pub struct VcgPayments;

impl PaymentRule for VcgPayments {
    fn payments(
        &self,
        values: &[Vec<Amount>],
        positions: usize,
        assignment: &[usize],
    ) -> Vec<Amount> {
        let welfare = assignment::welfare(values, assignment);
        assignment
            .iter()
            .enumerate()
            .map(|(winner, &col)| {
                let others_with = welfare - values[winner][col];
                let others_without = assignment::optimal_value_without(values, positions, winner);
                (others_without - others_with).max(0)
            })
            .collect()
    }
}
