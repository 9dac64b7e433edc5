//! Room-assignment auction
//!
//! Everything needed to clear one auction: bids come in as a frozen
//! [`Snapshot`], and a single call to [`clear`] produces the allocation of
//! positions, the payments and the budget adjustments. Nothing in here does
//! I/O; the services around it own storage and transport.
pub mod amount;
pub mod assignment;
pub mod pricing;
pub mod reconcile;
pub mod tie_break;
pub mod validate;

pub use self::amount::{Amount, AmountError, Precision};
pub use self::pricing::{PaymentRule, PricingRule};
pub use self::reconcile::{AdjustmentSplit, NonBidderContribution};
pub use self::tie_break::{SeededTieBreaker, TieBreaker};
pub use self::validate::{BidForm, ValidationError};

use serde::Serialize;
use std::{collections::BTreeMap, fmt, time::SystemTime};
use thiserror::Error;
use uuid::Uuid;

pub type ParticipantId = String;
pub type ParticipantIdRef<'s> = &'s str;

/// A pick slot (or room), numbered from 1
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Position(usize);

impl Position {
    pub fn from_index(index: usize) -> Self {
        Self(index + 1)
    }

    pub fn index(self) -> usize {
        self.0 - 1
    }

    pub fn number(self) -> usize {
        self.0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub email: String,
    pub is_bidder: bool,
    /// People this participant stands for (a couple is 2)
    pub headcount: u32,
}

/// Bids for every position, non-negative and non-increasing
///
/// Only the validator builds these, so holding one means the checks passed
/// for the rules in force at submission time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BidVector(Vec<Amount>);

impl BidVector {
    pub fn get(&self, position: Position) -> Option<Amount> {
        self.0.get(position.index()).copied()
    }

    pub fn as_slice(&self) -> &[Amount] {
        &self.0
    }

    pub fn total(&self) -> Amount {
        self.0.iter().sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub participant: Participant,
    bids: Option<BidVector>,
    pub comments: Option<String>,
}

impl Submission {
    pub fn bidder(mut participant: Participant, bids: BidVector) -> Self {
        participant.is_bidder = true;
        Self {
            participant,
            bids: Some(bids),
            comments: None,
        }
    }

    pub fn non_bidder(mut participant: Participant) -> Self {
        participant.is_bidder = false;
        Self {
            participant,
            bids: None,
            comments: None,
        }
    }

    pub fn with_comments(self, comments: Option<String>) -> Self {
        Self { comments, ..self }
    }

    pub fn bids(&self) -> Option<&BidVector> {
        self.bids.as_ref()
    }
}

/// Frozen set of submissions one clearing run reads
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Snapshot(BTreeMap<ParticipantId, Submission>);

impl Snapshot {
    pub fn new(submissions: impl IntoIterator<Item = Submission>) -> Self {
        Self(
            submissions
                .into_iter()
                .map(|s| (s.participant.id.clone(), s))
                .collect(),
        )
    }

    pub fn get(&self, id: ParticipantIdRef) -> Option<&Submission> {
        self.0.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Submission> {
        self.0.values()
    }

    /// Bidders in id order; row `i` of every value matrix is the `i`-th item
    pub fn bidders(&self) -> impl Iterator<Item = (&Participant, &BidVector)> {
        self.iter()
            .filter_map(|s| s.bids.as_ref().map(|bids| (&s.participant, bids)))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn insert(&mut self, submission: Submission) {
        self.0.insert(submission.participant.id.clone(), submission);
    }
}

/// Parameters of one auction
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Rules {
    pub target_total: Amount,
    pub positions: usize,
    pub pricing_rule: PricingRule,
    pub non_bidder_contribution: NonBidderContribution,
    pub adjustment_split: AdjustmentSplit,
    pub max_bid: Option<Amount>,
    pub bid_sum_target: Option<Amount>,
    pub precision: Precision,
    /// Above this many equally good allocations, ties are broken by random
    /// bidder priority instead of a uniform draw over all of them.
    pub max_tie_candidates: usize,
    pub fallback_room: String,
    /// Room name per position; empty for bare numbers
    pub position_labels: Vec<String>,
}

impl Rules {
    pub fn new(target_total: Amount, positions: usize) -> Self {
        Self {
            target_total,
            positions,
            pricing_rule: PricingRule::default(),
            non_bidder_contribution: NonBidderContribution::default(),
            adjustment_split: AdjustmentSplit::default(),
            max_bid: None,
            bid_sum_target: None,
            precision: Precision::default(),
            max_tie_candidates: 10_000,
            fallback_room: "Bedroom 6".to_owned(),
            position_labels: Vec::new(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("auction already cleared")]
    AlreadyCleared,
    #[error("participant already submitted: {0}")]
    AlreadySubmitted(ParticipantId),
    #[error("all {positions} positions already have a bidder")]
    Full { positions: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClearingError {
    #[error("auction already cleared")]
    AlreadyCleared,
    #[error("no bidding participants")]
    NoParticipants,
    #[error("{bidders} bidders but only {positions} positions")]
    TooManyBidders { bidders: usize, positions: usize },
    #[error("invalid bids from {participant}: {source}")]
    InvalidBids {
        participant: ParticipantId,
        #[source]
        source: ValidationError,
    },
    #[error("tie-break picked {picked} out of {candidates} candidates")]
    TieUnresolved { candidates: usize, picked: usize },
    #[error("final payments sum to {actual} instead of {expected}")]
    BudgetPrecision { expected: Amount, actual: Amount },
}

/// Bidder to position mapping
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Allocation(BTreeMap<ParticipantId, Position>);

impl Allocation {
    pub fn position_of(&self, id: ParticipantIdRef) -> Option<Position> {
        self.0.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, Position)> {
        self.0.iter().map(|(id, p)| (id, *p))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub participant: ParticipantId,
    pub name: String,
    pub position: Option<Position>,
    /// Label of the won position, or the fallback room for non-bidders
    pub room: Option<String>,
    pub bid: Option<Amount>,
    pub payment: Amount,
    pub adjustment: Amount,
    pub final_payment: Amount,
}

/// Result of [`clear`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Clearing {
    pub allocation: Allocation,
    pub settlements: Vec<Settlement>,
    /// Sum of winning bids
    pub welfare: Amount,
    /// `None` when there were more than `Rules::max_tie_candidates`
    pub tied_candidates: Option<usize>,
    pub residual: Amount,
    pub residual_holder: Option<ParticipantId>,
}

impl Clearing {
    pub fn settlement(&self, id: ParticipantIdRef) -> Option<&Settlement> {
        self.settlements.iter().find(|s| s.participant == id)
    }

    pub fn total(&self) -> Amount {
        self.settlements.iter().map(|s| s.final_payment).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub run_id: Uuid,
    pub cleared_at: String,
    pub pricing_rule: PricingRule,
    pub non_bidder_contribution: NonBidderContribution,
    pub adjustment_split: AdjustmentSplit,
    pub tie_break_seed: Option<u64>,
    pub target_total: Amount,
    #[serde(flatten)]
    pub clearing: Clearing,
}

impl Outcome {
    fn new(clearing: Clearing, rules: &Rules, tie_break_seed: Option<u64>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            cleared_at: humantime::format_rfc3339_seconds(SystemTime::now()).to_string(),
            pricing_rule: rules.pricing_rule,
            non_bidder_contribution: rules.non_bidder_contribution,
            adjustment_split: rules.adjustment_split,
            tie_break_seed,
            target_total: rules.target_total,
            clearing,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Collecting,
    Cleared,
}

/// The whole auction: collecting submissions, then cleared exactly once
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Auction {
    snapshot: Snapshot,
    outcome: Option<Outcome>,
}

impl Auction {
    pub fn phase(&self) -> Phase {
        if self.outcome.is_some() {
            Phase::Cleared
        } else {
            Phase::Collecting
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// Add a submission while collecting
    ///
    /// Bidders beyond `positions` are turned away; submissions cannot be
    /// withdrawn, so the auction would never clear with them.
    pub fn with_submission(
        &self,
        submission: Submission,
        positions: usize,
    ) -> Result<Self, SubmissionError> {
        if self.outcome.is_some() {
            return Err(SubmissionError::AlreadyCleared);
        }
        if self.snapshot.get(&submission.participant.id).is_some() {
            return Err(SubmissionError::AlreadySubmitted(
                submission.participant.id,
            ));
        }
        if submission.bids().is_some() && self.snapshot.bidders().count() >= positions {
            return Err(SubmissionError::Full { positions });
        }

        let mut snapshot = self.snapshot.clone();
        snapshot.insert(submission);
        Ok(Self {
            snapshot,
            outcome: None,
        })
    }

    /// Clear the current snapshot
    ///
    /// On error `self` is still collecting and nothing was recorded.
    pub fn cleared(
        &self,
        rules: &Rules,
        tie_breaker: &mut dyn TieBreaker,
    ) -> Result<Self, ClearingError> {
        if self.outcome.is_some() {
            return Err(ClearingError::AlreadyCleared);
        }

        let clearing = clear(&self.snapshot, rules, tie_breaker)?;
        Ok(Self {
            snapshot: self.snapshot.clone(),
            outcome: Some(Outcome::new(clearing, rules, tie_breaker.seed())),
        })
    }
}

/// Allocate, price and reconcile one snapshot
pub fn clear(
    snapshot: &Snapshot,
    rules: &Rules,
    tie_breaker: &mut dyn TieBreaker,
) -> Result<Clearing, ClearingError> {
    let bidders: Vec<_> = snapshot.bidders().collect();
    if bidders.is_empty() {
        return Err(ClearingError::NoParticipants);
    }
    if bidders.len() > rules.positions {
        return Err(ClearingError::TooManyBidders {
            bidders: bidders.len(),
            positions: rules.positions,
        });
    }
    for (participant, bids) in &bidders {
        validate::check(bids, rules).map_err(|source| ClearingError::InvalidBids {
            participant: participant.id.clone(),
            source,
        })?;
    }

    let values: Vec<Vec<Amount>> = bidders
        .iter()
        .map(|(_, bids)| bids.as_slice().to_vec())
        .collect();

    let (assignment, tied_candidates) =
        match assignment::optimal_allocations(&values, rules.positions, rules.max_tie_candidates) {
            Some(mut candidates) => {
                let count = candidates.len();
                let picked = tie_break::resolve(tie_breaker, count)?;
                (candidates.swap_remove(picked), Some(count))
            }
            None => (
                assignment::random_priority_allocation(&values, rules.positions, tie_breaker)?,
                None,
            ),
        };

    let welfare = assignment::welfare(&values, &assignment);
    let payments = rules
        .pricing_rule
        .engine()
        .payments(&values, rules.positions, &assignment);
    let second_prices =
        pricing::SecondPricePayments.payments(&values, rules.positions, &assignment);
    let contribution = rules
        .non_bidder_contribution
        .amount(&payments, &second_prices);

    let mut charges = Vec::with_capacity(snapshot.len());
    let mut drafts = Vec::with_capacity(snapshot.len());
    let mut allocation = BTreeMap::new();
    let mut row = 0;
    for submission in snapshot.iter() {
        let participant = &submission.participant;
        let weight = rules.adjustment_split.weight(participant);
        match submission.bids() {
            Some(bids) => {
                let position = Position::from_index(assignment[row]);
                allocation.insert(participant.id.clone(), position);
                charges.push(reconcile::Charge {
                    weight,
                    base: payments[row],
                    position: Some(position),
                });
                drafts.push((participant, Some(position), bids.get(position)));
                row += 1;
            }
            None => {
                charges.push(reconcile::Charge {
                    weight,
                    base: contribution,
                    position: None,
                });
                drafts.push((participant, None, None));
            }
        }
    }

    let reconciliation = reconcile::reconcile(&charges, rules.target_total)?;

    let settlements: Vec<Settlement> = drafts
        .into_iter()
        .zip(&charges)
        .zip(&reconciliation.adjustments)
        .map(|(((participant, position, bid), charge), &adjustment)| Settlement {
            participant: participant.id.clone(),
            name: participant.name.clone(),
            position,
            room: match position {
                Some(position) => rules.position_labels.get(position.index()).cloned(),
                None => Some(rules.fallback_room.clone()),
            },
            bid,
            payment: charge.base,
            adjustment,
            final_payment: charge.base + adjustment,
        })
        .collect();

    let residual_holder = reconciliation
        .residual_holder
        .and_then(|i| settlements.get(i))
        .map(|s| s.participant.clone());

    Ok(Clearing {
        allocation: Allocation(allocation),
        settlements,
        welfare,
        tied_candidates,
        residual: reconciliation.residual,
        residual_holder,
    })
}
