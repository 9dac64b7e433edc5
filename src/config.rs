//! Configuration, read from `ROOM_AUCTION_*` environment variables
//!
//! Amounts are decimal strings in the configured currency precision, e.g.
//! `ROOM_AUCTION_TARGET_TOTAL=3275.00`.
use crate::auction::{
    AdjustmentSplit, Amount, AmountError, NonBidderContribution, Precision, PricingRule, Rules,
};
use figment::{
    providers::{Env, Serialized},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::{net::SocketAddr, time::SystemTime};
use thiserror::Error;

pub const PREFIX: &str = "ROOM_AUCTION_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {field}: {source}")]
    Amount {
        field: &'static str,
        #[source]
        source: AmountError,
    },
    #[error("invalid listen address {addr:?}: {source}")]
    ListenAddr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("invalid deadline {deadline:?}: {source}")]
    Deadline {
        deadline: String,
        #[source]
        source: humantime::TimestampError,
    },
    #[error("non_bidder_fixed_amount is required with the fixed contribution rule")]
    MissingFixedAmount,
    #[error("positions must be at least 1")]
    NoPositions,
    #[error("max_tie_candidates must be at least 1")]
    NoTieCandidates,
    #[error("{labels} position labels for {positions} positions")]
    PositionLabels { labels: usize, positions: usize },
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionRule {
    #[default]
    HalfOfLowestPayment,
    HalfOfCheapestPosition,
    Fixed,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Address the HTTP server binds to
    pub listen_addr: String,
    /// Log filter directives
    pub log: String,
    /// What all final payments must add up to
    #[serde(deserialize_with = "amount_text")]
    pub target_total: String,
    pub positions: usize,
    pub pricing_rule: PricingRule,
    pub non_bidder_contribution: ContributionRule,
    #[serde(default, deserialize_with = "optional_amount_text")]
    pub non_bidder_fixed_amount: Option<String>,
    pub adjustment_split: AdjustmentSplit,
    /// Highest accepted bid for a single position
    #[serde(default, deserialize_with = "optional_amount_text")]
    pub max_bid: Option<String>,
    /// If set, every bid vector must add up to exactly this
    #[serde(default, deserialize_with = "optional_amount_text")]
    pub bid_sum_target: Option<String>,
    /// Decimal places of the currency
    pub currency_precision: u32,
    /// Fixed tie-break seed; a fresh one is drawn per run when unset
    pub tie_break_seed: Option<u64>,
    pub max_tie_candidates: usize,
    /// RFC 3339 timestamp after which the auction is cleared
    pub deadline: Option<String>,
    /// Room reported for participants without bids
    pub fallback_room: String,
    /// Room name per position, e.g. `[Room A - Ocean View Master, ...]`
    pub position_labels: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_owned(),
            log: "info".to_owned(),
            target_total: "3275.00".to_owned(),
            positions: 5,
            pricing_rule: PricingRule::SecondPrice,
            non_bidder_contribution: ContributionRule::HalfOfLowestPayment,
            non_bidder_fixed_amount: None,
            adjustment_split: AdjustmentSplit::PerParticipant,
            max_bid: None,
            bid_sum_target: None,
            currency_precision: 2,
            tie_break_seed: None,
            max_tie_candidates: 10_000,
            deadline: None,
            fallback_room: "Bedroom 6".to_owned(),
            position_labels: Vec::new(),
        }
    }
}

impl Config {
    pub fn get() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("RUST_").split("_").only(&["log"]))
            .merge(Env::prefixed(PREFIX))
            .extract()
    }

    pub fn rules(&self) -> Result<Rules, ConfigError> {
        if self.positions == 0 {
            return Err(ConfigError::NoPositions);
        }
        if self.max_tie_candidates == 0 {
            return Err(ConfigError::NoTieCandidates);
        }
        if !self.position_labels.is_empty() && self.position_labels.len() != self.positions {
            return Err(ConfigError::PositionLabels {
                labels: self.position_labels.len(),
                positions: self.positions,
            });
        }

        let precision = Precision::new(self.currency_precision).map_err(|source| {
            ConfigError::Amount {
                field: "currency_precision",
                source,
            }
        })?;
        let amount = |field: &'static str, raw: &str| -> Result<Amount, ConfigError> {
            precision
                .parse(raw)
                .map_err(|source| ConfigError::Amount { field, source })
        };
        let optional = |field: &'static str, raw: &Option<String>| {
            raw.as_deref().map(|raw| amount(field, raw)).transpose()
        };

        let non_bidder_contribution = match self.non_bidder_contribution {
            ContributionRule::HalfOfLowestPayment => NonBidderContribution::HalfOfLowestPayment,
            ContributionRule::HalfOfCheapestPosition => {
                NonBidderContribution::HalfOfCheapestPosition
            }
            ContributionRule::Fixed => NonBidderContribution::Fixed(
                optional("non_bidder_fixed_amount", &self.non_bidder_fixed_amount)?
                    .ok_or(ConfigError::MissingFixedAmount)?,
            ),
        };

        Ok(Rules {
            target_total: amount("target_total", &self.target_total)?,
            positions: self.positions,
            pricing_rule: self.pricing_rule,
            non_bidder_contribution,
            adjustment_split: self.adjustment_split,
            max_bid: optional("max_bid", &self.max_bid)?,
            bid_sum_target: optional("bid_sum_target", &self.bid_sum_target)?,
            precision,
            max_tie_candidates: self.max_tie_candidates,
            fallback_room: self.fallback_room.clone(),
            position_labels: self.position_labels.clone(),
        })
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr
            .parse()
            .map_err(|source| ConfigError::ListenAddr {
                addr: self.listen_addr.clone(),
                source,
            })
    }

    pub fn deadline(&self) -> Result<Option<SystemTime>, ConfigError> {
        self.deadline
            .as_deref()
            .map(|raw| {
                humantime::parse_rfc3339_weak(raw).map_err(|source| ConfigError::Deadline {
                    deadline: raw.to_owned(),
                    source,
                })
            })
            .transpose()
    }
}

/// Environment values that look like numbers arrive as numbers
#[derive(Deserialize)]
#[serde(untagged)]
enum AmountText {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl From<AmountText> for String {
    fn from(value: AmountText) -> Self {
        match value {
            AmountText::Text(s) => s,
            AmountText::Integer(i) => i.to_string(),
            AmountText::Float(f) => f.to_string(),
        }
    }
}

fn amount_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    AmountText::deserialize(deserializer).map(String::from)
}

fn optional_amount_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<AmountText>::deserialize(deserializer).map(|v| v.map(String::from))
}
