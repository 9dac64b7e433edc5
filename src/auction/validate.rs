//! Bid validation and form sanitization
//!
//! The collection form hands over raw strings. [`BidForm`] holds them as
//! they arrived and [`BidForm::into_submission`] turns them into a typed
//! [`Submission`] or a map of per-field messages. [`validate_bids`] is the
//! structural check of one bid vector, shared with the clearing run.
use super::{Amount, BidVector, Participant, Position, Rules, Submission};
use serde::Serialize;
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};
use thiserror::Error;

pub const NAMES_FIELD: &str = "names";
pub const EMAIL_FIELD: &str = "email";
pub const SINGLE_FIELD: &str = "single";
pub const HEADCOUNT_FIELD: &str = "headcount";
pub const COMMENTS_FIELD: &str = "comments";
pub const HONEYPOT_FIELD: &str = "bot-field";
pub const TOTAL_FIELD: &str = "total";

pub fn position_field(position: Position) -> String {
    format!("position_{position}")
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing bid for position {position}")]
    IncompleteVector { position: Position },
    #[error("no such position: {position}")]
    UnexpectedPosition { position: Position },
    #[error("bid for position {position} is negative: {amount}")]
    NegativeBid { position: Position, amount: Amount },
    #[error("bid for position {position} is above the maximum of {max}: {amount}")]
    OutOfRange {
        position: Position,
        amount: Amount,
        max: Amount,
    },
    #[error("bid for position {position} ({amount}) is higher than for the previous one ({previous})")]
    NonMonotonicSequence {
        position: Position,
        amount: Amount,
        previous: Amount,
    },
    #[error("bids total {total}, expected {expected}")]
    SumMismatch { total: Amount, expected: Amount },
}

impl ValidationError {
    pub fn position(&self) -> Option<Position> {
        use ValidationError::*;
        match *self {
            IncompleteVector { position }
            | UnexpectedPosition { position }
            | NegativeBid { position, .. }
            | OutOfRange { position, .. }
            | NonMonotonicSequence { position, .. } => Some(position),
            SumMismatch { .. } => None,
        }
    }
}

/// Check one participant's bids, position by position
///
/// Returns the first violation found.
pub fn validate_bids(raw: &[Option<Amount>], rules: &Rules) -> Result<BidVector, ValidationError> {
    use ValidationError::*;

    if raw.len() > rules.positions {
        return Err(UnexpectedPosition {
            position: Position::from_index(rules.positions),
        });
    }

    let mut bids: Vec<Amount> = Vec::with_capacity(rules.positions);
    for index in 0..rules.positions {
        let position = Position::from_index(index);
        let amount = raw
            .get(index)
            .copied()
            .flatten()
            .ok_or(IncompleteVector { position })?;

        if amount < 0 {
            return Err(NegativeBid { position, amount });
        }
        if let Some(max) = rules.max_bid {
            if amount > max {
                return Err(OutOfRange {
                    position,
                    amount,
                    max,
                });
            }
        }
        if let Some(&previous) = bids.last() {
            if amount > previous {
                return Err(NonMonotonicSequence {
                    position,
                    amount,
                    previous,
                });
            }
        }
        bids.push(amount);
    }

    if let Some(expected) = rules.bid_sum_target {
        let total = bids.iter().fold(0 as Amount, |acc, b| acc.saturating_add(*b));
        if total != expected {
            return Err(SumMismatch { total, expected });
        }
    }

    Ok(BidVector(bids))
}

/// Re-check an accepted vector against (possibly different) rules
pub fn check(bids: &BidVector, rules: &Rules) -> Result<(), ValidationError> {
    let raw: Vec<_> = bids.as_slice().iter().copied().map(Some).collect();
    validate_bids(&raw, rules).map(|_| ())
}

/// Field name to message, for everything wrong with one form
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, String>);

impl FormErrors {
    fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for FormErrors {}

/// Raw bid form, as posted
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BidForm {
    pub names: String,
    pub email: String,
    pub single: bool,
    pub headcount: Option<String>,
    pub bids: Vec<String>,
    pub comments: Option<String>,
    pub bot_field: Option<String>,
}

impl BidForm {
    pub fn from_fields(fields: &HashMap<String, String>, positions: usize) -> Self {
        let text = |name: &str| fields.get(name).cloned().unwrap_or_default();
        let optional = |name: &str| fields.get(name).cloned().filter(|v| !v.trim().is_empty());

        Self {
            names: text(NAMES_FIELD),
            email: text(EMAIL_FIELD),
            single: fields
                .get(SINGLE_FIELD)
                .map(|v| is_checked(v))
                .unwrap_or(false),
            headcount: optional(HEADCOUNT_FIELD),
            bids: (0..positions)
                .map(|i| text(&position_field(Position::from_index(i))))
                .collect(),
            comments: optional(COMMENTS_FIELD),
            bot_field: optional(HONEYPOT_FIELD),
        }
    }

    /// Sanitize into a submission
    ///
    /// `Ok(None)` means the honeypot field was filled in and the form should
    /// be dropped without telling the sender.
    pub fn into_submission(self, rules: &Rules) -> Result<Option<Submission>, FormErrors> {
        if self.bot_field.is_some() {
            return Ok(None);
        }

        let mut errors = FormErrors::default();

        let names = self.names.trim().to_owned();
        if names.is_empty() {
            errors.add(NAMES_FIELD, "Names are required");
        }

        let email = self.email.trim().to_owned();
        if email.is_empty() {
            errors.add(EMAIL_FIELD, "Email is required");
        } else if !looks_like_email(&email) {
            errors.add(EMAIL_FIELD, "Please enter a valid email address");
        }

        let headcount = match self.headcount.as_deref().map(str::trim) {
            None => Some(if self.single { 1 } else { 2 }),
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    errors.add(HEADCOUNT_FIELD, "Headcount must be a positive whole number");
                    None
                }
            },
        };

        // non-bidders may leave bids blank or half filled; they are ignored
        let bids = if self.single {
            None
        } else {
            parse_bids(&self.bids, rules, &mut errors)
        };

        if !errors.is_empty() {
            return Err(errors);
        }
        let headcount = headcount.unwrap_or(1);

        let participant = Participant {
            id: email.to_lowercase(),
            name: names,
            email,
            is_bidder: !self.single,
            headcount,
        };
        let submission = match bids {
            Some(bids) => Submission::bidder(participant, bids),
            None => Submission::non_bidder(participant),
        };
        Ok(Some(submission.with_comments(
            self.comments.map(|c| c.trim().to_owned()),
        )))
    }
}

fn parse_bids(raw: &[String], rules: &Rules, errors: &mut FormErrors) -> Option<BidVector> {
    let mut amounts = Vec::with_capacity(raw.len());
    let mut parsed_all = true;
    for (index, text) in raw.iter().enumerate() {
        if text.trim().is_empty() {
            amounts.push(None);
            continue;
        }
        match rules.precision.parse(text) {
            Ok(amount) => amounts.push(Some(amount)),
            Err(e) => {
                errors.add(position_field(Position::from_index(index)), e.to_string());
                parsed_all = false;
            }
        }
    }
    if !parsed_all {
        return None;
    }

    match validate_bids(&amounts, rules) {
        Ok(bids) => Some(bids),
        Err(e) => {
            let field = e
                .position()
                .map(position_field)
                .unwrap_or_else(|| TOTAL_FIELD.to_owned());
            errors.add(field, e.to_string());
            None
        }
    }
}

fn is_checked(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "on" | "true" | "yes" | "1"
    )
}

/// Same shape the site's form accepted: `local@domain.tld`, no whitespace
fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && domain
            .char_indices()
            .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}
