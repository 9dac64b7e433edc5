use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Money in minor currency units (cents with the default precision)
pub type Amount = i64;

const MAX_DECIMALS: u32 = 6;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("empty amount")]
    Empty,
    #[error("not a number: {0:?}")]
    Invalid(String),
    #[error("more than {decimals} decimal places: {raw:?}")]
    TooPrecise { raw: String, decimals: u32 },
    #[error("amount out of range: {0:?}")]
    Overflow(String),
    #[error("unsupported currency precision: {0}")]
    UnsupportedPrecision(u32),
}

/// Number of decimal places one [`Amount`] unit stands for
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Precision(u32);

impl Default for Precision {
    fn default() -> Self {
        Self(2)
    }
}

impl Precision {
    pub fn new(decimals: u32) -> Result<Self, AmountError> {
        if decimals > MAX_DECIMALS {
            return Err(AmountError::UnsupportedPrecision(decimals));
        }
        Ok(Self(decimals))
    }

    fn scale(self) -> i64 {
        10i64.pow(self.0)
    }

    /// Parse a human-typed amount like `"$1,125.50"` or `" 3275 "`
    pub fn parse(self, raw: &str) -> Result<Amount, AmountError> {
        let cleaned: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ',' && *c != '$')
            .collect();
        if cleaned.is_empty() {
            return Err(AmountError::Empty);
        }

        let (negative, unsigned) = match cleaned.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
        };

        let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction)
        {
            return Err(AmountError::Invalid(raw.to_owned()));
        }
        if fraction.len() > self.0 as usize {
            return Err(AmountError::TooPrecise {
                raw: raw.to_owned(),
                decimals: self.0,
            });
        }

        let overflow = || AmountError::Overflow(raw.to_owned());
        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let fraction_units: i64 = if fraction.is_empty() {
            0
        } else {
            let padding = self.0 - fraction.len() as u32;
            fraction.parse::<i64>().map_err(|_| overflow())? * 10i64.pow(padding)
        };

        let units = whole
            .checked_mul(self.scale())
            .and_then(|w| w.checked_add(fraction_units))
            .ok_or_else(overflow)?;
        Ok(if negative { -units } else { units })
    }

    pub fn format(self, amount: Amount) -> String {
        let sign = if amount < 0 { "-" } else { "" };
        let abs = amount.unsigned_abs();
        let scale = self.scale() as u64;
        if self.0 == 0 {
            return format!("{sign}{abs}");
        }
        format!(
            "{sign}{}.{:0width$}",
            abs / scale,
            abs % scale,
            width = self.0 as usize
        )
    }
}
