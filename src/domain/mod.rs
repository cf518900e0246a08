//! Exchange domain types.
//! Operators, lifecycle states and the fee policy, independent of any
//! transport or storage concern.

use bigdecimal::{BigDecimal, ToPrimitive};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Mobile-money operators this broker exchanges between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Orange,
    Wave,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown operator `{0}`, expected one of: orange, wave")]
pub struct UnknownOperator(String);

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Orange => "orange",
            Operator::Wave => "wave",
        }
    }

    /// Capitalized name for user-facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            Operator::Orange => "Orange",
            Operator::Wave => "Wave",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = UnknownOperator;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "orange" => Ok(Operator::Orange),
            "wave" => Ok(Operator::Wave),
            other => Err(UnknownOperator(other.to_string())),
        }
    }
}

/// Lifecycle of an exchange record.
///
/// `Processing` is the in-flight state claimed by a confirm call; it is what
/// makes a second concurrent confirm observable and rejectable. `Completed`
/// and `Failed` are terminal and never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ExchangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeStatus::Pending => "pending",
            ExchangeStatus::Processing => "processing",
            ExchangeStatus::Completed => "completed",
            ExchangeStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExchangeStatus::Completed | ExchangeStatus::Failed)
    }
}

impl fmt::Display for ExchangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(ExchangeStatus::Pending),
            "processing" => Ok(ExchangeStatus::Processing),
            "completed" => Ok(ExchangeStatus::Completed),
            "failed" => Ok(ExchangeStatus::Failed),
            other => Err(format!("unknown exchange status `{other}`")),
        }
    }
}

/// Brokerage fee: 1% of the amount, truncated to whole currency units, then
/// rounded up to the next multiple of 5.
///
/// Returns `None` when the amount falls outside the supported range
/// (negative or beyond the ledger column width); validation rejects such
/// amounts before this is ever reached.
pub fn exchange_fee(amount: &BigDecimal) -> Option<BigDecimal> {
    let minor = (amount * BigDecimal::from(100)).to_i64()?;
    if minor < 0 {
        return None;
    }
    let one_percent_units = minor / 10_000;
    let fee_units = (one_percent_units + 4) / 5 * 5;
    Some(BigDecimal::from(fee_units))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).expect("valid decimal")
    }

    #[test]
    fn parses_operators() {
        assert_eq!("orange".parse::<Operator>().unwrap(), Operator::Orange);
        assert_eq!("wave".parse::<Operator>().unwrap(), Operator::Wave);
        assert!("mtn".parse::<Operator>().is_err());
        assert!("Orange".parse::<Operator>().is_err());
    }

    #[test]
    fn status_terminality() {
        assert!(!ExchangeStatus::Pending.is_terminal());
        assert!(!ExchangeStatus::Processing.is_terminal());
        assert!(ExchangeStatus::Completed.is_terminal());
        assert!(ExchangeStatus::Failed.is_terminal());
    }

    #[test]
    fn status_round_trips() {
        for status in [
            ExchangeStatus::Pending,
            ExchangeStatus::Processing,
            ExchangeStatus::Completed,
            ExchangeStatus::Failed,
        ] {
            assert_eq!(ExchangeStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn fee_matches_published_schedule() {
        assert_eq!(exchange_fee(&dec("500")).unwrap(), dec("5"));
        assert_eq!(exchange_fee(&dec("501")).unwrap(), dec("5"));
        assert_eq!(exchange_fee(&dec("10000")).unwrap(), dec("100"));
    }

    #[test]
    fn fee_rounds_up_to_next_multiple_of_five() {
        assert_eq!(exchange_fee(&dec("600")).unwrap(), dec("10"));
        assert_eq!(exchange_fee(&dec("2400")).unwrap(), dec("25"));
        assert_eq!(exchange_fee(&dec("2500")).unwrap(), dec("25"));
        assert_eq!(exchange_fee(&dec("2600")).unwrap(), dec("30"));
    }

    #[test]
    fn fee_is_monotonic_and_non_negative() {
        let mut previous = BigDecimal::from(0);
        for units in (500..20_000).step_by(250) {
            let fee = exchange_fee(&BigDecimal::from(units)).unwrap();
            assert!(fee >= previous, "fee decreased at amount {units}");
            assert!(fee >= BigDecimal::from(0));
            previous = fee;
        }
    }

    #[test]
    fn fee_handles_fractional_amounts() {
        assert_eq!(exchange_fee(&dec("500.50")).unwrap(), dec("5"));
        assert_eq!(exchange_fee(&dec("999.99")).unwrap(), dec("10"));
    }

    #[test]
    fn fee_rejects_out_of_range_amounts() {
        assert!(exchange_fee(&dec("-500")).is_none());
        assert!(exchange_fee(&dec("99999999999999999999")).is_none());
    }
}
