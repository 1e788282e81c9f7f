use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Aggressor side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Single-letter code used on the wire and in the persisted `side` column.
    #[must_use]
    pub fn as_code(&self) -> &'static str {
        match self {
            Side::Buy => "b",
            Side::Sell => "s",
        }
    }

    /// Parses the upstream single-letter code.
    ///
    /// # Errors
    /// Returns [`DomainError::UnknownSide`] for anything but `b` or `s`.
    pub fn from_code(code: &str) -> Result<Self, DomainError> {
        match code {
            "b" => Ok(Side::Buy),
            "s" => Ok(Side::Sell),
            other => Err(DomainError::UnknownSide(other.to_string())),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Order type that produced a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    /// Single-letter code used on the wire and in the persisted `type` column.
    #[must_use]
    pub fn as_code(&self) -> &'static str {
        match self {
            OrderType::Market => "m",
            OrderType::Limit => "l",
        }
    }

    /// Parses the upstream single-letter code.
    ///
    /// # Errors
    /// Returns [`DomainError::UnknownOrderType`] for anything but `m` or `l`.
    pub fn from_code(code: &str) -> Result<Self, DomainError> {
        match code {
            "m" => Ok(OrderType::Market),
            "l" => Ok(OrderType::Limit),
            other => Err(DomainError::UnknownOrderType(other.to_string())),
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Kraken account verification tier.
///
/// Each tier decays the REST call counter at a different rate. History
/// calls are paced so the counter fully decays one call's cost before the
/// next call is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RateLimitTier {
    #[default]
    Starter,
    Intermediate,
    Pro,
}

impl RateLimitTier {
    /// Counter cost of one public trade-history call.
    pub const CALL_COST: f64 = 1.0;

    /// Counter decay per second.
    #[must_use]
    pub fn decay_per_sec(&self) -> f64 {
        match self {
            RateLimitTier::Starter => 0.33,
            RateLimitTier::Intermediate => 0.5,
            RateLimitTier::Pro => 1.0,
        }
    }

    /// Time needed for the counter to decay one call's cost.
    #[must_use]
    pub fn pacing_interval(&self) -> Duration {
        Duration::from_secs_f64(Self::CALL_COST / self.decay_per_sec())
    }
}

impl FromStr for RateLimitTier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "starter" => Ok(RateLimitTier::Starter),
            "intermediate" => Ok(RateLimitTier::Intermediate),
            "pro" => Ok(RateLimitTier::Pro),
            _ => Err(DomainError::UnknownTier(s.to_string())),
        }
    }
}

impl fmt::Display for RateLimitTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RateLimitTier::Starter => "starter",
            RateLimitTier::Intermediate => "intermediate",
            RateLimitTier::Pro => "pro",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_codes() {
        assert_eq!(Side::from_code("b").unwrap(), Side::Buy);
        assert_eq!(Side::from_code("s").unwrap(), Side::Sell);
        assert_eq!(Side::Sell.as_code(), "s");
        assert!(matches!(
            Side::from_code("x"),
            Err(DomainError::UnknownSide(code)) if code == "x"
        ));
    }

    #[test]
    fn test_order_type_codes() {
        assert_eq!(OrderType::from_code("m").unwrap(), OrderType::Market);
        assert_eq!(OrderType::from_code("l").unwrap(), OrderType::Limit);
        assert!(OrderType::from_code("").is_err());
    }

    #[test]
    fn test_tier_pacing_interval() {
        assert_eq!(RateLimitTier::Pro.pacing_interval(), Duration::from_secs(1));
        assert_eq!(
            RateLimitTier::Intermediate.pacing_interval(),
            Duration::from_secs(2)
        );
        let starter = RateLimitTier::Starter.pacing_interval();
        assert!(starter > Duration::from_secs(3));
        assert!(starter < Duration::from_millis(3100));
    }

    #[test]
    fn test_tier_from_str() {
        assert_eq!("PRO".parse::<RateLimitTier>().unwrap(), RateLimitTier::Pro);
        assert_eq!(
            " intermediate ".parse::<RateLimitTier>().unwrap(),
            RateLimitTier::Intermediate
        );
        assert!("gold".parse::<RateLimitTier>().is_err());
        assert_eq!(RateLimitTier::default(), RateLimitTier::Starter);
    }
}
