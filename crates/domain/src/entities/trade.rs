use crate::enums::{OrderType, Side};
use crate::error::DomainError;
use serde::{Deserialize, Serialize};

const NANOS_PER_SEC: i64 = 1_000_000_000;
const NANOS_PER_MICRO: i64 = 1_000;

/// One executed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Nanoseconds since the Unix epoch.
    pub time_ns: i64,
    pub price: f64,
    pub volume: f64,
    pub side: Side,
    pub order_type: OrderType,
    /// Free-text annotation, usually empty.
    pub misc: String,
    /// Upstream-assigned id, strictly increasing per pair.
    pub trade_id: i64,
}

/// Converts fractional epoch seconds to epoch nanoseconds.
///
/// The fractional part is rounded to whole microseconds, the upstream's
/// resolution, so float noise below that never reaches the stored value.
/// Returns `None` for negative, non-finite or out-of-range input.
#[must_use]
pub fn epoch_nanos(secs: f64) -> Option<i64> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    let whole = secs.trunc();
    let micros = ((secs - whole) * 1e6).round() as i64;
    (whole as i64)
        .checked_mul(NANOS_PER_SEC)?
        .checked_add(micros * NANOS_PER_MICRO)
}

/// One page of trades returned by a single upstream call.
#[derive(Debug, Clone, PartialEq)]
pub struct TradePage {
    pub trades: Vec<Trade>,
    /// Opaque trailing marker; the next request starts after it.
    pub last: String,
    /// True when the page held fewer records than the page size.
    pub is_final: bool,
}

impl TradePage {
    /// Builds a page, deriving `is_final` from the requested page size.
    pub fn new(trades: Vec<Trade>, last: impl Into<String>, page_size: usize) -> Self {
        let is_final = trades.len() < page_size;
        Self {
            trades,
            last: last.into(),
            is_final,
        }
    }

    /// Cursor for the following request: the trailing marker plus one.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidCursor`] if the marker is not an integer.
    pub fn next_cursor(&self) -> Result<i64, DomainError> {
        self.last
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|last| last.checked_add(1))
            .ok_or_else(|| DomainError::InvalidCursor(self.last.clone()))
    }

    /// Highest trade id on the page.
    #[must_use]
    pub fn last_trade_id(&self) -> Option<i64> {
        self.trades.last().map(|t| t.trade_id)
    }

    /// Whether trade ids on the page are strictly increasing.
    #[must_use]
    pub fn is_strictly_ascending(&self) -> bool {
        self.trades.windows(2).all(|w| w[0].trade_id < w[1].trade_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(id: i64) -> Trade {
        Trade {
            time_ns: id * NANOS_PER_SEC,
            price: 1.0,
            volume: 1.0,
            side: Side::Buy,
            order_type: OrderType::Limit,
            misc: String::new(),
            trade_id: id,
        }
    }

    #[test]
    fn test_epoch_nanos_microsecond_exact() {
        assert_eq!(epoch_nanos(1690000000.123456), Some(1_690_000_000_123_456_000));
        assert_eq!(epoch_nanos(0.0), Some(0));
        assert_eq!(epoch_nanos(1.5), Some(1_500_000_000));
    }

    #[test]
    fn test_epoch_nanos_rejects_invalid() {
        assert_eq!(epoch_nanos(-1.0), None);
        assert_eq!(epoch_nanos(f64::NAN), None);
        assert_eq!(epoch_nanos(f64::INFINITY), None);
        assert_eq!(epoch_nanos(1e300), None);
    }

    #[test]
    fn test_page_final_flag() {
        let full = TradePage::new((1..=3).map(trade).collect(), "3", 3);
        assert!(!full.is_final);

        let short = TradePage::new(vec![trade(1)], "1", 3);
        assert!(short.is_final);

        let empty = TradePage::new(Vec::new(), "0", 1000);
        assert!(empty.is_final);
    }

    #[test]
    fn test_next_cursor() {
        let page = TradePage::new(vec![trade(7)], "41", 1000);
        assert_eq!(page.next_cursor().unwrap(), 42);

        let bad = TradePage::new(Vec::new(), "abc", 1000);
        assert_eq!(
            bad.next_cursor(),
            Err(DomainError::InvalidCursor("abc".to_string()))
        );

        let overflow = TradePage::new(Vec::new(), i64::MAX.to_string(), 1000);
        assert!(overflow.next_cursor().is_err());
    }

    #[test]
    fn test_ascending_check() {
        let ok = TradePage::new(vec![trade(1), trade(2), trade(5)], "5", 1000);
        assert!(ok.is_strictly_ascending());
        assert_eq!(ok.last_trade_id(), Some(5));

        let dup = TradePage::new(vec![trade(1), trade(1)], "1", 1000);
        assert!(!dup.is_strictly_ascending());
    }
}
