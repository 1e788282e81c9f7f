//! Typed view of the Kraken public REST wire format.

use crate::error::SyncError;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};
use trade_history_domain::entities::epoch_nanos;
use trade_history_domain::{OrderType, PairDescriptor, Side, Trade, TradePage};

/// Key of the trailing cursor marker inside a trades result.
const LAST_KEY: &str = "last";

/// Top-level response envelope shared by every public endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub error: Vec<String>,
    pub result: Option<T>,
}

/// Catalog entry of `/0/public/AssetPairs`.
#[derive(Debug, Deserialize)]
pub(crate) struct AssetPairInfo {
    pub altname: String,
    #[serde(default)]
    pub wsname: Option<String>,
}

impl AssetPairInfo {
    pub fn into_descriptor(self, id: String) -> PairDescriptor {
        let mut alt_names = vec![self.altname];
        if let Some(wsname) = self.wsname
            && !alt_names.contains(&wsname)
        {
            alt_names.push(wsname);
        }
        PairDescriptor::new(id, alt_names)
    }
}

/// One trade as a positional array:
/// `[price, volume, time, side, type, misc, trade_id]`.
#[derive(Debug, Deserialize)]
struct WireTrade(
    String,
    String,
    f64,
    String,
    String,
    String,
    #[serde(deserialize_with = "integral_id")] i64,
);

impl WireTrade {
    fn into_trade(self) -> Result<Trade, SyncError> {
        let WireTrade(price, volume, time, side, order_type, misc, trade_id) = self;
        Ok(Trade {
            time_ns: epoch_nanos(time)
                .ok_or_else(|| SyncError::malformed(format!("invalid timestamp {time}")))?,
            price: parse_decimal("price", &price)?,
            volume: parse_decimal("volume", &volume)?,
            side: Side::from_code(&side)?,
            order_type: OrderType::from_code(&order_type)?,
            misc,
            trade_id,
        })
    }
}

fn parse_decimal(field: &str, raw: &str) -> Result<f64, SyncError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| SyncError::malformed(format!("{field} '{raw}' is not a decimal")))
}

/// Accepts the trade id as an integer or as an integral float.
fn integral_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Int(i64),
        Float(f64),
    }

    match Id::deserialize(deserializer)? {
        Id::Int(id) if id >= 0 => Ok(id),
        Id::Float(f) if f >= 0.0 && f.fract() == 0.0 && f < i64::MAX as f64 => Ok(f as i64),
        _ => Err(de::Error::custom("trade id must be a non-negative integer")),
    }
}

/// Decodes a single positional trade record.
///
/// # Errors
/// Returns [`SyncError::MalformedRecord`] when the array shape or any field
/// type does not match.
pub fn decode_trade(record: &Value) -> Result<Trade, SyncError> {
    WireTrade::deserialize(record)?.into_trade()
}

/// Decodes the `result` object of `/0/public/Trades` into a page.
pub(crate) fn decode_trades_result(
    mut result: Map<String, Value>,
    pair: &PairDescriptor,
    page_size: usize,
) -> Result<TradePage, SyncError> {
    let last = match result.remove(LAST_KEY) {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(SyncError::malformed(format!(
                "unexpected '{LAST_KEY}' marker {other}"
            )));
        }
        None => return Err(SyncError::malformed("missing 'last' marker")),
    };

    // The result is keyed by the canonical id; fall back to the sole entry.
    let records = match result.remove(&pair.id) {
        Some(records) => records,
        None if result.len() == 1 => result
            .into_iter()
            .next()
            .map(|(_, v)| v)
            .unwrap_or(Value::Null),
        None => {
            return Err(SyncError::malformed(format!(
                "no trades keyed by pair {}",
                pair.id
            )));
        }
    };

    let Value::Array(records) = records else {
        return Err(SyncError::malformed("trades are not an array"));
    };

    let trades = records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            decode_trade(record).map_err(|e| SyncError::malformed(format!("record {i}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TradePage::new(trades, last, page_size))
}
