use crate::notifier::Notice;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt::Debug;

/// Last-known server state for one feature area.
///
/// A snapshot names the fields that make a push meaningful (its salient key).
/// Volatile fields such as generation timestamps stay out of the key so that a
/// repeat push with a fresh timestamp does not re-render.
pub trait Snapshot: DeserializeOwned + Clone + Send + Sync + 'static {
    type Key: PartialEq + Debug + Send + Sync;

    /// Stream event carrying this snapshot.
    const EVENT: &'static str;
    /// REST path serving the same snapshot, used when polling.
    const ENDPOINT: &'static str;

    fn salient(&self) -> Self::Key;

    /// Side-effect notices for a change from `previous` (the last accepted
    /// snapshot) to `next`.
    fn notices(_previous: &Self, _next: &Self) -> Vec<Notice> {
        Vec::new()
    }
}

/// Notice text for a counter that went up, or `None` if it did not.
pub(crate) fn increase(
    previous: u64,
    next: u64,
    singular: &str,
    plural: &str,
) -> Option<String> {
    let added = next.checked_sub(previous).filter(|added| *added > 0)?;
    let noun = if added == 1 { singular } else { plural };
    Some(format!("{added} {noun}"))
}

/// Deserialize a money amount sent as a JSON number or numeric string
/// (`"1234.50"`) into minor units.
pub(crate) fn cents<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let amount = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Null => Some(0.0),
        _ => None,
    }
    .ok_or_else(|| D::Error::custom(format!("invalid amount: {value}")))?;
    Ok((amount * 100.0).round() as i64)
}

/// Deserialize a counter that PHP may send as a number or a numeric string.
pub(crate) fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        Value::Null => Some(0),
        _ => None,
    }
    .ok_or_else(|| D::Error::custom(format!("invalid count: {value}")))
}
