//! Event types shared by the RPC layer, the sync engine and the store.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::SuiIndexerError;

/// Decoded event fields, as returned in the node's `parsedJson`.
pub type EventData = Map<String, Value>;

/// Identifies a Move event type by package, module and event name.
///
/// # Example
///
/// ```
/// use sui_event_indexer::EventSelector;
///
/// let selector = EventSelector::new("0x2", "counter", "CounterIncremented");
/// assert_eq!(selector.handle(), "0x2::counter::CounterIncremented");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventSelector {
    /// Package id (the account address events are stored under).
    pub package: String,
    /// Module that emits the event.
    pub module: String,
    /// Event struct name.
    pub event: String,
}

impl EventSelector {
    /// Creates a selector from its three parts.
    pub fn new(
        package: impl Into<String>,
        module: impl Into<String>,
        event: impl Into<String>,
    ) -> Self {
        Self {
            package: package.into(),
            module: module.into(),
            event: event.into(),
        }
    }

    /// The event handle, `package::module::event`, used as the stream key.
    #[must_use]
    pub fn handle(&self) -> String {
        format!("{}::{}::{}", self.package, self.module, self.event)
    }
}

impl fmt::Display for EventSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.package, self.module, self.event)
    }
}

impl FromStr for EventSelector {
    type Err = SuiIndexerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split("::").collect();
        match parts.as_slice() {
            [package, module, event]
                if !package.is_empty() && !module.is_empty() && !event.is_empty() =>
            {
                Ok(Self::new(*package, *module, *event))
            }
            _ => Err(SuiIndexerError::ConfigError(format!(
                "Invalid event selector '{s}', expected package::module::event"
            ))),
        }
    }
}

/// Chain-assigned event identifier; also the pagination cursor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventId {
    pub tx_digest: String,
    /// Sequence of the event inside its transaction (decimal string on the wire).
    pub event_seq: String,
}

impl EventId {
    pub fn new(tx_digest: impl Into<String>, event_seq: impl Into<String>) -> Self {
        Self {
            tx_digest: tx_digest.into(),
            event_seq: event_seq.into(),
        }
    }
}

/// A single event as returned by `suix_queryEvents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainEvent {
    pub id: EventId,
    #[serde(default)]
    pub package_id: String,
    #[serde(default)]
    pub transaction_module: String,
    #[serde(default)]
    pub sender: String,
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub parsed_json: Value,
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub timestamp_ms: Option<u64>,
}

impl ChainEvent {
    /// Returns the decoded fields as an object.
    ///
    /// Non-object payloads (a bare value or null) are wrapped as `{"value": ..}`
    /// so every stored row carries a JSON object.
    #[must_use]
    pub fn data(&self) -> EventData {
        match &self.parsed_json {
            Value::Object(map) => map.clone(),
            Value::Null => EventData::new(),
            other => {
                let mut map = EventData::new();
                map.insert("value".to_string(), other.clone());
                map
            }
        }
    }
}

/// One page of a `suix_queryEvents` response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsPage {
    pub data: Vec<ChainEvent>,
    #[serde(default)]
    pub next_cursor: Option<EventId>,
    #[serde(default)]
    pub has_next_page: bool,
}

/// Persisted unit of the event table.
///
/// Rows are unique on `(event_account_address, event_handle, tx_digest, event_offset)`;
/// inserting an existing key is a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Surrogate id, only set on records read back from a store.
    pub id: Option<i64>,
    pub event_account_address: String,
    pub event_handle: String,
    /// Position of the event in its stream.
    pub event_offset: u64,
    pub tx_digest: String,
    pub block_version: u64,
    pub block_height: String,
    pub block_hash: Vec<u8>,
    /// Milliseconds since the Unix epoch.
    pub block_timestamp: u64,
    pub data: EventData,
}

impl EventRecord {
    /// Uniqueness key of the record.
    #[must_use]
    pub fn key(&self) -> (&str, &str, &str, u64) {
        (
            &self.event_account_address,
            &self.event_handle,
            &self.tx_digest,
            self.event_offset,
        )
    }
}

/// Accepts a `u64` encoded either as a JSON number or a decimal string.
pub(crate) fn de_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(u64),
        Str(String),
    }

    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(n) => Ok(n),
        NumOrStr::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

pub(crate) fn de_opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "de_u64")] u64);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(v)| v))
}
