// # Lease Record
//
// The normalized representation of one DHCP lease, and its storage codec.
//
// ## Wire Format
//
// Records are stored as compact JSON objects keyed by field name:
//
// ```json
// {
//   "ip": "192.168.1.222",
//   "mac": "28:6c:07:85:ed:ea",
//   "host": "xiaomi_gateway",
//   "domain": "lan",
//   "interface": "br0",
//   "expire": "1564497486",
//   "remaining_time": "43200",
//   "cmd": "old",
//   "client_id": "*",
//   "timestamp": 1564454286,
//   "time": "2019-07-30T02:38:06.000Z"
// }
// ```
//
// The hostname lives under `host` so that records written by earlier
// deployments stay readable. Unknown fields are ignored on decode.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{Error, Result};

/// Wire marker for a value the event source did not supply
pub const ABSENT: &str = "*";

/// A string field that is either absent or carries a non-empty value
///
/// Absence is encoded as [`ABSENT`] on the wire and in the `init` dump.
/// An empty string or a literal `"*"` always collapses to absent, so a
/// present value can never be confused with the marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct OrAbsent(Option<String>);

impl OrAbsent {
    /// The absent value
    pub fn absent() -> Self {
        Self(None)
    }

    /// Wrap a raw value, collapsing `""` and `"*"` to absent
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() || value == ABSENT {
            Self(None)
        } else {
            Self(Some(value))
        }
    }

    /// Wrap an optional raw value (e.g. an environment lookup)
    pub fn from_option(value: Option<String>) -> Self {
        value.map(Self::new).unwrap_or_default()
    }

    pub fn is_absent(&self) -> bool {
        self.0.is_none()
    }

    /// The present value, if any
    pub fn value(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Wire form: the value, or [`ABSENT`]
    pub fn as_str(&self) -> &str {
        self.0.as_deref().unwrap_or(ABSENT)
    }
}

impl fmt::Display for OrAbsent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OrAbsent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OrAbsent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(raw))
    }
}

/// One DHCP lease, keyed in the store by its IP address
///
/// Records are never mutated once written: every `old` event produces a
/// fresh record that fully replaces the previous value for the same IP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseRecord {
    /// IPv4/IPv6 textual address; primary identity
    pub ip: String,

    /// Hardware address as supplied by the event source
    pub mac: String,

    /// Client-advertised hostname; may be empty
    #[serde(rename = "host")]
    pub hostname: String,

    /// DNS domain context at write time
    #[serde(default)]
    pub domain: String,

    /// Interface the lease was observed on
    #[serde(default)]
    pub interface: String,

    /// Lease expiry; absent for static/infinite leases
    pub expire: OrAbsent,

    /// Seconds remaining, verbatim from the event source
    #[serde(default)]
    pub remaining_time: String,

    /// Event kind that produced this record
    #[serde(default)]
    pub cmd: String,

    /// DHCP client identifier
    pub client_id: OrAbsent,

    /// Processing time, Unix seconds
    #[serde(default)]
    pub timestamp: i64,

    /// Processing time, `YYYY-MM-DDTHH:MM:SS.mmmZ` in UTC
    #[serde(default)]
    pub time: String,
}

impl LeaseRecord {
    /// Serialize to the storage encoding
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| Error::encode(format!("Failed to encode lease {}: {}", self.ip, e)))
    }

    /// Deserialize from the storage encoding
    ///
    /// Fails with [`Error::Decode`] on malformed or truncated input; no
    /// partially populated record is ever returned.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::decode(format!("Invalid lease record: {}", e)))
    }

    /// Format as a dnsmasq `init` line: `expire mac ip hostname client_id`
    pub fn dnsmasq_line(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.expire, self.mac, self.ip, self.hostname, self.client_id
        )
    }
}
