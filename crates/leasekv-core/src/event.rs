// # Hook Events
//
// Parsing of the DHCP server's hook invocation and normalization of a lease
// event into a [`LeaseRecord`].
//
// ## Invocation Protocol
//
// ```text
// <program> -v                              version request (also --v, -version, --version)
// <program> <cmd>                           bare command (add, init, arp-add, arp-del, tftp)
// <program> <cmd> <mac> <ip> <hostname>     lease command (old, del)
// ```
//
// Any other argument count yields an event without a recognized kind.
//
// ## Environment
//
// The hook mechanism supplies enrichment values through `DNSMASQ_*`
// environment variables. They are captured once into a [`HookEnv`] so that
// normalization itself never touches the process environment.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::record::{LeaseRecord, OrAbsent};

/// Environment variable carrying the DNS domain
pub const ENV_DOMAIN: &str = "DNSMASQ_DOMAIN";
/// Environment variable carrying the remaining lease time
pub const ENV_TIME_REMAINING: &str = "DNSMASQ_TIME_REMAINING";
/// Environment variable carrying the interface name
pub const ENV_INTERFACE: &str = "DNSMASQ_INTERFACE";
/// Environment variable carrying the DHCP client identifier
pub const ENV_CLIENT_ID: &str = "DNSMASQ_CLIENT_ID";
/// Environment variable carrying the lease expiry timestamp
pub const ENV_LEASE_EXPIRES: &str = "DNSMASQ_LEASE_EXPIRES";

/// Layout of [`LeaseRecord::time`]
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Kind of lease event delivered by the hook mechanism
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Add,
    Old,
    Del,
    Init,
    ArpAdd,
    ArpDel,
    Tftp,
    /// Anything the recorder does not recognize (including an empty command)
    Other(String),
}

impl EventKind {
    pub fn parse(cmd: &str) -> Self {
        match cmd {
            "add" => Self::Add,
            "old" => Self::Old,
            "del" => Self::Del,
            "init" => Self::Init,
            "arp-add" => Self::ArpAdd,
            "arp-del" => Self::ArpDel,
            "tftp" => Self::Tftp,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Add => "add",
            Self::Old => "old",
            Self::Del => "del",
            Self::Init => "init",
            Self::ArpAdd => "arp-add",
            Self::ArpDel => "arp-del",
            Self::Tftp => "tftp",
            Self::Other(cmd) => cmd,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Positional lease fields of an `old`/`del` invocation
///
/// Values are passed through verbatim; no MAC/IP syntax validation happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseTarget {
    pub mac: String,
    pub ip: String,
    pub hostname: String,
}

impl LeaseTarget {
    pub fn new(mac: impl Into<String>, ip: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            mac: mac.into(),
            ip: ip.into(),
            hostname: hostname.into(),
        }
    }
}

/// One lease event: its kind plus positional fields when supplied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookEvent {
    pub kind: EventKind,
    pub target: Option<LeaseTarget>,
}

impl HookEvent {
    /// A bare command without positional fields
    pub fn bare(kind: EventKind) -> Self {
        Self { kind, target: None }
    }

    /// A lease command carrying MAC, IP and hostname
    pub fn lease(kind: EventKind, target: LeaseTarget) -> Self {
        Self {
            kind,
            target: Some(target),
        }
    }

    /// Build an event from the arguments following the program name
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Self {
        match args {
            [cmd] => Self::bare(EventKind::parse(cmd.as_ref())),
            [cmd, mac, ip, hostname] => Self::lease(
                EventKind::parse(cmd.as_ref()),
                LeaseTarget::new(mac.as_ref(), ip.as_ref(), hostname.as_ref()),
            ),
            _ => Self::bare(EventKind::Other(String::new())),
        }
    }
}

/// What the program was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Print `<program>: <version>` and exit
    Version,
    /// Process one lease event
    Event(HookEvent),
}

impl Invocation {
    /// Parse the full argument vector, program name first
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Self {
        let rest = args.get(1..).unwrap_or_default();

        if let Some(first) = rest.first()
            && matches!(first.as_ref(), "-v" | "--v" | "-version" | "--version")
        {
            return Self::Version;
        }

        Self::Event(HookEvent::from_args(rest))
    }
}

/// Enrichment values supplied through the hook environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookEnv {
    pub domain: Option<String>,
    pub time_remaining: Option<String>,
    pub interface: Option<String>,
    pub client_id: Option<String>,
    pub lease_expires: Option<String>,
}

impl HookEnv {
    /// Capture the `DNSMASQ_*` variables from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Capture values through an arbitrary lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            domain: lookup(ENV_DOMAIN),
            time_remaining: lookup(ENV_TIME_REMAINING),
            interface: lookup(ENV_INTERFACE),
            client_id: lookup(ENV_CLIENT_ID),
            lease_expires: lookup(ENV_LEASE_EXPIRES),
        }
    }
}

/// Normalize a lease event into a record stamped with `now`
///
/// Missing client id and expiry become absent (`"*"`); other missing
/// environment values become empty strings.
pub fn normalize(
    kind: &EventKind,
    target: &LeaseTarget,
    env: &HookEnv,
    now: DateTime<Utc>,
) -> LeaseRecord {
    LeaseRecord {
        ip: target.ip.clone(),
        mac: target.mac.clone(),
        hostname: target.hostname.clone(),
        domain: env.domain.clone().unwrap_or_default(),
        interface: env.interface.clone().unwrap_or_default(),
        expire: OrAbsent::from_option(env.lease_expires.clone()),
        remaining_time: env.time_remaining.clone().unwrap_or_default(),
        cmd: kind.as_str().to_string(),
        client_id: OrAbsent::from_option(env.client_id.clone()),
        timestamp: now.timestamp(),
        time: now.format(TIME_FORMAT).to_string(),
    }
}

/// [`normalize`] at the current instant
pub fn normalize_now(kind: &EventKind, target: &LeaseTarget, env: &HookEnv) -> LeaseRecord {
    normalize(kind, target, env, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn gateway() -> LeaseTarget {
        LeaseTarget::new("28:6c:07:85:ed:ea", "192.168.1.222", "xiaomi_gateway")
    }

    #[test]
    fn test_parse_bare_and_lease_commands() {
        assert_eq!(
            Invocation::from_args(&["leasekv", "init"]),
            Invocation::Event(HookEvent::bare(EventKind::Init))
        );

        let parsed = Invocation::from_args(&[
            "leasekv",
            "old",
            "28:6c:07:85:ed:ea",
            "192.168.1.222",
            "xiaomi_gateway",
        ]);
        assert_eq!(
            parsed,
            Invocation::Event(HookEvent::lease(EventKind::Old, gateway()))
        );
    }

    #[test]
    fn test_parse_version_flag() {
        assert_eq!(Invocation::from_args(&["leasekv", "-v"]), Invocation::Version);
        assert_eq!(Invocation::from_args(&["leasekv", "--version"]), Invocation::Version);
        // Flags are only recognized before the command
        assert_ne!(
            Invocation::from_args(&["leasekv", "old", "-v", "1.2.3.4", "h"]),
            Invocation::Version
        );
    }

    #[test]
    fn test_parse_unexpected_argument_counts() {
        let no_args: [&str; 1] = ["leasekv"];
        for args in [
            &no_args[..],
            &["leasekv", "add", "aa:bb:cc:dd:ee:ff"][..],
            &["leasekv", "add", "aa:bb:cc:dd:ee:ff", "10.0.0.2"][..],
        ] {
            let Invocation::Event(event) = Invocation::from_args(args) else {
                panic!("expected an event for {:?}", args);
            };
            assert_eq!(event.kind, EventKind::Other(String::new()));
            assert!(event.target.is_none());
        }
    }

    #[test]
    fn test_event_kind_names() {
        for name in ["add", "old", "del", "init", "arp-add", "arp-del", "tftp"] {
            let kind = EventKind::parse(name);
            assert!(!matches!(kind, EventKind::Other(_)), "{} should be recognized", name);
            assert_eq!(kind.as_str(), name);
        }
        assert_eq!(EventKind::parse("foo"), EventKind::Other("foo".to_string()));
    }

    #[test]
    fn test_normalize_defaults_sentinels() {
        let now = Utc.with_ymd_and_hms(2019, 7, 30, 2, 38, 6).unwrap();
        let record = normalize(&EventKind::Old, &gateway(), &HookEnv::default(), now);

        assert_eq!(record.client_id.as_str(), "*");
        assert_eq!(record.expire.as_str(), "*");
        assert_eq!(record.domain, "");
        assert_eq!(record.interface, "");
        assert_eq!(record.remaining_time, "");
        assert_eq!(record.cmd, "old");
        assert_eq!(record.timestamp, 1564454286);
        assert_eq!(record.time, "2019-07-30T02:38:06.000Z");
    }

    #[test]
    fn test_normalize_uses_environment() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_DOMAIN, "lan"),
            (ENV_TIME_REMAINING, "43200"),
            (ENV_INTERFACE, "br0"),
            (ENV_CLIENT_ID, "01:28:6c:07:85:ed:ea"),
            (ENV_LEASE_EXPIRES, "1564497486"),
        ]);
        let env = HookEnv::from_lookup(|name| vars.get(name).map(|v| v.to_string()));

        let record = normalize_now(&EventKind::Old, &gateway(), &env);

        assert_eq!(record.ip, "192.168.1.222");
        assert_eq!(record.mac, "28:6c:07:85:ed:ea");
        assert_eq!(record.hostname, "xiaomi_gateway");
        assert_eq!(record.domain, "lan");
        assert_eq!(record.interface, "br0");
        assert_eq!(record.remaining_time, "43200");
        assert_eq!(record.client_id.as_str(), "01:28:6c:07:85:ed:ea");
        assert_eq!(record.expire.as_str(), "1564497486");
    }

    #[test]
    fn test_normalize_treats_empty_env_as_absent() {
        let env = HookEnv {
            client_id: Some(String::new()),
            lease_expires: Some(String::new()),
            ..HookEnv::default()
        };
        let record = normalize_now(&EventKind::Del, &gateway(), &env);

        assert!(record.client_id.is_absent());
        assert!(record.expire.is_absent());
    }

    #[test]
    fn test_normalize_passes_fields_through_unvalidated() {
        let target = LeaseTarget::new("not-a-mac", "not-an-ip", "");
        let record = normalize_now(&EventKind::Old, &target, &HookEnv::default());

        assert_eq!(record.mac, "not-a-mac");
        assert_eq!(record.ip, "not-an-ip");
        assert_eq!(record.hostname, "");
    }
}
