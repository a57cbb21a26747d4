//! Contract Test: Hook Invocation
//!
//! Runs the real binary the way dnsmasq does: one process per event, the
//! command and lease fields as arguments, enrichment through `DNSMASQ_*`
//! variables. Uses the file backend so no agent is needed.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

const MAC: &str = "28:6c:07:85:ed:ea";
const IP: &str = "192.168.1.222";
const HOST: &str = "xiaomi_gateway";

/// Variables that must not leak in from the test runner's environment
const SCRUBBED: &[&str] = &[
    "DNSMASQ_DOMAIN",
    "DNSMASQ_TIME_REMAINING",
    "DNSMASQ_INTERFACE",
    "DNSMASQ_CLIENT_ID",
    "DNSMASQ_LEASE_EXPIRES",
    "LEASEKV_STORE",
    "LEASEKV_STORE_PATH",
    "LEASEKV_TIMEOUT_SECS",
    "LEASEKV_LOG_LEVEL",
    "CONSUL_HTTP_ADDR",
    "CONSUL_HTTP_TOKEN",
    "CONSUL_HTTP_SSL",
    "CONSUL_DATACENTER",
];

fn leasekv() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_leasekv"));
    for var in SCRUBBED {
        cmd.env_remove(var);
    }
    cmd
}

fn hook(store: &Path, args: &[&str]) -> Output {
    leasekv()
        .env("LEASEKV_STORE", "file")
        .env("LEASEKV_STORE_PATH", store)
        .args(args)
        .output()
        .expect("binary runs")
}

/// The stored record for `key`, decoded from the store file
fn stored_record(store: &Path, key: &str) -> Option<serde_json::Value> {
    let raw = std::fs::read_to_string(store).expect("store file exists");
    let file: serde_json::Value = serde_json::from_str(&raw).expect("store file is JSON");
    let value = file["entries"].get(key)?.as_str()?.to_string();
    Some(serde_json::from_str(&value).expect("stored value is a JSON record"))
}

#[test]
fn old_then_del_round_trip() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("leases.json");

    let output = hook(&store, &["old", MAC, IP, HOST]);
    assert!(output.status.success(), "old failed: {:?}", output);
    assert!(output.stdout.is_empty());

    let record = stored_record(&store, "DNSMASQ/192.168.1.222").expect("record stored");
    assert_eq!(record["mac"], MAC);
    assert_eq!(record["ip"], IP);
    assert_eq!(record["host"], HOST);
    assert_eq!(record["client_id"], "*");
    assert_eq!(record["expire"], "*");
    assert_eq!(record["cmd"], "old");

    let output = hook(&store, &["del", MAC, IP, HOST]);
    assert!(output.status.success(), "del failed: {:?}", output);
    assert!(stored_record(&store, "DNSMASQ/192.168.1.222").is_none());
}

#[test]
fn init_dumps_stored_leases() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("leases.json");

    let output = leasekv()
        .env("LEASEKV_STORE", "file")
        .env("LEASEKV_STORE_PATH", &store)
        .env("DNSMASQ_CLIENT_ID", "01:28:6c:07:85:ed:ea")
        .env("DNSMASQ_LEASE_EXPIRES", "1564497486")
        .args(["old", MAC, IP, HOST])
        .output()
        .unwrap();
    assert!(output.status.success(), "old failed: {:?}", output);

    let output = hook(&store, &["init"]);
    assert!(output.status.success(), "init failed: {:?}", output);
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "1564497486 28:6c:07:85:ed:ea 192.168.1.222 xiaomi_gateway 01:28:6c:07:85:ed:ea\n"
    );
}

#[test]
fn version_flag_skips_configuration() {
    for flag in ["-v", "--v", "-version", "--version"] {
        // An invalid store would fail with exit 1 if config were loaded
        let output = leasekv()
            .env("LEASEKV_STORE", "not-a-store")
            .arg(flag)
            .output()
            .unwrap();

        assert!(output.status.success(), "{} failed: {:?}", flag, output);
        let stdout = String::from_utf8(output.stdout).unwrap();
        assert!(
            stdout.trim_end().ends_with(&format!(": {}", env!("CARGO_PKG_VERSION"))),
            "unexpected version output for {}: {:?}",
            flag,
            stdout
        );
    }
}

#[test]
fn concurrent_hooks_keep_every_lease() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("leases.json");

    let children: Vec<_> = (1..=8)
        .map(|n| {
            leasekv()
                .env("LEASEKV_STORE", "file")
                .env("LEASEKV_STORE_PATH", &store)
                .arg("old")
                .arg(format!("aa:bb:cc:dd:ee:{:02x}", n))
                .arg(format!("10.0.0.{}", n))
                .arg(format!("host-{}", n))
                .spawn()
                .expect("binary starts")
        })
        .collect();

    for child in children {
        let output = child.wait_with_output().unwrap();
        assert!(output.status.success(), "old failed: {:?}", output);
    }

    for n in 1..=8 {
        let key = format!("DNSMASQ/10.0.0.{}", n);
        let record = stored_record(&store, &key)
            .unwrap_or_else(|| panic!("{} missing after concurrent writes", key));
        assert_eq!(record["host"], format!("host-{}", n));
    }
}

#[test]
fn unknown_command_is_a_no_op() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("leases.json");

    for args in [&["foo"][..], &["tftp", "1234", "10.0.0.2", "/tftp/pxe"][..], &[][..]] {
        let output = hook(&store, args);
        assert!(output.status.success(), "{:?} failed: {:?}", args, output);
        assert!(output.stdout.is_empty());
    }
}

#[test]
fn invalid_store_is_a_configuration_error() {
    let output = leasekv()
        .env("LEASEKV_STORE", "etcd")
        .arg("init")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(!output.stderr.is_empty());
}

#[cfg(feature = "consul")]
#[test]
fn unreachable_consul_is_a_runtime_error() {
    let output = leasekv()
        .env("LEASEKV_STORE", "consul")
        .env("CONSUL_HTTP_ADDR", "127.0.0.1:1")
        .env("LEASEKV_TIMEOUT_SECS", "2")
        .args(["old", MAC, IP, HOST])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
}
