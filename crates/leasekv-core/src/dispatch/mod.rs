//! Lease event dispatcher
//!
//! The Dispatcher routes one hook event to the minimal KV side effect that
//! realizes it:
//!
//! ```text
//! old        ── normalize ──▶ LeaseStore::put_lease
//! del        ── normalize ──▶ LeaseStore::delete_lease
//! init       ──────────────▶ LeaseStore::list_leases ──▶ dump lines
//! add, arp-add, arp-del, tftp, anything else ──▶ no-op
//! ```
//!
//! ## Failure Policy
//!
//! Every store or codec error is returned unchanged. The dispatcher never
//! retries and never degrades; the caller decides how to terminate.

use chrono::Utc;
use std::io::Write;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::event::{EventKind, HookEnv, HookEvent, normalize};
use crate::store::LeaseStore;

/// What a dispatched event did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// A record was written under `key`
    Stored { key: String },

    /// The record under `key` was removed (or was already absent)
    Deleted { key: String },

    /// `count` lease lines were written to the output
    Listed { count: usize },

    /// The event was acknowledged without touching the store
    Ignored { kind: EventKind },
}

/// Stateless router from hook events to store operations
///
/// The dispatcher owns the [`LeaseStore`] it was constructed with; there is
/// no process-wide client.
pub struct Dispatcher {
    store: LeaseStore,
}

impl Dispatcher {
    pub fn new(store: LeaseStore) -> Self {
        Self { store }
    }

    /// The store this dispatcher writes to
    pub fn store(&self) -> &LeaseStore {
        &self.store
    }

    /// Process exactly one event
    ///
    /// # Parameters
    ///
    /// - `event`: The parsed hook event
    /// - `env`: Enrichment values captured from the hook environment
    /// - `out`: Destination for the `init` dump
    ///
    /// # Returns
    ///
    /// - `Ok(Disposition)`: What the event did
    /// - `Err(Error)`: The first store, codec or output failure
    pub async fn dispatch<W: Write>(
        &self,
        event: &HookEvent,
        env: &HookEnv,
        out: &mut W,
    ) -> Result<Disposition> {
        debug!(
            "Dispatching {} event via {} backend",
            event.kind,
            self.store.backend_name()
        );

        match (&event.kind, &event.target) {
            (EventKind::Old, Some(target)) => {
                let record = normalize(&event.kind, target, env, Utc::now());
                let key = self.store.put_lease(&record).await?;
                info!(
                    "Lease refreshed: {} {} {}",
                    record.ip, record.mac, record.hostname
                );
                Ok(Disposition::Stored { key })
            }

            (EventKind::Del, Some(target)) => {
                let record = normalize(&event.kind, target, env, Utc::now());
                let key = self.store.delete_lease(&record.ip).await?;
                info!("Lease removed: {} {}", record.ip, record.mac);
                Ok(Disposition::Deleted { key })
            }

            (EventKind::Old | EventKind::Del, None) => {
                warn!("Ignoring {} event without lease fields", event.kind);
                Ok(Disposition::Ignored {
                    kind: event.kind.clone(),
                })
            }

            (EventKind::Init, _) => {
                let leases = self.store.list_leases().await?;

                // Nothing is written until every record decoded
                let mut dump = String::new();
                for lease in &leases {
                    dump.push_str(&lease.dnsmasq_line());
                    dump.push('\n');
                }
                out.write_all(dump.as_bytes())?;
                out.flush()?;

                info!("Dumped {} lease(s) for init", leases.len());
                Ok(Disposition::Listed {
                    count: leases.len(),
                })
            }

            // TODO: persist `add` once consumers agree on what an
            // unconfirmed lease should look like in the store.
            (EventKind::Add | EventKind::ArpAdd | EventKind::ArpDel | EventKind::Tftp, _) => {
                debug!("Acknowledged {} event", event.kind);
                Ok(Disposition::Ignored {
                    kind: event.kind.clone(),
                })
            }

            (EventKind::Other(cmd), _) => {
                debug!("Ignoring unrecognized event {:?}", cmd);
                Ok(Disposition::Ignored {
                    kind: event.kind.clone(),
                })
            }
        }
    }
}
