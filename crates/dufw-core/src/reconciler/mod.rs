//! Firewall reconciler
//!
//! The Reconciler is responsible for:
//! - Resolving the tracked hostname on every step
//! - Comparing the result against the last applied address
//! - Adding the new allow-rule and removing the stale one via [`RuleSet`]
//! - Remembering the new address only once the firewall confirmed it
//!
//! ## Architecture
//!
//! ```text
//!                  ┌──────────────┐
//!     interval ───▶│  Reconciler  │─── ReconcileEvent ───▶ (daemon / embedder)
//!                  └──────────────┘
//!                     │        │
//!            ┌────────┘        └────────┐
//!            ▼                          ▼
//!     ┌─────────────┐           ┌─────────────┐
//!     │  Resolver   │           │   RuleSet   │
//!     │ (resolve)   │           │ (list/add/  │
//!     └─────────────┘           │  delete)    │
//!                               └─────────────┘
//! ```
//!
//! ## Step Flow
//!
//! 1. Resolve hostname (abort on failure)
//! 2. Same as last applied address → done
//! 3. Snapshot the rule list (abort on failure)
//! 4. Snapshot already has the new address → remember it, done
//! 5. Add allow-rule for the new address (abort on failure)
//! 6. Delete the old address's rule if the snapshot had it (abort on failure)
//! 7. Remember the new address

use std::net::Ipv4Addr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::DufwConfig;
use crate::error::Result;
use crate::traits::{Resolver, RuleSet};

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// Run loop started
    Started {
        domain: String,
        interval_secs: u64,
    },

    /// Hostname resolved
    AddressResolved {
        domain: String,
        addr: Ipv4Addr,
    },

    /// Resolved address equals the last applied one
    Unchanged {
        addr: Ipv4Addr,
    },

    /// Rule list already allowed the resolved address; nothing issued
    AlreadyPresent {
        addr: Ipv4Addr,
    },

    /// Allow-rule added
    RuleAdded {
        addr: Ipv4Addr,
    },

    /// Stale allow-rule deleted
    RuleDeleted {
        addr: Ipv4Addr,
    },

    /// Step aborted
    StepFailed {
        stage: &'static str,
        error: String,
    },

    /// Run loop stopped
    Stopped {
        reason: String,
    },
}

/// Result of a completed reconciliation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Resolved address equals the last applied one; firewall untouched
    Unchanged { addr: Ipv4Addr },

    /// Rule list already allowed the resolved address; no add or delete issued
    AlreadyPresent {
        addr: Ipv4Addr,
        previous: Option<Ipv4Addr>,
    },

    /// Allow-rule added, and the previous one deleted if it was installed
    Applied {
        addr: Ipv4Addr,
        previous: Option<Ipv4Addr>,
        removed_previous: bool,
    },
}

/// Keeps one allow-rule pointed at the tracked hostname
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Either call [`Reconciler::reconcile_once()`] from your own scheduler,
///    or hand control to [`Reconciler::run_until()`] / [`Reconciler::run()`]
///
/// ## Threading
///
/// Steps take `&mut self` and therefore never overlap. External commands are
/// awaited one at a time.
pub struct Reconciler {
    /// Resolver for the tracked hostname
    resolver: Box<dyn Resolver>,

    /// Packet-filter rule port
    rule_set: Box<dyn RuleSet>,

    /// Hostname to track
    domain: String,

    /// Delay between steps
    interval: Duration,

    /// Address whose allow-rule is believed installed, `None` if none is
    last_known: Option<Ipv4Addr>,

    /// When `last_known` last moved
    last_applied_at: Option<DateTime<Utc>>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ReconcileEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields
    /// reconciler events
    pub fn new(
        resolver: Box<dyn Resolver>,
        rule_set: Box<dyn RuleSet>,
        config: DufwConfig,
    ) -> Result<(Self, mpsc::Receiver<ReconcileEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);
        let interval = config.interval();

        let reconciler = Self {
            resolver,
            rule_set,
            domain: config.domain,
            interval,
            last_known: None,
            last_applied_at: None,
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    /// Start from an address whose allow-rule is already known to exist
    pub fn with_last_known(mut self, addr: Option<Ipv4Addr>) -> Self {
        self.last_known = addr;
        self
    }

    /// Address whose allow-rule is believed installed
    pub fn last_known(&self) -> Option<Ipv4Addr> {
        self.last_known
    }

    /// When the last known address last changed
    pub fn last_applied_at(&self) -> Option<DateTime<Utc>> {
        self.last_applied_at
    }

    /// Tracked hostname
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Delay between steps
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run a single reconciliation step
    ///
    /// Errors are logged here and reported as [`ReconcileEvent::StepFailed`];
    /// none of them is fatal. The last known address is left untouched on
    /// every error path.
    pub async fn reconcile_once(&mut self) -> Result<StepOutcome> {
        match self.step().await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!("Reconciliation of {} failed: {}", self.domain, e);
                self.emit_event(ReconcileEvent::StepFailed {
                    stage: e.stage(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn step(&mut self) -> Result<StepOutcome> {
        let new_addr = self.resolver.resolve_v4(&self.domain).await?;
        let previous = self.last_known;

        debug!(
            "Last address: {}, current address: {}",
            previous.map(|a| a.to_string()).unwrap_or_else(|| "none".to_string()),
            new_addr
        );
        self.emit_event(ReconcileEvent::AddressResolved {
            domain: self.domain.clone(),
            addr: new_addr,
        });

        if previous == Some(new_addr) {
            debug!("Address of {} unchanged ({}), nothing to do", self.domain, new_addr);
            self.emit_event(ReconcileEvent::Unchanged { addr: new_addr });
            return Ok(StepOutcome::Unchanged { addr: new_addr });
        }

        let snapshot = self.rule_set.list().await?;
        if snapshot.is_inactive() {
            warn!(
                "{} reports inactive status, rules are not enforced",
                self.rule_set.tool_name()
            );
        }

        let has_new = snapshot.contains(new_addr);
        let old_installed = previous.filter(|old| snapshot.contains(*old));

        if has_new {
            info!("Allow rule for {} already present", new_addr);
            if let Some(old) = old_installed {
                warn!("Stale allow rule for {} left in place", old);
            }
            self.remember(new_addr);
            self.emit_event(ReconcileEvent::AlreadyPresent { addr: new_addr });
            return Ok(StepOutcome::AlreadyPresent {
                addr: new_addr,
                previous,
            });
        }

        self.rule_set.allow_from(new_addr).await?;
        info!("Added allow rule for {}", new_addr);
        self.emit_event(ReconcileEvent::RuleAdded { addr: new_addr });

        if let Some(old) = old_installed {
            if let Err(e) = self.rule_set.delete_allow_from(old).await {
                warn!("Allow rules for both {} and {} are active", old, new_addr);
                return Err(e);
            }
            info!("Deleted allow rule for {}", old);
            self.emit_event(ReconcileEvent::RuleDeleted { addr: old });
        }

        self.remember(new_addr);
        Ok(StepOutcome::Applied {
            addr: new_addr,
            previous,
            removed_previous: old_installed.is_some(),
        })
    }

    fn remember(&mut self, addr: Ipv4Addr) {
        self.last_known = Some(addr);
        self.last_applied_at = Some(Utc::now());
    }

    /// Run steps forever, stopping on Ctrl-C
    pub async fn run(&mut self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(forward_shutdown(tokio::signal::ctrl_c(), tx));
        self.run_until(rx).await
    }

    /// Run steps forever, one immediately and then one per interval
    ///
    /// `shutdown` interrupts the sleep between steps. A step already running
    /// is finished first. A dropped sender counts as shutdown.
    pub async fn run_until(&mut self, mut shutdown: oneshot::Receiver<()>) -> Result<()> {
        info!("Tracking {} every {:?}", self.domain, self.interval);
        self.emit_event(ReconcileEvent::Started {
            domain: self.domain.clone(),
            interval_secs: self.interval.as_secs(),
        });

        loop {
            // Failures are logged inside; the next tick is the retry.
            let _ = self.reconcile_once().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.emit_event(ReconcileEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }
            }
        }

        Ok(())
    }

    /// Emit a reconciler event
    fn emit_event(&self, event: ReconcileEvent) {
        // A closed channel just means nobody is listening.
        if let Err(mpsc::error::TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

/// Fire `tx` once `signal` completes
///
/// If the signal cannot be listened for, `tx` is held forever so the loop
/// keeps running instead of reading the dropped sender as a shutdown.
async fn forward_shutdown<F>(signal: F, tx: oneshot::Sender<()>)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            let _ = tx.send(());
        }
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forward_shutdown_sends_on_signal() {
        let (tx, rx) = oneshot::channel();
        forward_shutdown(async { Ok(()) }, tx).await;
        assert!(rx.await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_forward_shutdown_keeps_sender_on_signal_error() {
        let (tx, mut rx) = oneshot::channel();
        tokio::spawn(forward_shutdown(
            async { Err(std::io::Error::other("no signal support")) },
            tx,
        ));

        let waited = tokio::time::timeout(Duration::from_secs(3600), &mut rx).await;
        assert!(waited.is_err(), "sender must stay alive");
    }

    #[test]
    fn test_event_clone_eq() {
        let event = ReconcileEvent::RuleAdded {
            addr: Ipv4Addr::new(1, 2, 3, 4),
        };
        assert_eq!(event.clone(), event);
    }
}
