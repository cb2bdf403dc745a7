//! Test doubles and common utilities for reconciler contract tests
//!
//! The doubles are `Clone` and share their state through `Arc`, so a test
//! can hand one copy to the reconciler and keep another for assertions.

#![allow(dead_code)]

use dufw_core::config::DufwConfig;
use dufw_core::error::{Error, Result};
use dufw_core::traits::{Resolver, RuleSet, RuleSnapshot};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A resolver whose answer the test controls
#[derive(Clone)]
pub struct FakeResolver {
    /// Address to return, `None` to fail
    answer: Arc<Mutex<Option<Ipv4Addr>>>,
    /// Call counter for resolve_v4()
    call_count: Arc<AtomicUsize>,
}

impl FakeResolver {
    pub fn new(answer: Option<Ipv4Addr>) -> Self {
        Self {
            answer: Arc::new(Mutex::new(answer)),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Change the answer for subsequent lookups
    pub fn set(&self, answer: Option<Ipv4Addr>) {
        *self.answer.lock().unwrap() = answer;
    }

    /// Get the number of times resolve_v4() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Resolver for FakeResolver {
    async fn resolve_v4(&self, host: &str) -> Result<Ipv4Addr> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let answer = *self.answer.lock().unwrap();
        answer.ok_or_else(|| Error::resolution(host, "lookup failed"))
    }
}

/// A command issued against the rule set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCommand {
    List,
    Allow(Ipv4Addr),
    Delete(Ipv4Addr),
}

/// A rule set that records commands and keeps an in-memory status text
///
/// Successful adds append a rule line; successful deletes drop the lines
/// mentioning the address, the way ufw's own table would change.
#[derive(Clone)]
pub struct RecordingRuleSet {
    rules: Arc<Mutex<Vec<String>>>,
    commands: Arc<Mutex<Vec<RuleCommand>>>,
    fail_list: Arc<AtomicBool>,
    fail_add: Arc<AtomicBool>,
    fail_delete: Arc<AtomicBool>,
    inactive: Arc<AtomicBool>,
}

impl RecordingRuleSet {
    /// Create a rule set that already allows `addrs`
    pub fn with_rules(addrs: &[Ipv4Addr]) -> Self {
        Self {
            rules: Arc::new(Mutex::new(addrs.iter().map(|a| rule_line(*a)).collect())),
            commands: Arc::new(Mutex::new(Vec::new())),
            fail_list: Arc::new(AtomicBool::new(false)),
            fail_add: Arc::new(AtomicBool::new(false)),
            fail_delete: Arc::new(AtomicBool::new(false)),
            inactive: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn empty() -> Self {
        Self::with_rules(&[])
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_add(&self, fail: bool) {
        self.fail_add.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Report `Status: inactive` in listings (rules are still recorded)
    pub fn set_inactive(&self, inactive: bool) {
        self.inactive.store(inactive, Ordering::SeqCst);
    }

    /// Every command issued so far, in order
    pub fn commands(&self) -> Vec<RuleCommand> {
        self.commands.lock().unwrap().clone()
    }

    /// Add and delete commands issued so far, in order
    pub fn mutations(&self) -> Vec<RuleCommand> {
        self.commands()
            .into_iter()
            .filter(|c| *c != RuleCommand::List)
            .collect()
    }

    /// Forget recorded commands (rules are kept)
    pub fn clear_commands(&self) {
        self.commands.lock().unwrap().clear();
    }

    /// Whether an allow-rule for `addr` is currently installed
    pub fn allows(&self, addr: Ipv4Addr) -> bool {
        let needle = addr.to_string();
        self.rules.lock().unwrap().iter().any(|l| l.contains(&needle))
    }

    fn record(&self, command: RuleCommand) {
        self.commands.lock().unwrap().push(command);
    }
}

fn rule_line(addr: Ipv4Addr) -> String {
    format!("Anywhere                   ALLOW IN    {}", addr)
}

#[async_trait::async_trait]
impl RuleSet for RecordingRuleSet {
    async fn list(&self) -> Result<RuleSnapshot> {
        self.record(RuleCommand::List);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Error::rule_query("exit status: 1"));
        }

        if self.inactive.load(Ordering::SeqCst) {
            return Ok(RuleSnapshot::new("Status: inactive\n"));
        }

        let mut text = String::from(
            "Status: active\n\n     To                         Action      From\n",
        );
        for (i, line) in self.rules.lock().unwrap().iter().enumerate() {
            text.push_str(&format!("[{:>2}] {}\n", i + 1, line));
        }
        Ok(RuleSnapshot::new(text))
    }

    async fn allow_from(&self, addr: Ipv4Addr) -> Result<()> {
        self.record(RuleCommand::Allow(addr));
        if self.fail_add.load(Ordering::SeqCst) {
            return Err(Error::rule_add(addr, "exit status: 1"));
        }
        self.rules.lock().unwrap().push(rule_line(addr));
        Ok(())
    }

    async fn delete_allow_from(&self, addr: Ipv4Addr) -> Result<()> {
        self.record(RuleCommand::Delete(addr));
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Error::rule_delete(addr, "exit status: 1"));
        }
        let needle = addr.to_string();
        self.rules.lock().unwrap().retain(|l| !l.contains(&needle));
        Ok(())
    }

    fn tool_name(&self) -> &'static str {
        "recording"
    }
}

pub const OLD: Ipv4Addr = Ipv4Addr::new(1, 2, 3, 4);
pub const NEW: Ipv4Addr = Ipv4Addr::new(5, 6, 7, 8);

/// Helper to create a minimal DufwConfig for testing
pub fn minimal_config(domain: &str) -> DufwConfig {
    DufwConfig::new(domain).with_interval_secs(1)
}
