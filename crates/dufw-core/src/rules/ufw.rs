// # ufw Rule Set
//
// [`RuleSet`] implementation that shells out to the `ufw` command line tool.
//
// ## Commands
//
// - `ufw status numbered` → snapshot text
// - `ufw allow from <addr>`
// - `ufw delete allow from <addr>`
// - `ufw version` → startup availability check
//
// Success is judged by exit status alone. Commands are not given a timeout;
// a hung `ufw` stalls the caller.

use std::net::Ipv4Addr;
use std::process::{Output, Stdio};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::config::DufwConfig;
use crate::traits::{RuleSet, RuleSnapshot};
use crate::{Error, Result};

/// ufw-backed [`RuleSet`]
#[derive(Debug, Clone)]
pub struct UfwRuleSet {
    /// Program to execute (`ufw`, `sudo`, ...)
    program: String,

    /// Arguments placed before every subcommand (e.g. `ufw` after `sudo`)
    base_args: Vec<String>,
}

impl UfwRuleSet {
    /// Invoke `ufw` from `PATH`
    pub fn new() -> Self {
        Self {
            program: "ufw".to_string(),
            base_args: Vec::new(),
        }
    }

    /// Build from a command line, program first (e.g. `["sudo", "ufw"]`)
    pub fn from_command(command: &[String]) -> Result<Self> {
        let (program, rest) = command
            .split_first()
            .ok_or_else(|| Error::config("ufw command cannot be empty"))?;

        if program.trim().is_empty() {
            return Err(Error::config("ufw command cannot be empty"));
        }

        Ok(Self {
            program: program.clone(),
            base_args: rest.to_vec(),
        })
    }

    /// Build from the `ufw_command` setting
    pub fn from_config(config: &DufwConfig) -> Result<Self> {
        Self::from_command(&config.ufw_command)
    }

    /// Verify the tool can be run, returning the first line of `ufw version`
    ///
    /// Fails with [`Error::ToolUnavailable`]. This is the one fatal check at
    /// startup.
    pub async fn check_available(&self) -> Result<String> {
        let output = self
            .invoke(&["version"])
            .await
            .map_err(|e| Error::tool_unavailable(format!("{}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(Error::tool_unavailable(describe_failure(&output)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }

    /// Run `<program> <base_args> <args>` to completion, capturing output
    async fn invoke(&self, args: &[&str]) -> std::io::Result<Output> {
        debug!("Running {} {:?} {:?}", self.program, self.base_args, args);

        Command::new(&self.program)
            .args(&self.base_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
    }
}

impl Default for UfwRuleSet {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuleSet for UfwRuleSet {
    async fn list(&self) -> Result<RuleSnapshot> {
        let output = self
            .invoke(&["status", "numbered"])
            .await
            .map_err(|e| Error::rule_query(format!("failed to spawn {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(Error::rule_query(describe_failure(&output)));
        }

        let text = String::from_utf8(output.stdout)
            .map_err(|e| Error::rule_query(format!("unreadable status output: {}", e)))?;

        Ok(RuleSnapshot::new(text))
    }

    async fn allow_from(&self, addr: Ipv4Addr) -> Result<()> {
        let addr_text = addr.to_string();
        let output = self
            .invoke(&["allow", "from", addr_text.as_str()])
            .await
            .map_err(|e| Error::rule_add(addr, format!("failed to spawn {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(Error::rule_add(addr, describe_failure(&output)));
        }
        Ok(())
    }

    async fn delete_allow_from(&self, addr: Ipv4Addr) -> Result<()> {
        let addr_text = addr.to_string();
        let output = self
            .invoke(&["delete", "allow", "from", addr_text.as_str()])
            .await
            .map_err(|e| {
                Error::rule_delete(addr, format!("failed to spawn {}: {}", self.program, e))
            })?;

        if !output.status.success() {
            return Err(Error::rule_delete(addr, describe_failure(&output)));
        }
        Ok(())
    }

    fn tool_name(&self) -> &'static str {
        "ufw"
    }
}

/// Summarize a failed invocation as `<status>: <stderr lines>`
fn describe_failure(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let detail: Vec<&str> = stderr
        .lines()
        .map(|line| line.trim().trim_start_matches("ERROR: "))
        .filter(|line| !line.is_empty())
        .collect();

    if detail.is_empty() {
        output.status.to_string()
    } else {
        format!("{}: {}", output.status, detail.join("; "))
    }
}
