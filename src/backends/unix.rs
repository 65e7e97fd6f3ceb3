// Text-tool enumerator for Unix-like systems
//
// Two independent external data sources, combined by a local-address key:
// netstat supplies the connection table, lsof supplies socket ownership.
// Exact flag sets matter here; both parsers assume these output formats.

use super::ConnectionEnumerator;
use super::lsof::parse_lsof;
use super::netstat::parse_netstat;
use crate::socket::{Connection, Process};
use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::process::Command;

const NETSTAT_BINARY: &str = "netstat";
const LSOF_BINARY: &str = "lsof";

/// Enumerator backed by the netstat and lsof command-line tools.
pub struct TextToolEnumerator;

impl TextToolEnumerator {
    pub fn new() -> Result<Self> {
        if !Self::is_available() {
            bail!("netstat and lsof are required for connection enumeration");
        }
        Ok(Self)
    }

    /// Check that both external tools can be found.
    pub fn is_available() -> bool {
        binary_exists(NETSTAT_BINARY) && binary_exists(LSOF_BINARY)
    }

    fn run_netstat(&self) -> Result<String> {
        let output = Command::new(NETSTAT_BINARY)
            .args([
                "-n", // numeric addresses, no name resolving
                "-W", // wide output, no column truncation
                "-p", "tcp", // TCP only
            ])
            .output()
            .context("failed to execute netstat")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("netstat failed: {}", stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn run_lsof(&self) -> Result<String> {
        let output = Command::new(LSOF_BINARY)
            .args([
                "-i", // Internet sockets only
                "-n", "-P", // no host or port name resolving
                "-w", // suppress warnings
                "-F", "cn", // field-tagged output: command name, network endpoint
            ])
            .output()
            .context("failed to execute lsof")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("lsof failed: {}", stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn binary_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

impl ConnectionEnumerator for TextToolEnumerator {
    fn name(&self) -> &'static str {
        "text-tools"
    }

    fn list_connections(&self) -> Result<Vec<Connection>> {
        let connections = parse_netstat(&self.run_netstat()?)?;
        let owners = parse_lsof(&self.run_lsof()?)?;
        Ok(attach_owners(connections, &owners))
    }
}

/// Join the connection table against the ownership map by the local
/// endpoint's textual rendering.
///
/// Best-effort by design: a connection whose local address renders
/// differently in the two sources (IPv6 formatting can diverge) simply keeps
/// no owner; this is a documented limitation, not an error.
fn attach_owners(
    mut connections: Vec<Connection>,
    owners: &HashMap<String, Process>,
) -> Vec<Connection> {
    for connection in &mut connections {
        connection.process = owners.get(&connection.local.to_string()).cloned();
    }
    connections
}

#[cfg(test)]
mod tests {
    use super::*;

    const NETSTAT_OUT: &str = "Active Internet connections\n\
        Proto Recv-Q Send-Q  Local Address          Foreign Address        (state)\n\
        tcp4       0      0  10.0.1.6.58287         1.2.3.4.443            ESTABLISHED\n\
        tcp4       0      0  10.0.1.6.60000         9.9.9.9.21             ESTABLISHED\n";

    #[test]
    fn test_join_attaches_matching_process() {
        let connections = parse_netstat(NETSTAT_OUT).unwrap();
        let owners = parse_lsof("p100\ncsshd\nn10.0.1.6:58287->1.2.3.4:443\n").unwrap();

        let joined = attach_owners(connections, &owners);

        let process = joined[0].process.as_ref().unwrap();
        assert_eq!(process.pid, 100);
        assert_eq!(process.name, "sshd");
    }

    #[test]
    fn test_unmatched_connection_keeps_no_owner() {
        let connections = parse_netstat(NETSTAT_OUT).unwrap();
        let owners = parse_lsof("p100\ncsshd\nn10.0.1.6:58287->1.2.3.4:443\n").unwrap();

        let joined = attach_owners(connections, &owners);

        assert!(joined[1].process.is_none());
    }
}
