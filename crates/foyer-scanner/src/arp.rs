//! Neighbour-table reading for presence scanning

use anyhow::Result;
use std::net::Ipv4Addr;
use std::process::Command;
use std::str::FromStr;
use tracing::{debug, trace};

/// Neighbour table entry
#[derive(Debug, Clone)]
pub struct NeighborEntry {
    pub ip: Ipv4Addr,
    pub mac: String,
    pub state: NeighborState,
}

/// Neighbour entry state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborState {
    Reachable,
    Stale,
    Delay,
    Probe,
    Failed,
    Incomplete,
    Permanent,
    Unknown,
}

impl NeighborState {
    /// Whether an entry in this state counts as a present device.
    pub fn is_present(self) -> bool {
        matches!(self, Self::Reachable | Self::Delay | Self::Permanent)
    }
}

/// Read the kernel neighbour table.
///
/// Uses `ip neigh show` and falls back to `arp -a` (macOS and systems
/// without iproute2).
pub fn neighbor_table() -> Result<Vec<NeighborEntry>> {
    match ip_neigh_table() {
        Ok(entries) => Ok(entries),
        Err(e) => {
            debug!(error = %e, "ip neigh unavailable, falling back to arp -a");
            arp_a_table()
        }
    }
}

fn ip_neigh_table() -> Result<Vec<NeighborEntry>> {
    let output = Command::new("ip").args(["neigh", "show"]).output()?;

    if !output.status.success() {
        anyhow::bail!(
            "ip neigh failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let entries: Vec<NeighborEntry> = stdout.lines().filter_map(parse_ip_neigh_line).collect();

    debug!("Found {} neighbour entries", entries.len());
    Ok(entries)
}

fn arp_a_table() -> Result<Vec<NeighborEntry>> {
    let output = Command::new("arp").arg("-a").output()?;

    if !output.status.success() {
        anyhow::bail!("arp -a failed: {}", String::from_utf8_lossy(&output.stderr));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let entries: Vec<NeighborEntry> = stdout.lines().filter_map(parse_arp_a_line).collect();

    debug!("Found {} ARP entries", entries.len());
    Ok(entries)
}

/// Parse a line from `ip neigh show` output
fn parse_ip_neigh_line(line: &str) -> Option<NeighborEntry> {
    // Format: "192.168.1.1 dev eth0 lladdr aa:bb:cc:dd:ee:ff REACHABLE"
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 4 {
        return None;
    }

    let ip = Ipv4Addr::from_str(parts[0]).ok()?;

    let lladdr_idx = parts.iter().position(|&p| p == "lladdr")?;
    let mac = parts.get(lladdr_idx + 1)?.to_string();

    let state = parts
        .last()
        .map(|s| parse_neighbor_state(s))
        .unwrap_or(NeighborState::Unknown);

    Some(NeighborEntry { ip, mac, state })
}

/// Parse a line from `arp -a` output
fn parse_arp_a_line(line: &str) -> Option<NeighborEntry> {
    // Format: "router.lan (192.168.1.1) at aa:bb:cc:dd:ee:ff on en0 ifscope [ethernet]"
    let open = line.find('(')?;
    let close = line[open..].find(')')? + open;
    let ip = Ipv4Addr::from_str(&line[open + 1..close]).ok()?;

    let at_idx = line.find(" at ")?;
    let mac = line[at_idx + 4..].split_whitespace().next()?.to_string();
    if mac == "(incomplete)" {
        return None;
    }

    // arp -a carries no state; every listed entry counts as present
    Some(NeighborEntry {
        ip,
        mac,
        state: NeighborState::Reachable,
    })
}

fn parse_neighbor_state(s: &str) -> NeighborState {
    match s.to_uppercase().as_str() {
        "REACHABLE" => NeighborState::Reachable,
        "STALE" => NeighborState::Stale,
        "DELAY" => NeighborState::Delay,
        "PROBE" => NeighborState::Probe,
        "FAILED" => NeighborState::Failed,
        "INCOMPLETE" => NeighborState::Incomplete,
        "PERMANENT" => NeighborState::Permanent,
        _ => NeighborState::Unknown,
    }
}

/// Validate a MAC address: six groups of 1-2 hex digits separated by
/// `:` or `-`.
pub fn is_valid_mac(mac: &str) -> bool {
    let groups: Vec<&str> = mac.split(|c| c == ':' || c == '-').collect();
    groups.len() == 6
        && groups.iter().all(|g| {
            (1..=2).contains(&g.len()) && g.chars().all(|c| c.is_ascii_hexdigit())
        })
}

/// Normalize a MAC address to lowercase, zero-padded, colon-separated
/// pairs. `arp -a` on macOS drops leading zeros.
pub fn normalize_mac(mac: &str) -> String {
    mac.split(|c| c == ':' || c == '-')
        .map(|group| format!("{:0>2}", group.to_ascii_lowercase()))
        .collect::<Vec<_>>()
        .join(":")
}

/// Best-effort reverse hostname lookup via the system resolver.
pub fn resolve_hostname(ip: Ipv4Addr) -> Option<String> {
    let output = Command::new("getent")
        .args(["hosts", &ip.to_string()])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let hostname = stdout.split_whitespace().nth(1)?.to_string();
    trace!(ip = %ip, hostname = %hostname, "Resolved hostname");
    Some(hostname)
}
