// Shared connection/process data model used by every enumerator backend

use std::fmt;
use std::net::IpAddr;

/// An IP address paired with a port.
///
/// The textual form is `ip:port`. IPv6 addresses are bracketed
/// (`[::1]:6600`) so the rendering matches the address strings produced by
/// the process-ownership source, which is what the attribution join keys on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SockAddr {
    pub ip: IpAddr,
    pub port: u16,
}

impl SockAddr {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }
}

impl fmt::Display for SockAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ip {
            IpAddr::V4(ip) => write!(f, "{}:{}", ip, self.port),
            IpAddr::V6(ip) => write!(f, "[{}]:{}", ip, self.port),
        }
    }
}

/// The process that owns a socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    pub pid: u32,
    /// Command name. Empty when the ownership source never reported one.
    pub name: String,
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pid, self.name)
    }
}

/// Raw OS connection-state code.
///
/// The values are OS-defined and deliberately not mapped to symbolic names.
/// The text-tool backend filters on the textual state instead and reports 0
/// here, since netstat output carries no numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionState(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Tcp => write!(f, "tcp"),
        }
    }
}

/// One active connection as seen at enumeration time.
///
/// Snapshot value, not a live handle: each `list_connections` call produces
/// a fresh set. `process` is `None` when ownership attribution failed.
#[derive(Debug, Clone)]
pub struct Connection {
    pub transport: Transport,
    pub local: SockAddr,
    pub remote: SockAddr,
    pub state: ConnectionState,
    pub process: Option<Process>,
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {} state={}",
            self.transport, self.local, self.remote, self.state.0
        )?;
        match &self.process {
            Some(process) => write!(f, " ({})", process),
            None => write!(f, " (-)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sockaddr_display_ipv4() {
        let addr = SockAddr::new("10.0.1.6".parse().unwrap(), 58287);
        assert_eq!(addr.to_string(), "10.0.1.6:58287");
    }

    #[test]
    fn test_sockaddr_display_ipv6_bracketed() {
        let addr = SockAddr::new("::1".parse().unwrap(), 6600);
        assert_eq!(addr.to_string(), "[::1]:6600");
    }

    #[test]
    fn test_connection_display() {
        let connection = Connection {
            transport: Transport::Tcp,
            local: SockAddr::new("10.0.1.6".parse().unwrap(), 58287),
            remote: SockAddr::new("1.2.3.4".parse().unwrap(), 443),
            state: ConnectionState(5),
            process: None,
        };
        assert_eq!(
            connection.to_string(),
            "tcp 10.0.1.6:58287 -> 1.2.3.4:443 state=5 (-)"
        );
    }

    #[test]
    fn test_process_display() {
        let process = Process {
            pid: 100,
            name: "sshd".to_string(),
        };
        assert_eq!(process.to_string(), "100/sshd");
    }
}
