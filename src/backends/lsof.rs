// lsof field-tagged output parser
//
// Parses `lsof -i -n -P -w -F cn` output, where each line's first character
// identifies its role: `p` starts a new process context (pid), `c` names the
// current process, `n` is a network endpoint, `f` is a file descriptor.
// A process context persists across endpoint lines until the next `p`.
//
// Example (one process with two listens and one connection):
//
//   p13100
//   cmpd
//   n[::1]:6600
//   n127.0.0.1:6600
//   n[::1]:6600->[::1]:50992
//
// Endpoints without a `->` are passive listen sockets and are skipped; the
// rest map their local endpoint string to the current process.

use crate::socket::Process;
use anyhow::{Result, bail};
use std::collections::HashMap;

/// Parse lsof output into a map from local endpoint string (as lsof renders
/// it, e.g. `10.0.1.6:58287` or `[::1]:6600`) to the owning process.
///
/// An unrecognised field tag or a non-numeric pid is a hard error: a partial
/// map would silently misattribute connections.
pub fn parse_lsof(out: &str) -> Result<HashMap<String, Process>> {
    let mut owners = HashMap::new();
    let mut current = Process {
        pid: 0,
        name: String::new(),
    };

    for line in out.lines() {
        if line.len() < 2 {
            continue;
        }

        let (tag, value) = line.split_at(1);
        match tag {
            "p" => {
                let pid: u32 = match value.parse() {
                    Ok(pid) => pid,
                    Err(_) => bail!("invalid 'p' field in lsof output: {:?}", value),
                };
                // New process context. The name arrives on a later 'c' line;
                // until then it stays unresolved.
                current = Process {
                    pid,
                    name: String::new(),
                };
            }
            "c" => {
                current.name = value.to_string();
            }
            "n" => {
                // A bare endpoint with no '->' is a listen socket.
                let Some((local, _remote)) = value.split_once("->") else {
                    continue;
                };
                owners.insert(local.to_string(), current.clone());
            }
            "f" => {
                // File descriptor lines are always selected by lsof; not
                // useful for correlation.
            }
            _ => bail!("unexpected lsof field: {:?} in {:?}", tag, value),
        }
    }

    Ok(owners)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_single_connection() {
        let out = "p100\ncsshd\nn10.0.1.6:58287->1.2.3.4:443\n";
        let owners = parse_lsof(out).unwrap();

        assert_eq!(owners.len(), 1);
        let process = &owners["10.0.1.6:58287"];
        assert_eq!(process.pid, 100);
        assert_eq!(process.name, "sshd");
    }

    #[test]
    fn test_listen_endpoints_are_skipped() {
        let out = "p13100\ncmpd\nn[::1]:6600\nn127.0.0.1:6600\nn[::1]:6600->[::1]:50992\n";
        let owners = parse_lsof(out).unwrap();

        assert_eq!(owners.len(), 1);
        assert_eq!(owners["[::1]:6600"].name, "mpd");
    }

    #[test]
    fn test_context_persists_across_endpoints() {
        let out = "p100\ncsshd\n\
            n10.0.1.6:58287->1.2.3.4:443\n\
            n10.0.1.6:58288->1.2.3.4:443\n\
            p200\ncftp\n\
            n10.0.1.6:60000->9.9.9.9:21\n";
        let owners = parse_lsof(out).unwrap();

        assert_eq!(owners["10.0.1.6:58288"].name, "sshd");
        assert_eq!(owners["10.0.1.6:60000"].pid, 200);
    }

    #[test]
    fn test_fd_lines_are_ignored() {
        let out = "p100\ncsshd\nf12\nn10.0.1.6:58287->1.2.3.4:443\n";
        let owners = parse_lsof(out).unwrap();
        assert_eq!(owners.len(), 1);
    }

    #[test]
    fn test_unknown_tag_is_an_error() {
        let out = "p100\ncsshd\nz??\n";
        assert!(parse_lsof(out).is_err());
    }

    #[test]
    fn test_non_numeric_pid_is_an_error() {
        assert!(parse_lsof("pabc\n").is_err());
    }

    #[test]
    fn test_name_before_c_line_is_empty() {
        let out = "p100\nn10.0.1.6:58287->1.2.3.4:443\ncsshd\n";
        let owners = parse_lsof(out).unwrap();
        assert_eq!(owners["10.0.1.6:58287"].name, "");
    }
}
