// netstat table parser
//
// Parses the line-oriented table produced by `netstat -n -W -p tcp` on
// BSD-flavoured systems, where address and port are joined by the same
// delimiter as the address octets:
//
//   Active Internet connections
//   Proto Recv-Q Send-Q  Local Address          Foreign Address        (state)
//   tcp4       0      0  10.0.1.6.58287         1.2.3.4.443            ESTABLISHED
//
// The parser is intentionally strict about ports: one malformed port field
// invalidates the whole batch, since the downstream ownership join assumes a
// well-formed table.

use crate::socket::{Connection, ConnectionState, SockAddr, Transport};
use anyhow::{Context, Result};
use std::net::IpAddr;

/// Parse netstat output into established TCP connections.
///
/// Rows that are not six whitespace-separated fields, whose state is not
/// ESTABLISHED, or whose address part does not parse (zoned IPv6 forms) are
/// skipped. A row whose port is not numeric aborts the parse with an error.
pub fn parse_netstat(out: &str) -> Result<Vec<Connection>> {
    let mut connections = Vec::new();

    for line in out.lines().skip(2) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 6 {
            continue;
        }

        if fields[5] != "ESTABLISHED" {
            continue;
        }

        let Some(local) = parse_dotted_addr(fields[3])? else {
            continue;
        };
        let Some(remote) = parse_dotted_addr(fields[4])? else {
            continue;
        };

        connections.push(Connection {
            transport: Transport::Tcp,
            local,
            remote,
            // netstat reports the state textually, so no numeric code here.
            state: ConnectionState(0),
            process: None,
        });
    }

    Ok(connections)
}

/// Parse the dotted `<ip>.<port>` encoding: the last dot-separated component
/// is the port, the rest reassembled with dots is the IP. Returns `Ok(None)`
/// for fields with fewer than two components.
fn parse_dotted_addr(field: &str) -> Result<Option<SockAddr>> {
    let Some((ip_part, port_part)) = field.rsplit_once('.') else {
        return Ok(None);
    };

    let port: u16 = port_part
        .parse()
        .with_context(|| format!("invalid port in netstat field: {:?}", field))?;

    let ip: IpAddr = match ip_part.parse() {
        Ok(ip) => ip,
        Err(_) => {
            log::debug!("skipping netstat row with unparseable address: {:?}", field);
            return Ok(None);
        }
    };

    Ok(Some(SockAddr::new(ip, port)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Active Internet connections\n\
        Proto Recv-Q Send-Q  Local Address          Foreign Address        (state)\n";

    #[test]
    fn test_parses_established_row() {
        let out = format!(
            "{HEADER}tcp4       0      0  10.0.1.6.58287         1.2.3.4.443            ESTABLISHED\n"
        );
        let connections = parse_netstat(&out).unwrap();

        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].local.to_string(), "10.0.1.6:58287");
        assert_eq!(connections[0].remote.to_string(), "1.2.3.4:443");
        assert!(connections[0].process.is_none());
    }

    #[test]
    fn test_skips_header_lines() {
        // The two header lines alone yield nothing, even though they split
        // into whitespace fields.
        assert!(parse_netstat(HEADER).unwrap().is_empty());
    }

    #[test]
    fn test_skips_non_established_rows() {
        let out = format!(
            "{HEADER}\
            tcp4       0      0  10.0.1.6.58287         1.2.3.4.443            ESTABLISHED\n\
            tcp4       0      0  *.22                   *.*                    LISTEN\n\
            tcp4       0      0  10.0.1.6.49000         5.6.7.8.80             TIME_WAIT\n"
        );
        let connections = parse_netstat(&out).unwrap();

        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].local.port, 58287);
    }

    #[test]
    fn test_skips_rows_with_wrong_field_count() {
        let out = format!("{HEADER}tcp4 0 0 10.0.1.6.58287 1.2.3.4.443 ESTABLISHED extra\n");
        assert!(parse_netstat(&out).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_port_aborts_whole_parse() {
        let out = format!(
            "{HEADER}\
            tcp4       0      0  10.0.1.6.58287         1.2.3.4.443            ESTABLISHED\n\
            tcp4       0      0  10.0.1.6.oops          1.2.3.4.443            ESTABLISHED\n"
        );
        assert!(parse_netstat(&out).is_err());
    }

    #[test]
    fn test_zoned_ipv6_address_is_skipped_not_fatal() {
        let out = format!(
            "{HEADER}\
            tcp6       0      0  fe80::1%lo0.5000       fe80::2%lo0.5001       ESTABLISHED\n\
            tcp4       0      0  10.0.1.6.58287         1.2.3.4.443            ESTABLISHED\n"
        );
        let connections = parse_netstat(&out).unwrap();

        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].local.port, 58287);
    }

    #[test]
    fn test_malformed_remote_port_aborts_too() {
        let out = format!(
            "{HEADER}tcp4       0      0  10.0.1.6.58287         1.2.3.4.x              ESTABLISHED\n"
        );
        assert!(parse_netstat(&out).is_err());
    }
}
