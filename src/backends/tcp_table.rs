// Fixed-layout decoder for the system TCP connection table
//
// The native-table backend receives an opaque byte buffer laid out as a
// 32-bit entry count followed by fixed-size rows. Decoding is explicit
// offset/width/byte-order work over the raw buffer, kept separate from the
// syscall plumbing so it can be exercised with synthetic buffers on any
// platform. Any drift from this layout yields wrong addresses rather than a
// parse error, so the field order below is load-bearing:
//
//   offset  width  field
//        0      4  connection state code (host order)
//        4      4  local address, four network-order bytes
//        8      4  local port, big-endian u16 in the low two bytes
//       12      4  remote address, four network-order bytes
//       16      4  remote port, big-endian u16 in the low two bytes
//       20      4  owning process id (host order)
//       24      4  offload state (ignored)

use crate::socket::SockAddr;
use anyhow::{Result, bail};
use std::net::{IpAddr, Ipv4Addr};

/// Size in bytes of one connection row.
pub const ROW_SIZE: usize = 28;

/// State code for an established connection in the native table.
pub const STATE_ESTABLISHED: u32 = 5;

/// One decoded row of the native connection table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpRow {
    pub state: u32,
    pub local: SockAddr,
    pub remote: SockAddr,
    pub pid: u32,
}

/// Decode the full table buffer: entry count, then `count` rows.
///
/// A buffer too small for its declared entry count is an error; trailing
/// bytes beyond the last row are tolerated (the sizing probe can over-ask).
pub fn parse_tcp_table(buf: &[u8]) -> Result<Vec<TcpRow>> {
    if buf.len() < 4 {
        bail!("tcp table buffer too small for entry count: {}", buf.len());
    }

    let count = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    let needed = 4 + count * ROW_SIZE;
    if buf.len() < needed {
        bail!(
            "tcp table buffer truncated: {} entries need {} bytes, got {}",
            count,
            needed,
            buf.len()
        );
    }

    let mut rows = Vec::with_capacity(count);
    for i in 0..count {
        let row = &buf[4 + i * ROW_SIZE..4 + (i + 1) * ROW_SIZE];
        rows.push(decode_row(row));
    }

    Ok(rows)
}

fn decode_row(row: &[u8]) -> TcpRow {
    TcpRow {
        state: read_u32(&row[0..4]),
        local: decode_endpoint(&row[4..12]),
        remote: decode_endpoint(&row[12..20]),
        pid: read_u32(&row[20..24]),
    }
}

/// Decode an 8-byte endpoint: four raw address bytes in network order, then
/// the port as a big-endian u16 packed into the low bytes of a u32 field.
fn decode_endpoint(bytes: &[u8]) -> SockAddr {
    let ip = Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]);
    let port = u16::from_be_bytes([bytes[4], bytes[5]]);
    SockAddr::new(IpAddr::V4(ip), port)
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_row(buf: &mut Vec<u8>, state: u32, local: (Ipv4Addr, u16), remote: (Ipv4Addr, u16), pid: u32) {
        buf.extend_from_slice(&state.to_le_bytes());
        buf.extend_from_slice(&local.0.octets());
        buf.extend_from_slice(&local.1.to_be_bytes());
        buf.extend_from_slice(&[0, 0]); // high bytes of the port field
        buf.extend_from_slice(&remote.0.octets());
        buf.extend_from_slice(&remote.1.to_be_bytes());
        buf.extend_from_slice(&[0, 0]);
        buf.extend_from_slice(&pid.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes()); // offload state
    }

    #[test]
    fn test_decodes_single_entry() {
        let mut buf = 1u32.to_le_bytes().to_vec();
        push_row(
            &mut buf,
            STATE_ESTABLISHED,
            (Ipv4Addr::new(10, 0, 1, 6), 58287),
            (Ipv4Addr::new(1, 2, 3, 4), 443),
            4242,
        );

        let rows = parse_tcp_table(&buf).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].state, STATE_ESTABLISHED);
        assert_eq!(rows[0].local.to_string(), "10.0.1.6:58287");
        assert_eq!(rows[0].remote.to_string(), "1.2.3.4:443");
        assert_eq!(rows[0].pid, 4242);
    }

    #[test]
    fn test_decodes_multiple_entries() {
        let mut buf = 2u32.to_le_bytes().to_vec();
        push_row(
            &mut buf,
            STATE_ESTABLISHED,
            (Ipv4Addr::new(192, 168, 0, 2), 50000),
            (Ipv4Addr::new(8, 8, 8, 8), 53),
            1,
        );
        push_row(
            &mut buf,
            2, // LISTEN
            (Ipv4Addr::new(0, 0, 0, 0), 22),
            (Ipv4Addr::new(0, 0, 0, 0), 0),
            2,
        );

        let rows = parse_tcp_table(&buf).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].state, 2);
        assert_eq!(rows[1].local.port, 22);
    }

    #[test]
    fn test_trailing_bytes_tolerated() {
        let mut buf = 0u32.to_le_bytes().to_vec();
        buf.extend_from_slice(&[0u8; 16]);
        assert!(parse_tcp_table(&buf).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_buffer_is_an_error() {
        let mut buf = 2u32.to_le_bytes().to_vec();
        buf.extend_from_slice(&[0u8; ROW_SIZE]); // one row, two declared
        assert!(parse_tcp_table(&buf).is_err());
    }

    #[test]
    fn test_empty_buffer_is_an_error() {
        assert!(parse_tcp_table(&[1, 0]).is_err());
    }
}
