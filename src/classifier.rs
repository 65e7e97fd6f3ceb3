// Frame direction classification
//
// A frame whose Ethernet destination is the monitored interface's own MAC
// address arrived here (downstream); anything else is leaving (upstream).
// This is a purely local decision per frame and never consults the
// connection enumerator.

use crate::counters::ByteCounters;
use pnet::packet::ethernet::EthernetPacket;
use pnet::util::MacAddr;

/// Classify one captured frame and add its byte length to the matching
/// counter. Frames too short to carry an Ethernet header are skipped and
/// count toward neither direction.
pub fn record_frame(frame: &[u8], local_mac: MacAddr, counters: &ByteCounters) {
    let Some(ethernet) = EthernetPacket::new(frame) else {
        return;
    };

    if ethernet.get_destination() == local_mac {
        counters.add_downstream(frame.len() as u64);
    } else {
        counters.add_upstream(frame.len() as u64);
    }
}
