// Interface resolution and the packet capture loop

use crate::classifier;
use crate::counters::ByteCounters;
use anyhow::{Context, Result, anyhow};
use pnet::datalink::{self, Channel, Config, NetworkInterface};
use pnet::util::MacAddr;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// How long a single capture read may block before the loop rechecks the
/// stop flag.
const READ_TIMEOUT: Duration = Duration::from_millis(200);

/// The monitored interface's addresses, resolved once at startup and fixed
/// for the process lifetime. The MAC is what the classifier compares frame
/// destinations against.
#[derive(Debug, Clone, Copy)]
pub struct LocalIdentity {
    pub ipv4: Ipv4Addr,
    pub mac: MacAddr,
}

/// Look up an interface by name. Unknown names are fatal at startup.
pub fn find_interface(name: &str) -> Result<NetworkInterface> {
    datalink::interfaces()
        .into_iter()
        .find(|iface| iface.name == name)
        .ok_or_else(|| anyhow!("network interface not found: {}", name))
}

/// Resolve the interface's IPv4 and hardware addresses. Either one missing
/// is fatal: without a MAC there is no direction classification.
pub fn resolve_identity(interface: &NetworkInterface) -> Result<LocalIdentity> {
    let ipv4 = interface
        .ips
        .iter()
        .find_map(|ip| match ip.ip() {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| anyhow!("interface {} has no IPv4 address", interface.name))?;

    let mac = interface
        .mac
        .ok_or_else(|| anyhow!("interface {} has no MAC address", interface.name))?;

    Ok(LocalIdentity { ipv4, mac })
}

/// Owns the capture thread for one interface.
pub struct NetworkMonitor {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl NetworkMonitor {
    /// Open the capture channel and start the capture thread. Channel open
    /// failure is a fatal startup error; there is no retry.
    pub fn start(
        interface: NetworkInterface,
        identity: LocalIdentity,
        counters: Arc<ByteCounters>,
        stop: Arc<AtomicBool>,
    ) -> Result<Self> {
        let config = Config {
            read_timeout: Some(READ_TIMEOUT),
            ..Default::default()
        };

        let (_tx, mut rx) = match datalink::channel(&interface, config)
            .with_context(|| format!("failed to open capture channel on {}", interface.name))?
        {
            Channel::Ethernet(tx, rx) => (tx, rx),
            _ => return Err(anyhow!("unsupported channel type on {}", interface.name)),
        };

        let iface_name = interface.name.clone();
        let thread_stop = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            log::info!("packet capture started on {}", iface_name);

            while !thread_stop.load(Ordering::Relaxed) {
                match rx.next() {
                    Ok(frame) => classifier::record_frame(frame, identity.mac, &counters),
                    Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                    Err(e) => {
                        log::error!("packet receive error on {}: {}", iface_name, e);
                        thread::sleep(Duration::from_millis(100));
                    }
                }
            }

            // Dropping rx here releases the capture handle.
            log::info!("packet capture stopped on {}", iface_name);
        });

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Signal the capture loop to stop and wait for it to exit.
    pub fn shutdown(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
