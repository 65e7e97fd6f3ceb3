// Native-table enumerator for Windows
//
// Queries the system TCP connection table through GetTcpTable2, resolved by
// name from iphlpapi.dll at startup rather than linked at build time. The
// query is two-phase: probe with a null buffer to learn the required size
// (ERROR_INSUFFICIENT_BUFFER is the expected result there), then fetch into
// an exact-size buffer with the sort flag set. Decoding the buffer lives in
// `tcp_table`, which is pure and tested with synthetic data.

use super::ConnectionEnumerator;
use super::tcp_table::{self, STATE_ESTABLISHED};
use crate::socket::{Connection, ConnectionState, Process, Transport};
use anyhow::{Context, Result, anyhow, bail};
use core::ffi::c_void;
use std::collections::HashMap;
use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryA};
use windows::core::s;

const NO_ERROR: u32 = 0;
const ERROR_INSUFFICIENT_BUFFER: u32 = 122;

/// GetTcpTable2 signature: table buffer, in/out size, sort flag.
type GetTcpTable2Fn = unsafe extern "system" fn(*mut c_void, *mut u32, u32) -> u32;

/// Enumerator backed by the IP Helper TCP table.
pub struct IpHelperEnumerator {
    get_tcp_table2: GetTcpTable2Fn,
}

impl IpHelperEnumerator {
    /// Resolve GetTcpTable2 from iphlpapi.dll. Resolution happens once; a
    /// missing library or export is a fatal startup error.
    pub fn new() -> Result<Self> {
        unsafe {
            let module =
                LoadLibraryA(s!("Iphlpapi.dll")).context("failed to load Iphlpapi.dll")?;
            let proc = GetProcAddress(module, s!("GetTcpTable2"))
                .ok_or_else(|| anyhow!("GetTcpTable2 not found in Iphlpapi.dll"))?;

            Ok(Self {
                get_tcp_table2: std::mem::transmute::<_, GetTcpTable2Fn>(proc),
            })
        }
    }

    /// Two-phase table query: size probe, then sorted fetch.
    fn query_table(&self) -> Result<Vec<u8>> {
        let mut size: u32 = 0;

        let ret = unsafe { (self.get_tcp_table2)(std::ptr::null_mut(), &mut size, 0) };
        if ret != NO_ERROR && ret != ERROR_INSUFFICIENT_BUFFER {
            bail!("GetTcpTable2 size probe failed with error code {}", ret);
        }

        let mut buf = vec![0u8; size as usize];
        // Sort flag requests ordering by local address, local port, remote
        // address, remote port.
        let ret = unsafe { (self.get_tcp_table2)(buf.as_mut_ptr() as *mut c_void, &mut size, 1) };
        if ret != NO_ERROR {
            bail!("GetTcpTable2 failed with error code {}", ret);
        }

        Ok(buf)
    }
}

impl ConnectionEnumerator for IpHelperEnumerator {
    fn name(&self) -> &'static str {
        "iphelper"
    }

    fn list_connections(&self) -> Result<Vec<Connection>> {
        let buf = self.query_table()?;
        let rows = tcp_table::parse_tcp_table(&buf)?;

        let names = process_names();

        Ok(rows
            .into_iter()
            .filter(|row| row.state == STATE_ESTABLISHED)
            .map(|row| Connection {
                transport: Transport::Tcp,
                local: row.local,
                remote: row.remote,
                state: ConnectionState(row.state),
                process: Some(Process {
                    pid: row.pid,
                    name: names.get(&row.pid).cloned().unwrap_or_default(),
                }),
            })
            .collect())
    }
}

/// Snapshot pid -> display name for every running process. Best effort:
/// rows whose pid has vanished by now keep an empty name.
fn process_names() -> HashMap<u32, String> {
    use sysinfo::System;

    let sys = System::new_all();
    sys.processes()
        .iter()
        .map(|(pid, process)| {
            (
                pid.as_u32(),
                process.name().to_str().unwrap_or_default().to_string(),
            )
        })
        .collect()
}
