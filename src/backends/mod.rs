// Connection enumeration backend system
//
// One polymorphic capability, "list active TCP connections with their owning
// process", with one implementation per platform family:
// - Unix-like: shells out to netstat and lsof and joins their output
// - Windows: queries the system TCP table through iphlpapi
//
// No shared code path assumes a specific backend's data shapes; everything
// downstream works on the `socket` model types.

use crate::socket::Connection;
use anyhow::Result;

// The parsers and the table decoder are pure and platform-independent; they
// are compiled under cfg(test) everywhere so their unit tests run on any
// host, and for real only on the platform whose backend drives them.
#[cfg(any(unix, test))]
pub mod lsof;
#[cfg(any(unix, test))]
pub mod netstat;
#[cfg(any(windows, test))]
pub mod tcp_table;

#[cfg(unix)]
pub mod unix;

#[cfg(windows)]
pub mod windows;

/// Platform-agnostic connection enumerator.
///
/// Enumeration is an on-demand, potentially slow operation (external
/// processes or blocking syscalls); it is never called on the frame path.
pub trait ConnectionEnumerator: Send + Sync {
    /// Backend name (e.g., "text-tools", "iphelper")
    fn name(&self) -> &'static str;

    /// List established TCP connections with best-effort process
    /// attribution. Connections whose owner cannot be resolved are still
    /// returned, with `process` absent.
    fn list_connections(&self) -> Result<Vec<Connection>>;
}

/// Create the platform's enumerator. Unavailable facilities (missing tools,
/// unresolvable system library) fail here, at startup, not per call.
pub fn create_enumerator() -> Result<Box<dyn ConnectionEnumerator>> {
    #[cfg(unix)]
    {
        Ok(Box::new(unix::TextToolEnumerator::new()?))
    }

    #[cfg(windows)]
    {
        Ok(Box::new(windows::IpHelperEnumerator::new()?))
    }

    #[cfg(not(any(unix, windows)))]
    {
        compile_error!("Unsupported platform - only Unix-like systems and Windows are supported");
    }
}
