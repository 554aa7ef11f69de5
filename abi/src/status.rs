//! Status codes returned across the port boundary.

pub const IP_SUCCESS: u32 = 0x00;
pub const IP_NO_PACKET: u32 = 0x01;
pub const IP_OVERFLOW: u32 = 0x03;
pub const IP_NO_MORE_ENTRIES: u32 = 0x17;
pub const IP_CALLER_ERROR: u32 = 0x11;
pub const IP_NOT_ENABLED: u32 = 0x14;
pub const IP_ADDRESS_ERROR: u32 = 0x21;
pub const IP_NOT_SUCCESSFUL: u32 = 0x43;
pub const IP_UNHANDLED_COMMAND: u32 = 0x44;
pub const IP_NOT_SUPPORTED: u32 = 0x4B;
pub const IP_INVALID_INTERFACE: u32 = 0x4C;
pub const IP_NOT_FOUND: u32 = 0x4E;
pub const IP_DUPLICATED_ENTRY: u32 = 0x52;
pub const IP_DRIVER_FAILED: u32 = 0x5A;

// =============================================================================
// Wait options
// =============================================================================

/// Return immediately when the request cannot be satisfied.
pub const NO_WAIT: u64 = 0;
/// Block until the request is satisfied.
pub const WAIT_FOREVER: u64 = u64::MAX;

// =============================================================================
// Status-check bits
// =============================================================================

pub const IP_INITIALIZE_DONE: u32 = 0x0001;
pub const IP_ADDRESS_RESOLVED: u32 = 0x0002;
pub const IP_LINK_ENABLED: u32 = 0x0004;
pub const IP_ARP_ENABLED: u32 = 0x0008;
pub const IP_UDP_ENABLED: u32 = 0x0010;
pub const IP_TCP_ENABLED: u32 = 0x0020;
pub const IP_IGMP_ENABLED: u32 = 0x0040;
pub const IP_RARP_COMPLETE: u32 = 0x0080;
pub const IP_INTERFACE_LINK_ENABLED: u32 = 0x0100;
