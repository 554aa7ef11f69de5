//! Link driver commands, helper events and IPv4 protocol constants.

// =============================================================================
// Link driver command codes
// =============================================================================

pub const LINK_PACKET_SEND: u32 = 0;
pub const LINK_INITIALIZE: u32 = 1;
pub const LINK_ENABLE: u32 = 2;
pub const LINK_DISABLE: u32 = 3;
pub const LINK_MULTICAST_JOIN: u32 = 8;
pub const LINK_MULTICAST_LEAVE: u32 = 9;
pub const LINK_GET_STATUS: u32 = 10;
pub const LINK_DEFERRED_PROCESSING: u32 = 18;
pub const LINK_INTERFACE_ATTACH: u32 = 19;
pub const LINK_SET_PHYSICAL_ADDRESS: u32 = 20;
pub const LINK_INTERFACE_CAPABILITY_GET: u32 = 21;
pub const LINK_INTERFACE_CAPABILITY_SET: u32 = 22;
pub const LINK_INTERFACE_DETACH: u32 = 23;
/// First code available to driver-private commands.
pub const LINK_USER_COMMAND: u32 = 50;

// =============================================================================
// Helper task event bits
// =============================================================================

pub const IP_PERIODIC_EVENT: u32 = 0x0001;
pub const IP_UNFRAG_EVENT: u32 = 0x0002;
pub const IP_ICMP_EVENT: u32 = 0x0004;
pub const IP_RECEIVE_EVENT: u32 = 0x0008;
pub const IP_ARP_REC_EVENT: u32 = 0x0010;
pub const IP_RARP_REC_EVENT: u32 = 0x0020;
pub const IP_IGMP_EVENT: u32 = 0x0040;
pub const IP_TCP_EVENT: u32 = 0x0080;
pub const IP_FAST_EVENT: u32 = 0x0100;
pub const IP_DRIVER_PACKET_EVENT: u32 = 0x0200;
pub const IP_IGMP_ENABLE_EVENT: u32 = 0x0400;
pub const IP_DRIVER_DEFERRED_EVENT: u32 = 0x0800;
pub const IP_TCP_CLEANUP_DEFERRED: u32 = 0x1000;
pub const IP_LINK_STATUS_EVENT: u32 = 0x2000;
pub const IP_ALL_EVENTS: u32 = 0x3FFF;

// =============================================================================
// Interface capability bits
// =============================================================================

pub const CAP_IPV4_TX_CHECKSUM: u32 = 0x0000_0001;
pub const CAP_IPV4_RX_CHECKSUM: u32 = 0x0000_0002;
pub const CAP_TCP_TX_CHECKSUM: u32 = 0x0000_0004;
pub const CAP_TCP_RX_CHECKSUM: u32 = 0x0000_0008;
pub const CAP_UDP_TX_CHECKSUM: u32 = 0x0000_0010;
pub const CAP_UDP_RX_CHECKSUM: u32 = 0x0000_0020;
pub const CAP_ICMPV4_TX_CHECKSUM: u32 = 0x0000_0040;
pub const CAP_ICMPV4_RX_CHECKSUM: u32 = 0x0000_0080;
pub const CAP_ICMPV6_RX_CHECKSUM: u32 = 0x0000_0100;
pub const CAP_ICMPV6_TX_CHECKSUM: u32 = 0x0000_0200;
pub const CAP_IGMP_TX_CHECKSUM: u32 = 0x0000_0400;
pub const CAP_IGMP_RX_CHECKSUM: u32 = 0x0000_0800;
pub const CAP_PTP_TIMESTAMP: u32 = 0x0000_1000;
pub const CAP_TCPIP_OFFLOAD: u32 = 0x0000_2000;

// =============================================================================
// IPv4 constants
// =============================================================================

/// Default time-to-live for locally originated datagrams.
pub const IP_TIME_TO_LIVE: u8 = 0x80;
/// Protocol number stamped on raw datagrams.
pub const IP_RAW_PROTOCOL: u8 = 0xFF;
pub const IP_FRAGMENT_OKAY: u16 = 0x0000;
pub const IP_DONT_FRAGMENT: u16 = 0x4000;
pub const IP_TOS_NORMAL: u8 = 0x00;

/// All-hosts group joined on every interface when multicast is enabled.
pub const IP_ALL_HOSTS_ADDRESS: u32 = 0xE000_0001;
pub const IP_LINK_LOCAL_NETWORK: u32 = 0xA9FE_0000;
pub const IP_LINK_LOCAL_MASK: u32 = 0xFFFF_0000;
pub const IP_LOOPBACK_ADDRESS: u32 = 0x7F00_0001;
pub const IP_LOOPBACK_MASK: u32 = 0xFF00_0000;

/// Upper 25 bits of an IPv4 multicast MAC address (01:00:5E).
pub const IP_MULTICAST_MAC_PREFIX: [u8; 3] = [0x01, 0x00, 0x5E];
pub const IP_MULTICAST_MAC_MASK: u32 = 0x007F_FFFF;

pub const DEFAULT_IP_MTU: u32 = 1500;
pub const LOOPBACK_MTU: u32 = 65535;
