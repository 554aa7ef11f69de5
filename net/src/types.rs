//! Type-safe primitives for the IP core.
//!
//! Addresses are zero-cost newtypes stored in network byte order. Masks and
//! networks are compared as host-order `u32` so "numerically larger mask"
//! means "more specific prefix".

use core::fmt;

use ipcore_abi::net::{
    IP_LINK_LOCAL_MASK, IP_LINK_LOCAL_NETWORK, IP_MULTICAST_MAC_MASK, IP_MULTICAST_MAC_PREFIX,
};
use ipcore_abi::status;

// =============================================================================
// Newtype wrappers
// =============================================================================

/// IPv4 address stored in **network byte order** (`[u8; 4]`).
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Ipv4Addr(pub [u8; 4]);

impl Ipv4Addr {
    /// The wildcard address `0.0.0.0`.
    pub const UNSPECIFIED: Self = Self([0, 0, 0, 0]);
    /// The limited broadcast address `255.255.255.255`.
    pub const BROADCAST: Self = Self([255, 255, 255, 255]);
    pub const LOCALHOST: Self = Self([127, 0, 0, 1]);

    #[inline]
    pub const fn new(a: u8, b: u8, c: u8, d: u8) -> Self {
        Self([a, b, c, d])
    }

    /// Construct from a host-order `u32` (`0xC0A8_0101` is `192.168.1.1`).
    #[inline]
    pub const fn from_u32(val: u32) -> Self {
        Self(val.to_be_bytes())
    }

    /// Return the address as a host-order `u32`.
    #[inline]
    pub const fn to_u32(self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    #[inline]
    pub const fn is_loopback(&self) -> bool {
        self.0[0] == 127
    }

    #[inline]
    pub const fn is_broadcast(&self) -> bool {
        self.to_u32() == u32::MAX
    }

    /// `true` if the address is in the multicast range `224.0.0.0/4`.
    #[inline]
    pub const fn is_multicast(&self) -> bool {
        self.0[0] >= 224 && self.0[0] <= 239
    }

    #[inline]
    pub const fn is_unspecified(&self) -> bool {
        self.to_u32() == 0
    }

    /// `true` for `169.254.0.0/16`.
    #[inline]
    pub const fn is_link_local(&self) -> bool {
        self.to_u32() & IP_LINK_LOCAL_MASK == IP_LINK_LOCAL_NETWORK
    }

    /// `self & mask`.
    #[inline]
    pub const fn network(self, mask: Ipv4Addr) -> Ipv4Addr {
        Ipv4Addr::from_u32(self.to_u32() & mask.to_u32())
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Debug for Ipv4Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

impl fmt::Display for Ipv4Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 48-bit physical (MAC) address.
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const ZERO: Self = Self([0; 6]);
    pub const BROADCAST: Self = Self([0xFF; 6]);

    /// Link-layer group address for an IPv4 multicast group:
    /// `01:00:5E` followed by the low 23 bits of the group.
    pub const fn ipv4_multicast(group: Ipv4Addr) -> Self {
        let low = (group.to_u32() & IP_MULTICAST_MAC_MASK).to_be_bytes();
        Self([
            IP_MULTICAST_MAC_PREFIX[0],
            IP_MULTICAST_MAC_PREFIX[1],
            IP_MULTICAST_MAC_PREFIX[2],
            low[1],
            low[2],
            low[3],
        ])
    }

    /// `true` if the group bit (LSB of the first octet) is set.
    #[inline]
    pub const fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        let b = &self.0;
        b[0] == 0 && b[1] == 0 && b[2] == 0 && b[3] == 0 && b[4] == 0 && b[5] == 0
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Slot index into an instance's interface table.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IfIndex(pub usize);

impl fmt::Display for IfIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if{}", self.0)
    }
}

// =============================================================================
// IpError
// =============================================================================

/// Unified error type for every IP core operation.
///
/// Nothing here is fatal; each variant is returned to the caller, which
/// decides whether to retry, pick another interface, or drop its buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IpError {
    /// No viable interface or route for the address.
    AddressError,
    /// A non-wildcard address already belongs to a valid interface.
    DuplicateAddress,
    /// The static routing table is full.
    Overflow,
    /// Every interface slot is in use.
    NoFreeSlot,
    /// Delete or lookup miss.
    NotFound,
    /// Index out of range or slot not attached.
    InvalidInterface,
    /// Feature compiled out.
    NotSupported,
    /// Raw receive found nothing within its wait budget.
    NoPacket,
    /// The driver does not recognize the command.
    Unhandled,
    /// The driver recognized the command but failed it.
    DriverFailed,
    /// Raw packet service is disabled.
    NotEnabled,
    /// A status poll ran out of budget.
    NotSuccessful,
    /// Thread-only operation called from interrupt context.
    CallerError,
}

impl IpError {
    /// Numeric status code for C-style ports.
    pub const fn to_status(&self) -> u32 {
        match self {
            Self::AddressError => status::IP_ADDRESS_ERROR,
            Self::DuplicateAddress => status::IP_DUPLICATED_ENTRY,
            Self::Overflow => status::IP_OVERFLOW,
            Self::NoFreeSlot => status::IP_NO_MORE_ENTRIES,
            Self::NotFound => status::IP_NOT_FOUND,
            Self::InvalidInterface => status::IP_INVALID_INTERFACE,
            Self::NotSupported => status::IP_NOT_SUPPORTED,
            Self::NoPacket => status::IP_NO_PACKET,
            Self::Unhandled => status::IP_UNHANDLED_COMMAND,
            Self::DriverFailed => status::IP_DRIVER_FAILED,
            Self::NotEnabled => status::IP_NOT_ENABLED,
            Self::NotSuccessful => status::IP_NOT_SUCCESSFUL,
            Self::CallerError => status::IP_CALLER_ERROR,
        }
    }
}

impl fmt::Display for IpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressError => write!(f, "no route to address"),
            Self::DuplicateAddress => write!(f, "address already assigned"),
            Self::Overflow => write!(f, "routing table full"),
            Self::NoFreeSlot => write!(f, "no free interface slot"),
            Self::NotFound => write!(f, "entry not found"),
            Self::InvalidInterface => write!(f, "invalid interface"),
            Self::NotSupported => write!(f, "feature not supported"),
            Self::NoPacket => write!(f, "no packet available"),
            Self::Unhandled => write!(f, "driver command unhandled"),
            Self::DriverFailed => write!(f, "driver command failed"),
            Self::NotEnabled => write!(f, "raw packet service not enabled"),
            Self::NotSuccessful => write!(f, "status not reached in time"),
            Self::CallerError => write!(f, "invalid caller context"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_classes() {
        assert!(Ipv4Addr::new(169, 254, 3, 4).is_link_local());
        assert!(!Ipv4Addr::new(169, 253, 3, 4).is_link_local());
        assert!(Ipv4Addr::new(239, 1, 1, 1).is_multicast());
        assert!(Ipv4Addr::BROADCAST.is_broadcast());
        assert_eq!(
            Ipv4Addr::new(10, 1, 2, 3).network(Ipv4Addr::new(255, 255, 0, 0)),
            Ipv4Addr::new(10, 1, 0, 0)
        );
        assert_eq!(Ipv4Addr::from_u32(0xC0A8_0101), Ipv4Addr::new(192, 168, 1, 1));
    }

    #[test]
    fn multicast_mac_uses_low_23_bits() {
        let mac = MacAddr::ipv4_multicast(Ipv4Addr::new(239, 129, 2, 3));
        assert_eq!(mac, MacAddr([0x01, 0x00, 0x5E, 0x01, 0x02, 0x03]));
        assert!(mac.is_multicast());
    }
}
