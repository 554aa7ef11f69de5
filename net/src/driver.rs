//! Link driver interface.
//!
//! Every transport (Ethernet MAC, PPP, loopback shim, test double) is an
//! [`IpDriver`]. The core talks to it with one tagged [`DriverCommand`] at a
//! time; per-command payloads ride in the variant, and the driver reports
//! interface properties by writing the [`LinkInfo`] it is handed.

use core::fmt;

use bitflags::bitflags;
use ipcore_abi::net as abi;

use crate::types::{IfIndex, MacAddr};

bitflags! {
    /// Offload capabilities a driver reports during `Initialize`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct InterfaceCapability: u32 {
        const IPV4_TX_CHECKSUM = abi::CAP_IPV4_TX_CHECKSUM;
        const IPV4_RX_CHECKSUM = abi::CAP_IPV4_RX_CHECKSUM;
        const TCP_TX_CHECKSUM = abi::CAP_TCP_TX_CHECKSUM;
        const TCP_RX_CHECKSUM = abi::CAP_TCP_RX_CHECKSUM;
        const UDP_TX_CHECKSUM = abi::CAP_UDP_TX_CHECKSUM;
        const UDP_RX_CHECKSUM = abi::CAP_UDP_RX_CHECKSUM;
        const ICMPV4_TX_CHECKSUM = abi::CAP_ICMPV4_TX_CHECKSUM;
        const ICMPV4_RX_CHECKSUM = abi::CAP_ICMPV4_RX_CHECKSUM;
        const ICMPV6_RX_CHECKSUM = abi::CAP_ICMPV6_RX_CHECKSUM;
        const ICMPV6_TX_CHECKSUM = abi::CAP_ICMPV6_TX_CHECKSUM;
        const IGMP_TX_CHECKSUM = abi::CAP_IGMP_TX_CHECKSUM;
        const IGMP_RX_CHECKSUM = abi::CAP_IGMP_RX_CHECKSUM;
        const PTP_TIMESTAMP = abi::CAP_PTP_TIMESTAMP;
        const TCPIP_OFFLOAD = abi::CAP_TCPIP_OFFLOAD;

        const CHECKSUM_ALL = Self::IPV4_TX_CHECKSUM.bits()
            | Self::IPV4_RX_CHECKSUM.bits()
            | Self::TCP_TX_CHECKSUM.bits()
            | Self::TCP_RX_CHECKSUM.bits()
            | Self::UDP_TX_CHECKSUM.bits()
            | Self::UDP_RX_CHECKSUM.bits()
            | Self::ICMPV4_TX_CHECKSUM.bits()
            | Self::ICMPV4_RX_CHECKSUM.bits()
            | Self::ICMPV6_RX_CHECKSUM.bits()
            | Self::ICMPV6_TX_CHECKSUM.bits()
            | Self::IGMP_TX_CHECKSUM.bits()
            | Self::IGMP_RX_CHECKSUM.bits();
    }
}

/// The driver-writable part of an interface record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkInfo {
    pub index: IfIndex,
    pub mtu: u32,
    pub physical_address: MacAddr,
    pub capabilities: InterfaceCapability,
    /// Cached link state. Drivers set it on `Enable`/`Disable` and whenever
    /// they notice a change; it is the fallback when `GetStatus` is unhandled.
    pub link_up: bool,
}

impl LinkInfo {
    pub const fn new(index: IfIndex) -> Self {
        Self {
            index,
            mtu: abi::DEFAULT_IP_MTU,
            physical_address: MacAddr::ZERO,
            capabilities: InterfaceCapability::empty(),
            link_up: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverCommand {
    Attach,
    Initialize,
    Enable,
    Disable,
    Detach,
    /// Query the live link state; answered with `DriverReply::LinkStatus`.
    GetStatus,
    SetPhysicalAddress(MacAddr),
    MulticastJoin(MacAddr),
    MulticastLeave(MacAddr),
    /// Run work the driver postponed from its interrupt handler.
    DeferredProcessing,
    CapabilitySet(InterfaceCapability),
    /// Driver-private command, passed through untouched.
    Direct { code: u32, arg: u64 },
}

impl DriverCommand {
    /// Numeric link command code.
    pub const fn code(&self) -> u32 {
        match self {
            Self::Attach => abi::LINK_INTERFACE_ATTACH,
            Self::Initialize => abi::LINK_INITIALIZE,
            Self::Enable => abi::LINK_ENABLE,
            Self::Disable => abi::LINK_DISABLE,
            Self::Detach => abi::LINK_INTERFACE_DETACH,
            Self::GetStatus => abi::LINK_GET_STATUS,
            Self::SetPhysicalAddress(_) => abi::LINK_SET_PHYSICAL_ADDRESS,
            Self::MulticastJoin(_) => abi::LINK_MULTICAST_JOIN,
            Self::MulticastLeave(_) => abi::LINK_MULTICAST_LEAVE,
            Self::DeferredProcessing => abi::LINK_DEFERRED_PROCESSING,
            Self::CapabilitySet(_) => abi::LINK_INTERFACE_CAPABILITY_SET,
            Self::Direct { code, .. } => *code,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverReply {
    Done,
    LinkStatus(bool),
    Value(u64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverError {
    /// The driver does not implement this command. Expected and non-fatal.
    Unhandled,
    Failed,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unhandled => write!(f, "unhandled"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl From<DriverError> for crate::types::IpError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Unhandled => Self::Unhandled,
            DriverError::Failed => Self::DriverFailed,
        }
    }
}

pub type DriverResult = Result<DriverReply, DriverError>;

/// A link driver bound to one interface.
///
/// `command` is called from thread context, usually with the instance mutex
/// held; it must not call back into instance operations that take that
/// mutex. Interrupt-side entry points (`deferred_receive`,
/// `driver_link_status_event`, ...) are fine.
pub trait IpDriver: Send + Sync {
    fn command(&self, link: &mut LinkInfo, command: DriverCommand) -> DriverResult;
}
