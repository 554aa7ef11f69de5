//! Routing and interface core of an embedded IPv4 stack.
//!
//! An [`IpInstance`] owns a small fixed interface table, a mask-sorted
//! static route table and a default gateway, and resolves every outbound
//! destination to an interface plus next hop. Drivers plug in through
//! [`IpDriver`]; received frames travel through a deferred queue to the
//! instance's helper task, which also runs protocol timers through
//! [`ProtocolHooks`]. A raw datagram service sits on top for
//! applications that speak their own protocol over IP.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
mod deferred;
pub mod driver;
mod gateway;
pub mod helper;
pub mod hooks;
pub mod interface;
pub mod ip;
pub mod packet;
pub mod raw;
mod resolve;
pub mod route;
pub mod stats;
pub mod status;
pub mod types;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod interface_tests;
#[cfg(test)]
mod route_tests;

use types::IfIndex;

/// Driver-backed interface slots.
pub const MAX_PHYSICAL_INTERFACES: usize = 4;
/// The loopback entry lives right after the physical slots.
pub const LOOPBACK_INTERFACE: IfIndex = IfIndex(MAX_PHYSICAL_INTERFACES);
pub const MAX_IP_INTERFACES: usize = MAX_PHYSICAL_INTERFACES + 1;
pub const ROUTING_TABLE_SIZE: usize = 8;

pub use config::IpConfig;
pub use driver::{
    DriverCommand, DriverError, DriverReply, DriverResult, InterfaceCapability, IpDriver, LinkInfo,
};
pub use gateway::Gateway;
pub use helper::IpEvents;
pub use hooks::{NoProtocols, ProtocolEvent, ProtocolHooks, TransmitRequest};
pub use interface::InterfaceInfo;
pub use ip::{AddressChangeNotify, DriverDeferredHandler, HelperState, IpInstance, LinkStatusNotify};
pub use packet::Packet;
pub use raw::{RawPacketFilter, SendError};
pub use resolve::Route;
pub use route::{RouteEntry, RouteUpdate};
pub use stats::{IpStats, IpStatsSnapshot};
pub use status::IpStatus;
pub use types::{IpError, Ipv4Addr, MacAddr};
