//! Seams to the protocol layers that sit on top of the core.
//!
//! ARP, ICMP, IGMP, TCP, UDP, reassembly and the generic IPv4 transmit path
//! are not part of the core. The helper task and the raw path reach them
//! through one [`ProtocolHooks`] object per instance; every method has a
//! no-op default so a port only overrides what it links in.

extern crate alloc;

use alloc::boxed::Box;

use ipcore_lib::klog_trace;

use crate::ip::IpInstance;
use crate::packet::Packet;
use crate::status::IpStatus;
use crate::types::{IfIndex, Ipv4Addr};

/// Everything the IPv4 transmit path needs besides the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransmitRequest {
    pub destination: Ipv4Addr,
    pub next_hop: Ipv4Addr,
    pub interface: IfIndex,
    pub protocol: u8,
    pub ttl: u8,
    pub tos: u8,
    /// `IP_FRAGMENT_OKAY` or `IP_DONT_FRAGMENT`.
    pub fragment: u16,
}

/// Protocol work signalled through the helper's event flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtocolEvent {
    Tcp,
    ArpReceive,
    RarpReceive,
    Igmp,
    Icmp,
    TcpCleanup,
}

pub trait ProtocolHooks: Send + Sync {
    /// Hand a routed datagram to the IPv4 transmit path, which owns it from
    /// here on and accounts for its own failures.
    fn transmit(&self, _ip: &IpInstance, packet: Box<Packet>, request: &TransmitRequest) {
        klog_trace!(
            "ip: no transmit path, dropping {} bytes to {}",
            packet.len(),
            request.destination
        );
    }

    /// IPv4 demultiplexer for buffers drained from the deferred queue.
    fn ipv4_receive(&self, _ip: &IpInstance, _packet: Box<Packet>) {}

    /// Housekeeping on every periodic tick (ARP/RARP/IGMP aging, TCP timers).
    fn periodic(&self, _ip: &IpInstance) {}

    fn fast_periodic(&self, _ip: &IpInstance) {}

    fn protocol_event(&self, _ip: &IpInstance, _event: ProtocolEvent) {}

    fn fragment_assembly(&self, _ip: &IpInstance) {}

    fn fragment_timeout_check(&self, _ip: &IpInstance) {}

    /// Protocol-owned status bits (ARP/UDP/TCP/IGMP enabled, RARP complete).
    fn enabled_protocols(&self) -> IpStatus {
        IpStatus::empty()
    }
}

/// Hooks for an instance with no protocol layers linked in.
pub struct NoProtocols;

impl ProtocolHooks for NoProtocols {}
