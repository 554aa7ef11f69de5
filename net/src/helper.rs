//! The IP helper task.
//!
//! One long-lived thread per instance owns driver bring-up and all deferred
//! work. It sleeps on the instance event group and, per wakeup, runs the
//! handler for every bit it took in a fixed order, re-checking for bits set
//! while it was busy before sleeping again. Timers and drivers only set bits.

extern crate alloc;

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::sync::atomic::Ordering;

use bitflags::bitflags;
use ipcore_abi::net as abi;
use ipcore_abi::status::WAIT_FOREVER;
use ipcore_lib::{klog_debug, klog_info, klog_trace, klog_warn};

use crate::driver::{DriverCommand, DriverError};
use crate::hooks::ProtocolEvent;
use crate::ip::{HelperState, IpInstance, thread_context};
use crate::packet::Packet;
use crate::types::{IfIndex, IpError};

bitflags! {
    /// Bits of the instance event group.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct IpEvents: u32 {
        const PERIODIC        = abi::IP_PERIODIC_EVENT;
        const UNFRAG          = abi::IP_UNFRAG_EVENT;
        const ICMP            = abi::IP_ICMP_EVENT;
        const RECEIVE         = abi::IP_RECEIVE_EVENT;
        const ARP_REC         = abi::IP_ARP_REC_EVENT;
        const RARP_REC        = abi::IP_RARP_REC_EVENT;
        const IGMP            = abi::IP_IGMP_EVENT;
        const TCP             = abi::IP_TCP_EVENT;
        const FAST            = abi::IP_FAST_EVENT;
        const DRIVER_PACKET   = abi::IP_DRIVER_PACKET_EVENT;
        const IGMP_ENABLE     = abi::IP_IGMP_ENABLE_EVENT;
        const DRIVER_DEFERRED = abi::IP_DRIVER_DEFERRED_EVENT;
        const TCP_CLEANUP     = abi::IP_TCP_CLEANUP_DEFERRED;
        const LINK_STATUS     = abi::IP_LINK_STATUS_EVENT;
    }
}

type EventHandler = fn(&IpInstance);

/// Handler order within one wakeup. Received frames go first so protocol
/// timers see the freshest state.
const DISPATCH: [(IpEvents, EventHandler); 14] = [
    (IpEvents::DRIVER_PACKET, handle_driver_packets),
    (IpEvents::RECEIVE, handle_receive),
    (IpEvents::TCP, handle_tcp),
    (IpEvents::FAST, handle_fast),
    (IpEvents::PERIODIC, handle_periodic),
    (IpEvents::ARP_REC, handle_arp),
    (IpEvents::RARP_REC, handle_rarp),
    (IpEvents::IGMP, handle_igmp),
    (IpEvents::IGMP_ENABLE, handle_igmp_enable),
    (IpEvents::UNFRAG, handle_unfrag),
    (IpEvents::ICMP, handle_icmp),
    (IpEvents::DRIVER_DEFERRED, handle_driver_deferred),
    (IpEvents::TCP_CLEANUP, handle_tcp_cleanup),
    (IpEvents::LINK_STATUS, handle_link_status),
];

impl IpInstance {
    /// Bring every attached driver up and mark the instance running.
    ///
    /// Runs once, at the top of the helper task. Interfaces attached later
    /// are brought up by `interface_attach` itself.
    pub fn helper_startup(&self) -> Result<(), IpError> {
        thread_context()?;
        let mut core = self.core.lock();
        if self.helper_state() != HelperState::Uninitialized {
            return Ok(());
        }
        self.set_helper_state(HelperState::Initializing);

        let multicast = core.multicast;
        let mut count = 0usize;
        for iface in core.interfaces.physical_mut() {
            if !iface.has_driver() {
                continue;
            }
            iface.bring_up();
            if multicast {
                iface.join_all_hosts();
            }
            count += 1;
        }

        self.set_helper_state(HelperState::Running);
        drop(core);
        klog_info!("ip {}: helper running, {} interface(s) up", self.name(), count);
        Ok(())
    }

    /// Body of the helper thread. Never returns.
    pub fn helper_task_entry(&self) -> ! {
        if let Err(e) = self.helper_startup() {
            klog_info!("ip {}: helper startup refused: {}", self.name(), e);
        }
        loop {
            self.helper_task_step(WAIT_FOREVER);
        }
    }

    /// One helper iteration: wait up to `wait` ticks for any event, then
    /// dispatch until no bits remain. Returns every event handled.
    pub fn helper_task_step(&self, wait: u64) -> IpEvents {
        let mut handled = IpEvents::empty();
        let Some(bits) = self.events.wait_any_clear(IpEvents::all().bits(), wait) else {
            return handled;
        };
        let mut pending = IpEvents::from_bits_truncate(bits);

        while !pending.is_empty() {
            for (event, handler) in DISPATCH.iter() {
                if pending.contains(*event) {
                    handler(self);
                }
            }
            handled |= pending;
            pending = self
                .events
                .try_take(IpEvents::all().bits())
                .map(IpEvents::from_bits_truncate)
                .unwrap_or(IpEvents::empty());
        }
        klog_trace!("ip {}: helper handled {:?}", self.name(), handled);
        handled
    }

    /// Periodic timer expiry. Callable from interrupt context.
    pub fn periodic_timer_expired(&self) {
        self.events.set(IpEvents::PERIODIC.bits());
    }

    /// Fast timer expiry. Callable from interrupt context.
    pub fn fast_timer_expired(&self) {
        self.events.set(IpEvents::FAST.bits());
    }

    pub fn fragment_enable(&self) -> Result<(), IpError> {
        thread_context()?;
        if !cfg!(feature = "fragment") {
            return Err(IpError::NotSupported);
        }
        self.core.lock().fragment = true;
        Ok(())
    }

    pub fn fragment_disable(&self) -> Result<(), IpError> {
        thread_context()?;
        if !cfg!(feature = "fragment") {
            return Err(IpError::NotSupported);
        }
        self.core.lock().fragment = false;
        Ok(())
    }

    pub fn fragment_enabled(&self) -> bool {
        self.core.lock().fragment
    }

    /// Account for and demultiplex one received buffer.
    fn dispatch_received(&self, packet: Box<Packet>) {
        self.stats.add_packets_received(1);
        self.stats.add_bytes_received(packet.len() as u64);
        match packet.ip_version() {
            Some(4) => {
                self.stats.add_packets_delivered(1);
                self.hooks.ipv4_receive(self, packet);
            }
            version => {
                self.stats.add_invalid_packets(1);
                klog_debug!(
                    "ip {}: dropping {} bytes, version {:?}",
                    self.name(),
                    packet.len(),
                    version
                );
            }
        }
    }
}

fn handle_driver_packets(ip: &IpInstance) {
    let handler = ip.core.lock().driver_deferred_handler;
    while let Some(packet) = ip.driver_deferred.dequeue() {
        match handler {
            Some(handler) => handler(ip, packet),
            None => ip.dispatch_received(packet),
        }
    }
}

fn handle_receive(ip: &IpInstance) {
    while let Some(packet) = ip.deferred.dequeue() {
        ip.dispatch_received(packet);
    }
}

fn handle_tcp(ip: &IpInstance) {
    ip.hooks.protocol_event(ip, ProtocolEvent::Tcp);
}

fn handle_fast(ip: &IpInstance) {
    ip.hooks.fast_periodic(ip);
}

fn handle_periodic(ip: &IpInstance) {
    ip.hooks.periodic(ip);
    if ip.fragment_enabled() {
        ip.hooks.fragment_timeout_check(ip);
    }
}

fn handle_arp(ip: &IpInstance) {
    ip.hooks.protocol_event(ip, ProtocolEvent::ArpReceive);
}

fn handle_rarp(ip: &IpInstance) {
    ip.hooks.protocol_event(ip, ProtocolEvent::RarpReceive);
}

fn handle_igmp(ip: &IpInstance) {
    ip.hooks.protocol_event(ip, ProtocolEvent::Igmp);
}

/// Multicast was switched on after startup: join all-hosts everywhere.
fn handle_igmp_enable(ip: &IpInstance) {
    let mut core = ip.core.lock();
    for iface in core.interfaces.physical_mut() {
        if iface.has_driver() {
            iface.join_all_hosts();
        }
    }
}

fn handle_unfrag(ip: &IpInstance) {
    if ip.fragment_enabled() {
        ip.hooks.fragment_assembly(ip);
    }
}

fn handle_icmp(ip: &IpInstance) {
    ip.hooks.protocol_event(ip, ProtocolEvent::Icmp);
}

fn handle_driver_deferred(ip: &IpInstance) {
    let mut core = ip.core.lock();
    for iface in core.interfaces.physical_mut() {
        // Unhandled is the normal answer from drivers without deferred work.
        if let Err(DriverError::Failed) = iface.command(DriverCommand::DeferredProcessing) {
            klog_warn!("ip {}: {} deferred processing failed", ip.name(), iface.name);
        }
    }
}

fn handle_tcp_cleanup(ip: &IpInstance) {
    ip.hooks.protocol_event(ip, ProtocolEvent::TcpCleanup);
}

fn handle_link_status(ip: &IpInstance) {
    let pending = ip.link_status_pending.swap(0, Ordering::AcqRel);
    if pending == 0 {
        return;
    }

    let mut changes: Vec<(IfIndex, bool)> = Vec::new();
    let notify = {
        let mut core = ip.core.lock();
        for slot in 0..crate::MAX_IP_INTERFACES {
            if pending & (1 << slot) == 0 {
                continue;
            }
            if let Ok(iface) = core.interfaces.get_mut(IfIndex(slot)) {
                let up = iface.query_link();
                changes.push((IfIndex(slot), up));
            }
        }
        core.link_status_notify
    };

    for (index, up) in changes {
        klog_info!("ip {}: {} link {}", ip.name(), index, if up { "up" } else { "down" });
        if let Some(notify) = notify {
            notify(ip, index, up);
        }
    }
}
