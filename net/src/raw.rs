//! Raw IP packet service.
//!
//! Send resolves a route and hands the buffer to the transmit path with the
//! raw protocol number. Receive pops the raw FIFO or parks the caller on a
//! suspension list; each suspended receiver owns a one-shot delivery slot
//! that the producer fills before resuming it. Buffers and waiters are
//! both served strictly first in, first out.
//!
//! Queue, suspension list and delivery slots are only touched inside the
//! `raw` interrupt-safe lock, so producers may run in interrupt context.

extern crate alloc;

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use ipcore_abi::net::{IP_FRAGMENT_OKAY, IP_RAW_PROTOCOL, IP_TIME_TO_LIVE};
use ipcore_abi::status::NO_WAIT;
use ipcore_lib::kernel_services::rtos::{self, NULL_THREAD, ThreadHandle};
use ipcore_lib::{Deadline, IrqMutex, klog_debug};

use crate::hooks::TransmitRequest;
use crate::ip::{IpInstance, thread_context};
use crate::packet::{Packet, PacketQueue};
use crate::types::{IfIndex, IpError, Ipv4Addr};

/// Veto hook run on every raw buffer before it is queued or handed to a
/// waiter. Returning `false` leaves the buffer with the protocol layer.
pub type RawPacketFilter = fn(protocol: u8, packet: &Packet) -> bool;

type Delivery = Result<Box<Packet>, IpError>;

/// One suspended receiver.
struct RawWaiter {
    thread: ThreadHandle,
    slot: IrqMutex<Option<Delivery>>,
}

impl RawWaiter {
    fn take(&self) -> Option<Delivery> {
        self.slot.lock().take()
    }
}

pub(crate) struct RawState {
    enabled: bool,
    queue: PacketQueue,
    queue_max: usize,
    waiters: VecDeque<Arc<RawWaiter>>,
    filter: Option<RawPacketFilter>,
}

impl RawState {
    pub(crate) fn new(queue_max: usize) -> Self {
        Self {
            enabled: false,
            queue: PacketQueue::new(),
            queue_max,
            waiters: VecDeque::new(),
            filter: None,
        }
    }

    /// Hand `delivery` to the oldest waiter, if any. Must run with the raw
    /// lock held so a timing-out waiter cannot miss it.
    fn deliver_to_waiter(&mut self, delivery: Delivery) -> Result<ThreadHandle, Delivery> {
        match self.waiters.pop_front() {
            Some(waiter) => {
                *waiter.slot.lock() = Some(delivery);
                Ok(waiter.thread)
            }
            None => Err(delivery),
        }
    }
}

/// A failed send. The caller keeps the buffer.
pub struct SendError {
    pub error: IpError,
    pub packet: Box<Packet>,
}

impl fmt::Debug for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendError")
            .field("error", &self.error)
            .field("packet", &self.packet)
            .finish()
    }
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "raw send failed: {}", self.error)
    }
}

impl IpInstance {
    pub fn raw_packet_enable(&self) -> Result<(), IpError> {
        thread_context()?;
        self.raw.lock().enabled = true;
        Ok(())
    }

    /// Disable the service: queued buffers are released and every
    /// suspended receiver wakes with `NotEnabled`.
    pub fn raw_packet_disable(&self) -> Result<(), IpError> {
        thread_context()?;
        let mut woken: Vec<ThreadHandle> = Vec::new();
        let dropped = {
            let mut raw = self.raw.lock();
            raw.enabled = false;
            while let Ok(thread) = raw.deliver_to_waiter(Err(IpError::NotEnabled)) {
                woken.push(thread);
            }
            raw.queue.clear()
        };
        for thread in woken.iter().copied() {
            rtos::thread_resume(thread);
        }
        klog_debug!(
            "ip {}: raw disabled ({} queued released, {} waiters woken)",
            self.name(),
            dropped,
            woken.len()
        );
        Ok(())
    }

    pub fn raw_packet_enabled(&self) -> bool {
        self.raw.lock().enabled
    }

    /// Cap the raw receive queue. Buffers already queued are kept.
    pub fn raw_receive_queue_max_set(&self, max: usize) -> Result<(), IpError> {
        thread_context()?;
        self.raw.lock().queue_max = max;
        Ok(())
    }

    pub fn raw_packet_filter_set(&self, filter: Option<RawPacketFilter>) -> Result<(), IpError> {
        thread_context()?;
        self.raw.lock().filter = filter;
        Ok(())
    }

    /// Resolve `destination` and transmit `packet` as a raw datagram.
    pub fn raw_packet_send(
        &self,
        packet: Box<Packet>,
        destination: Ipv4Addr,
        tos: u8,
    ) -> Result<(), SendError> {
        self.raw_send(packet, destination, None, tos)
    }

    /// Like [`raw_packet_send`](Self::raw_packet_send) but resolution is
    /// restricted to `interface`, which fixes the source address on a
    /// multihomed instance.
    pub fn raw_packet_source_send(
        &self,
        packet: Box<Packet>,
        destination: Ipv4Addr,
        interface: IfIndex,
        tos: u8,
    ) -> Result<(), SendError> {
        if let Err(error) = thread_context() {
            return Err(SendError { error, packet });
        }
        let valid = self.core.lock().interfaces.get(interface).is_ok();
        if !valid {
            return Err(SendError {
                error: IpError::InvalidInterface,
                packet,
            });
        }
        self.raw_send(packet, destination, Some(interface), tos)
    }

    fn raw_send(
        &self,
        mut packet: Box<Packet>,
        destination: Ipv4Addr,
        hint: Option<IfIndex>,
        tos: u8,
    ) -> Result<(), SendError> {
        if let Err(error) = thread_context() {
            return Err(SendError { error, packet });
        }
        if !self.raw_packet_enabled() {
            return Err(SendError {
                error: IpError::NotEnabled,
                packet,
            });
        }
        self.stats.add_send_requests(1);

        let route = match self.route_find(destination, hint) {
            Ok(route) => route,
            Err(error) => {
                self.stats.add_transmit_no_route(1);
                return Err(SendError { error, packet });
            }
        };

        packet.set_interface(Some(route.interface));
        let request = TransmitRequest {
            destination,
            next_hop: route.next_hop,
            interface: route.interface,
            protocol: IP_RAW_PROTOCOL,
            ttl: IP_TIME_TO_LIVE,
            tos,
            fragment: IP_FRAGMENT_OKAY,
        };
        self.stats.add_packets_sent(1);
        self.stats.add_bytes_sent(packet.len() as u64);
        self.hooks.transmit(self, packet, &request);
        Ok(())
    }

    /// Take the oldest raw buffer, waiting up to `wait` ticks for one.
    ///
    /// `NO_WAIT` never blocks. A non-zero wait parks the caller behind any
    /// earlier waiters; it returns with a buffer or, once the budget is
    /// spent, with `NoPacket`.
    pub fn raw_packet_receive(&self, wait: u64) -> Result<Box<Packet>, IpError> {
        let waiter = {
            let mut raw = self.raw.lock();
            if !raw.enabled {
                return Err(IpError::NotEnabled);
            }
            if let Some(packet) = raw.queue.pop_front() {
                return Ok(packet);
            }
            if wait == NO_WAIT {
                return Err(IpError::NoPacket);
            }
            drop(raw);

            thread_context()?;
            if !rtos::is_rtos_initialized() {
                return Err(IpError::NoPacket);
            }
            let thread = rtos::current_thread();
            if thread == NULL_THREAD {
                return Err(IpError::NoPacket);
            }

            let waiter = Arc::new(RawWaiter {
                thread,
                slot: IrqMutex::new(None),
            });
            let mut raw = self.raw.lock();
            // A buffer may have landed while the lock was dropped.
            if let Some(packet) = raw.queue.pop_front() {
                return Ok(packet);
            }
            raw.waiters.push_back(waiter.clone());
            waiter
        };

        let deadline = Deadline::after(wait);
        loop {
            if let Some(delivery) = waiter.take() {
                return delivery;
            }
            if deadline.expired() {
                let mut raw = self.raw.lock();
                raw.waiters.retain(|w| !Arc::ptr_eq(w, &waiter));
                return waiter.take().unwrap_or(Err(IpError::NoPacket));
            }
            rtos::thread_block(deadline.remaining());
        }
    }

    /// Producer side, called by the protocol layer for each raw-eligible
    /// datagram. The buffer is handed back when the service is disabled
    /// or the filter rejects it. A full queue drops it.
    ///
    /// The filter runs without the raw lock held, so it may call back into
    /// the instance.
    pub fn raw_packet_deliver(&self, protocol: u8, packet: Box<Packet>) -> Result<(), Box<Packet>> {
        let (enabled, filter) = {
            let raw = self.raw.lock();
            (raw.enabled, raw.filter)
        };
        if !enabled {
            return Err(packet);
        }
        if let Some(filter) = filter {
            if !filter(protocol, &packet) {
                return Err(packet);
            }
        }

        let mut raw = self.raw.lock();
        // Disabled while the filter ran.
        if !raw.enabled {
            return Err(packet);
        }
        let delivered = raw.deliver_to_waiter(Ok(packet));
        let packet = match delivered {
            Ok(thread) => {
                drop(raw);
                rtos::thread_resume(thread);
                return Ok(());
            }
            Err(Ok(packet)) => packet,
            Err(Err(_)) => return Ok(()),
        };

        if raw.queue.len() >= raw.queue_max {
            drop(raw);
            self.stats.add_raw_dropped(1);
            self.stats.add_receive_dropped(1);
            klog_debug!("ip {}: raw queue full, dropped {} bytes", self.name(), packet.len());
            return Ok(());
        }
        raw.queue.push_back(packet);
        Ok(())
    }

    pub fn raw_suspended_count(&self) -> usize {
        self.raw.lock().waiters.len()
    }

    pub fn raw_queued_count(&self) -> usize {
        self.raw.lock().queue.len()
    }
}
