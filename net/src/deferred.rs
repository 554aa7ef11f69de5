//! Deferred receive: drivers hand buffers over from interrupt context and
//! the helper task processes them later in thread context.

extern crate alloc;

use alloc::boxed::Box;
use core::sync::atomic::Ordering;

use ipcore_lib::IrqMutex;

use crate::helper::IpEvents;
use crate::ip::IpInstance;
use crate::packet::{Packet, PacketQueue};
use crate::types::IfIndex;

/// FIFO of buffers waiting for the helper. Safe to fill from an ISR.
pub(crate) struct DeferredQueue {
    queue: IrqMutex<PacketQueue>,
}

impl DeferredQueue {
    pub(crate) const fn new() -> Self {
        Self {
            queue: IrqMutex::new(PacketQueue::new()),
        }
    }

    /// Append `packet`; `true` when the queue was empty before.
    pub(crate) fn enqueue(&self, packet: Box<Packet>) -> bool {
        self.queue.lock().push_back(packet)
    }

    pub(crate) fn dequeue(&self) -> Option<Box<Packet>> {
        self.queue.lock().pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.lock().len()
    }
}

impl IpInstance {
    /// Queue a received frame for the helper. Callable from interrupt
    /// context. The receive event is only raised on the empty to non-empty
    /// transition; the helper drains the whole queue per event.
    pub fn deferred_receive(&self, packet: Box<Packet>) {
        if self.deferred.enqueue(packet) {
            self.events.set(IpEvents::RECEIVE.bits());
        }
    }

    /// Like [`deferred_receive`](Self::deferred_receive), but the helper
    /// passes these buffers to the driver's deferred packet handler.
    pub fn driver_deferred_receive(&self, packet: Box<Packet>) {
        if self.driver_deferred.enqueue(packet) {
            self.events.set(IpEvents::DRIVER_PACKET.bits());
        }
    }

    /// Ask the helper to run DEFERRED_PROCESSING on every driver.
    pub fn driver_deferred_processing(&self) {
        self.events.set(IpEvents::DRIVER_DEFERRED.bits());
    }

    /// Record a link change on `interface` for the helper to pick up.
    pub fn driver_link_status_event(&self, interface: IfIndex) {
        if interface.0 >= crate::MAX_IP_INTERFACES {
            return;
        }
        self.link_status_pending
            .fetch_or(1 << interface.0, Ordering::AcqRel);
        self.events.set(IpEvents::LINK_STATUS.bits());
    }

    /// Buffers in the deferred receive queue.
    pub fn deferred_pending(&self) -> usize {
        self.deferred.len()
    }
}
