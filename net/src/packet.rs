//! Packet buffers and the intrusive FIFO that links them.
//!
//! Buffer allocation belongs to the port's pool; the core only needs an
//! owned byte buffer that can be threaded onto a queue without allocating
//! a node. Each [`Packet`] therefore carries its own `next` link, and a
//! [`PacketQueue`] is nothing more than head, tail and count.

extern crate alloc;

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use core::ptr::NonNull;

use crate::types::IfIndex;

pub struct Packet {
    data: Vec<u8>,
    /// Receiving interface on ingress, egress interface once routed.
    interface: Option<IfIndex>,
    next: Option<Box<Packet>>,
}

impl Packet {
    pub fn new(data: Vec<u8>) -> Box<Self> {
        Box::new(Self {
            data,
            interface: None,
            next: None,
        })
    }

    pub fn from_slice(bytes: &[u8]) -> Box<Self> {
        Self::new(bytes.to_vec())
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn interface(&self) -> Option<IfIndex> {
        self.interface
    }

    #[inline]
    pub fn set_interface(&mut self, interface: Option<IfIndex>) {
        self.interface = interface;
    }

    /// IP version nibble of the first byte, if any.
    #[inline]
    pub fn ip_version(&self) -> Option<u8> {
        self.data.first().map(|b| b >> 4)
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("len", &self.data.len())
            .field("interface", &self.interface)
            .finish()
    }
}

/// Singly-linked FIFO of packets.
///
/// Not synchronized; owners wrap it in the lock appropriate to the contexts
/// that touch it (an `IrqMutex` when an interrupt handler is a producer).
pub struct PacketQueue {
    head: Option<Box<Packet>>,
    /// Last node of the chain owned by `head`; `None` iff `head` is `None`.
    tail: Option<NonNull<Packet>>,
    count: usize,
}

// SAFETY: `tail` only ever points into the chain owned by `head`, so moving
// the queue moves every node it can reach.
unsafe impl Send for PacketQueue {}

impl PacketQueue {
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            count: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Append `packet`. Returns `true` if the queue was empty beforehand.
    pub fn push_back(&mut self, mut packet: Box<Packet>) -> bool {
        packet.next = None;
        let node = NonNull::from(&mut *packet);
        let was_empty = match self.tail {
            // SAFETY: `tail` points at the last node owned by this queue and
            // we hold `&mut self`.
            Some(mut tail) => unsafe {
                tail.as_mut().next = Some(packet);
                false
            },
            None => {
                self.head = Some(packet);
                true
            }
        };
        self.tail = Some(node);
        self.count += 1;
        was_empty
    }

    pub fn pop_front(&mut self) -> Option<Box<Packet>> {
        let mut packet = self.head.take()?;
        self.head = packet.next.take();
        if self.head.is_none() {
            self.tail = None;
        }
        self.count -= 1;
        Some(packet)
    }

    /// Release every queued packet. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let mut dropped = 0;
        // One node at a time so dropping a long chain is not recursive.
        while self.pop_front().is_some() {
            dropped += 1;
        }
        dropped
    }
}

impl Default for PacketQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PacketQueue {
    fn drop(&mut self) {
        self.clear();
    }
}
