//! Prioritized static routing table.
//!
//! Entries are kept sorted by descending mask (numerically larger mask
//! first), so the first entry whose network matches a destination is the
//! longest-prefix match and the resolver needs one linear scan. Entries
//! with equal masks stay in insertion order.
//!
//! The table is a fixed array; inserts and deletes shift the tail by one
//! slot. It lives inside the instance core and is only edited under the
//! instance mutex from thread context.

extern crate alloc;

use alloc::vec::Vec;
use core::fmt;

use ipcore_lib::klog_debug;

use crate::ROUTING_TABLE_SIZE;
use crate::ip::{IpInstance, thread_context};
use crate::types::{IfIndex, IpError, Ipv4Addr};

// =============================================================================
// RouteEntry
// =============================================================================

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    /// Destination network, already normalized to `network & mask`.
    pub network: Ipv4Addr,
    pub mask: Ipv4Addr,
    pub next_hop: Ipv4Addr,
    /// Interface whose subnet contained `next_hop` when the route was added.
    pub interface: IfIndex,
}

impl RouteEntry {
    const EMPTY: Self = Self {
        network: Ipv4Addr::UNSPECIFIED,
        mask: Ipv4Addr::UNSPECIFIED,
        next_hop: Ipv4Addr::UNSPECIFIED,
        interface: IfIndex(0),
    };

    /// `true` if `dst` falls inside this entry's network.
    #[inline]
    pub fn matches(&self, dst: Ipv4Addr) -> bool {
        dst.network(self.mask) == self.network
    }

    #[inline]
    pub fn prefix_len(&self) -> u32 {
        self.mask.to_u32().leading_ones()
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} via {} dev {}",
            self.network,
            self.prefix_len(),
            self.next_hop,
            self.interface
        )
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteUpdate {
    Inserted,
    /// An entry with the same network and mask got a new next hop.
    Updated,
}

// =============================================================================
// StaticRouteTable
// =============================================================================

pub struct StaticRouteTable {
    entries: [RouteEntry; ROUTING_TABLE_SIZE],
    count: usize,
}

impl StaticRouteTable {
    pub const fn new() -> Self {
        Self {
            entries: [RouteEntry::EMPTY; ROUTING_TABLE_SIZE],
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

    /// Live entries in lookup order.
    #[inline]
    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries[..self.count]
    }

    /// Insert or update `(network & mask, mask)`.
    ///
    /// An existing entry is updated in place even when the table is full;
    /// only a genuinely new entry can fail with `Overflow`.
    pub fn add(
        &mut self,
        network: Ipv4Addr,
        mask: Ipv4Addr,
        next_hop: Ipv4Addr,
        interface: IfIndex,
    ) -> Result<RouteUpdate, IpError> {
        let network = network.network(mask);
        let mut pos = self.count;

        for (i, entry) in self.entries[..self.count].iter_mut().enumerate() {
            if entry.network == network && entry.mask == mask {
                klog_debug!("route: updated {:?} -> {}", entry, next_hop);
                entry.next_hop = next_hop;
                entry.interface = interface;
                return Ok(RouteUpdate::Updated);
            }
            // Equal masks never reach here before the duplicate check above.
            if mask.to_u32() > entry.mask.to_u32() {
                pos = i;
                break;
            }
        }

        if self.count == ROUTING_TABLE_SIZE {
            klog_debug!("route: table full, dropping {}/{}", network, mask);
            return Err(IpError::Overflow);
        }

        self.entries.copy_within(pos..self.count, pos + 1);
        self.entries[pos] = RouteEntry {
            network,
            mask,
            next_hop,
            interface,
        };
        self.count += 1;
        klog_debug!("route: added {:?} at {}", self.entries[pos], pos);
        Ok(RouteUpdate::Inserted)
    }

    /// Remove `(network & mask, mask)`, shifting later entries up.
    pub fn delete(&mut self, network: Ipv4Addr, mask: Ipv4Addr) -> Result<RouteEntry, IpError> {
        let network = network.network(mask);
        let pos = self
            .entries()
            .iter()
            .position(|e| e.network == network && e.mask == mask)
            .ok_or(IpError::NotFound)?;

        let removed = self.entries[pos];
        self.entries.copy_within(pos + 1..self.count, pos);
        self.count -= 1;
        self.entries[self.count] = RouteEntry::EMPTY;
        klog_debug!("route: removed {:?}", removed);
        Ok(removed)
    }

    /// Drop every entry bound to `interface`, keeping the rest in order.
    pub fn remove_interface(&mut self, interface: IfIndex) -> usize {
        let mut kept = 0;
        for i in 0..self.count {
            if self.entries[i].interface != interface {
                self.entries[kept] = self.entries[i];
                kept += 1;
            }
        }
        let removed = self.count - kept;
        for slot in &mut self.entries[kept..self.count] {
            *slot = RouteEntry::EMPTY;
        }
        self.count = kept;
        removed
    }

    /// Longest-prefix entry whose network contains `dst`, ignoring link
    /// state. The resolver applies its own liveness filters.
    pub fn lookup(&self, dst: Ipv4Addr) -> Option<&RouteEntry> {
        self.entries().iter().find(|e| e.matches(dst))
    }
}

impl Default for StaticRouteTable {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Instance operations
// =============================================================================

impl IpInstance {
    /// Add a static route. The next hop must sit on a live interface's
    /// subnet; that interface becomes the route's egress.
    pub fn static_route_add(
        &self,
        network: Ipv4Addr,
        mask: Ipv4Addr,
        next_hop: Ipv4Addr,
    ) -> Result<RouteUpdate, IpError> {
        if !cfg!(feature = "static-routing") {
            return Err(IpError::NotSupported);
        }
        thread_context()?;
        let mut core = self.core.lock();
        let interface = core
            .interfaces
            .owner_of(next_hop)
            .ok_or(IpError::AddressError)?;
        core.routes.add(network, mask, next_hop, interface)
    }

    pub fn static_route_delete(&self, network: Ipv4Addr, mask: Ipv4Addr) -> Result<(), IpError> {
        if !cfg!(feature = "static-routing") {
            return Err(IpError::NotSupported);
        }
        thread_context()?;
        self.core.lock().routes.delete(network, mask).map(|_| ())
    }

    /// Copy of the static table in lookup order.
    pub fn static_routes(&self) -> Vec<RouteEntry> {
        self.core.lock().routes.entries().to_vec()
    }
}
