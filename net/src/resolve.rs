//! Destination to (egress interface, next hop) resolution.
//!
//! Rules are evaluated first-match-wins against the current interface
//! table, static routes and gateway:
//!
//! 1. Multicast or limited broadcast: next hop is the destination; the
//!    hint if it is up, else the first up physical interface. Terminal.
//! 2. Destination is a live interface's own address: local delivery.
//! 3. Static routes in longest-prefix order, skipping entries whose
//!    interface is down or whose next hop left that interface's subnet.
//! 4. Directly connected subnet, loopback included.
//! 5. Link-local destination (169.254/16).
//! 6. Default gateway, when its interface is up and still contains it.
//! 7. The candidate interface itself carries a link-local address.
//! 8. Otherwise `AddressError`.
//!
//! A hint restricts rules 2 to 7 to that interface; it never makes them
//! fail early. Link state and subnet membership are read fresh on every
//! call.

use crate::gateway::Gateway;
use crate::interface::{Interface, InterfaceTable};
use crate::ip::{IpInstance, thread_context};
use crate::route::StaticRouteTable;
use crate::types::{IfIndex, IpError, Ipv4Addr};

/// Result of a successful resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Route {
    pub interface: IfIndex,
    pub next_hop: Ipv4Addr,
}

impl Route {
    #[inline]
    const fn new(interface: IfIndex, next_hop: Ipv4Addr) -> Self {
        Self {
            interface,
            next_hop,
        }
    }
}

/// Borrowed snapshot of the routing state.
pub(crate) struct RouteView<'a> {
    pub(crate) interfaces: &'a InterfaceTable,
    pub(crate) routes: &'a StaticRouteTable,
    pub(crate) gateway: Option<Gateway>,
}

impl RouteView<'_> {
    pub(crate) fn resolve(&self, dst: Ipv4Addr, hint: Option<IfIndex>) -> Result<Route, IpError> {
        if let Some(hint) = hint {
            if hint.0 >= crate::MAX_IP_INTERFACES {
                return Err(IpError::InvalidInterface);
            }
        }
        let allowed = |iface: &Interface| hint.is_none_or(|h| h == iface.index());

        // 1. Multicast and limited broadcast.
        if dst.is_multicast() || dst.is_broadcast() {
            let hinted = hint
                .and_then(|h| self.interfaces.get(h).ok())
                .filter(|iface| iface.is_up());
            let iface = hinted.or_else(|| self.interfaces.physical().find(|i| i.is_up()));
            return iface
                .map(|iface| Route::new(iface.index(), dst))
                .ok_or(IpError::AddressError);
        }

        // 2. One of our own addresses.
        if let Some(iface) = self
            .interfaces
            .iter()
            .find(|i| i.is_up() && i.address() == dst && allowed(*i))
        {
            return Ok(Route::new(iface.index(), dst));
        }

        // 3. Static routes, longest prefix first.
        for entry in self.routes.entries() {
            if !entry.matches(dst) {
                continue;
            }
            let Ok(iface) = self.interfaces.get(entry.interface) else {
                continue;
            };
            if iface.is_up() && iface.contains(entry.next_hop) && allowed(iface) {
                return Ok(Route::new(iface.index(), entry.next_hop));
            }
        }

        // 4. Directly connected.
        if let Some(iface) = self.interfaces.iter().find(|i| {
            i.is_up() && !i.address().is_unspecified() && i.contains(dst) && allowed(*i)
        }) {
            return Ok(Route::new(iface.index(), dst));
        }

        // 5. Link-local destination.
        if dst.is_link_local() {
            let iface = match hint {
                Some(h) => self.interfaces.get(h).ok().filter(|i| i.is_up()),
                None => self.interfaces.physical().find(|i| i.is_up()),
            };
            if let Some(iface) = iface {
                return Ok(Route::new(iface.index(), dst));
            }
        }

        // 6. Default gateway.
        if let Some(gw) = self.gateway {
            if let Ok(iface) = self.interfaces.get(gw.interface) {
                if iface.is_up() && iface.contains(gw.address) && allowed(iface) {
                    return Ok(Route::new(iface.index(), gw.address));
                }
            }
        }

        // 7. Sending from a link-local address.
        let candidate = match hint {
            Some(h) => self.interfaces.get(h).ok().filter(|i| i.is_up()),
            None => self
                .interfaces
                .physical()
                .find(|i| i.is_up() && i.address().is_link_local()),
        };
        if let Some(iface) = candidate.filter(|i| i.address().is_link_local()) {
            return Ok(Route::new(iface.index(), dst));
        }

        Err(IpError::AddressError)
    }
}

impl IpInstance {
    /// Resolve the egress interface and next hop for `dst`, optionally
    /// restricted to the interface `hint`.
    pub fn route_find(&self, dst: Ipv4Addr, hint: Option<IfIndex>) -> Result<Route, IpError> {
        thread_context()?;
        let core = self.core.lock();
        let view = RouteView {
            interfaces: &core.interfaces,
            routes: &core.routes,
            gateway: core.gateway,
        };
        view.resolve(dst, hint)
    }
}
