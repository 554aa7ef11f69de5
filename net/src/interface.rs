//! Interface table and interface management operations.
//!
//! Slots `0..MAX_PHYSICAL_INTERFACES` hold driver-backed attachments; the
//! slot right after them is reserved for the loopback entry. A slot is
//! live while `valid` is set. The derived network is recomputed on every
//! address or mask change and never written directly.

extern crate alloc;

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::Ordering;

use ipcore_abi::net::{IP_ALL_HOSTS_ADDRESS, LOOPBACK_MTU};
use ipcore_lib::{klog_debug, klog_info, klog_warn};

use crate::driver::{
    DriverCommand, DriverError, DriverReply, DriverResult, InterfaceCapability, IpDriver,
    LinkInfo,
};
use crate::ip::{HelperState, IpInstance, thread_context};
use crate::types::{IfIndex, IpError, Ipv4Addr, MacAddr};
use crate::{LOOPBACK_INTERFACE, MAX_IP_INTERFACES, MAX_PHYSICAL_INTERFACES};

// =============================================================================
// Interface record
// =============================================================================

pub(crate) struct Interface {
    index: IfIndex,
    pub(crate) name: String,
    valid: bool,
    address: Ipv4Addr,
    mask: Ipv4Addr,
    network: Ipv4Addr,
    pub(crate) link: LinkInfo,
    driver: Option<Arc<dyn IpDriver>>,
}

impl Interface {
    fn empty(index: IfIndex) -> Self {
        Self {
            index,
            name: String::new(),
            valid: false,
            address: Ipv4Addr::UNSPECIFIED,
            mask: Ipv4Addr::UNSPECIFIED,
            network: Ipv4Addr::UNSPECIFIED,
            link: LinkInfo::new(index),
            driver: None,
        }
    }

    fn loopback(index: IfIndex) -> Self {
        let mut iface = Self::empty(index);
        iface.name = "lo".to_string();
        iface.valid = true;
        iface.set_address(Ipv4Addr::LOCALHOST, Ipv4Addr::new(255, 0, 0, 0));
        iface.link.mtu = LOOPBACK_MTU;
        iface.link.link_up = true;
        iface
    }

    #[inline]
    pub(crate) fn index(&self) -> IfIndex {
        self.index
    }

    #[inline]
    pub(crate) fn is_valid(&self) -> bool {
        self.valid
    }

    /// Valid and link up. Evaluated at every use, never cached.
    #[inline]
    pub(crate) fn is_up(&self) -> bool {
        self.valid && self.link.link_up
    }

    #[inline]
    pub(crate) fn address(&self) -> Ipv4Addr {
        self.address
    }

    #[inline]
    pub(crate) fn mask(&self) -> Ipv4Addr {
        self.mask
    }

    #[inline]
    pub(crate) fn has_driver(&self) -> bool {
        self.driver.is_some()
    }

    pub(crate) fn set_address(&mut self, address: Ipv4Addr, mask: Ipv4Addr) {
        self.address = address;
        self.mask = mask;
        self.network = address.network(mask);
    }

    /// `true` if `addr` is on this interface's subnet.
    #[inline]
    pub(crate) fn contains(&self, addr: Ipv4Addr) -> bool {
        addr.network(self.mask) == self.network
    }

    pub(crate) fn command(&mut self, command: DriverCommand) -> DriverResult {
        match self.driver.as_ref() {
            Some(driver) => driver.command(&mut self.link, command),
            None => Err(DriverError::Unhandled),
        }
    }

    /// Live link state: GET_STATUS, or the cached flag when the driver
    /// answers "unhandled". Updates the cache with what the driver said.
    pub(crate) fn query_link(&mut self) -> bool {
        let up = match self.command(DriverCommand::GetStatus) {
            Ok(DriverReply::LinkStatus(up)) => up,
            Ok(DriverReply::Value(v)) => v != 0,
            // The driver wrote `link.link_up` itself.
            Ok(DriverReply::Done) => self.link.link_up,
            Err(DriverError::Unhandled) => return self.link.link_up,
            Err(DriverError::Failed) => false,
        };
        self.link.link_up = up;
        up
    }

    /// ATTACH, INITIALIZE, ENABLE in that order. The link starts out up and
    /// drivers may lower it. A failed phase ends the sequence with the link
    /// down; unhandled phases are skipped.
    pub(crate) fn bring_up(&mut self) {
        self.link.capabilities = InterfaceCapability::empty();
        self.link.link_up = true;
        for command in [
            DriverCommand::Attach,
            DriverCommand::Initialize,
            DriverCommand::Enable,
        ] {
            match self.command(command) {
                Ok(_) | Err(DriverError::Unhandled) => {}
                Err(DriverError::Failed) => {
                    klog_warn!("ip: {} {} failed during bring-up", self.name, command_name(&command));
                    self.link.link_up = false;
                    return;
                }
            }
        }
        klog_debug!(
            "ip: {} up={} mtu={} mac={}",
            self.name,
            self.link.link_up,
            self.link.mtu,
            self.link.physical_address
        );
    }

    pub(crate) fn join_all_hosts(&mut self) {
        let group = MacAddr::ipv4_multicast(Ipv4Addr::from_u32(IP_ALL_HOSTS_ADDRESS));
        if let Err(DriverError::Failed) = self.command(DriverCommand::MulticastJoin(group)) {
            klog_warn!("ip: {} all-hosts join failed", self.name);
        }
    }

    fn info(&self) -> InterfaceInfo {
        InterfaceInfo {
            index: self.index,
            name: self.name.clone(),
            address: self.address,
            mask: self.mask,
            network: self.network,
            mtu: self.link.mtu,
            physical_address: self.link.physical_address,
            capabilities: self.link.capabilities,
            link_up: self.link.link_up,
        }
    }
}

fn command_name(command: &DriverCommand) -> &'static str {
    match command {
        DriverCommand::Attach => "ATTACH",
        DriverCommand::Initialize => "INITIALIZE",
        DriverCommand::Enable => "ENABLE",
        _ => "command",
    }
}

/// Read-only copy of an interface record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub index: IfIndex,
    pub name: String,
    pub address: Ipv4Addr,
    pub mask: Ipv4Addr,
    pub network: Ipv4Addr,
    pub mtu: u32,
    pub physical_address: MacAddr,
    pub capabilities: InterfaceCapability,
    pub link_up: bool,
}

impl fmt::Display for InterfaceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {}/{} mtu {} hw {} link {}",
            self.name,
            self.index,
            self.address,
            self.mask,
            self.mtu,
            self.physical_address,
            if self.link_up { "up" } else { "down" }
        )
    }
}

// =============================================================================
// Interface table
// =============================================================================

pub(crate) struct InterfaceTable {
    slots: [Interface; MAX_IP_INTERFACES],
}

impl InterfaceTable {
    pub(crate) fn new(loopback: bool) -> Self {
        let mut slots = core::array::from_fn(|i| Interface::empty(IfIndex(i)));
        if loopback {
            slots[LOOPBACK_INTERFACE.0] = Interface::loopback(LOOPBACK_INTERFACE);
        }
        Self { slots }
    }

    /// The live interface at `index`.
    pub(crate) fn get(&self, index: IfIndex) -> Result<&Interface, IpError> {
        match self.slots.get(index.0) {
            Some(iface) if iface.valid => Ok(iface),
            _ => Err(IpError::InvalidInterface),
        }
    }

    pub(crate) fn get_mut(&mut self, index: IfIndex) -> Result<&mut Interface, IpError> {
        match self.slots.get_mut(index.0) {
            Some(iface) if iface.valid => Ok(iface),
            _ => Err(IpError::InvalidInterface),
        }
    }

    /// Every live slot, loopback included, in slot order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.slots.iter().filter(|iface| iface.valid)
    }

    /// Live driver-backed slots in slot order.
    pub(crate) fn physical(&self) -> impl Iterator<Item = &Interface> {
        self.slots[..MAX_PHYSICAL_INTERFACES]
            .iter()
            .filter(|iface| iface.valid)
    }

    pub(crate) fn physical_mut(&mut self) -> impl Iterator<Item = &mut Interface> {
        self.slots[..MAX_PHYSICAL_INTERFACES]
            .iter_mut()
            .filter(|iface| iface.valid)
    }

    fn first_free(&self) -> Option<IfIndex> {
        self.slots[..MAX_PHYSICAL_INTERFACES]
            .iter()
            .position(|iface| !iface.valid)
            .map(IfIndex)
    }

    fn holds_address(&self, address: Ipv4Addr) -> bool {
        self.iter().any(|iface| iface.address == address)
    }

    /// First live physical interface with a configured address whose
    /// subnet contains `addr`.
    pub(crate) fn owner_of(&self, addr: Ipv4Addr) -> Option<IfIndex> {
        self.physical()
            .find(|iface| !iface.address.is_unspecified() && iface.contains(addr))
            .map(|iface| iface.index)
    }
}

// =============================================================================
// Instance operations
// =============================================================================

impl IpInstance {
    /// Attach a new interface in the first free slot.
    ///
    /// When the helper task is already running the driver is brought up
    /// here (ATTACH, INITIALIZE, ENABLE, then the all-hosts join when
    /// multicast is on); otherwise the helper's startup does the same for
    /// every interface attached before it.
    pub fn interface_attach(
        &self,
        name: &str,
        address: Ipv4Addr,
        mask: Ipv4Addr,
        driver: Arc<dyn IpDriver>,
    ) -> Result<IfIndex, IpError> {
        thread_context()?;
        let mut core = self.core.lock();

        if !address.is_unspecified() && core.interfaces.holds_address(address) {
            klog_debug!("ip {}: attach {} rejected, {} in use", self.name(), name, address);
            return Err(IpError::DuplicateAddress);
        }
        let index = core.interfaces.first_free().ok_or(IpError::NoFreeSlot)?;

        let running = self.helper_state() == HelperState::Running;
        let multicast = core.multicast;
        let iface = &mut core.interfaces.slots[index.0];
        *iface = Interface::empty(index);
        iface.name = name.to_string();
        iface.valid = true;
        iface.set_address(address, mask);
        iface.driver = Some(driver);

        klog_info!("ip {}: attached {} as {} {}/{}", self.name(), name, index, address, mask);

        if running {
            iface.bring_up();
            if multicast {
                iface.join_all_hosts();
            }
        }
        Ok(index)
    }

    /// Detach an interface: DETACH to the driver, then drop the static
    /// routes and gateway that use it and free the slot.
    pub fn interface_detach(&self, index: IfIndex) -> Result<(), IpError> {
        thread_context()?;
        if index == LOOPBACK_INTERFACE {
            return Err(IpError::InvalidInterface);
        }
        let mut core = self.core.lock();
        let iface = core.interfaces.get_mut(index)?;
        if let Err(DriverError::Failed) = iface.command(DriverCommand::Detach) {
            klog_warn!("ip {}: {} DETACH failed", self.name(), iface.name);
        }
        klog_info!("ip {}: detached {}", self.name(), iface.name);
        *iface = Interface::empty(index);

        let removed = core.routes.remove_interface(index);
        if removed > 0 {
            klog_debug!("ip {}: dropped {} routes via {}", self.name(), removed, index);
        }
        if core.gateway.is_some_and(|gw| gw.interface == index) {
            core.gateway = None;
        }
        self.link_status_pending
            .fetch_and(!(1 << index.0), Ordering::AcqRel);
        Ok(())
    }

    pub fn interface_address_get(&self, index: IfIndex) -> Result<(Ipv4Addr, Ipv4Addr), IpError> {
        thread_context()?;
        let core = self.core.lock();
        let iface = core.interfaces.get(index)?;
        Ok((iface.address, iface.mask))
    }

    /// Replace address and mask together; the network is re-derived.
    pub fn interface_address_set(
        &self,
        index: IfIndex,
        address: Ipv4Addr,
        mask: Ipv4Addr,
    ) -> Result<(), IpError> {
        thread_context()?;
        let notify = {
            let mut core = self.core.lock();
            let iface = core.interfaces.get_mut(index)?;
            iface.set_address(address, mask);
            klog_info!("ip {}: {} now {}/{}", self.name(), iface.name, address, mask);
            core.address_change_notify
        };
        if let Some(notify) = notify {
            notify(self, index, address, mask);
        }
        Ok(())
    }

    pub fn interface_info_get(&self, index: IfIndex) -> Result<InterfaceInfo, IpError> {
        thread_context()?;
        let core = self.core.lock();
        core.interfaces.get(index).map(Interface::info)
    }

    /// Snapshot of every live interface in slot order.
    pub fn interfaces(&self) -> alloc::vec::Vec<InterfaceInfo> {
        let core = self.core.lock();
        core.interfaces.iter().map(Interface::info).collect()
    }

    pub fn interface_capability_get(&self, index: IfIndex) -> Result<InterfaceCapability, IpError> {
        thread_context()?;
        let core = self.core.lock();
        Ok(core.interfaces.get(index)?.link.capabilities)
    }

    pub fn interface_capability_set(
        &self,
        index: IfIndex,
        capabilities: InterfaceCapability,
    ) -> Result<(), IpError> {
        thread_context()?;
        let mut core = self.core.lock();
        let iface = core.interfaces.get_mut(index)?;
        iface.link.capabilities = capabilities;
        match iface.command(DriverCommand::CapabilitySet(capabilities)) {
            Ok(_) | Err(DriverError::Unhandled) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn interface_mtu_set(&self, index: IfIndex, mtu: u32) -> Result<(), IpError> {
        thread_context()?;
        let mut core = self.core.lock();
        core.interfaces.get_mut(index)?.link.mtu = mtu;
        Ok(())
    }

    pub fn interface_physical_address_get(&self, index: IfIndex) -> Result<MacAddr, IpError> {
        thread_context()?;
        let core = self.core.lock();
        Ok(core.interfaces.get(index)?.link.physical_address)
    }

    /// Program a new physical address. A driver that does not handle
    /// SET_PHYSICAL_ADDRESS still gets the cached address updated.
    pub fn interface_physical_address_set(&self, index: IfIndex, mac: MacAddr) -> Result<(), IpError> {
        thread_context()?;
        let mut core = self.core.lock();
        let iface = core.interfaces.get_mut(index)?;
        match iface.command(DriverCommand::SetPhysicalAddress(mac)) {
            Ok(_) | Err(DriverError::Unhandled) => {
                iface.link.physical_address = mac;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Pass a driver-private command straight through.
    pub fn driver_direct_command(
        &self,
        index: IfIndex,
        code: u32,
        arg: u64,
    ) -> Result<DriverReply, IpError> {
        thread_context()?;
        let mut core = self.core.lock();
        let iface = core.interfaces.get_mut(index)?;
        iface
            .command(DriverCommand::Direct { code, arg })
            .map_err(IpError::from)
    }

    /// Turn on all-hosts membership; the helper task joins the group on
    /// every live interface.
    pub fn multicast_enable(&self) -> Result<(), IpError> {
        thread_context()?;
        self.core.lock().multicast = true;
        self.events.set(crate::helper::IpEvents::IGMP_ENABLE.bits());
        Ok(())
    }

    pub fn multicast_enabled(&self) -> bool {
        self.core.lock().multicast
    }
}
