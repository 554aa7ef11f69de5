//! Status polling.
//!
//! A caller asks for a set of conditions and waits, polling once per tick,
//! until all of them hold or its budget runs out.

use bitflags::bitflags;
use ipcore_abi::status as abi;
use ipcore_lib::Deadline;
use ipcore_lib::kernel_services::rtos;

use crate::ip::{HelperState, IpInstance, thread_context};
use crate::types::{IfIndex, IpError};

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct IpStatus: u32 {
        const INITIALIZE_DONE        = abi::IP_INITIALIZE_DONE;
        const ADDRESS_RESOLVED       = abi::IP_ADDRESS_RESOLVED;
        const LINK_ENABLED           = abi::IP_LINK_ENABLED;
        const ARP_ENABLED            = abi::IP_ARP_ENABLED;
        const UDP_ENABLED            = abi::IP_UDP_ENABLED;
        const TCP_ENABLED            = abi::IP_TCP_ENABLED;
        const IGMP_ENABLED           = abi::IP_IGMP_ENABLED;
        const RARP_COMPLETE          = abi::IP_RARP_COMPLETE;
        const INTERFACE_LINK_ENABLED = abi::IP_INTERFACE_LINK_ENABLED;
    }
}

impl IpInstance {
    /// Wait for `needed` on the primary interface (the first live physical
    /// slot, or the loopback when none is attached).
    pub fn status_check(&self, needed: IpStatus, wait: u64) -> Result<IpStatus, IpError> {
        self.poll_status(None, needed, wait)
    }

    /// Wait for `needed` on one interface.
    pub fn interface_status_check(
        &self,
        index: IfIndex,
        needed: IpStatus,
        wait: u64,
    ) -> Result<IpStatus, IpError> {
        self.core.lock().interfaces.get(index)?;
        self.poll_status(Some(index), needed, wait)
    }

    fn poll_status(
        &self,
        index: Option<IfIndex>,
        needed: IpStatus,
        wait: u64,
    ) -> Result<IpStatus, IpError> {
        thread_context()?;
        let deadline = Deadline::after(wait);
        loop {
            let current = self.current_status(index)?;
            if current.contains(needed) {
                return Ok(current);
            }
            if deadline.expired() || !rtos::is_rtos_initialized() {
                return Err(IpError::NotSuccessful);
            }
            rtos::thread_sleep(1);
        }
    }

    fn current_status(&self, index: Option<IfIndex>) -> Result<IpStatus, IpError> {
        let mut status = self.hooks.enabled_protocols()
            & !(IpStatus::INITIALIZE_DONE
                | IpStatus::ADDRESS_RESOLVED
                | IpStatus::LINK_ENABLED
                | IpStatus::INTERFACE_LINK_ENABLED);
        if self.helper_state() == HelperState::Running {
            status |= IpStatus::INITIALIZE_DONE;
        }

        let mut core = self.core.lock();
        let index = match index {
            Some(index) => index,
            None => match core.interfaces.physical().next() {
                Some(iface) => iface.index(),
                None => crate::LOOPBACK_INTERFACE,
            },
        };
        let Ok(iface) = core.interfaces.get_mut(index) else {
            // The slot went away while polling.
            return Err(IpError::InvalidInterface);
        };
        if !iface.address().is_unspecified() {
            status |= IpStatus::ADDRESS_RESOLVED;
        }
        if iface.query_link() {
            status |= IpStatus::LINK_ENABLED | IpStatus::INTERFACE_LINK_ENABLED;
        }
        Ok(status)
    }
}
