//! Default gateway.
//!
//! At most one gateway per instance. Address and owning interface are set
//! and cleared together; when set, the owning interface's subnet contained
//! the address. The resolver re-checks that containment on every lookup
//! because interface addresses can change afterwards.

use ipcore_lib::klog_info;

use crate::ip::{IpInstance, thread_context};
use crate::types::{IfIndex, IpError, Ipv4Addr};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Gateway {
    pub address: Ipv4Addr,
    pub interface: IfIndex,
}

impl IpInstance {
    pub fn gateway_address_set(&self, address: Ipv4Addr) -> Result<(), IpError> {
        thread_context()?;
        if address.is_unspecified() {
            return Err(IpError::AddressError);
        }
        let mut core = self.core.lock();
        let interface = core
            .interfaces
            .owner_of(address)
            .ok_or(IpError::AddressError)?;
        core.gateway = Some(Gateway { address, interface });
        klog_info!("ip {}: gateway {} via {}", self.name(), address, interface);
        Ok(())
    }

    pub fn gateway_address_get(&self) -> Result<Gateway, IpError> {
        thread_context()?;
        self.core.lock().gateway.ok_or(IpError::NotFound)
    }

    pub fn gateway_address_clear(&self) -> Result<(), IpError> {
        thread_context()?;
        if self.core.lock().gateway.take().is_some() {
            klog_info!("ip {}: gateway cleared", self.name());
        }
        Ok(())
    }
}
