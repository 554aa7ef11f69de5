//! The IP instance object.
//!
//! All per-instance state lives here and every operation takes
//! `&IpInstance`, so several instances can coexist in one image. State is
//! split across two lock tiers:
//!
//! - `core` ([`Mutex`]): interface table, gateway, static routes and
//!   settings. Thread context only; edited with read-modify-write sequences.
//! - the queues and raw receive state ([`IrqMutex`]): touched from interrupt
//!   handlers too, so only held for a few pointer updates.
//!
//! Event flags and a handful of atomics bridge the two.

extern crate alloc;

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use core::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use ipcore_lib::kernel_services::rtos;
use ipcore_lib::{EventFlags, IrqMutex, Mutex, klog_info};

use crate::config::IpConfig;
use crate::deferred::DeferredQueue;
use crate::gateway::Gateway;
use crate::hooks::ProtocolHooks;
use crate::interface::InterfaceTable;
use crate::packet::Packet;
use crate::raw::RawState;
use crate::route::StaticRouteTable;
use crate::stats::IpStats;
use crate::types::{IfIndex, IpError, Ipv4Addr};

/// Called after an interface address or mask changes.
pub type AddressChangeNotify = fn(&IpInstance, IfIndex, Ipv4Addr, Ipv4Addr);
/// Called from the helper task after a driver reported a link change.
pub type LinkStatusNotify = fn(&IpInstance, IfIndex, bool);
/// Consumes buffers a driver queued with `driver_deferred_receive`.
pub type DriverDeferredHandler = fn(&IpInstance, alloc::boxed::Box<Packet>);

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HelperState {
    Uninitialized = 0,
    /// Driver bring-up in progress.
    Initializing = 1,
    Running = 2,
}

impl HelperState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Uninitialized,
            1 => Self::Initializing,
            _ => Self::Running,
        }
    }
}

/// State guarded by the instance mutex.
pub(crate) struct IpCore {
    pub(crate) interfaces: InterfaceTable,
    pub(crate) gateway: Option<Gateway>,
    pub(crate) routes: StaticRouteTable,
    pub(crate) multicast: bool,
    pub(crate) fragment: bool,
    pub(crate) address_change_notify: Option<AddressChangeNotify>,
    pub(crate) link_status_notify: Option<LinkStatusNotify>,
    pub(crate) driver_deferred_handler: Option<DriverDeferredHandler>,
}

pub struct IpInstance {
    name: String,
    config: IpConfig,
    pub(crate) core: Mutex<IpCore>,
    pub(crate) events: EventFlags,
    pub(crate) deferred: DeferredQueue,
    pub(crate) driver_deferred: DeferredQueue,
    pub(crate) raw: IrqMutex<RawState>,
    /// One bit per interface slot with an unprocessed link change.
    pub(crate) link_status_pending: AtomicU32,
    helper_state: AtomicU8,
    pub(crate) stats: IpStats,
    pub(crate) hooks: Arc<dyn ProtocolHooks>,
}

impl IpInstance {
    pub fn new(name: &str, config: IpConfig, hooks: Arc<dyn ProtocolHooks>) -> Self {
        let core = IpCore {
            interfaces: InterfaceTable::new(config.loopback),
            gateway: None,
            routes: StaticRouteTable::new(),
            multicast: config.multicast,
            fragment: config.fragment && cfg!(feature = "fragment"),
            address_change_notify: None,
            link_status_notify: None,
            driver_deferred_handler: None,
        };
        klog_info!(
            "ip {}: created (periodic {}t, fast {}t, raw max {})",
            name,
            config.periodic_ticks,
            config.fast_ticks,
            config.raw_queue_max
        );
        Self {
            name: name.to_string(),
            config,
            core: Mutex::new(core),
            events: EventFlags::new(),
            deferred: DeferredQueue::new(),
            driver_deferred: DeferredQueue::new(),
            raw: IrqMutex::new(RawState::new(config.raw_queue_max)),
            link_status_pending: AtomicU32::new(0),
            helper_state: AtomicU8::new(HelperState::Uninitialized as u8),
            stats: IpStats::new(),
            hooks,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn config(&self) -> &IpConfig {
        &self.config
    }

    /// Event group the helper task waits on. Protocol layers OR their own
    /// bits in here (`IpEvents::TCP`, `IpEvents::ARP_REC`, ...).
    #[inline]
    pub fn events(&self) -> &EventFlags {
        &self.events
    }

    #[inline]
    pub fn helper_state(&self) -> HelperState {
        HelperState::from_raw(self.helper_state.load(Ordering::Acquire))
    }

    pub(crate) fn set_helper_state(&self, state: HelperState) {
        self.helper_state.store(state as u8, Ordering::Release);
    }

    pub fn address_change_notify_set(&self, notify: Option<AddressChangeNotify>) -> Result<(), IpError> {
        thread_context()?;
        self.core.lock().address_change_notify = notify;
        Ok(())
    }

    pub fn link_status_change_notify_set(&self, notify: Option<LinkStatusNotify>) -> Result<(), IpError> {
        thread_context()?;
        self.core.lock().link_status_notify = notify;
        Ok(())
    }

    pub fn driver_deferred_packet_handler_set(
        &self,
        handler: Option<DriverDeferredHandler>,
    ) -> Result<(), IpError> {
        thread_context()?;
        self.core.lock().driver_deferred_handler = handler;
        Ok(())
    }
}

/// Thread-only operations refuse to run from an interrupt handler.
pub(crate) fn thread_context() -> Result<(), IpError> {
    if rtos::is_rtos_initialized() && rtos::in_interrupt() {
        Err(IpError::CallerError)
    } else {
        Ok(())
    }
}
