//! Test doubles shared by the net test suites.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use std::sync::Mutex as StdMutex;

use crate::driver::{DriverCommand, DriverError, DriverReply, DriverResult, IpDriver, LinkInfo};
use crate::hooks::{ProtocolEvent, ProtocolHooks, TransmitRequest};
use crate::ip::IpInstance;
use crate::packet::Packet;
use crate::types::{IfIndex, Ipv4Addr, MacAddr};
use crate::{IpConfig, IpStatus};

/// What `GetStatus` answers with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusReply {
    Live,
    Unhandled,
    Failed,
}

struct MockState {
    commands: Vec<DriverCommand>,
    link_up: bool,
    status: StatusReply,
    fail_on: Option<DriverCommand>,
    unhandled: Vec<DriverCommand>,
}

/// Driver that records every command and brings its link up on ENABLE.
pub struct MockDriver {
    state: StdMutex<MockState>,
    mac: MacAddr,
}

impl MockDriver {
    pub fn new() -> Arc<Self> {
        Self::with_mac(MacAddr([0x02, 0, 0, 0, 0, 0x01]))
    }

    pub fn with_mac(mac: MacAddr) -> Arc<Self> {
        Arc::new(Self {
            state: StdMutex::new(MockState {
                commands: Vec::new(),
                link_up: true,
                status: StatusReply::Live,
                fail_on: None,
                unhandled: Vec::new(),
            }),
            mac,
        })
    }

    pub fn commands(&self) -> Vec<DriverCommand> {
        self.state.lock().map(|s| s.commands.clone()).unwrap_or_default()
    }

    pub fn command_codes(&self) -> Vec<u32> {
        self.commands().iter().map(DriverCommand::code).collect()
    }

    /// Physical link state reported to GET_STATUS and applied on ENABLE.
    pub fn set_link(&self, up: bool) {
        if let Ok(mut s) = self.state.lock() {
            s.link_up = up;
        }
    }

    pub fn set_status_reply(&self, reply: StatusReply) {
        if let Ok(mut s) = self.state.lock() {
            s.status = reply;
        }
    }

    pub fn fail_on(&self, command: DriverCommand) {
        if let Ok(mut s) = self.state.lock() {
            s.fail_on = Some(command);
        }
    }

    pub fn leave_unhandled(&self, command: DriverCommand) {
        if let Ok(mut s) = self.state.lock() {
            s.unhandled.push(command);
        }
    }
}

impl IpDriver for MockDriver {
    fn command(&self, link: &mut LinkInfo, command: DriverCommand) -> DriverResult {
        let mut s = self.state.lock().map_err(|_| DriverError::Failed)?;
        s.commands.push(command);
        if s.fail_on == Some(command) {
            return Err(DriverError::Failed);
        }
        if s.unhandled.contains(&command) {
            return Err(DriverError::Unhandled);
        }
        match command {
            DriverCommand::Initialize => {
                link.physical_address = self.mac;
                link.mtu = 1500;
                Ok(DriverReply::Done)
            }
            DriverCommand::Enable => {
                link.link_up = s.link_up;
                Ok(DriverReply::Done)
            }
            DriverCommand::Disable => {
                link.link_up = false;
                Ok(DriverReply::Done)
            }
            DriverCommand::GetStatus => match s.status {
                StatusReply::Live => Ok(DriverReply::LinkStatus(s.link_up)),
                StatusReply::Unhandled => Err(DriverError::Unhandled),
                StatusReply::Failed => Err(DriverError::Failed),
            },
            DriverCommand::Direct { arg, .. } => Ok(DriverReply::Value(arg + 1)),
            _ => Ok(DriverReply::Done),
        }
    }
}

#[derive(Default)]
pub struct HookLog {
    pub transmitted: Vec<(TransmitRequest, usize)>,
    pub received: Vec<usize>,
    pub events: Vec<&'static str>,
}

/// Protocol hooks that only record what the core asked of them.
#[derive(Default)]
pub struct RecordingHooks {
    pub log: StdMutex<HookLog>,
    /// Bits returned from `enabled_protocols`.
    pub protocols: StdMutex<u32>,
}

impl RecordingHooks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn transmitted(&self) -> Vec<(TransmitRequest, usize)> {
        self.log.lock().map(|l| l.transmitted.clone()).unwrap_or_default()
    }

    pub fn received(&self) -> Vec<usize> {
        self.log.lock().map(|l| l.received.clone()).unwrap_or_default()
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.log.lock().map(|l| l.events.clone()).unwrap_or_default()
    }

    fn note(&self, event: &'static str) {
        if let Ok(mut l) = self.log.lock() {
            l.events.push(event);
        }
    }
}

impl ProtocolHooks for RecordingHooks {
    fn transmit(&self, _ip: &IpInstance, packet: Box<Packet>, request: &TransmitRequest) {
        if let Ok(mut l) = self.log.lock() {
            l.transmitted.push((*request, packet.len()));
        }
    }

    fn ipv4_receive(&self, _ip: &IpInstance, packet: Box<Packet>) {
        if let Ok(mut l) = self.log.lock() {
            l.received.push(packet.len());
            l.events.push("ipv4");
        }
    }

    fn periodic(&self, _ip: &IpInstance) {
        self.note("periodic");
    }

    fn fast_periodic(&self, _ip: &IpInstance) {
        self.note("fast");
    }

    fn protocol_event(&self, _ip: &IpInstance, event: ProtocolEvent) {
        self.note(match event {
            ProtocolEvent::Tcp => "tcp",
            ProtocolEvent::ArpReceive => "arp",
            ProtocolEvent::RarpReceive => "rarp",
            ProtocolEvent::Igmp => "igmp",
            ProtocolEvent::Icmp => "icmp",
            ProtocolEvent::TcpCleanup => "tcp_cleanup",
        });
    }

    fn fragment_assembly(&self, _ip: &IpInstance) {
        self.note("unfrag");
    }

    fn fragment_timeout_check(&self, _ip: &IpInstance) {
        self.note("frag_timeout");
    }

    fn enabled_protocols(&self) -> IpStatus {
        let bits = self.protocols.lock().map(|b| *b).unwrap_or(0);
        IpStatus::from_bits_truncate(bits)
    }
}

pub fn v4(a: u8, b: u8, c: u8, d: u8) -> Ipv4Addr {
    Ipv4Addr::new(a, b, c, d)
}

pub fn mask(prefix: u32) -> Ipv4Addr {
    if prefix == 0 {
        Ipv4Addr::UNSPECIFIED
    } else {
        Ipv4Addr::from_u32(u32::MAX << (32 - prefix))
    }
}

/// A minimal IPv4 datagram of `len` bytes.
pub fn ipv4_packet(len: usize) -> Box<Packet> {
    let mut data = alloc::vec![0u8; len.max(20)];
    data[0] = 0x45;
    Packet::new(data)
}

pub fn instance(hooks: Arc<RecordingHooks>) -> IpInstance {
    IpInstance::new("test", IpConfig::default(), hooks)
}

/// Instance with the helper already running, so attach brings drivers up.
pub fn running_instance(hooks: Arc<RecordingHooks>) -> IpInstance {
    let ip = instance(hooks);
    let _ = ip.helper_startup();
    ip
}

pub fn attach(
    ip: &IpInstance,
    name: &str,
    address: Ipv4Addr,
    prefix: u32,
) -> (IfIndex, Arc<MockDriver>) {
    let driver = MockDriver::new();
    let index = ip
        .interface_attach(name, address, mask(prefix), driver.clone())
        .unwrap_or(IfIndex(usize::MAX));
    (index, driver)
}

/// Attach an interface whose link stays down after bring-up.
pub fn attach_down(
    ip: &IpInstance,
    name: &str,
    address: Ipv4Addr,
    prefix: u32,
) -> (IfIndex, Arc<MockDriver>) {
    let driver = MockDriver::new();
    driver.set_link(false);
    let index = ip
        .interface_attach(name, address, mask(prefix), driver.clone())
        .unwrap_or(IfIndex(usize::MAX));
    (index, driver)
}

/// Flip the cached link flag as a driver interrupt would.
pub fn set_cached_link(ip: &IpInstance, index: IfIndex, up: bool) {
    if let Ok(iface) = ip.core.lock().interfaces.get_mut(index) {
        iface.link.link_up = up;
    }
}
