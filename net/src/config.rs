//! Per-instance configuration.
//!
//! Defaults suit a single small Ethernet attachment; a port may override
//! them from its boot command line (`ip.periodic=100 ip.raw_max=8 ...`).

use ipcore_lib::cmdline::{options, parse_bool, parse_ticks};

const DEFAULT_PERIODIC_TICKS: u64 = 100;
const DEFAULT_RAW_QUEUE_MAX: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IpConfig {
    /// Period of the housekeeping timer (ARP aging, reassembly timeout).
    pub periodic_ticks: u64,
    /// Period of the fast timer (retransmission clocks).
    pub fast_ticks: u64,
    /// Raw receive queue depth before newly delivered buffers are dropped.
    pub raw_queue_max: usize,
    /// Join the all-hosts group on every interface.
    pub multicast: bool,
    /// Reserve the slot after the physical interfaces for 127.0.0.1/8.
    pub loopback: bool,
    /// Reassembly hooks active from creation.
    pub fragment: bool,
}

impl Default for IpConfig {
    fn default() -> Self {
        Self {
            periodic_ticks: DEFAULT_PERIODIC_TICKS,
            fast_ticks: DEFAULT_PERIODIC_TICKS / 10,
            raw_queue_max: DEFAULT_RAW_QUEUE_MAX,
            multicast: false,
            loopback: true,
            fragment: false,
        }
    }
}

impl IpConfig {
    pub fn from_cmdline(cmdline: Option<&str>) -> Self {
        let mut cfg = Self::default();
        let Some(cmdline) = cmdline else {
            return cfg;
        };
        for (key, value) in options(cmdline, "ip.") {
            match key {
                "periodic" => {
                    if let Some(ticks) = parse_ticks(value).filter(|&t| t > 0) {
                        cfg.periodic_ticks = ticks;
                    }
                }
                "fast" => {
                    if let Some(ticks) = parse_ticks(value).filter(|&t| t > 0) {
                        cfg.fast_ticks = ticks;
                    }
                }
                "raw_max" => {
                    if let Ok(max) = value.parse::<usize>() {
                        cfg.raw_queue_max = max;
                    }
                }
                "multicast" => {
                    if let Some(on) = parse_bool(value) {
                        cfg.multicast = on;
                    }
                }
                "loopback" => {
                    if let Some(on) = parse_bool(value) {
                        cfg.loopback = on;
                    }
                }
                "fragment" => {
                    if let Some(on) = parse_bool(value) {
                        cfg.fragment = on;
                    }
                }
                _ => {}
            }
        }
        cfg
    }
}
