//! Per-instance counters.
//!
//! Counters are plain relaxed atomics so drivers and the helper can bump
//! them without taking the instance mutex. A snapshot is taken under the
//! mutex, which keeps it consistent with respect to other thread-context
//! readers but not to interrupt-side increments.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use ipcore_lib::paste::paste;

use crate::ip::{IpInstance, thread_context};
use crate::types::IpError;

macro_rules! ip_counters {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        paste! {
            /// Live counters. Protocol layers bump their own through
            /// [`IpInstance::counters`].
            pub struct IpStats {
                $($name: AtomicU64,)*
            }

            impl IpStats {
                pub(crate) const fn new() -> Self {
                    Self { $($name: AtomicU64::new(0),)* }
                }

                $(
                    #[inline]
                    pub fn [<add_ $name>](&self, n: u64) {
                        self.$name.fetch_add(n, Ordering::Relaxed);
                    }
                )*

                fn snapshot(&self) -> IpStatsSnapshot {
                    IpStatsSnapshot {
                        $($name: self.$name.load(Ordering::Relaxed),)*
                    }
                }
            }

            #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
            pub struct IpStatsSnapshot {
                $($(#[$meta])* pub $name: u64,)*
            }
        }
    };
}

ip_counters! {
    /// Send calls that reached route resolution.
    send_requests,
    packets_sent,
    bytes_sent,
    packets_received,
    /// Received buffers handed to the IPv4 demultiplexer.
    packets_delivered,
    bytes_received,
    /// Received buffers with a bad version or header.
    invalid_packets,
    invalid_transmit_packets,
    transmit_no_route,
    receive_dropped,
    checksum_errors,
    send_dropped,
    fragments_sent,
    fragments_received,
    /// Raw buffers dropped because the raw queue was full.
    raw_dropped,
}

impl fmt::Display for IpStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "tx: {} req, {} pkts, {} bytes, {} no route, {} dropped, {} invalid, {} frags",
            self.send_requests,
            self.packets_sent,
            self.bytes_sent,
            self.transmit_no_route,
            self.send_dropped,
            self.invalid_transmit_packets,
            self.fragments_sent
        )?;
        write!(
            f,
            "rx: {} pkts, {} delivered, {} bytes, {} invalid, {} csum, {} dropped, {} raw dropped, {} frags",
            self.packets_received,
            self.packets_delivered,
            self.bytes_received,
            self.invalid_packets,
            self.checksum_errors,
            self.receive_dropped,
            self.raw_dropped,
            self.fragments_received
        )
    }
}

impl IpInstance {
    /// Lock-free read of the counters.
    pub fn stats(&self) -> IpStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn counters(&self) -> &IpStats {
        &self.stats
    }

    /// Counter snapshot taken under the instance mutex.
    pub fn info_get(&self) -> Result<IpStatsSnapshot, IpError> {
        thread_context()?;
        let _core = self.core.lock();
        Ok(self.stats.snapshot())
    }
}
