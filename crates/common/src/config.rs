//! Scan configuration
//!
//! Built once from the command line and passed by reference to every
//! component that needs it.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use crate::error::{SweepError, SweepResult};
use crate::types::AddressFamily;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(2);
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Capture interface name.
    pub interface: String,
    /// Per-connect timeout.
    pub timeout: Duration,
    /// Idle time after the last capture event before the scan drains.
    pub cooldown: Duration,
    /// IPv4 source address; `Some` enables IPv4 targets.
    pub source_v4: Option<Ipv4Addr>,
    /// IPv6 source address; `Some` enables IPv6 targets.
    pub source_v6: Option<Ipv6Addr>,
    /// Capacity of the capture -> correlator channel.
    pub channel_capacity: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interface: String::new(),
            timeout: DEFAULT_TIMEOUT,
            cooldown: DEFAULT_COOLDOWN,
            source_v4: None,
            source_v6: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ScanConfig {
    #[must_use]
    pub fn new<S: Into<String>>(interface: S) -> Self {
        Self {
            interface: interface.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    #[must_use]
    pub fn with_source_v4(mut self, source: Ipv4Addr) -> Self {
        self.source_v4 = Some(source);
        self
    }

    #[must_use]
    pub fn with_source_v6(mut self, source: Ipv6Addr) -> Self {
        self.source_v6 = Some(source);
        self
    }

    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    #[inline]
    #[must_use]
    pub fn is_enabled(&self, family: AddressFamily) -> bool {
        self.source_for(family).is_some()
    }

    /// Local address to bind when dialing a target of `family`.
    #[inline]
    #[must_use]
    pub fn source_for(&self, family: AddressFamily) -> Option<IpAddr> {
        match family {
            AddressFamily::V4 => self.source_v4.map(IpAddr::V4),
            AddressFamily::V6 => self.source_v6.map(IpAddr::V6),
        }
    }

    /// Enabled families, IPv4 first.
    #[must_use]
    pub fn enabled_families(&self) -> Vec<AddressFamily> {
        [AddressFamily::V4, AddressFamily::V6]
            .into_iter()
            .filter(|family| self.is_enabled(*family))
            .collect()
    }

    /// Reject configurations that cannot run a scan.
    pub fn validate(&self) -> SweepResult<()> {
        if self.interface.trim().is_empty() {
            return Err(SweepError::Config("no capture interface provided".into()));
        }
        if self.source_v4.is_none() && self.source_v6.is_none() {
            return Err(SweepError::Config(
                "no source address provided; enable IPv4, IPv6 or both".into(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(SweepError::Config("connect timeout must be non-zero".into()));
        }
        if self.channel_capacity == 0 {
            return Err(SweepError::Config("channel capacity must be non-zero".into()));
        }
        Ok(())
    }
}
