//! BPF filter construction
//!
//! Only inbound TCP segments that carry data and are addressed to one of
//! our source addresses are worth decoding. IPv6 has no `tcp[tcpflags]`
//! shorthand, so the PSH bit is read from the fixed header offset
//! (40-byte IPv6 header + 13).

use sqlsweep_common::ScanConfig;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::CaptureError;

#[must_use]
pub fn ipv4_clause(destination: Ipv4Addr) -> String {
    format!("((ip proto 6 && (tcp[tcpflags] & tcp-push != 0)) && ip dst {destination})")
}

#[must_use]
pub fn ipv6_clause(destination: Ipv6Addr) -> String {
    format!("((ip6 proto 6 && (ip6[53] & 8 != 0)) && ip6 dst {destination})")
}

/// Build the capture filter for the families enabled in `config`.
pub fn build_filter(config: &ScanConfig) -> Result<String, CaptureError> {
    match (config.source_v4, config.source_v6) {
        (Some(v4), Some(v6)) => Ok(format!("({}||{})", ipv6_clause(v6), ipv4_clause(v4))),
        (Some(v4), None) => Ok(ipv4_clause(v4)),
        (None, Some(v6)) => Ok(ipv6_clause(v6)),
        (None, None) => Err(CaptureError::NoAddressFamily),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv4_only() {
        let config = ScanConfig::new("eth0").with_source_v4(Ipv4Addr::new(192, 168, 1, 2));
        assert_eq!(
            build_filter(&config).unwrap(),
            "((ip proto 6 && (tcp[tcpflags] & tcp-push != 0)) && ip dst 192.168.1.2)"
        );
    }

    #[test]
    fn test_ipv6_only() {
        let config = ScanConfig::new("eth0").with_source_v6("2001:db8::2".parse().unwrap());
        assert_eq!(
            build_filter(&config).unwrap(),
            "((ip6 proto 6 && (ip6[53] & 8 != 0)) && ip6 dst 2001:db8::2)"
        );
    }

    #[test]
    fn test_both_families_are_or_combined() {
        let config = ScanConfig::new("eth0")
            .with_source_v4(Ipv4Addr::new(10, 0, 0, 2))
            .with_source_v6("2001:db8::2".parse().unwrap());
        let filter = build_filter(&config).unwrap();
        assert!(filter.starts_with("(((ip6 proto 6"));
        assert!(filter.contains(")||(("));
        assert!(filter.ends_with("ip dst 10.0.0.2))"));
    }

    #[test]
    fn test_no_family_is_an_error() {
        let config = ScanConfig::new("eth0");
        assert!(matches!(build_filter(&config), Err(CaptureError::NoAddressFamily)));
    }
}
