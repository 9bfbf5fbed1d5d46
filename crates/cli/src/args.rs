use clap::{Args, Parser, Subcommand};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;
use std::time::Duration;

use sqlsweep_common::config::DEFAULT_CHANNEL_CAPACITY;
use sqlsweep_common::ScanConfig;

#[derive(Parser, Debug)]
#[command(name = "sqlsweep")]
#[command(version)]
#[command(about = "Stateless MySQL handshake scanner", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dial `ip,port` targets and record the MySQL handshakes they send back
    Scan(ScanArgs),
    /// List devices available for capture
    Interfaces,
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Interface to capture replies on
    #[arg(short, long)]
    pub interface: String,

    /// Connect timeout in seconds
    #[arg(short, long, default_value_t = 10)]
    pub timeout: u64,

    /// Seconds without a captured packet before the scan gives up
    #[arg(short, long, default_value_t = 2)]
    pub cooldown: u64,

    /// IPv4 source address; enables IPv4 targets
    #[arg(short = '4', long = "ipv4", value_name = "ADDR")]
    pub ipv4: Option<Ipv4Addr>,

    /// IPv6 source address; enables IPv6 targets
    #[arg(short = '6', long = "ipv6", value_name = "ADDR")]
    pub ipv6: Option<Ipv6Addr>,

    /// Read targets from a file instead of stdin
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Capture events buffered ahead of the correlator
    #[arg(long, default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,
}

impl ScanArgs {
    #[must_use]
    pub fn to_config(&self) -> ScanConfig {
        let mut config = ScanConfig::new(self.interface.as_str())
            .with_timeout(Duration::from_secs(self.timeout))
            .with_cooldown(Duration::from_secs(self.cooldown))
            .with_channel_capacity(self.channel_capacity);
        if let Some(v4) = self.ipv4 {
            config = config.with_source_v4(v4);
        }
        if let Some(v6) = self.ipv6 {
            config = config.with_source_v6(v6);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_scan_defaults() {
        let cli = Cli::parse_from(["sqlsweep", "scan", "-i", "eth0", "-4", "192.0.2.10"]);
        let Commands::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        let config = args.to_config();
        assert_eq!(config.interface, "eth0");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.cooldown, Duration::from_secs(2));
        assert_eq!(config.source_v4, Some(Ipv4Addr::new(192, 0, 2, 10)));
        assert_eq!(config.source_v6, None);
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dual_stack_and_verbosity() {
        let cli = Cli::parse_from([
            "sqlsweep", "-vv", "scan", "-i", "eth0", "-t", "3", "-c", "5", "-4", "192.0.2.10", "-6",
            "2001:db8::10", "--log-json",
        ]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.log_json);
        let Commands::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        let config = args.to_config();
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.cooldown, Duration::from_secs(5));
        assert!(config.source_v6.is_some());
    }

    #[test]
    fn test_bad_source_address_is_rejected() {
        assert!(Cli::try_parse_from(["sqlsweep", "scan", "-i", "eth0", "-4", "not-an-ip"]).is_err());
    }
}
