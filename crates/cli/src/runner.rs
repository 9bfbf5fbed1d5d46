use anyhow::{Context, Result};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::info;

use sqlsweep_capture::list_interfaces;
use sqlsweep_orchestrator::Orchestrator;

use crate::args::ScanArgs;
use crate::output::JsonLineSink;

pub async fn run_scan(args: ScanArgs) -> Result<()> {
    let config = args.to_config();
    config.validate().context("invalid arguments")?;
    info!(
        interface = %config.interface,
        timeout = ?config.timeout,
        cooldown = ?config.cooldown,
        families = ?config.enabled_families(),
        "Starting scan"
    );

    let input: Box<dyn AsyncBufRead + Unpin + Send> = match &args.input {
        Some(path) => {
            let file = File::open(path)
                .await
                .with_context(|| format!("opening target list {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let mut sink = JsonLineSink::new(tokio::io::stdout());
    let orchestrator = Orchestrator::new(config);
    let summary = orchestrator.run(input, &mut sink).await?;
    info!(records = sink.written(), elapsed = ?summary.elapsed, "Scan finished");
    Ok(())
}

pub fn print_interfaces() -> Result<()> {
    let devices = list_interfaces().context("listing capture devices")?;
    if devices.is_empty() {
        println!("No capture devices found (missing privileges?)");
        return Ok(());
    }
    for (name, description) in devices {
        match description {
            Some(description) => println!("{name:<20} {description}"),
            None => println!("{name}"),
        }
    }
    Ok(())
}
