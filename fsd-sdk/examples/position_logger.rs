//! Position logger example — connects as an observer and prints every
//! pilot and controller position it sees, plus consolidated text traffic.
//!
//! Usage:
//!   cargo run --example position_logger -- --server fsd.example.net:6809 \
//!     --callsign OBS_ME --name "Jane Observer" --client-id 0x1234567 --key secret

use anyhow::Result;
use clap::Parser;
use fsd_sdk::event::Event;
use fsd_sdk::protocol::fields::{AtcRating, PilotRating, ProtocolVersion};
use fsd_sdk::{ClientConfig, ClientIdentity, LoginMode, ServerTarget, connect};

#[derive(Parser)]
#[command(name = "position-logger", about = "FSD observer that logs traffic")]
struct Args {
    #[arg(long, default_value = "localhost:6809")]
    server: String,
    #[arg(long, default_value = "OBS_ME")]
    callsign: String,
    #[arg(long, default_value = "Position Logger")]
    name: String,
    /// Client id, hex (e.g. 0x1234567) or decimal.
    #[arg(long, value_parser = parse_client_id, default_value = "0x1234567")]
    client_id: u32,
    #[arg(long, default_value = "changeme")]
    key: String,
}

fn parse_client_id(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("bad client id {s:?}: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let (host, port) = args
        .server
        .rsplit_once(':')
        .ok_or_else(|| anyhow::anyhow!("server must be host:port"))?;

    let identity = ClientIdentity {
        callsign: args.callsign,
        real_name: args.name,
        client_id: args.client_id,
        key: args.key,
        protocol: ProtocolVersion::CURRENT,
        simulator_type: 0,
        rating: AtcRating::Observer,
        pilot_rating: PilotRating::Student,
        capabilities: fsd_sdk::caps::CapabilitySet::default(),
    };
    let server = ServerTarget {
        host: host.to_string(),
        port: port.parse()?,
        mode: LoginMode::Observer,
        require_icao_equipment_suffix: false,
    };

    let (handle, mut events) = connect(ClientConfig::new(identity, server)).await?;

    while let Some(event) = events.recv().await {
        match event {
            Event::Connected => println!("connected"),
            Event::Disconnected { reason } => {
                println!("disconnected: {reason}");
                break;
            }
            Event::PilotPosition(p) => {
                println!(
                    "{}: {:.5} {:.5} {}ft {}kts hdg {:.0}{}",
                    p.callsign,
                    p.latitude,
                    p.longitude,
                    p.altitude_ft,
                    p.groundspeed_kts,
                    p.heading,
                    if p.on_ground { " (ground)" } else { "" },
                );
            }
            Event::AtcPosition(p) => {
                println!("{}: online, range {}nm", p.callsign, p.visual_range_nm);
            }
            Event::TextBatch(batch) => {
                println!("[{:?}] {}: {}", batch.to, batch.from, batch.messages.join(" | "));
            }
            Event::ServerError { code, text, .. } => {
                eprintln!("server error {code}: {text}");
            }
            Event::KillRequested { from, reason } => {
                eprintln!("killed by {from}: {}", reason.unwrap_or_default());
            }
            _ => {}
        }
    }

    drop(handle);
    Ok(())
}
