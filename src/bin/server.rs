// ABOUTME: Aircast server binary
// ABOUTME: Standalone relay application for rebroadcasting publisher audio

use aircast::relay::{AircastServer, ServerArgs};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "aircast-server")]
#[command(author, version, about = "Aircast audio relay server", long_about = None)]
struct Args {
    #[command(flatten)]
    server: ServerArgs,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // Initialize tracing
    args.server.init_tracing();

    // Log startup info
    args.server.log_startup_info();

    // Create server configuration
    let config = args.server.build_config();

    // Create and run server
    let server = AircastServer::with_config(config);
    let registry = server.registry();

    // Spawn a task to periodically report live channels
    let report_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(5));
        loop {
            interval.tick().await;
            let channels = registry.snapshot();
            if !channels.is_empty() {
                tracing::info!("Live channels: {}", channels.len());
                for (id, summary) in channels {
                    tracing::info!(
                        "  - {}: active={}, clients={}, in={}B, out={}B, joins={}",
                        id,
                        summary.active,
                        summary.clients,
                        summary.stats.bytes_in,
                        summary.stats.bytes_out,
                        summary.stats.connections
                    );
                }
            }
        }
    });

    tracing::info!("Press Ctrl+C to stop");

    let result = server.run().await;
    report_task.abort();
    result
}
