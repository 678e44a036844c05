use clap::Parser;
use log::{error, info};
use pong_server::config::{MatchSettings, ServerConfig};
use pong_server::network::Server;

/// Main-method of the application.
/// Parses command-line arguments, binds the listener and serves matches until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[command(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[arg(short = 'H', long, env = "SERVER_IP", default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[arg(short, long, env = "SERVER_PORT", default_value = "5555")]
        port: u16,
        /// Simulation ticks per second
        #[arg(short, long, default_value = "60")]
        tick_rate: u32,
        /// Milliseconds between countdown steps
        #[arg(long, default_value = "1000")]
        countdown_step_ms: u64,
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = MatchSettings::from_rates(args.tick_rate, args.countdown_step_ms);
    let config = ServerConfig::new(&args.host, args.port, settings);

    let server = match Server::bind(&config).await {
        Ok(server) => server,
        Err(e) => {
            error!("Error starting server on {}: {}", config.bind_addr, e);
            std::process::exit(1);
        }
    };

    tokio::select! {
        _ = server.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Server interrupted by user, shutting down...");
        }
    }

    Ok(())
}
