//! Server network layer accepting TCP connections and handing them to sessions

use crate::config::ServerConfig;
use crate::matchmaker::Matchmaker;
use crate::session;
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Listening socket plus the matchmaker every accepted connection goes through
pub struct Server {
    listener: TcpListener,
    matchmaker: Arc<Matchmaker>,
}

impl Server {
    pub async fn bind(config: &ServerConfig) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        info!("Pong server started at {}", listener.local_addr()?);

        Ok(Server {
            listener,
            matchmaker: Arc::new(Matchmaker::new(config.settings)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    pub fn matchmaker(&self) -> Arc<Matchmaker> {
        Arc::clone(&self.matchmaker)
    }

    /// Accepts connections forever, pairing each one and spawning its session.
    pub async fn run(self) {
        info!("Waiting for connections...");

        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    continue;
                }
            };
            info!("New connection from {}", addr);

            if let Err(e) = stream.set_nodelay(true) {
                error!("Failed to disable Nagle for {}: {}", addr, e);
            }

            let (game, slot) = self.matchmaker.pair().await;
            session::spawn(stream, game, slot, Arc::clone(&self.matchmaker));
        }
    }
}
