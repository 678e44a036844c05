//! Runtime settings for the server and the matches it hosts.

use std::time::Duration;

/// Timing shared by every match the server creates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchSettings {
    /// Period of one simulation tick.
    pub tick: Duration,
    /// Time between two countdown steps.
    pub countdown_step: Duration,
}

impl MatchSettings {
    pub fn from_rates(tick_rate: u32, countdown_step_ms: u64) -> Self {
        Self {
            tick: Duration::from_secs_f64(1.0 / tick_rate.max(1) as f64),
            countdown_step: Duration::from_millis(countdown_step_ms),
        }
    }
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self::from_rates(60, 1000)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address the TCP listener binds to, e.g. `127.0.0.1:5555`.
    pub bind_addr: String,
    pub settings: MatchSettings,
}

impl ServerConfig {
    pub fn new(host: &str, port: u16, settings: MatchSettings) -> Self {
        Self {
            bind_addr: format!("{}:{}", host, port),
            settings,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", 5555, MatchSettings::default())
    }
}
