use serde::{Deserialize, Serialize};

/// Host server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the WebSocket listener on.
    pub bind: String,
    /// Listener port (valid range: 1-65535).
    pub port: u32,
    /// Number of participant slots (valid range: 1-255).
    pub max_slots: u32,
    /// Slots reserved for AI traffic. Never handed to clients.
    pub ai_slots: Vec<u32>,
    /// Seconds a new connection has to send its hello (valid range: 1-120).
    pub hello_timeout_secs: u32,
    /// Outbound queue length per client (valid range: 8-4096).
    pub client_queue: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 9600,
            max_slots: 24,
            ai_slots: Vec::new(),
            hello_timeout_secs: 10,
            client_queue: 256,
        }
    }
}

impl ServerConfig {
    /// `bind:port` string for the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
