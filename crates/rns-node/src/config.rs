//! TOML configuration for rns nodes.

use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

use rns_transport::InterfaceMode;

use crate::error::NodeError;

/// Top-level node configuration.
#[derive(Debug, Default, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub node: NodeSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub interfaces: Vec<InterfaceEntry>,
    #[serde(default)]
    pub destinations: Vec<DestinationEntry>,
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("failed to read config file: {e}")))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(format!("failed to parse config: {e}")))
    }
}

/// The `[node]` section.
#[derive(Debug, Deserialize)]
pub struct NodeSection {
    /// Whether this node forwards traffic for others.
    #[serde(default)]
    pub enable_transport: bool,
    /// Seconds between re-announcing configured destinations. 0 disables
    /// periodic re-announces.
    #[serde(default = "default_announce_interval")]
    pub announce_interval: u64,
    /// Storage directory. Defaults to `~/.rns`.
    pub storage_path: Option<String>,
}

fn default_announce_interval() -> u64 {
    1800
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            enable_transport: false,
            announce_interval: default_announce_interval(),
            storage_path: None,
        }
    }
}

/// The `[logging]` section.
#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "plain" or "json".
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "plain".into()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// An `[[interfaces]]` entry. Only UDP is built in; everything else is an
/// out-of-tree driver.
#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceEntry {
    pub name: String,
    /// Interface kind; currently `"udp"`.
    pub kind: String,
    /// Local bind address.
    pub bind: SocketAddr,
    /// Peer address for outgoing datagrams.
    pub target: Option<SocketAddr>,
    /// Nominal bandwidth in bits per second.
    #[serde(default = "default_bitrate")]
    pub bitrate: u64,
    /// Interface mode; one of `full`, `point_to_point`, `access_point`,
    /// `roaming`, `boundary`, `gateway`.
    #[serde(default = "default_mode")]
    pub mode: String,
}

fn default_bitrate() -> u64 {
    10_000_000
}

fn default_mode() -> String {
    "full".into()
}

impl InterfaceEntry {
    pub fn interface_mode(&self) -> Result<InterfaceMode, NodeError> {
        match self.mode.as_str() {
            "full" => Ok(InterfaceMode::Full),
            "point_to_point" => Ok(InterfaceMode::PointToPoint),
            "access_point" => Ok(InterfaceMode::AccessPoint),
            "roaming" => Ok(InterfaceMode::Roaming),
            "boundary" => Ok(InterfaceMode::Boundary),
            "gateway" => Ok(InterfaceMode::Gateway),
            other => Err(NodeError::Config(format!("unknown interface mode: {other}"))),
        }
    }
}

/// A `[[destinations]]` entry announced on startup.
#[derive(Debug, Clone, Deserialize)]
pub struct DestinationEntry {
    pub app_name: String,
    #[serde(default)]
    pub aspects: Vec<String>,
    /// Optional application data carried in announces.
    pub app_data: Option<String>,
    /// Whether incoming link requests are accepted.
    #[serde(default)]
    pub accept_links: bool,
    /// Whether announces carry a rotating ratchet key.
    #[serde(default)]
    pub ratchets: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_gets_defaults() {
        let config = NodeConfig::parse("").unwrap();
        assert!(!config.node.enable_transport);
        assert_eq!(config.node.announce_interval, 1800);
        assert_eq!(config.logging.level, "info");
        assert!(config.interfaces.is_empty());
        assert!(config.destinations.is_empty());
    }

    #[test]
    fn full_config_parses() {
        let config = NodeConfig::parse(
            r#"
            [node]
            enable_transport = true
            announce_interval = 600

            [logging]
            level = "debug"
            format = "json"

            [[interfaces]]
            name = "udp0"
            kind = "udp"
            bind = "0.0.0.0:4242"
            target = "192.0.2.1:4242"
            bitrate = 1000000
            mode = "gateway"

            [[destinations]]
            app_name = "chat"
            aspects = ["alpha"]
            app_data = "node-1"
            accept_links = true
            ratchets = true
            "#,
        )
        .unwrap();

        assert!(config.node.enable_transport);
        assert_eq!(config.node.announce_interval, 600);
        assert_eq!(config.logging.format, "json");

        let iface = &config.interfaces[0];
        assert_eq!(iface.kind, "udp");
        assert_eq!(iface.bitrate, 1_000_000);
        assert_eq!(iface.interface_mode().unwrap(), InterfaceMode::Gateway);

        let dest = &config.destinations[0];
        assert_eq!(dest.app_name, "chat");
        assert!(dest.accept_links);
        assert!(dest.ratchets);
    }

    #[test]
    fn bad_mode_is_rejected() {
        let config = NodeConfig::parse(
            r#"
            [[interfaces]]
            name = "udp0"
            kind = "udp"
            bind = "0.0.0.0:4242"
            mode = "warp"
            "#,
        )
        .unwrap();
        assert!(config.interfaces[0].interface_mode().is_err());
    }
}
