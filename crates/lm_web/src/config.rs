use std::env;
use std::net::SocketAddr;

use lm_core::{Error, Result};

pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
}

impl ServerConfig {
    /// `HTTP_ADDR` picks the bind address; `RUNNING_PORT` replaces only its port.
    pub fn from_env() -> Result<Self> {
        let addr = env::var("HTTP_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
        let port = env::var("RUNNING_PORT").ok();
        Self::resolve(&addr, port.as_deref())
    }

    pub fn resolve(addr: &str, port: Option<&str>) -> Result<Self> {
        let mut addr: SocketAddr = addr
            .trim()
            .parse()
            .map_err(|e| Error::Configuration(format!("Invalid HTTP_ADDR '{}': {}", addr, e)))?;

        if let Some(port) = port.map(str::trim).filter(|p| !p.is_empty()) {
            let port = port
                .parse::<u16>()
                .map_err(|e| Error::Configuration(format!("Invalid RUNNING_PORT '{}': {}", port, e)))?;
            addr.set_port(port);
        }

        Ok(Self { addr })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_port_overrides_port_only() {
        let config = ServerConfig::resolve("127.0.0.1:8080", Some("4000")).unwrap();
        assert_eq!(config.addr, "127.0.0.1:4000".parse().unwrap());

        let config = ServerConfig::resolve(DEFAULT_ADDR, None).unwrap();
        assert_eq!(config.addr.port(), 3000);
    }

    #[test]
    fn test_invalid_values_are_configuration_errors() {
        assert!(matches!(
            ServerConfig::resolve("nowhere", None),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            ServerConfig::resolve(DEFAULT_ADDR, Some("seventy")),
            Err(Error::Configuration(_))
        ));
    }
}
