use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::{env_parse, ConfigError, FromEnv};

/// Listen address for the HTTP server
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl ServerConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self { host, port }
    }

    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl FromEnv for ServerConfig {
    /// - HOST: IP literal, defaults to 0.0.0.0
    /// - PORT: defaults to 8080
    ///
    /// Both are parsed here so a bad value fails at startup rather than at bind.
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            host: env_parse("HOST", defaults.host)?,
            port: env_parse("PORT", defaults.port)?,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080)
    }
}
