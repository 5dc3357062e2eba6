use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Result, TicksError};
use crate::presence::PresencePolicy;

pub struct Config {
    pub server: ServerConfig,
    pub presence: PresencePolicy,
    pub diagnostics: DiagnosticsConfig,
}

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
}

pub struct DiagnosticsConfig {
    pub log_file: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let port = match env::var("SERVER_PORT").or_else(|_| env::var("PORT")) {
            Ok(raw) => parse_var("SERVER_PORT", &raw)?,
            Err(_) => 8080,
        };

        let presence = PresencePolicy {
            active_minutes: var_or("ACTIVE_TIMEOUT_MINUTES", PresencePolicy::DEFAULT_ACTIVE_MINUTES)?,
            removal_minutes: var_or("REMOVAL_TIMEOUT_MINUTES", PresencePolicy::DEFAULT_REMOVAL_MINUTES)?,
        };
        presence.validate()?;

        Ok(Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port,
                static_dir: env::var("STATIC_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./public")),
            },
            presence,
            diagnostics: DiagnosticsConfig {
                log_file: env::var("DIAGNOSTIC_LOG")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./server.log")),
            },
        })
    }

    pub fn bind_address(&self) -> ([u8; 4], u16) {
        let ip_addr = self.parse_host_to_ipv4();
        (ip_addr.octets(), self.server.port)
    }

    fn parse_host_to_ipv4(&self) -> Ipv4Addr {
        if let Ok(addr) = self.server.host.parse::<IpAddr>() {
            match addr {
                IpAddr::V4(ipv4) => return ipv4,
                IpAddr::V6(_) => {
                    tracing::warn!(
                        host = %self.server.host,
                        "IPv6 address provided but only IPv4 supported, using 0.0.0.0"
                    );
                    return Ipv4Addr::new(0, 0, 0, 0);
                }
            }
        }

        match self.server.host.as_str() {
            "localhost" => Ipv4Addr::new(127, 0, 0, 1),
            "" | "0.0.0.0" => Ipv4Addr::new(0, 0, 0, 0),
            _ => {
                tracing::warn!(
                    host = %self.server.host,
                    "Unable to parse host as IPv4, using 0.0.0.0"
                );
                Ipv4Addr::new(0, 0, 0, 0)
            }
        }
    }
}

fn var_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => parse_var(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| TicksError::ConfigurationParseFailed(format!("{key}={raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_host(host: &str, port: u16) -> Config {
        Config {
            server: ServerConfig {
                host: host.to_string(),
                port,
                static_dir: PathBuf::from("./public"),
            },
            presence: PresencePolicy::default(),
            diagnostics: DiagnosticsConfig {
                log_file: PathBuf::from("./server.log"),
            },
        }
    }

    #[test]
    fn test_parse_localhost() {
        let config = config_with_host("localhost", 8080);
        assert_eq!(config.bind_address(), ([127, 0, 0, 1], 8080));
    }

    #[test]
    fn test_parse_ipv4_address() {
        let config = config_with_host("192.168.1.1", 3000);
        assert_eq!(config.bind_address(), ([192, 168, 1, 1], 3000));
    }

    #[test]
    fn test_parse_empty_host() {
        let config = config_with_host("", 8080);
        assert_eq!(config.bind_address(), ([0, 0, 0, 0], 8080));
    }

    #[test]
    fn test_parse_invalid_hostname_defaults_to_all() {
        let config = config_with_host("invalid-hostname", 9000);
        assert_eq!(config.bind_address(), ([0, 0, 0, 0], 9000));
    }

    #[test]
    fn test_parse_var_accepts_padded_numbers() {
        let port: u16 = parse_var("SERVER_PORT", " 8081 ").unwrap();
        assert_eq!(port, 8081);
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        let err = parse_var::<u16>("SERVER_PORT", "eighty").unwrap_err();
        assert!(matches!(err, TicksError::ConfigurationParseFailed(_)));
        assert!(err.to_string().contains("SERVER_PORT=eighty"));
    }
}
