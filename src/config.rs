use std::{env, net::SocketAddr};

use thiserror::Error;

use crate::youtube_client::DEFAULT_YOUTUBE_API_BASE_URL;

pub const DEFAULT_PORT: u16 = 3002;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Http,
    Stdio,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub transport: TransportMode,
    pub bind_addr: String,
    pub port: u16,
    pub issuer: String,
    pub youtube_api_key: String,
    pub youtube_api_base_url: String,
    pub api_token: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YOUTUBE_API_KEY is required and must not be empty")]
    MissingYoutubeApiKey,
    #[error("PORT must be a valid u16")]
    InvalidPort,
    #[error("MCP_TRANSPORT must be one of: http, stdio")]
    InvalidTransport,
    #[error("ISSUER must be an http or https URL")]
    InvalidIssuer,
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let youtube_api_key =
            non_empty("YOUTUBE_API_KEY").ok_or(ConfigError::MissingYoutubeApiKey)?;

        let transport = match non_empty("MCP_TRANSPORT")
            .map(|value| value.to_ascii_lowercase())
            .as_deref()
        {
            None | Some("http") => TransportMode::Http,
            Some("stdio") => TransportMode::Stdio,
            _ => return Err(ConfigError::InvalidTransport),
        };

        let bind_addr = non_empty("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = non_empty("PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(DEFAULT_PORT);

        let issuer = non_empty("ISSUER")
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://localhost:{port}"));
        if !(issuer.starts_with("http://") || issuer.starts_with("https://")) {
            return Err(ConfigError::InvalidIssuer);
        }

        let youtube_api_base_url = non_empty("YOUTUBE_API_BASE_URL")
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_YOUTUBE_API_BASE_URL.to_string());

        let config = Self {
            transport,
            bind_addr,
            port,
            issuer,
            youtube_api_key,
            youtube_api_base_url,
            api_token: non_empty("MCP_API_TOKEN"),
        };

        if config.transport == TransportMode::Http {
            let _ = config.bind_socket()?;
        }
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |key: &str| map.get(key).map(|value| value.to_string())
    }

    #[test]
    fn parse_defaults() {
        let config =
            Config::from_lookup(lookup(&[("YOUTUBE_API_KEY", "key")])).expect("config should parse");

        assert_eq!(config.transport, TransportMode::Http);
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.issuer, "http://localhost:3002");
        assert_eq!(config.youtube_api_base_url, DEFAULT_YOUTUBE_API_BASE_URL);
        assert_eq!(config.api_token, None);
    }

    #[test]
    fn missing_api_key_fails() {
        let err = Config::from_lookup(lookup(&[("YOUTUBE_API_KEY", "  ")]))
            .expect_err("expected missing key error");
        assert!(matches!(err, ConfigError::MissingYoutubeApiKey));
    }

    #[test]
    fn issuer_follows_port_and_strips_trailing_slash() {
        let config = Config::from_lookup(lookup(&[
            ("YOUTUBE_API_KEY", "key"),
            ("PORT", "3001"),
        ]))
        .expect("config should parse");
        assert_eq!(config.issuer, "http://localhost:3001");

        let config = Config::from_lookup(lookup(&[
            ("YOUTUBE_API_KEY", "key"),
            ("ISSUER", "https://auth.example.com/"),
        ]))
        .expect("config should parse");
        assert_eq!(config.issuer, "https://auth.example.com");
    }

    #[test]
    fn invalid_port_fails() {
        let err = Config::from_lookup(lookup(&[
            ("YOUTUBE_API_KEY", "key"),
            ("PORT", "70000"),
        ]))
        .expect_err("expected invalid port error");
        assert!(matches!(err, ConfigError::InvalidPort));
    }

    #[test]
    fn stdio_transport_parses_case_insensitively() {
        let config = Config::from_lookup(lookup(&[
            ("YOUTUBE_API_KEY", "key"),
            ("MCP_TRANSPORT", "STDIO"),
            ("BIND_ADDR", "not an address"),
        ]))
        .expect("stdio ignores bind address");
        assert_eq!(config.transport, TransportMode::Stdio);
    }

    #[test]
    fn unknown_transport_fails() {
        let err = Config::from_lookup(lookup(&[
            ("YOUTUBE_API_KEY", "key"),
            ("MCP_TRANSPORT", "websocket"),
        ]))
        .expect_err("expected invalid transport error");
        assert!(matches!(err, ConfigError::InvalidTransport));
    }

    #[test]
    fn non_http_issuer_fails() {
        let err = Config::from_lookup(lookup(&[
            ("YOUTUBE_API_KEY", "key"),
            ("ISSUER", "ftp://example.com"),
        ]))
        .expect_err("expected invalid issuer error");
        assert!(matches!(err, ConfigError::InvalidIssuer));
    }
}
