//! Command-line arguments for the `rcon-proxy` binary

use std::path::PathBuf;

use clap::Parser;

use crate::config::ApiConfig;
use crate::types::{Port, ThreadCount};

/// RCON control plane with a management HTTP API
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Args {
    /// API port to listen on (overrides config file)
    #[arg(short, long, env = "RCON_PROXY_PORT")]
    pub port: Option<Port>,

    /// API host to bind to (overrides config file)
    #[arg(long, env = "RCON_PROXY_HOST")]
    pub host: Option<String>,

    /// Configuration file path; a missing file means defaults
    #[arg(short, long, default_value = "config.toml", env = "RCON_PROXY_CONFIG")]
    pub config: PathBuf,

    /// Number of worker threads (default: 1, use 0 for CPU cores)
    #[arg(short, long, env = "RCON_PROXY_THREADS")]
    pub threads: Option<ThreadCount>,

    /// Also write logs to this file
    #[arg(long, env = "RCON_PROXY_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Open a session to every configured backend at startup
    #[arg(long, env = "RCON_PROXY_PREWARM")]
    pub prewarm: bool,
}

impl Args {
    /// `host:port` for the API listener, CLI values winning over the config
    #[must_use]
    pub fn listen_addr(&self, api: &ApiConfig) -> String {
        let host = self.host.as_deref().unwrap_or(&api.host);
        let port = self.port.unwrap_or(api.port);
        format!("{}:{}", host, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("rcon-proxy").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.config, PathBuf::from("config.toml"));
        assert!(args.threads.is_none());
        assert!(!args.prewarm);
        assert_eq!(args.listen_addr(&ApiConfig::default()), "0.0.0.0:8000");
    }

    #[test]
    fn test_cli_overrides_config() {
        let args = parse(&["--port", "9000", "--host", "127.0.0.1"]);
        let api = ApiConfig {
            host: "10.0.0.1".into(),
            port: Port::new(7000).unwrap(),
        };
        assert_eq!(args.listen_addr(&api), "127.0.0.1:9000");
    }

    #[test]
    fn test_config_port_used_without_flag() {
        let args = parse(&["--threads", "4"]);
        let api = ApiConfig {
            port: Port::new(7000).unwrap(),
            ..Default::default()
        };
        assert_eq!(args.listen_addr(&api), "0.0.0.0:7000");
        assert_eq!(args.threads, ThreadCount::new(4));
    }

    #[test]
    fn test_zero_port_rejected() {
        let result = Args::try_parse_from(["rcon-proxy", "--port", "0"]);
        assert!(result.is_err());
    }
}
