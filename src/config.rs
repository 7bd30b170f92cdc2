//! Server configuration
//!
//! All tunables come from outside: the bind address from the first command
//! line argument, the rest from `CHAT_*` environment variables.

use std::env;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::ConfigError;
use crate::registry::DEFAULT_CAPACITY;

/// Default TCP port
pub const DEFAULT_PORT: u16 = 2222;

/// Default name-negotiation attempts
pub const DEFAULT_MAX_NAME_TRIES: usize = 10;

/// Default inactivity threshold in seconds
pub const DEFAULT_MAX_INACTIVE_SECS: u64 = 60;

/// Default longest accepted input line, in bytes
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4096;

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds
    pub bind_addr: SocketAddr,
    /// Registry capacity
    pub max_sessions: usize,
    /// Name prompts before the connection is rejected
    pub max_name_tries: usize,
    /// Idle interval that closes a session
    pub max_inactive: Duration,
    /// Deadline for a single read; a silent peer is closed when it elapses
    pub read_timeout: Duration,
    /// Longest accepted input line
    pub max_line_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            max_sessions: DEFAULT_CAPACITY,
            max_name_tries: DEFAULT_MAX_NAME_TRIES,
            max_inactive: Duration::from_secs(DEFAULT_MAX_INACTIVE_SECS),
            read_timeout: Duration::from_secs(DEFAULT_MAX_INACTIVE_SECS),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl ServerConfig {
    /// Load from the process arguments and environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_sources(env::args().nth(1), |key| env::var(key).ok())
    }

    /// Build from an optional address argument and a variable lookup
    pub fn from_sources<F>(addr_arg: Option<String>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(arg) = addr_arg {
            config.bind_addr = parse_addr(&arg)?;
        }
        if let Some(n) = read_number(&lookup, "CHAT_MAX_SESSIONS")? {
            config.max_sessions = non_zero("CHAT_MAX_SESSIONS", n)?;
        }
        if let Some(n) = read_number(&lookup, "CHAT_MAX_NAME_TRIES")? {
            config.max_name_tries = non_zero("CHAT_MAX_NAME_TRIES", n)?;
        }
        if let Some(n) = read_number(&lookup, "CHAT_MAX_INACTIVE_SECS")? {
            let secs = non_zero("CHAT_MAX_INACTIVE_SECS", n)?;
            config.max_inactive = Duration::from_secs(secs as u64);
            config.read_timeout = config.max_inactive;
        }
        if let Some(n) = read_number(&lookup, "CHAT_READ_TIMEOUT_SECS")? {
            let secs = non_zero("CHAT_READ_TIMEOUT_SECS", n)?;
            config.read_timeout = Duration::from_secs(secs as u64);
        }
        if let Some(n) = read_number(&lookup, "CHAT_MAX_LINE_LENGTH")? {
            config.max_line_length = non_zero("CHAT_MAX_LINE_LENGTH", n)?;
        }

        Ok(config)
    }
}

/// Accept a bare port (bound on localhost) or a full socket address
fn parse_addr(arg: &str) -> Result<SocketAddr, ConfigError> {
    if let Ok(port) = arg.parse::<u16>() {
        return Ok(SocketAddr::from((Ipv4Addr::LOCALHOST, port)));
    }
    arg.parse()
        .map_err(|_| ConfigError::InvalidAddress(arg.to_string()))
}

fn read_number<F>(lookup: &F, key: &'static str) -> Result<Option<usize>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| match value.trim().parse() {
            Ok(n) => Ok(n),
            Err(_) => Err(ConfigError::InvalidNumber { key, value }),
        })
        .transpose()
}

fn non_zero(key: &'static str, n: usize) -> Result<usize, ConfigError> {
    if n == 0 {
        Err(ConfigError::Zero(key))
    } else {
        Ok(n)
    }
}
