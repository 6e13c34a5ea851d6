//! Hub configuration types.
//!
//! [`HubConfig`] is the single source of truth for runtime settings.  It is
//! built from defaults, an optional TOML file and command-line flags (in that
//! order of precedence, lowest first) by the binary; the library only reads it.

use std::net::SocketAddr;

use gluenet_core::protocol::messages::MAX_SESSIONS;

/// All runtime configuration for the hub.
///
/// # Example
///
/// ```rust
/// use gluenet_hub::domain::HubConfig;
///
/// let cfg = HubConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 8080);
/// assert_eq!(cfg.session_ceiling(), 256);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: SocketAddr,

    /// Maximum number of concurrently live sessions.
    ///
    /// Session ids are one byte, so values above 256 are treated as 256.
    pub max_sessions: usize,

    /// Fallback `tracing` filter used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl HubConfig {
    /// The effective session ceiling, clamped to `1..=256`.
    pub fn session_ceiling(&self) -> usize {
        self.max_sessions.clamp(1, MAX_SESSIONS)
    }
}

impl Default for HubConfig {
    /// | Field        | Default        |
    /// |--------------|----------------|
    /// | bind_addr    | `0.0.0.0:8080` |
    /// | max_sessions | `256`          |
    /// | log_level    | `info`         |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_sessions: MAX_SESSIONS,
            log_level: "info".to_string(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_binds_all_interfaces_on_8080() {
        // Arrange / Act
        let cfg = HubConfig::default();
        // Assert
        assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn test_default_ceiling_is_256() {
        assert_eq!(HubConfig::default().session_ceiling(), 256);
    }

    #[test]
    fn test_ceiling_is_clamped_to_one_byte_ids() {
        let cfg = HubConfig {
            max_sessions: 10_000,
            ..HubConfig::default()
        };
        assert_eq!(cfg.session_ceiling(), 256);
    }

    #[test]
    fn test_zero_ceiling_still_admits_one_session() {
        let cfg = HubConfig {
            max_sessions: 0,
            ..HubConfig::default()
        };
        assert_eq!(cfg.session_ceiling(), 1);
    }
}
