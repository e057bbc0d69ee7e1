//! Default path resolution for configuration files
//!
//! Uses XDG Base Directory specification when available, with sensible fallbacks.

use std::path::PathBuf;

/// Returns the default path for the static server configuration file.
///
/// Uses XDG config directory if available:
/// - Linux/macOS: `~/.config/scada/server.toml`
/// - Fallback: `/etc/scada/server.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/etc"))
        .join("scada")
        .join("server.toml")
}

/// Returns the default data directory holding the YAML documents.
///
/// Uses XDG data directory if available:
/// - Linux/macOS: `~/.local/share/scada`
/// - Fallback: `/var/lib/scada`
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("/var/lib"))
        .join("scada")
}

/// Returns the default location of the CLI's persisted login session.
pub fn default_session_path() -> PathBuf {
    default_data_dir().join("session.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path_is_toml() {
        let path = default_config_path();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("toml"));
        assert!(path.ends_with("scada/server.toml"));
    }

    #[test]
    fn test_default_data_dir_ends_with_scada() {
        assert!(default_data_dir().ends_with("scada"));
    }

    #[test]
    fn test_session_path_lives_in_data_dir() {
        let path = default_session_path();
        assert!(path.starts_with(default_data_dir()));
        assert!(path.ends_with("session.json"));
    }
}
