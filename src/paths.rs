use std::path::PathBuf;
use std::sync::OnceLock;

/// XDG-compliant directory layout for rangefinder.
///
/// On Linux:
///   Config:  $XDG_CONFIG_HOME/rangefinder  (~/.config/rangefinder)
///   Data:    $XDG_DATA_HOME/rangefinder    (~/.local/share/rangefinder)
///
/// On macOS both live under ~/Library/Application Support/rangefinder.
/// The resolved base paths are cached after the first lookup.

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();
static CONFIG_DIR: OnceLock<PathBuf> = OnceLock::new();

const APP_DIR: &str = "rangefinder";

/// Root data directory: $XDG_DATA_HOME/rangefinder
pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    })
}

/// Root config directory: $XDG_CONFIG_HOME/rangefinder
pub fn config_dir() -> &'static PathBuf {
    CONFIG_DIR.get_or_init(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    })
}

/// Config file path: <config_dir>/config.toml
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Song catalogue: <data_dir>/songs.db
pub fn db_path() -> PathBuf {
    data_dir().join("songs.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_ends_with_app_name() {
        assert!(data_dir().ends_with("rangefinder"));
    }

    #[test]
    fn config_dir_ends_with_app_name() {
        assert!(config_dir().ends_with("rangefinder"));
    }

    #[test]
    fn config_file_structure() {
        let path = config_file();
        assert!(path.ends_with("rangefinder/config.toml"));
    }

    #[test]
    fn db_path_structure() {
        let path = db_path();
        assert!(path.ends_with("rangefinder/songs.db"));
        assert!(path.starts_with(data_dir()));
    }
}
