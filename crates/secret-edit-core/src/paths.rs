//! Standard paths used by the secret editing tools

use std::path::PathBuf;

/// Directory name shared by every tool in the suite
pub const APP_DIR: &str = "kubectl-edit-secret";

/// Standard paths
pub struct Paths {
    /// Config directory (~/.config/kubectl-edit-secret)
    pub config: PathBuf,
    /// Scratch directory for edit artifacts (system temp dir)
    pub scratch: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join(APP_DIR);

        Self {
            config,
            scratch: std::env::temp_dir(),
        }
    }

    /// Path of the main config file
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.yaml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_under_app_dir() {
        let paths = Paths::new();
        assert!(paths.config.ends_with(APP_DIR));
        assert_eq!(paths.config_file().file_name().unwrap(), "config.yaml");
    }
}
