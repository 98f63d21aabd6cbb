//! Filesystem locations

use std::path::{Path, PathBuf};

/// Data directory (~/.fieldhand), falling back to the working directory
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".fieldhand")
}

/// Config file location
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Ensure directory exists
pub async fn ensure_dir(path: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_lives_in_data_dir() {
        let config = config_path();
        assert_eq!(config.file_name().unwrap(), "config.json");
        assert_eq!(config.parent().unwrap(), data_dir());
        assert!(data_dir().ends_with(".fieldhand"));
    }

    #[tokio::test]
    async fn test_ensure_dir_creates_nested_directories() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("a").join("b");

        ensure_dir(&nested).await.unwrap();
        ensure_dir(&nested).await.unwrap();

        assert!(nested.is_dir());
    }
}
