use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::config_error;
use crate::core::{ErrorContext, Result};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML configuration format
    Toml,
    /// JSON configuration format
    Json,
}

impl ConfigFormat {
    /// Determine configuration format from file extension
    pub fn from_extension(path: &Path) -> Self {
        match path.extension().and_then(|s| s.to_str()) {
            Some("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml, // Default
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(config_error!("Configuration file not found: {}", path.display()));
    }

    let content = fs::read_to_string(path)?;
    let config = parse_config(&content, ConfigFormat::from_extension(path))
        .with_context_lazy(|| path.display().to_string())?;
    tracing::info!(path = %path.display(), "loaded configuration");
    Ok(config)
}

/// Parse configuration text in the given format
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<Config> {
    match format {
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| config_error!("Failed to parse TOML config: {e}")),
        ConfigFormat::Json => serde_json::from_str(content).map_err(|e| config_error!("Failed to parse JSON config: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OrbitRagError;
    use std::io::Write;

    #[test]
    fn format_from_extension() {
        assert_eq!(ConfigFormat::from_extension(Path::new("a.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_extension(Path::new("a.toml")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_extension(Path::new("a")), ConfigFormat::Toml);
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = load_config(Path::new("/nonexistent/orbitrag.toml")).unwrap_err();
        assert!(matches!(err, OrbitRagError::Config { .. }));
    }

    #[test]
    fn loads_toml_and_json_files() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("orbitrag.toml");
        let mut file = fs::File::create(&toml_path).unwrap();
        writeln!(file, "[graph]\nmax_hops = 3").unwrap();
        assert_eq!(load_config(&toml_path).unwrap().graph.max_hops, 3);

        let json_path = dir.path().join("orbitrag.json");
        fs::write(&json_path, r#"{"vector": {"top_k": 9}}"#).unwrap();
        assert_eq!(load_config(&json_path).unwrap().vector.top_k, 9);
    }

    #[test]
    fn malformed_file_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ \"vector\": ").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, OrbitRagError::Config { .. }));
        let message = err.to_string();
        assert!(message.contains("broken.json"), "{message}");
        assert!(message.contains("JSON"), "{message}");
    }

    #[test]
    fn malformed_content_is_config_error() {
        let err = parse_config("[graph\nmax_hops = ", ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("TOML"));
    }
}
