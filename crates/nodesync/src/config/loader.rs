use std::path::Path;

use crate::config::schema::SyncConfig;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SyncConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<SyncConfig, ConfigError> {
    // An empty document means "all defaults".
    let config: SyncConfig = if content.trim().is_empty() {
        SyncConfig::default()
    } else {
        serde_yaml::from_str(content)?
    };

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &SyncConfig) -> Result<(), ConfigError> {
    let file_name = config.yml_file_name.trim();
    if file_name.is_empty() {
        return Err(ConfigError::Validation {
            message: "ymlFileName must not be empty".to_string(),
        });
    }
    if file_name.contains('/') || file_name.contains('\\') || file_name == "." || file_name == ".."
    {
        return Err(ConfigError::Validation {
            message: format!(
                "ymlFileName '{}' must be a plain file name",
                config.yml_file_name
            ),
        });
    }

    if config.default_branch.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "defaultBranch must not be empty".to_string(),
        });
    }

    if config.git.clone_depth == 0 {
        return Err(ConfigError::Validation {
            message: "git.cloneDepth must be greater than 0".to_string(),
        });
    }

    if config.git.timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "git.timeoutSecs must be greater than 0".to_string(),
        });
    }

    if config.logging.level.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "logging.level must not be empty".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.yml_file_name, ".flow.yml");
        assert_eq!(config.default_branch, "master");
        assert_eq!(config.git.clone_depth, 1);
        assert_eq!(config.git.timeout_secs, 600);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_load_full_config() {
        let yaml = r#"
workspaceDir: /srv/nodesync/ws
databasePath: /srv/nodesync/db.sqlite
ymlFileName: pipeline.yml
defaultBranch: main
git:
  cloneDepth: 5
  timeoutSecs: 30
logging:
  level: nodesync=debug
  format: json
"#;
        let config = load_config_from_str(yaml).unwrap();
        assert_eq!(config.workspace_dir, PathBuf::from("/srv/nodesync/ws"));
        assert_eq!(config.database_path, PathBuf::from("/srv/nodesync/db.sqlite"));
        assert_eq!(config.yml_file_name, "pipeline.yml");
        assert_eq!(config.default_branch, "main");
        assert_eq!(config.git.clone_depth, 5);
        assert_eq!(config.git.timeout_secs, 30);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = load_config_from_str("git:\n  timeoutSecs: 10\n").unwrap();
        assert_eq!(config.git.timeout_secs, 10);
        assert_eq!(config.git.clone_depth, 1);
    }

    #[test]
    fn test_rejects_invalid_values() {
        for yaml in [
            "ymlFileName: ''",
            "ymlFileName: nested/file.yml",
            "defaultBranch: ' '",
            "git:\n  cloneDepth: 0",
            "git:\n  timeoutSecs: 0",
        ] {
            let err = load_config_from_str(yaml).unwrap_err();
            assert!(matches!(err, ConfigError::Validation { .. }), "{yaml}");
        }
    }

    #[test]
    fn test_rejects_malformed_yaml() {
        let err = load_config_from_str("git: [1, 2").unwrap_err();
        assert!(matches!(err, ConfigError::ParseYaml(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "defaultBranch: develop").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.default_branch, "develop");
    }

    #[test]
    fn test_missing_file() {
        let err = load_config("/definitely/not/here.yml").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
