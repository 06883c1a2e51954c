use crate::error::VcsError;
use crate::paths::PathRoot;
use crate::process::{CommandRunner, SystemRunner};
use crate::traits::VcsBackend;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Type of VCS backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VcsBackendType {
    /// Distributed: the VCS produces diffs natively
    Git,
    /// Centralized: status scraping, path translation and diff synthesis
    Perforce,
}

/// Settings for the git backend
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    pub executable: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            executable: "git".to_string(),
        }
    }
}

/// Settings for the Perforce backend
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PerforceConfig {
    pub executable: String,
    /// Where the versioned tree starts inside depot paths
    pub root: PathRoot,
    /// Client workspace (`-c`); falls back to P4CLIENT/P4CONFIG
    pub client: Option<String>,
    /// Server address (`-p`)
    pub port: Option<String>,
    /// User (`-u`)
    pub user: Option<String>,
}

impl Default for PerforceConfig {
    fn default() -> Self {
        Self {
            executable: "p4".to_string(),
            root: PathRoot::default(),
            client: None,
            port: None,
            user: None,
        }
    }
}

impl PerforceConfig {
    /// Global arguments placed before every p4 subcommand
    pub fn global_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for (flag, value) in [("-p", &self.port), ("-u", &self.user), ("-c", &self.client)] {
            if let Some(value) = value {
                args.push(flag.to_string());
                args.push(value.clone());
            }
        }
        args
    }
}

/// Configuration for VCS backend
#[derive(Debug, Clone, Deserialize)]
pub struct VcsConfig {
    pub backend_type: VcsBackendType,
    pub path: PathBuf,
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub perforce: PerforceConfig,
}

impl VcsConfig {
    pub fn new(backend_type: VcsBackendType, path: impl Into<PathBuf>) -> Self {
        Self {
            backend_type,
            path: path.into(),
            git: GitConfig::default(),
            perforce: PerforceConfig::default(),
        }
    }

    /// Parse a TOML configuration document
    pub fn from_toml_str(contents: &str) -> Result<Self, VcsError> {
        toml::from_str(contents).map_err(|e| VcsError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, VcsError> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(
            config = %path.display(),
            backend = ?config.backend_type,
            "loaded vcs configuration"
        );
        Ok(config)
    }
}

/// Name of the Perforce config file to look for, honouring P4CONFIG
fn p4config_name() -> String {
    std::env::var("P4CONFIG")
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| ".p4config".to_string())
}

/// Factory for creating VCS backends
pub struct VcsFactory;

impl VcsFactory {
    /// Create a backend based on configuration
    pub fn create(config: &VcsConfig) -> Result<Box<dyn VcsBackend>, VcsError> {
        Self::create_with_runner(config, Arc::new(SystemRunner))
    }

    /// Create a backend that runs its commands through `runner`
    pub fn create_with_runner(
        config: &VcsConfig,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Box<dyn VcsBackend>, VcsError> {
        match config.backend_type {
            #[cfg(feature = "git")]
            VcsBackendType::Git => {
                let repo =
                    crate::backend::git::GitRepository::open(&config.path, &config.git, runner)?;
                Ok(Box::new(repo))
            }
            #[cfg(feature = "perforce")]
            VcsBackendType::Perforce => {
                let repo = crate::backend::perforce::PerforceRepository::open(
                    &config.path,
                    &config.perforce,
                    runner,
                )?;
                Ok(Box::new(repo))
            }
            #[allow(unreachable_patterns)]
            other => Err(VcsError::InvalidOperation(format!(
                "{other:?} backend not enabled in this build"
            ))),
        }
    }

    /// Auto-detect backend from an existing working copy
    pub fn detect(path: &Path) -> Result<VcsBackendType, VcsError> {
        let p4config = p4config_name();
        for dir in path.ancestors() {
            if dir.join(".git").exists() {
                return Ok(VcsBackendType::Git);
            }
            if dir.join(&p4config).is_file() {
                return Ok(VcsBackendType::Perforce);
            }
        }
        Err(VcsError::repo_not_found(path))
    }

    /// Create a backend by auto-detecting the type
    pub fn auto_detect(path: &Path) -> Result<Box<dyn VcsBackend>, VcsError> {
        let backend_type = Self::detect(path)?;
        Self::create(&VcsConfig::new(backend_type, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_from_toml() {
        let config = VcsConfig::from_toml_str(
            r#"
backend_type = "perforce"
path = "/home/dev/ws"

[perforce]
root = { prefix = "//depot/main" }
client = "dev-ws"
port = "ssl:perforce:1666"
"#,
        )
        .unwrap();

        assert_eq!(config.backend_type, VcsBackendType::Perforce);
        assert_eq!(config.path, PathBuf::from("/home/dev/ws"));
        assert_eq!(config.perforce.root, PathRoot::Prefix("//depot/main".into()));
        assert_eq!(config.perforce.executable, "p4");
        assert_eq!(config.git.executable, "git");
        assert_eq!(
            config.perforce.global_args(),
            vec!["-p", "ssl:perforce:1666", "-c", "dev-ws"]
        );
    }

    #[test]
    fn test_config_defaults() {
        let config = VcsConfig::from_toml_str("backend_type = \"git\"\npath = \".\"\n").unwrap();
        assert_eq!(config.backend_type, VcsBackendType::Git);
        assert_eq!(config.perforce.root, PathRoot::Depth(2));
        assert!(config.perforce.global_args().is_empty());
    }

    #[test]
    fn test_config_rejects_unknown_backend() {
        let err = VcsConfig::from_toml_str("backend_type = \"svn\"\npath = \".\"\n").unwrap_err();
        assert!(matches!(err, VcsError::Config(_)));
    }

    #[test]
    fn test_detect_git() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join(".git")).unwrap();
        let nested = temp.path().join("src/deep");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(VcsFactory::detect(&nested).unwrap(), VcsBackendType::Git);
    }

    #[test]
    fn test_detect_perforce() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(p4config_name()), "P4CLIENT=dev-ws\n").unwrap();

        assert_eq!(
            VcsFactory::detect(temp.path()).unwrap(),
            VcsBackendType::Perforce
        );
    }
}
