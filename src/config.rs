use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::LaunchpadError;

pub const DEFAULT_INSTANCE_URL: &str = "https://usegalaxy.org";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub galaxy_instance_url: Option<String>,
    #[serde(default)]
    pub deseq2_workflow_id: Option<String>,
}

/// Resolved Galaxy environment: the instance base URL plus the stored
/// workflow id used for the differential expression launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalaxyEnvironment {
    instance_url: String,
    pub deseq2_workflow_id: Option<String>,
}

impl GalaxyEnvironment {
    pub fn new(instance_url: impl Into<String>) -> Result<Self, LaunchpadError> {
        let instance_url: String = instance_url.into();
        url::Url::parse(&instance_url)
            .map_err(|_| LaunchpadError::InvalidInstanceUrl(instance_url.clone()))?;
        Ok(Self {
            instance_url: instance_url.trim_end_matches('/').to_string(),
            deseq2_workflow_id: None,
        })
    }

    pub fn with_deseq2_workflow_id(mut self, id: Option<String>) -> Self {
        self.deseq2_workflow_id = id;
        self
    }

    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    /// API endpoint creating workflow landing records.
    pub fn workflow_landings_api_url(&self) -> String {
        format!("{}/api/workflow_landings", self.instance_url)
    }

    /// Landing page base the user is redirected to after a workflow launch.
    pub fn workflow_landing_url(&self) -> String {
        format!("{}/workflow_landings", self.instance_url)
    }

    /// API endpoint creating data landing records (send-data workflow).
    pub fn data_landings_api_url(&self) -> String {
        format!("{}/api/data_landings", self.instance_url)
    }

    /// Landing page base for data landings.
    pub fn data_landing_url(&self) -> String {
        format!("{}/tool_landings", self.instance_url)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `launchpad.json` (or an explicit path), then applies
    /// environment overrides `GALAXY_INSTANCE_URL` and
    /// `GALAXY_DESEQ2_WORKFLOW_ID`. A missing default config file is fine;
    /// an explicitly named one must exist.
    pub fn resolve(path: Option<&str>) -> Result<GalaxyEnvironment, LaunchpadError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from("launchpad.json"),
        };

        let config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| LaunchpadError::ConfigRead(config_path.clone()))?;
            serde_json::from_str::<Config>(&content)
                .map_err(|err| LaunchpadError::ConfigParse(err.to_string()))?
        } else if path.is_some() {
            return Err(LaunchpadError::ConfigRead(config_path));
        } else {
            Config::default()
        };

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<GalaxyEnvironment, LaunchpadError> {
        let instance_url = std::env::var("GALAXY_INSTANCE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or(config.galaxy_instance_url)
            .unwrap_or_else(|| DEFAULT_INSTANCE_URL.to_string());

        let deseq2_workflow_id = std::env::var("GALAXY_DESEQ2_WORKFLOW_ID")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or(config.deseq2_workflow_id);

        Ok(GalaxyEnvironment::new(instance_url)?.with_deseq2_workflow_id(deseq2_workflow_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_urls_share_the_instance_base() {
        let env = GalaxyEnvironment::new("https://galaxy.example.org/").unwrap();
        assert_eq!(
            env.workflow_landings_api_url(),
            "https://galaxy.example.org/api/workflow_landings"
        );
        assert_eq!(
            env.workflow_landing_url(),
            "https://galaxy.example.org/workflow_landings"
        );
        assert_eq!(
            env.data_landings_api_url(),
            "https://galaxy.example.org/api/data_landings"
        );
        assert_eq!(
            env.data_landing_url(),
            "https://galaxy.example.org/tool_landings"
        );
    }

    #[test]
    fn invalid_instance_url_is_rejected() {
        assert!(GalaxyEnvironment::new("not a url").is_err());
    }

    #[test]
    fn config_defaults_to_public_instance() {
        let env = ConfigLoader::resolve_config(Config::default()).unwrap();
        // Unless the environment overrides it, the public instance is used.
        if std::env::var("GALAXY_INSTANCE_URL").is_err() {
            assert_eq!(env.instance_url(), DEFAULT_INSTANCE_URL);
        }
    }
}
