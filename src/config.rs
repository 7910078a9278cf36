use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use zeroize::Zeroize;

fn default_prefix() -> String {
    "!".to_string()
}

fn default_session_timeout() -> u64 {
    300
}

fn default_request_timeout() -> u64 {
    15
}

fn default_trakt_list_url() -> String {
    "https://api.trakt.tv/users/garycrawfordgc/lists/latest-releases/items".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub discord_bot_token: String,
    #[serde(default = "default_prefix")]
    pub bot_prefix: String,
    #[serde(default)]
    pub tmdb_api_key: String,
    #[serde(default)]
    pub riven_api_url: String,
    #[serde(default)]
    pub riven_api_token: String,
    /// Discord user names or numeric ids allowed to run commands
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub log_to_file: bool,

    // Latest releases
    #[serde(default)]
    pub trakt_api_key: Option<String>,
    #[serde(default = "default_trakt_list_url")]
    pub trakt_list_url: String,
    #[serde(default)]
    pub latest_releases_count: Option<usize>,
    #[serde(default)]
    pub max_grid_width: Option<u32>,
    #[serde(default)]
    pub poster_image_width: Option<u32>,
    #[serde(default)]
    pub poster_image_height: Option<u32>,

    // Runtime
    #[serde(default = "default_session_timeout")]
    pub session_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Settings the latest-releases command cannot run without
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseSettings {
    pub trakt_api_key: String,
    pub list_url: String,
    pub count: usize,
    pub max_grid_width: u32,
    pub poster_width: u32,
    pub poster_height: u32,
}

impl AppConfig {
    /// Resolve and read the config file.
    /// Order: explicit path, platform config dir, `./data/config.json`.
    pub fn load(explicit: Option<&Path>) -> Result<Self, anyhow::Error> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => Self::discover().ok_or_else(|| {
                anyhow::anyhow!("No config.json found in the config directory or ./data")
            })?,
        };
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, anyhow::Error> {
        let config: AppConfig = serde_json::from_str(content)?;
        Ok(config)
    }

    fn discover() -> Option<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("com", "rivbot", "rivbot") {
            let config_path = proj_dirs.config_dir().join("config.json");
            if config_path.exists() {
                return Some(config_path);
            }
        }
        let local = PathBuf::from("./data/config.json");
        local.exists().then_some(local)
    }

    /// Names of required keys that are empty
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.discord_bot_token.trim().is_empty() {
            missing.push("discord_bot_token");
        }
        if self.tmdb_api_key.trim().is_empty() {
            missing.push("tmdb_api_key");
        }
        if self.riven_api_url.trim().is_empty() {
            missing.push("riven_api_url");
        }
        if self.riven_api_token.trim().is_empty() {
            missing.push("riven_api_token");
        }
        missing
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let missing = self.missing_keys();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(anyhow::anyhow!("Missing required config keys: {}", missing.join(", ")))
        }
    }

    /// Latest-releases settings, or the first missing key
    pub fn release_settings(&self) -> Result<ReleaseSettings, &'static str> {
        let trakt_api_key = self
            .trakt_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or("trakt_api_key")?;
        if self.tmdb_api_key.trim().is_empty() {
            return Err("tmdb_api_key");
        }
        Ok(ReleaseSettings {
            trakt_api_key,
            list_url: self.trakt_list_url.clone(),
            count: self.latest_releases_count.ok_or("latest_releases_count")?,
            max_grid_width: self.max_grid_width.ok_or("max_grid_width")?,
            poster_width: self.poster_image_width.ok_or("poster_image_width")?,
            poster_height: self.poster_image_height.ok_or("poster_image_height")?,
        })
    }

    /// Whitelist accepts either the user name or the numeric id
    pub fn is_whitelisted(&self, user_name: &str, user_id: u64) -> bool {
        let id = user_id.to_string();
        self.whitelist
            .iter()
            .any(|entry| entry == user_name || *entry == id)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl Drop for AppConfig {
    fn drop(&mut self) {
        self.discord_bot_token.zeroize();
        self.tmdb_api_key.zeroize();
        self.riven_api_token.zeroize();
        if let Some(key) = self.trakt_api_key.as_mut() {
            key.zeroize();
        }
    }
}
