use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const APP_DOMAIN: &str = "net";
const APP_ORG: &str = "CarbsCalc";
const APP_NAME: &str = "carbs-calc";

pub const CONFIG_ENV: &str = "CARBS_CALC_CONFIG";
pub const DATA_ENV: &str = "CARBS_CALC_DATA";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn with_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            default_cfg.post_load(&self.paths);
            self.write_default_config(&default_cfg)?;
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load(&self.paths);
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub catalog_path: PathBuf,
    pub store_dir: PathBuf,
    pub state_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var(CONFIG_ENV).ok().map(PathBuf::from);
        let override_data = env::var(DATA_ENV).ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let data_root = override_data.unwrap_or_else(|| project_dirs.data_dir().to_path_buf());
        let state_dir = project_dirs
            .state_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| data_root.join("state"));

        Ok(Self::rooted(config_dir, config_file, data_root, state_dir))
    }

    pub fn rooted(
        config_dir: PathBuf,
        config_file: PathBuf,
        data_dir: PathBuf,
        state_dir: PathBuf,
    ) -> Self {
        Self {
            config_dir,
            config_file,
            catalog_path: data_dir.join("data.json"),
            store_dir: state_dir.join("store"),
            data_dir,
            state_dir,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.data_dir, &self.store_dir, &self.state_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub recent: RecentOptions,
    pub search: SearchOptions,
    pub catalog: CatalogOptions,
}

impl AppConfig {
    fn post_load(&mut self, paths: &ConfigPaths) {
        self.catalog.resolve(paths);
        self.recent.validate();
        if self.search.max_results == 0 {
            tracing::warn!("search.max_results must be positive, using default");
            self.search.max_results = SearchOptions::default().max_results;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecentOptions {
    pub storage_key: String,
    pub max_entries: usize,
    pub decay_factor: f64,
    pub priority_floor: f64,
}

impl Default for RecentOptions {
    fn default() -> Self {
        Self {
            storage_key: "carbs-calc/recentItems".to_string(),
            max_entries: 100,
            decay_factor: 0.99,
            priority_floor: 0.01,
        }
    }
}

impl RecentOptions {
    fn validate(&mut self) {
        let defaults = Self::default();
        if self.storage_key.trim().is_empty() {
            tracing::warn!("empty recent.storage_key, using default");
            self.storage_key = defaults.storage_key;
        }
        if self.max_entries == 0 {
            tracing::warn!("recent.max_entries must be positive, using default");
            self.max_entries = defaults.max_entries;
        }
        if !(self.decay_factor > 0.0 && self.decay_factor <= 1.0) {
            tracing::warn!(self.decay_factor, "recent.decay_factor outside (0, 1], using default");
            self.decay_factor = defaults.decay_factor;
        }
        if !(self.priority_floor >= 0.0 && self.priority_floor.is_finite()) {
            tracing::warn!(self.priority_floor, "invalid recent.priority_floor, using default");
            self.priority_floor = defaults.priority_floor;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub max_results: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { max_results: 50 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogOptions {
    pub path: Option<PathBuf>,
}

impl CatalogOptions {
    fn resolve(&mut self, paths: &ConfigPaths) {
        if self.path.is_none() {
            self.path = Some(paths.catalog_path.clone());
        }
    }

    pub fn path_or<'a>(&'a self, paths: &'a ConfigPaths) -> &'a Path {
        self.path.as_deref().unwrap_or(&paths.catalog_path)
    }
}
