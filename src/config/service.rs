// src/config/service.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::{env, fs};

pub const DEFAULT_CONFIG_PATH: &str = "config/berries.toml";
pub const ENV_CONFIG_PATH: &str = "BERRIES_CONFIG_PATH";

pub const ENV_USER_POSTS_URL: &str = "BERRIES_USER_POSTS_URL";
pub const ENV_COIN_BALANCES_URL: &str = "BERRIES_COIN_BALANCES_URL";
pub const ENV_CREDIBILITY_MODEL: &str = "BERRIES_CREDIBILITY_MODEL";
pub const ENV_INFLUENCER_MODEL: &str = "BERRIES_INFLUENCER_MODEL";
pub const ENV_FOLLOWERS_OF_FOLLOWERS: &str = "BERRIES_FOLLOWERS_OF_FOLLOWERS";
pub const ENV_ADS_PURCHASED: &str = "BERRIES_ADS_PURCHASED";
pub const ENV_BIND: &str = "BERRIES_BIND";

fn default_user_posts_url() -> String {
    "https://resources-bfih.onrender.com/get-user-posts".to_string()
}
fn default_coin_balances_url() -> String {
    "https://balance-7m39.onrender.com/coin_balances".to_string()
}
fn default_credibility_model() -> PathBuf {
    PathBuf::from("models/credibility_model.json")
}
fn default_influencer_model() -> PathBuf {
    PathBuf::from("models/influencer_model.json")
}
fn default_followers_of_followers() -> u64 {
    5000
}
fn default_ads_purchased() -> u64 {
    10
}
fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

/// Where the two upstream collaborators live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpstreamConfig {
    /// Queried as `?AccountAddress=<addr>`, redirects not followed.
    #[serde(default = "default_user_posts_url")]
    pub user_posts_url: String,
    /// Queried as `?address=<addr>`, redirects followed.
    #[serde(default = "default_coin_balances_url")]
    pub coin_balances_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            user_posts_url: default_user_posts_url(),
            coin_balances_url: default_coin_balances_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelPaths {
    #[serde(default = "default_credibility_model")]
    pub credibility: PathBuf,
    #[serde(default = "default_influencer_model")]
    pub influencer: PathBuf,
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self {
            credibility: default_credibility_model(),
            influencer: default_influencer_model(),
        }
    }
}

/// Placeholder inputs that are not derived from fetched data yet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoringConstants {
    #[serde(default = "default_followers_of_followers")]
    pub followers_of_followers: u64,
    #[serde(default = "default_ads_purchased")]
    pub ads_purchased_from_profile: u64,
}

impl Default for ScoringConstants {
    fn default() -> Self {
        Self {
            followers_of_followers: default_followers_of_followers(),
            ads_purchased_from_profile: default_ads_purchased(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub models: ModelPaths,
    #[serde(default)]
    pub scoring: ScoringConstants,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl ServiceConfig {
    /// Load from an explicit TOML file. Missing sections fall back to defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading service config from {}", path.display()))?;
        toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))
    }

    /// Resolve config in order:
    /// 1) $BERRIES_CONFIG_PATH (must exist)
    /// 2) config/berries.toml
    /// 3) built-in defaults
    ///
    /// Env overrides are applied on top in every case.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else {
            let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
            if fallback.exists() {
                Self::load_from_file(&fallback)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env_string(ENV_USER_POSTS_URL) {
            self.upstream.user_posts_url = v;
        }
        if let Some(v) = env_string(ENV_COIN_BALANCES_URL) {
            self.upstream.coin_balances_url = v;
        }
        if let Some(v) = env_string(ENV_CREDIBILITY_MODEL) {
            self.models.credibility = PathBuf::from(v);
        }
        if let Some(v) = env_string(ENV_INFLUENCER_MODEL) {
            self.models.influencer = PathBuf::from(v);
        }
        if let Some(v) = env_parsed::<u64>(ENV_FOLLOWERS_OF_FOLLOWERS)? {
            self.scoring.followers_of_followers = v;
        }
        if let Some(v) = env_parsed::<u64>(ENV_ADS_PURCHASED)? {
            self.scoring.ads_purchased_from_profile = v;
        }
        if let Some(v) = env_parsed::<SocketAddr>(ENV_BIND)? {
            self.server.bind = v;
        }
        Ok(())
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_parsed<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("invalid {key}={raw:?}: {e}")),
    }
}
