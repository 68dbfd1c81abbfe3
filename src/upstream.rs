//! External data fetchers: user posts/profile resources and coin balances.

use std::time::Instant;

use anyhow::Context;
use async_trait::async_trait;
use metrics::histogram;
use reqwest::{redirect, Client};
use serde_json::Value;

use crate::config::UpstreamConfig;
use crate::error::{BerriesError, Result, Upstream};

/// Source of the two raw payloads the aggregator works on.
#[async_trait]
pub trait AccountDataSource: Send + Sync {
    /// Payload with a top-level `resources` array.
    async fn fetch_user_posts(&self, address: &str) -> Result<Value>;
    /// Payload with a top-level `latest_balances` array.
    async fn fetch_coin_balances(&self, address: &str) -> Result<Value>;
}

pub struct HttpDataSource {
    user_posts_url: String,
    coin_balances_url: String,
    // Posts endpoint must not follow redirects; balances endpoint must.
    no_redirect: Client,
    follow_redirect: Client,
}

impl HttpDataSource {
    pub fn new(cfg: &UpstreamConfig) -> anyhow::Result<Self> {
        let no_redirect = Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .context("building user-posts http client")?;
        let follow_redirect = Client::builder()
            .build()
            .context("building coin-balances http client")?;
        Ok(Self {
            user_posts_url: cfg.user_posts_url.clone(),
            coin_balances_url: cfg.coin_balances_url.clone(),
            no_redirect,
            follow_redirect,
        })
    }

    async fn get_json(
        &self,
        upstream: Upstream,
        client: &Client,
        url: &str,
        param: &str,
        address: &str,
    ) -> Result<Value> {
        let t0 = Instant::now();
        tracing::debug!(%upstream, %address, "fetching upstream");

        let resp = client
            .get(url)
            .query(&[(param, address)])
            .send()
            .await
            .with_context(|| format!("{upstream} http get()"))?;

        histogram!("berries_upstream_fetch_ms", "upstream" => upstream.as_str())
            .record(t0.elapsed().as_secs_f64() * 1_000.0);

        let status = resp.status();
        if !status.is_success() {
            return Err(BerriesError::UpstreamFetch {
                upstream,
                status: status.as_u16(),
                url: resp.url().to_string(),
            });
        }

        let body = resp
            .bytes()
            .await
            .with_context(|| format!("{upstream} http body"))?;
        serde_json::from_slice(&body)
            .map_err(|e| BerriesError::malformed(format!("{upstream} body is not JSON ({e})")))
    }
}

#[async_trait]
impl AccountDataSource for HttpDataSource {
    async fn fetch_user_posts(&self, address: &str) -> Result<Value> {
        self.get_json(
            Upstream::UserPosts,
            &self.no_redirect,
            &self.user_posts_url,
            "AccountAddress",
            address,
        )
        .await
    }

    async fn fetch_coin_balances(&self, address: &str) -> Result<Value> {
        self.get_json(
            Upstream::CoinBalances,
            &self.follow_redirect,
            &self.coin_balances_url,
            "address",
            address,
        )
        .await
    }
}
