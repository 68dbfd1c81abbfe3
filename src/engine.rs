//! Orchestrator: fetch → aggregate → credibility → influencer → output.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::aggregate::{aggregate_activity, onchain_net_worth, ActivitySnapshot};
use crate::config::{ScoringConstants, ServiceConfig};
use crate::error::{BerriesError, Result};
use crate::model::{self, CredibilityFeatures, InfluencerFeatures, Models};
use crate::upstream::{AccountDataSource, HttpDataSource};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BerriesOutput {
    pub credibility_weight: f64,
    pub berries: f64,
}

/// Everything a request needs, built once and never mutated.
pub struct ScoringContext {
    pub source: Arc<dyn AccountDataSource>,
    pub models: Models,
    pub constants: ScoringConstants,
}

impl ScoringContext {
    pub fn new(
        source: Arc<dyn AccountDataSource>,
        models: Models,
        constants: ScoringConstants,
    ) -> Self {
        Self {
            source,
            models,
            constants,
        }
    }

    /// Production wiring: HTTP upstreams and model artifacts from disk.
    pub fn from_config(cfg: &ServiceConfig) -> anyhow::Result<Self> {
        let source = HttpDataSource::new(&cfg.upstream)?;
        let models = Models::load(&cfg.models)?;
        Ok(Self::new(Arc::new(source), models, cfg.scoring))
    }

    pub async fn calculate(&self, account_address: &str) -> Result<BerriesOutput> {
        if account_address.is_empty() {
            return Err(BerriesError::InvalidRequest(
                "account_address must not be empty".to_string(),
            ));
        }

        // Fetched concurrently, but errors surface in pipeline order:
        // posts fetch, posts payload, balances fetch, balances payload.
        let (posts, balances) = tokio::join!(
            self.source.fetch_user_posts(account_address),
            self.source.fetch_coin_balances(account_address),
        );

        let activity = aggregate_activity(&posts?)?;
        let net_worth = onchain_net_worth(&balances?)?;

        let credibility_weight = model::credibility_weight(
            self.models.credibility.as_ref(),
            &self.credibility_features(net_worth),
        )?;
        let influencer = self.influencer_features(&activity, credibility_weight);
        let berries = model::berries(self.models.influencer.as_ref(), &influencer)?;

        info!(
            %account_address,
            followers = activity.total_followers,
            posts = activity.total_posts,
            net_worth,
            credibility_weight,
            berries,
            "berries calculated"
        );

        Ok(BerriesOutput {
            credibility_weight,
            berries,
        })
    }

    pub fn credibility_features(&self, onchain_net_worth: f64) -> CredibilityFeatures {
        CredibilityFeatures {
            onchain_net_worth,
            followers_of_followers: self.constants.followers_of_followers as f64,
        }
    }

    pub fn influencer_features(
        &self,
        activity: &ActivitySnapshot,
        credibility_weight: f64,
    ) -> InfluencerFeatures {
        InfluencerFeatures {
            followers: activity.total_followers as f64,
            likes: activity.total_likes as f64,
            comments: activity.total_comments as f64,
            ads_purchased_from_profile: self.constants.ads_purchased_from_profile as f64,
            average_likes_per_day: activity.avg_likes_per_day(),
            average_comments_per_day: activity.avg_comments_per_day(),
            credibility_weight,
        }
    }
}
