//! Predictor abstraction and the two feature vectors fed into it.
//!
//! The service treats both regressors as black boxes: a row of `f64` goes in,
//! a 1-D or 2-D numeric result comes out, and the first value is the score.
//! Artifacts on disk are linear regressors serialized as JSON.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ModelPaths;

/// Raw predictor output, in whichever shape the model produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    Vector(Vec<f64>),
    Matrix(Vec<Vec<f64>>),
}

impl Prediction {
    /// First element for 1-D output, first row/first column for 2-D output.
    pub fn scalar(&self) -> Result<f64> {
        let v = match self {
            Prediction::Vector(v) => v.first(),
            Prediction::Matrix(m) => m.first().and_then(|row| row.first()),
        };
        v.copied().ok_or_else(|| anyhow!("predictor returned an empty result"))
    }
}

/// Read-only regressor. Implementations hold no per-call mutable state and
/// are shared across concurrent requests.
pub trait Predictor: Send + Sync {
    fn predict(&self, row: &[f64]) -> Result<Prediction>;
}

pub type DynPredictor = Arc<dyn Predictor>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coefficients {
    Single(Vec<f64>),
    Multi(Vec<Vec<f64>>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Intercept {
    Single(f64),
    Multi(Vec<f64>),
}

/// `y = X·coefᵀ + intercept`, one output per coefficient row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub coef: Coefficients,
    pub intercept: Intercept,
}

impl LinearModel {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading model artifact {}", path.display()))?;
        let model: LinearModel = serde_json::from_str(&data)
            .with_context(|| format!("deserializing model artifact {}", path.display()))?;
        model
            .validate()
            .with_context(|| format!("invalid model artifact {}", path.display()))?;
        Ok(model)
    }

    /// Number of input columns the model expects.
    pub fn n_features(&self) -> usize {
        match &self.coef {
            Coefficients::Single(c) => c.len(),
            Coefficients::Multi(rows) => rows.first().map_or(0, Vec::len),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.n_features() == 0 {
            bail!("model has no coefficients");
        }
        match (&self.coef, &self.intercept) {
            (Coefficients::Single(_), Intercept::Single(_)) => Ok(()),
            (Coefficients::Multi(rows), Intercept::Multi(b)) => {
                if rows.len() != b.len() {
                    bail!("{} coefficient rows but {} intercepts", rows.len(), b.len());
                }
                if rows.iter().any(|r| r.len() != self.n_features()) {
                    bail!("ragged coefficient matrix");
                }
                Ok(())
            }
            (Coefficients::Single(_), Intercept::Multi(_)) => {
                bail!("1-D coefficients need a scalar intercept")
            }
            (Coefficients::Multi(_), Intercept::Single(_)) => {
                bail!("2-D coefficients need an intercept array")
            }
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl Predictor for LinearModel {
    fn predict(&self, row: &[f64]) -> Result<Prediction> {
        let n = self.n_features();
        if row.len() != n {
            bail!("feature row has {} columns, model expects {n}", row.len());
        }
        Ok(match (&self.coef, &self.intercept) {
            (Coefficients::Single(c), Intercept::Single(b)) => {
                Prediction::Vector(vec![dot(c, row) + b])
            }
            (Coefficients::Multi(rows), Intercept::Multi(bs)) => Prediction::Matrix(vec![rows
                .iter()
                .zip(bs)
                .map(|(c, b)| dot(c, row) + b)
                .collect()]),
            _ => bail!("model coefficients and intercept disagree in shape"),
        })
    }
}

/// The two predictors, loaded once at startup.
#[derive(Clone)]
pub struct Models {
    pub credibility: DynPredictor,
    pub influencer: DynPredictor,
}

impl Models {
    pub fn new(credibility: DynPredictor, influencer: DynPredictor) -> Self {
        Self {
            credibility,
            influencer,
        }
    }

    /// Load both artifacts. Either failing is fatal to startup.
    pub fn load(paths: &ModelPaths) -> Result<Self> {
        let credibility = LinearModel::load(&paths.credibility).context("credibility model")?;
        let influencer = LinearModel::load(&paths.influencer).context("influencer model")?;
        if credibility.n_features() != CredibilityFeatures::WIDTH {
            bail!(
                "credibility model expects {} features, service provides {}",
                credibility.n_features(),
                CredibilityFeatures::WIDTH
            );
        }
        if influencer.n_features() != InfluencerFeatures::WIDTH {
            bail!(
                "influencer model expects {} features, service provides {}",
                influencer.n_features(),
                InfluencerFeatures::WIDTH
            );
        }
        info!(
            credibility = %paths.credibility.display(),
            influencer = %paths.influencer.display(),
            "Models loaded successfully"
        );
        Ok(Self::new(Arc::new(credibility), Arc::new(influencer)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CredibilityFeatures {
    pub onchain_net_worth: f64,
    pub followers_of_followers: f64,
}

impl CredibilityFeatures {
    pub const WIDTH: usize = 2;

    pub fn row(&self) -> [f64; Self::WIDTH] {
        [self.onchain_net_worth, self.followers_of_followers]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InfluencerFeatures {
    pub followers: f64,
    pub likes: f64,
    pub comments: f64,
    pub ads_purchased_from_profile: f64,
    pub average_likes_per_day: f64,
    pub average_comments_per_day: f64,
    pub credibility_weight: f64,
}

impl InfluencerFeatures {
    pub const WIDTH: usize = 7;

    pub fn row(&self) -> [f64; Self::WIDTH] {
        [
            self.followers,
            self.likes,
            self.comments,
            self.ads_purchased_from_profile,
            self.average_likes_per_day,
            self.average_comments_per_day,
            self.credibility_weight,
        ]
    }
}

pub fn credibility_weight(model: &dyn Predictor, features: &CredibilityFeatures) -> Result<f64> {
    model
        .predict(&features.row())
        .and_then(|p| p.scalar())
        .context("credibility inference")
}

pub fn berries(model: &dyn Predictor, features: &InfluencerFeatures) -> Result<f64> {
    model
        .predict(&features.row())
        .and_then(|p| p.scalar())
        .context("influencer inference")
}
