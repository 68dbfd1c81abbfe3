//! Error taxonomy for the scoring pipeline and its HTTP mapping.
//!
//! Every failure that reaches the `/calculate_berries` handler is one of these
//! variants; the handler logs it and turns it into a `{ "detail": ... }` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BerriesError>;

/// Which upstream collaborator a fetch went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    UserPosts,
    CoinBalances,
}

impl Upstream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Upstream::UserPosts => "user_posts",
            Upstream::CoinBalances => "coin_balances",
        }
    }
}

impl std::fmt::Display for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum BerriesError {
    /// Request body passed extraction but carries an unusable value.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Upstream answered with a non-2xx status.
    #[error("{upstream} upstream returned {status} for {url}")]
    UpstreamFetch {
        upstream: Upstream,
        status: u16,
        url: String,
    },

    /// A key the aggregator needs is missing or has the wrong type.
    #[error("{0}")]
    MalformedData(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl BerriesError {
    pub fn malformed(path: impl Into<String>) -> Self {
        Self::MalformedData(path.into())
    }

    /// Short label used for logs and the `kind` metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::UpstreamFetch { .. } => "upstream_fetch",
            Self::MalformedData(_) => "malformed_data",
            Self::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            // Upstream status is passed through; anything axum cannot express falls back to 502.
            Self::UpstreamFetch { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::MalformedData(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message.
    pub fn detail(&self) -> String {
        match self {
            Self::InvalidRequest(msg) => msg.clone(),
            Self::UpstreamFetch { .. } => format!("Error fetching external data: {self}"),
            Self::MalformedData(path) => {
                format!("Unexpected data structure in external API response: {path}")
            }
            Self::Internal(e) => format!("Internal Server Error: {e:#}"),
        }
    }
}

#[derive(serde::Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for BerriesError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            detail: self.detail(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
