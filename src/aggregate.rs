//! Feature aggregation over the raw upstream payloads.
//!
//! Both payloads are walked as untyped JSON. Counts may arrive either as
//! JSON numbers or as decimal strings (on-chain u64 values are usually
//! serialized as strings). Any key the walk needs that is missing, or a
//! value of the wrong shape, becomes `BerriesError::MalformedData` carrying
//! the JSON path. The only silent zeros are the documented defaults: no posts,
//! no APT balance, no `amount_in_usd`.

use serde_json::Value;

use crate::error::{BerriesError, Result};

pub const PROFILE_TAG_SUFFIX: &str = "::SocialMediaPlatform::Profile";
pub const USER_POSTS_TAG_SUFFIX: &str = "::SocialMediaPlatform::UserPosts";
pub const NET_WORTH_SYMBOL: &str = "APT";

/// Closed set of resource kinds the aggregator cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Profile,
    UserPosts,
    Other,
}

impl ResourceKind {
    /// Classify by suffix so that `0xabc::SocialMediaPlatform::Profile` and
    /// any other module address both match.
    pub fn classify(tag: &str) -> Self {
        if tag.ends_with(PROFILE_TAG_SUFFIX) {
            ResourceKind::Profile
        } else if tag.ends_with(USER_POSTS_TAG_SUFFIX) {
            ResourceKind::UserPosts
        } else {
            ResourceKind::Other
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivitySnapshot {
    pub total_followers: u64,
    pub total_likes: u64,
    pub total_comments: u64,
    pub total_posts: u64,
}

impl ActivitySnapshot {
    pub fn avg_likes_per_day(&self) -> f64 {
        per_post(self.total_likes, self.total_posts)
    }

    pub fn avg_comments_per_day(&self) -> f64 {
        per_post(self.total_comments, self.total_posts)
    }
}

fn per_post(total: u64, posts: u64) -> f64 {
    if posts == 0 {
        0.0
    } else {
        total as f64 / posts as f64
    }
}

/// Reduce the user-posts payload to follower/like/comment/post totals.
pub fn aggregate_activity(payload: &Value) -> Result<ActivitySnapshot> {
    let resources = array_at(payload, "resources", "resources")?;
    let mut snap = ActivitySnapshot::default();

    for (i, resource) in resources.iter().enumerate() {
        let at = format!("resources[{i}]");
        let tag = str_at(resource, "type", &format!("{at}.type"))?;

        match ResourceKind::classify(tag) {
            ResourceKind::Profile => {
                let data = field(resource, "data", &format!("{at}.data"))?;
                let path = format!("{at}.data.followers_count");
                let followers = count(field(data, "followers_count", &path)?, &path)?;
                snap.total_followers = snap.total_followers.saturating_add(followers);
            }
            ResourceKind::UserPosts => {
                let data = field(resource, "data", &format!("{at}.data"))?;
                let posts = array_at(data, "posts", &format!("{at}.data.posts"))?;
                for (j, post) in posts.iter().enumerate() {
                    let pat = format!("{at}.data.posts[{j}]");
                    let like_path = format!("{pat}.like_count");
                    let likes = count(field(post, "like_count", &like_path)?, &like_path)?;
                    let comments = array_at(post, "comments", &format!("{pat}.comments"))?;

                    snap.total_likes = snap.total_likes.saturating_add(likes);
                    snap.total_comments = snap.total_comments.saturating_add(comments.len() as u64);
                    snap.total_posts += 1;
                }
            }
            ResourceKind::Other => {}
        }
    }

    Ok(snap)
}

/// USD value of the first APT balance, 0 when there is none.
pub fn onchain_net_worth(payload: &Value) -> Result<f64> {
    let balances = array_at(payload, "latest_balances", "latest_balances")?;

    for (i, balance) in balances.iter().enumerate() {
        let at = format!("latest_balances[{i}]");
        let metadata = field(balance, "metadata", &format!("{at}.metadata"))?;
        let symbol = str_at(metadata, "symbol", &format!("{at}.metadata.symbol"))?;
        if symbol != NET_WORTH_SYMBOL {
            continue;
        }
        return match balance.get("amount_in_usd") {
            None | Some(Value::Null) => Ok(0.0),
            Some(v) => amount(v, &format!("{at}.amount_in_usd")),
        };
    }

    Ok(0.0)
}

fn field<'a>(v: &'a Value, key: &str, path: &str) -> Result<&'a Value> {
    v.get(key)
        .ok_or_else(|| BerriesError::malformed(format!("missing key '{path}'")))
}

fn array_at<'a>(v: &'a Value, key: &str, path: &str) -> Result<&'a Vec<Value>> {
    field(v, key, path)?
        .as_array()
        .ok_or_else(|| BerriesError::malformed(format!("'{path}' is not an array")))
}

fn str_at<'a>(v: &'a Value, key: &str, path: &str) -> Result<&'a str> {
    field(v, key, path)?
        .as_str()
        .ok_or_else(|| BerriesError::malformed(format!("'{path}' is not a string")))
}

fn count(v: &Value, path: &str) -> Result<u64> {
    let parsed = match v {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|x| *x >= 0.0 && x.fract() == 0.0 && *x <= u64::MAX as f64)
                .map(|x| x as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| BerriesError::malformed(format!("'{path}' is not a non-negative integer")))
}

fn amount(v: &Value, path: &str) -> Result<f64> {
    let parsed = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|x| x.is_finite())
        .ok_or_else(|| BerriesError::malformed(format!("'{path}' is not a number")))
}
