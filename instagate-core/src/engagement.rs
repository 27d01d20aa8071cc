//! Trailing-window engagement statistics over a user's recent posts.

use crate::types::Post;
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;

/// Number of most recent posts the stats endpoint looks at.
pub const STATS_POST_LIMIT: usize = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngagementStats {
    pub engagement_7d: u64,
    pub engagement_30d: u64,
    pub posts_7d: u32,
    pub posts_30d: u32,
}

/// Sums likes + comments and counts posts taken within the last 7 and 30 days.
///
/// Both cutoffs are inclusive and the windows overlap: a post from the last
/// week counts in both buckets.
pub fn aggregate_engagement(posts: &[Post], now: DateTime<Utc>) -> EngagementStats {
    let week_ago = now - Duration::days(7);
    let month_ago = now - Duration::days(30);

    posts
        .iter()
        .fold(EngagementStats::default(), |mut stats, post| {
            let engagement = post.engagement();

            if post.taken_at >= week_ago {
                stats.engagement_7d += engagement;
                stats.posts_7d += 1;
            }
            if post.taken_at >= month_ago {
                stats.engagement_30d += engagement;
                stats.posts_30d += 1;
            }
            stats
        })
}

/// Reads a post timestamp from an API payload.
///
/// Accepts unix seconds (integer or float), RFC 3339 strings, and naive
/// `YYYY-MM-DDTHH:MM:SS[.f]` strings. Naive values are taken as UTC.
pub fn normalize_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::Number(n) => {
            if let Some(secs) = n.as_i64() {
                Utc.timestamp_opt(secs, 0).single()
            } else {
                let secs = n.as_f64()?;
                let millis = (secs * 1000.0).round() as i64;
                Utc.timestamp_millis_opt(millis).single()
            }
        }
        serde_json::Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(secs) = s.parse::<i64>() {
        return Utc.timestamp_opt(secs, 0).single();
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}
