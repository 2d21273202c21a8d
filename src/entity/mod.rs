use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(test)]
mod tests;

/// Status codes that mean a match is currently in play.
pub const LIVE_STATUSES: [&str; 9] = ["1H", "HT", "2H", "ET", "BT", "P", "LIVE", "INT", "SUSP"];

/// Returns true if `status` is an in-play status code.
pub fn is_live_status(status: &str) -> bool {
    LIVE_STATUSES.contains(&status)
}

/// A single match as returned by the remote provider.
///
/// Only `id`, scores and `status` are interpreted. The full JSON object is
/// kept in `raw` and handed to subscribers untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedEntity {
    /// Stable key (fixture identifier)
    pub id: String,
    pub home_score: u32,
    pub away_score: u32,
    /// Provider status code (e.g. "1H", "FT")
    pub status: String,
    /// Raw provider payload
    pub raw: Value,
}

impl TrackedEntity {
    /// Builds an entity from a provider JSON object.
    ///
    /// Expects `id`, `homeScore`, `awayScore` and `status` fields. `id` may be a
    /// number or a string; null or missing scores count as 0.
    pub fn from_value(raw: Value) -> Result<Self> {
        let obj = raw
            .as_object()
            .context("Match entry is not a JSON object")?;

        let id = match obj.get("id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => bail!("Match entry has invalid 'id': {}", other),
            None => bail!("Match entry missing 'id' field"),
        };

        let status = obj
            .get("status")
            .and_then(|v| v.as_str())
            .with_context(|| format!("Match '{}' missing 'status' field", id))?
            .to_string();

        let home_score = read_score(obj.get("homeScore"))
            .with_context(|| format!("Match '{}' has invalid 'homeScore'", id))?;
        let away_score = read_score(obj.get("awayScore"))
            .with_context(|| format!("Match '{}' has invalid 'awayScore'", id))?;

        Ok(Self {
            id,
            home_score,
            away_score,
            status,
            raw,
        })
    }

    /// Short representation of the fields that matter for change detection.
    pub fn fingerprint(&self) -> String {
        format!("{}-{}-{}", self.home_score, self.away_score, self.status)
    }

    pub fn is_live(&self) -> bool {
        is_live_status(&self.status)
    }
}

fn read_score(value: Option<&Value>) -> Result<u32> {
    match value {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .context("score is not a non-negative integer"),
        Some(Value::String(s)) => s.trim().parse::<u32>().context("score is not numeric"),
        Some(other) => bail!("unexpected score value {}", other),
    }
}

/// Change event payload delivered to `match_update` subscribers.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchUpdate {
    pub entity_id: String,
    pub home_score: u32,
    pub away_score: u32,
    pub status: String,
    pub live: bool,
    pub timestamp_ms: i64,
    /// Provider payload, passed through as-is
    pub raw: Value,
}

impl From<&TrackedEntity> for MatchUpdate {
    fn from(entity: &TrackedEntity) -> Self {
        Self {
            entity_id: entity.id.clone(),
            home_score: entity.home_score,
            away_score: entity.away_score,
            status: entity.status.clone(),
            live: entity.is_live(),
            timestamp_ms: Utc::now().timestamp_millis(),
            raw: entity.raw.clone(),
        }
    }
}
