use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::database::repositories::TimeRange;
use crate::ingest::ListenerState;

/// Optional time window for price queries
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct PriceQueryParams {
    /// Inclusive lower bound (RFC3339, e.g. 2025-09-10T09:00:00Z)
    pub start_time: Option<String>,
    /// Inclusive upper bound (RFC3339)
    pub end_time: Option<String>,
}

impl PriceQueryParams {
    /// Parse both bounds; the error names the offending parameter
    pub fn time_range(&self) -> Result<TimeRange, String> {
        Ok(TimeRange::new(
            parse_time("start_time", self.start_time.as_deref())?,
            parse_time("end_time", self.end_time.as_deref())?,
        ))
    }
}

/// RFC3339, or a timestamp without offset taken as UTC
fn parse_time(name: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>, String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(|e| format!("Invalid '{}' timestamp {:?}: {}", name, raw, e))
}

/// Mean price over the requested window
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AverageResponse {
    /// `null` when no prices match
    pub average_price: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Degraded,
}

/// Health of the ingestion service
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listener: Option<ListenerState>,
    pub timestamp: String,
}

impl HealthResponse {
    pub fn from_listener(listener: Option<ListenerState>) -> Self {
        let status = match listener {
            Some(ListenerState::Subscribed) => HealthState::Healthy,
            _ => HealthState::Degraded,
        };

        Self {
            status,
            listener,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}
