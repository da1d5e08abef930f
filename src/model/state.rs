//! 页面状态快照

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Observer 采集的环境快照，作为决策与落库的上下文
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageState {
    /// 当前页面 URL
    pub url: String,
    /// 页面标题（取不到时为空串）
    pub title: String,
    /// 采集时刻
    pub observed_at: DateTime<Utc>,
}

impl PageState {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            observed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_timestamp_as_rfc3339() {
        let state = PageState::new("https://example.com", "Example");
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["url"], "https://example.com");
        assert_eq!(value["title"], "Example");
        assert!(value["observed_at"].is_string());
    }

    #[test]
    fn test_round_trips_through_json() {
        let state = PageState::new("https://example.com", "Example");
        let json = serde_json::to_string(&state).unwrap();
        let parsed: PageState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.url, state.url);
        assert_eq!(parsed.title, state.title);
        assert_eq!(parsed.observed_at, state.observed_at);
    }
}
