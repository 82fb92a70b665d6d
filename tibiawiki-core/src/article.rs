//! Wiki articles as handed over by the fetch layer.

use crate::error::{Result, TibiaWikiError};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const BASE_URL: &str = "https://tibia.fandom.com";

/// Format of revision timestamps returned by the wiki API.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A text article: its identity, last edit and raw wikitext.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub article_id: i64,
    pub title: String,
    /// Last edit, as unix seconds.
    #[serde(with = "wiki_timestamp")]
    pub timestamp: i64,
    pub content: String,
}

impl Article {
    /// Build an article from the wiki's string timestamp.
    pub fn new(
        article_id: i64,
        title: impl Into<String>,
        timestamp: &str,
        content: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            article_id,
            title: title.into(),
            timestamp: parse_timestamp(timestamp)?,
            content: content.into(),
        })
    }

    /// URL of the article's display page.
    pub fn url(&self) -> String {
        format!("{}/wiki/{}", BASE_URL, self.title.replace(' ', "_"))
    }
}

/// Parse a revision timestamp like `2018-08-20T04:33:15Z` into unix seconds.
pub fn parse_timestamp(value: &str) -> Result<i64> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp());
    }
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|dt| dt.and_utc().timestamp())
        .map_err(|e| TibiaWikiError::Parse(format!("Invalid timestamp {:?}: {}", value, e)))
}

/// Render unix seconds back into the wiki's timestamp format.
pub fn format_timestamp(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

mod wiki_timestamp {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(i64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(timestamp: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(*timestamp))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Seconds(seconds) => Ok(seconds),
            Raw::Text(text) => super::parse_timestamp(&text).map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("2018-08-20T04:33:15Z").unwrap(), 1534739595);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_parse_timestamp_with_offset() {
        assert_eq!(parse_timestamp("2018-08-20T04:33:15+00:00").unwrap(), 1534739595);
        assert_eq!(parse_timestamp("2018-08-20T04:33:15.000Z").unwrap(), 1534739595);
        assert_eq!(parse_timestamp("2018-08-20T06:33:15+02:00").unwrap(), 1534739595);
        assert!(parse_timestamp("2018-08-20 04:33:15").is_err());
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(1534739595), "2018-08-20T04:33:15Z");
    }

    #[test]
    fn test_article_from_json() {
        let json = r#"{"article_id": 1, "title": "Fire Sword", "timestamp": "2018-08-20T04:33:15Z", "content": "{{Infobox Item}}"}"#;
        let article: Article = serde_json::from_str(json).unwrap();
        assert_eq!(article.article_id, 1);
        assert_eq!(article.timestamp, 1534739595);
        assert_eq!(article.url(), "https://tibia.fandom.com/wiki/Fire_Sword");
    }

    #[test]
    fn test_article_json_roundtrip_keeps_timestamp_format() {
        let article = Article::new(2, "Demon", "2018-08-20T04:33:15Z", "").unwrap();
        let json = serde_json::to_string(&article).unwrap();
        assert!(json.contains("\"2018-08-20T04:33:15Z\""));
    }
}
