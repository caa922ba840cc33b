//! Company news headlines.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub source: String,
    #[serde(default = "unknown_time")]
    pub time: String,
}

fn unknown_time() -> String {
    "Unknown".to_string()
}

impl NewsArticle {
    /// Only http(s) links are rendered as anchors.
    pub fn has_web_link(&self) -> bool {
        let link = self.link.trim_start().to_ascii_lowercase();
        link.starts_with("http://") || link.starts_with("https://")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsFeed {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub news: Vec<NewsArticle>,
}

impl NewsFeed {
    pub fn is_empty(&self) -> bool {
        self.news.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_feed_with_missing_time() {
        let feed: NewsFeed = serde_json::from_str(
            r#"{"symbol":"TCS.NS","count":1,"news":[{"title":"T","link":"https://x","source":"S"}]}"#,
        )
        .unwrap();
        assert_eq!(feed.news[0].time, "Unknown");
        assert!(!feed.is_empty());
    }

    #[test]
    fn only_http_links_are_web_links() {
        let mut article = NewsArticle {
            title: "T".into(),
            link: "https://example.com/a".into(),
            source: String::new(),
            time: unknown_time(),
        };
        assert!(article.has_web_link());
        for link in ["HTTP://example.com", " http://example.com"] {
            article.link = link.into();
            assert!(article.has_web_link(), "{link}");
        }
        for link in ["javascript:alert(1)", "data:text/html,x", "//example.com", ""] {
            article.link = link.into();
            assert!(!article.has_web_link(), "{link}");
        }
    }

    #[test]
    fn empty_body_is_empty_feed() {
        let feed: NewsFeed = serde_json::from_str("{}").unwrap();
        assert!(feed.is_empty());
    }
}
