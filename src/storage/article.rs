use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A published article. Tags stay sorted; `timestamp` is the creation time
/// in epoch milliseconds and drives listing order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Article {
    pub id: Uuid,
    pub author: Uuid,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_default_to_empty_on_deserialize() {
        let raw = format!(
            r#"{{"id":"{}","author":"{}","title":"t","content":"c","timestamp":0}}"#,
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        let article: Article = serde_json::from_str(&raw).unwrap();
        assert!(article.tags.is_empty());
    }

    #[test]
    fn tags_serialize_sorted() {
        let mut tags = BTreeSet::new();
        tags.insert("zebra".to_string());
        tags.insert("apple".to_string());
        let article = Article {
            id: Uuid::new_v4(),
            author: Uuid::new_v4(),
            title: "t".into(),
            content: "c".into(),
            tags,
            timestamp: 42,
        };
        let raw = serde_json::to_string(&article).unwrap();
        assert!(raw.find("apple").unwrap() < raw.find("zebra").unwrap());
    }
}
