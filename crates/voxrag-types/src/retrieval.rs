use serde_json::{Map, Value};

/// Text carried by the placeholder passage that stands in for "no relevant match".
pub const GENERAL_QUERY_FLAG: &str = "GENERAL_QUERY_FLAG";

/// Metadata key holding a curated answer that can be returned without generation.
pub const ANSWER_METADATA_KEY: &str = "answer";

/// One retrieved unit of supporting text.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Passage {
    text: String,
    #[serde(default)]
    metadata: Map<String, Value>,
    /// Similarity distance reported by the index, smaller is closer.
    #[serde(default)]
    distance: Option<f32>,
    /// Set only on the sentinel passage.
    #[serde(default)]
    general: bool,
}

impl Passage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: Map::new(),
            distance: None,
            general: false,
        }
    }

    /// The placeholder returned when nothing in the index qualifies.
    pub fn sentinel() -> Self {
        let mut metadata = Map::new();
        metadata.insert("isGeneral".to_string(), Value::Bool(true));
        Self {
            text: GENERAL_QUERY_FLAG.to_string(),
            metadata,
            distance: None,
            general: true,
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_distance(mut self, distance: f32) -> Self {
        self.distance = Some(distance);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn distance(&self) -> Option<f32> {
        self.distance
    }

    pub fn is_general(&self) -> bool {
        self.general
    }

    /// A non-empty curated answer stored in the passage metadata, if any.
    pub fn direct_answer(&self) -> Option<&str> {
        match self.metadata.get(ANSWER_METADATA_KEY) {
            Some(Value::String(answer)) if !answer.is_empty() => Some(answer),
            _ => None,
        }
    }
}

/// Ranked passages for one query. Never empty: an unmatched query holds exactly the sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalResult {
    head: Passage,
    tail: Vec<Passage>,
}

impl RetrievalResult {
    /// Wraps passages already ranked closest-first, substituting the sentinel when empty.
    pub fn from_passages(passages: Vec<Passage>) -> Self {
        let mut passages = passages.into_iter();
        match passages.next() {
            Some(head) => Self {
                head,
                tail: passages.collect(),
            },
            None => Self::no_match(),
        }
    }

    pub fn no_match() -> Self {
        Self {
            head: Passage::sentinel(),
            tail: Vec::new(),
        }
    }

    /// The best-ranked passage.
    pub fn first(&self) -> &Passage {
        &self.head
    }

    pub fn iter(&self) -> impl Iterator<Item = &Passage> {
        std::iter::once(&self.head).chain(self.tail.iter())
    }

    pub fn len(&self) -> usize {
        1 + self.tail.len()
    }

    pub fn is_general(&self) -> bool {
        self.head.is_general()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_result_holds_single_sentinel() {
        let result = RetrievalResult::from_passages(vec![]);

        assert_eq!(result.len(), 1);
        assert!(result.is_general());
        assert_eq!(result.first().text(), GENERAL_QUERY_FLAG);
        assert_eq!(result.first().metadata().get("isGeneral"), Some(&json!(true)));
    }

    #[test]
    fn test_passages_keep_rank_order() {
        let result = RetrievalResult::from_passages(vec![
            Passage::new("closest").with_distance(0.1),
            Passage::new("middle").with_distance(0.2),
            Passage::new("farthest").with_distance(0.4),
        ]);

        let texts: Vec<&str> = result.iter().map(Passage::text).collect();
        assert_eq!(texts, vec!["closest", "middle", "farthest"]);
        assert!(!result.is_general());
        assert_eq!(result.first().distance(), Some(0.1));
    }

    #[test]
    fn test_direct_answer_ignores_empty_and_non_string_values() {
        let metadata = |value: Value| {
            let mut map = Map::new();
            map.insert(ANSWER_METADATA_KEY.to_string(), value);
            map
        };

        let with_answer = Passage::new("q").with_metadata(metadata(json!("Open 9 to 5.")));
        let empty = Passage::new("q").with_metadata(metadata(json!("")));
        let numeric = Passage::new("q").with_metadata(metadata(json!(42)));

        assert_eq!(with_answer.direct_answer(), Some("Open 9 to 5."));
        assert_eq!(empty.direct_answer(), None);
        assert_eq!(numeric.direct_answer(), None);
        assert_eq!(Passage::new("q").direct_answer(), None);
    }
}
