//! Stream identity newtype.

use serde::{Deserialize, Serialize};

/// Logical identifier of a delivery stream, used to key watermark
/// checkpoints (e.g. `"pageview-firehose"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamKey(String);

impl StreamKey {
    /// Create a new stream key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S: Into<String>> From<S> for StreamKey {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_key_display_and_as_str() {
        let key = StreamKey::new("pageview-firehose");
        assert_eq!(key.as_str(), "pageview-firehose");
        assert_eq!(key.to_string(), "pageview-firehose");
    }

    #[test]
    fn stream_key_eq_and_hash() {
        use std::collections::HashSet;
        let a = StreamKey::new("s");
        let b = StreamKey::from("s");
        assert_eq!(a, b);
        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn stream_key_serde_transparent() {
        let key = StreamKey::new("s");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"s\"");
    }
}
