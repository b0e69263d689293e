use serde::{Deserialize, Serialize};

/// A candidate token with a selection weight and optional context conditions.
///
/// Weight 0 means the tag is never picked by a weighted draw; it can still
/// show up in `all` and `sequential` groups, where every listed tag counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedTag {
    pub tag: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Tokens that must already be present in the prompt being built.
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_weight() -> u32 {
    1
}

fn default_enabled() -> bool {
    true
}

impl WeightedTag {
    pub fn new(tag: impl Into<String>, weight: u32) -> Self {
        Self {
            tag: tag.into(),
            weight,
            conditions: Vec::new(),
            enabled: true,
        }
    }

    /// Builder-style helper for attaching context conditions.
    pub fn with_conditions(mut self, conditions: &[&str]) -> Self {
        self.conditions = conditions.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Convenience for building an unweighted list: every tag gets weight 1.
    pub fn uniform(tags: &[&str]) -> Vec<WeightedTag> {
        tags.iter().map(|t| WeightedTag::new(*t, 1)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ron_defaults_fill_optional_fields() {
        let tag: WeightedTag = ron::from_str(r#"(tag: "long hair")"#).unwrap();
        assert_eq!(tag.tag, "long hair");
        assert_eq!(tag.weight, 1);
        assert!(tag.conditions.is_empty());
        assert!(tag.enabled);
    }

    #[test]
    fn builder_helpers() {
        let tag = WeightedTag::new("smile", 5)
            .with_conditions(&["girl"])
            .disabled();
        assert_eq!(tag.weight, 5);
        assert_eq!(tag.conditions, vec!["girl".to_string()]);
        assert!(!tag.enabled);
    }

    #[test]
    fn uniform_weights() {
        let tags = WeightedTag::uniform(&["a", "b", "c"]);
        assert_eq!(tags.len(), 3);
        assert!(tags.iter().all(|t| t.weight == 1));
    }
}
