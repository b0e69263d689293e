use serde::{Deserialize, Serialize};

use super::tag::WeightedTag;

/// How many candidates a node draws from its pool, and how.
///
/// Groups use it over their tags (or their children, for containers) and
/// categories use it over their groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// One weighted draw.
    #[default]
    Single,
    /// `select_count` distinct weighted draws without replacement.
    MultipleNum,
    /// An independent Bernoulli trial per candidate.
    MultipleProb,
    /// Every candidate, optionally shuffled.
    All,
    /// Round-robin through the pool, one candidate per call, position
    /// persisted by the sequence store.
    Sequential,
}

/// Where a group's tags come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Tags listed inline on the group.
    #[default]
    Custom,
    /// A named built-in tag library.
    Builtin,
    /// An externally sourced pool materialized on demand.
    DynamicPool,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::Builtin => "builtin",
            Self::DynamicPool => "dynamic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    #[default]
    Leaf,
    /// Holds child groups instead of tags.
    ConfigContainer,
}

/// A node of the configuration tree yielding zero or more tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagGroup {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_probability")]
    pub probability: f64,
    #[serde(default)]
    pub selection_mode: SelectionMode,
    #[serde(default = "default_select_count")]
    pub select_count: usize,
    /// Inclusion chance per child under `multiple_prob` for containers.
    #[serde(default = "default_select_prob")]
    pub select_prob: f64,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default)]
    pub bracket_min: i32,
    #[serde(default)]
    pub bracket_max: i32,
    #[serde(default)]
    pub source_type: SourceType,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<WeightedTag>,
    #[serde(default)]
    pub children: Vec<TagGroup>,
    #[serde(default)]
    pub node_type: NodeType,
}

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_probability() -> f64 {
    1.0
}

pub(crate) fn default_select_count() -> usize {
    1
}

pub(crate) fn default_select_prob() -> f64 {
    0.5
}

impl TagGroup {
    fn base(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            enabled: true,
            probability: 1.0,
            selection_mode: SelectionMode::Single,
            select_count: 1,
            select_prob: 0.5,
            shuffle: false,
            bracket_min: 0,
            bracket_max: 0,
            source_type: SourceType::Custom,
            source_id: None,
            tags: Vec::new(),
            children: Vec::new(),
            node_type: NodeType::Leaf,
        }
    }

    /// A leaf group with inline tags.
    pub fn leaf(id: &str, tags: Vec<WeightedTag>) -> Self {
        Self {
            tags,
            ..Self::base(id)
        }
    }

    /// A leaf group whose tags come from a pool provider.
    pub fn pool(id: &str, source_type: SourceType, source_id: &str) -> Self {
        Self {
            source_type,
            source_id: Some(source_id.to_string()),
            ..Self::base(id)
        }
    }

    pub fn container(id: &str, children: Vec<TagGroup>) -> Self {
        Self {
            children,
            node_type: NodeType::ConfigContainer,
            ..Self::base(id)
        }
    }

    pub fn with_mode(mut self, mode: SelectionMode, count: usize) -> Self {
        self.selection_mode = mode;
        self.select_count = count;
        self
    }

    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    pub fn with_brackets(mut self, min: i32, max: i32) -> Self {
        self.bracket_min = min;
        self.bracket_max = max;
        self
    }

    pub fn with_select_prob(mut self, select_prob: f64) -> Self {
        self.select_prob = select_prob;
        self
    }

    pub fn shuffled(mut self) -> Self {
        self.shuffle = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn is_container(&self) -> bool {
        self.node_type == NodeType::ConfigContainer
    }

    /// Key under which the sequence store tracks this group's position.
    pub fn sequence_key(&self) -> String {
        format!("group:{}", self.id)
    }
}
