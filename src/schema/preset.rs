/// Presets — the root of a configuration tree, plus loading and validation.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

use super::category::RandomCategory;
use super::character::CharacterCountConfig;
use super::group::{SelectionMode, SourceType, TagGroup};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid preset: {}", join_issues(.0))]
    Invalid(Vec<ConfigIssue>),
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A single problem found while validating a preset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Location in the tree, e.g. `category 'hair' > group 'color'`.
    pub path: String,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A complete, user-authored generation configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Preset {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Resolved in this order on every call.
    #[serde(default)]
    pub categories: Vec<RandomCategory>,
    /// `None` means the preset does not cast characters at all.
    #[serde(default)]
    pub character_count: Option<CharacterCountConfig>,
}

impl Preset {
    pub fn new(name: &str, categories: Vec<RandomCategory>) -> Self {
        Self {
            id: name.to_string(),
            name: name.to_string(),
            description: String::new(),
            categories,
            character_count: None,
        }
    }

    pub fn with_characters(mut self, config: CharacterCountConfig) -> Self {
        self.character_count = Some(config);
        self
    }

    /// Load a preset from a file. `.json` files are read as JSON, anything
    /// else as RON.
    pub fn load(path: &Path) -> Result<Preset, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            Self::parse_json(&contents)
        } else {
            Self::parse_ron(&contents)
        }
    }

    pub fn parse_ron(input: &str) -> Result<Preset, ConfigError> {
        Ok(ron::from_str(input)?)
    }

    pub fn parse_json(input: &str) -> Result<Preset, ConfigError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Check the tree for malformed configuration. Degenerate but legal
    /// content (empty pools, zero weights) is not reported here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let issues = self.issues();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(issues))
        }
    }

    pub fn issues(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let mut keys = FxHashSet::default();

        for category in &self.categories {
            let path = format!("category '{}'", category.key);
            if !keys.insert(category.key.as_str()) {
                issues.push(issue(&path, "duplicate category key"));
            }
            check_probability(&path, "probability", category.probability, &mut issues);
            check_probability(
                &path,
                "group_select_prob",
                category.group_select_prob,
                &mut issues,
            );
            if category.group_selection_mode == SelectionMode::MultipleNum
                && category.group_select_count == 0
            {
                issues.push(issue(&path, "multiple_num selection needs a count of at least 1"));
            }
            for group in &category.groups {
                check_group(&path, group, &mut issues);
            }
        }

        if let Some(ref config) = self.character_count {
            for category in &config.categories {
                for option in &category.tag_options {
                    if option.slots.len() != category.count {
                        issues.push(issue(
                            &format!(
                                "character count '{}' > option '{}'",
                                category.id, option.id
                            ),
                            &format!(
                                "declares {} slots for a count of {}",
                                option.slots.len(),
                                category.count
                            ),
                        ));
                    }
                }
            }
        }

        issues
    }
}

fn issue(path: &str, message: &str) -> ConfigIssue {
    ConfigIssue {
        path: path.to_string(),
        message: message.to_string(),
    }
}

fn check_probability(path: &str, field: &str, value: f64, issues: &mut Vec<ConfigIssue>) {
    if !(0.0..=1.0).contains(&value) {
        issues.push(issue(path, &format!("{} {} is outside [0, 1]", field, value)));
    }
}

fn check_group(parent: &str, group: &TagGroup, issues: &mut Vec<ConfigIssue>) {
    let path = format!("{} > group '{}'", parent, group.id);

    check_probability(&path, "probability", group.probability, issues);
    check_probability(&path, "select_prob", group.select_prob, issues);

    if group.bracket_min > group.bracket_max {
        issues.push(issue(
            &path,
            &format!(
                "bracket range {}..{} is inverted",
                group.bracket_min, group.bracket_max
            ),
        ));
    }
    if group.selection_mode == SelectionMode::MultipleNum && group.select_count == 0 {
        issues.push(issue(&path, "multiple_num selection needs a count of at least 1"));
    }

    if group.is_container() {
        if group.children.is_empty() {
            issues.push(issue(&path, "container group has no children"));
        }
        for child in &group.children {
            check_group(&path, child, issues);
        }
        return;
    }

    if group.source_type != SourceType::Custom {
        if group.source_id.as_deref().map_or(true, str::is_empty) {
            issues.push(issue(
                &path,
                &format!("{} source needs a source_id", group.source_type.as_str()),
            ));
        }
        if !group.tags.is_empty() {
            issues.push(issue(
                &path,
                &format!("{} source cannot carry inline tags", group.source_type.as_str()),
            ));
        }
    }
}
