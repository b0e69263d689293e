use serde::{Deserialize, Serialize};

use super::character::Gender;
use super::group::{
    default_probability, default_select_count, default_select_prob, default_true, SelectionMode,
    TagGroup,
};

/// Where a category's resolved tokens are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Into each character's own prompt, resolved independently per slot.
    Character,
    /// Into the shared main prompt.
    #[default]
    Global,
    /// Applies to the whole scene. Resolved once and written to the main
    /// prompt; gender restriction matches against every character.
    All,
}

/// A top-level, independently gated collection of tag groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomCategory {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Stable key, also used for the category's sequence position.
    pub key: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_probability")]
    pub probability: f64,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default = "all_groups")]
    pub group_selection_mode: SelectionMode,
    #[serde(default = "default_select_count")]
    pub group_select_count: usize,
    #[serde(default = "default_select_prob")]
    pub group_select_prob: f64,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default)]
    pub gender_restriction_enabled: bool,
    #[serde(default)]
    pub applicable_genders: Vec<Gender>,
    #[serde(default)]
    pub groups: Vec<TagGroup>,
}

fn all_groups() -> SelectionMode {
    SelectionMode::All
}

impl RandomCategory {
    pub fn new(key: &str, scope: Scope, groups: Vec<TagGroup>) -> Self {
        Self {
            id: key.to_string(),
            name: key.to_string(),
            key: key.to_string(),
            enabled: true,
            probability: 1.0,
            scope,
            group_selection_mode: SelectionMode::All,
            group_select_count: 1,
            group_select_prob: 0.5,
            shuffle: false,
            gender_restriction_enabled: false,
            applicable_genders: Vec::new(),
            groups,
        }
    }

    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    pub fn with_group_mode(mut self, mode: SelectionMode, count: usize) -> Self {
        self.group_selection_mode = mode;
        self.group_select_count = count;
        self
    }

    pub fn with_group_select_prob(mut self, select_prob: f64) -> Self {
        self.group_select_prob = select_prob;
        self
    }

    pub fn restricted_to(mut self, genders: &[Gender]) -> Self {
        self.gender_restriction_enabled = true;
        self.applicable_genders = genders.to_vec();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether a character of `gender` may receive this category's tokens.
    pub fn applies_to(&self, gender: Gender) -> bool {
        !self.gender_restriction_enabled || self.applicable_genders.contains(&gender)
    }

    pub fn sequence_key(&self) -> String {
        format!("category:{}", self.key)
    }
}
