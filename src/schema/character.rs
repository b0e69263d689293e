use serde::{Deserialize, Serialize};

use super::group::default_true;

/// Gender assigned to a character slot. Drives gender-restricted categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Female,
    Male,
    Other,
}

impl Gender {
    /// Context key added for a slot of this gender, usable in tag conditions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Female => "female",
            Self::Male => "male",
            Self::Other => "other",
        }
    }
}

/// Seed tag for one character slot, e.g. `girl` for a female slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterSlotTag {
    pub gender: Gender,
    pub tag: String,
}

impl CharacterSlotTag {
    pub fn new(gender: Gender, tag: &str) -> Self {
        Self {
            gender,
            tag: tag.to_string(),
        }
    }
}

/// One way of casting a given character count: the fragment written to
/// the main prompt plus a seed tag per slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterTagOption {
    pub id: String,
    /// Main-prompt fragment, e.g. `2girls` or `1girl, 1boy`.
    pub main_tag: String,
    #[serde(default = "default_option_weight")]
    pub weight: u32,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub slots: Vec<CharacterSlotTag>,
}

fn default_option_weight() -> u32 {
    1
}

impl CharacterTagOption {
    pub fn new(id: &str, main_tag: &str, weight: u32, slots: Vec<CharacterSlotTag>) -> Self {
        Self {
            id: id.to_string(),
            main_tag: main_tag.to_string(),
            weight,
            enabled: true,
            slots,
        }
    }
}

/// All the casting variants for one character count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterCountCategory {
    pub id: String,
    pub count: usize,
    pub weight: u32,
    #[serde(default)]
    pub tag_options: Vec<CharacterTagOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CharacterCountConfig {
    #[serde(default)]
    pub categories: Vec<CharacterCountCategory>,
}

impl CharacterCountConfig {
    /// The stock configuration: mostly solo scenes, some duos, the
    /// occasional trio and a small chance of no humans at all.
    pub fn nai_default() -> Self {
        use Gender::{Female, Male};
        let girl = || CharacterSlotTag::new(Female, "girl");
        let boy = || CharacterSlotTag::new(Male, "boy");

        Self {
            categories: vec![
                CharacterCountCategory {
                    id: "none".to_string(),
                    count: 0,
                    weight: 5,
                    tag_options: vec![CharacterTagOption::new(
                        "no_humans",
                        "no humans",
                        1,
                        Vec::new(),
                    )],
                },
                CharacterCountCategory {
                    id: "solo".to_string(),
                    count: 1,
                    weight: 70,
                    tag_options: vec![
                        CharacterTagOption::new("1girl", "1girl", 70, vec![girl()]),
                        CharacterTagOption::new("1boy", "1boy", 30, vec![boy()]),
                    ],
                },
                CharacterCountCategory {
                    id: "duo".to_string(),
                    count: 2,
                    weight: 20,
                    tag_options: vec![
                        CharacterTagOption::new("2girls", "2girls", 50, vec![girl(), girl()]),
                        CharacterTagOption::new("1girl_1boy", "1girl, 1boy", 35, vec![girl(), boy()]),
                        CharacterTagOption::new("2boys", "2boys", 15, vec![boy(), boy()]),
                    ],
                },
                CharacterCountCategory {
                    id: "trio".to_string(),
                    count: 3,
                    weight: 5,
                    tag_options: vec![
                        CharacterTagOption::new("3girls", "3girls", 50, vec![girl(), girl(), girl()]),
                        CharacterTagOption::new(
                            "2girls_1boy",
                            "2girls, 1boy",
                            30,
                            vec![girl(), girl(), boy()],
                        ),
                        CharacterTagOption::new(
                            "1girl_2boys",
                            "1girl, 2boys",
                            20,
                            vec![girl(), boy(), boy()],
                        ),
                    ],
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nai_default_slot_counts_match() {
        let config = CharacterCountConfig::nai_default();
        for category in &config.categories {
            for option in &category.tag_options {
                assert_eq!(
                    option.slots.len(),
                    category.count,
                    "option '{}' of '{}'",
                    option.id,
                    category.id
                );
            }
        }
    }

    #[test]
    fn gender_keys() {
        assert_eq!(Gender::Female.as_str(), "female");
        assert_eq!(Gender::Male.as_str(), "male");
        assert_eq!(Gender::Other.as_str(), "other");
    }

    #[test]
    fn ron_option_defaults() {
        let option: CharacterTagOption = ron::from_str(
            r#"(id: "solo", main_tag: "1girl", slots: [(gender: female, tag: "girl")])"#,
        )
        .unwrap();
        assert_eq!(option.weight, 1);
        assert!(option.enabled);
        assert_eq!(option.slots[0].gender, Gender::Female);
    }
}
