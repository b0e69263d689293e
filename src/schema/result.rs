use serde::{Deserialize, Serialize};

use super::character::Gender;

/// Per-character sub-prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterResult {
    pub prompt: String,
    pub gender: Gender,
}

/// The structured output of one generation call.
///
/// `characters` holds one entry per resolved character when the target
/// model takes character slots; it is empty for legacy single-prompt models
/// and for scenes with no humans.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GenerationResult {
    pub main_prompt: String,
    pub characters: Vec<CharacterResult>,
    pub no_humans: bool,
}

impl GenerationResult {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Main prompt followed by every character prompt, in slot order.
    pub fn flattened_prompt(&self) -> String {
        std::iter::once(self.main_prompt.as_str())
            .chain(self.characters.iter().map(|c| c.prompt.as_str()))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_shape() {
        let result = GenerationResult {
            main_prompt: "2girls, outdoors".to_string(),
            characters: vec![CharacterResult {
                prompt: "girl, red hair".to_string(),
                gender: Gender::Female,
            }],
            no_humans: false,
        };
        let json = result.to_json().unwrap();
        assert!(json.contains(r#""main_prompt":"2girls, outdoors""#));
        assert!(json.contains(r#""gender":"female""#));
        assert!(json.contains(r#""no_humans":false"#));
    }

    #[test]
    fn flattened_prompt_skips_empty_parts() {
        let result = GenerationResult {
            main_prompt: String::new(),
            characters: vec![
                CharacterResult {
                    prompt: "girl".to_string(),
                    gender: Gender::Female,
                },
                CharacterResult {
                    prompt: "boy, smile".to_string(),
                    gender: Gender::Male,
                },
            ],
            no_humans: false,
        };
        assert_eq!(result.flattened_prompt(), "girl, boy, smile");
        assert_eq!(GenerationResult::default().flattened_prompt(), "");
    }
}
