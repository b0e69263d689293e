/// Character assignment — how many characters a scene has and who they are.

use rand::rngs::StdRng;

use crate::core::selector::pick_weighted;
use crate::schema::character::{
    CharacterCountCategory, CharacterCountConfig, CharacterTagOption, Gender,
};

/// One resolved character slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterSlot {
    pub index: usize,
    pub gender: Gender,
    /// Seed tag opening the character's own prompt.
    pub tag: String,
}

/// The cast drawn for one generation call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CharacterAssignment {
    pub count: usize,
    /// Fragment for the main prompt, e.g. `1girl, 1boy`. May be empty.
    pub main_tag: String,
    pub slots: Vec<CharacterSlot>,
}

impl CharacterAssignment {
    pub fn no_humans(&self) -> bool {
        self.count == 0
    }

    /// Whether any character in the scene has one of `genders`.
    pub fn has_any(&self, genders: &[Gender]) -> bool {
        self.slots.iter().any(|s| genders.contains(&s.gender))
    }
}

fn drawable_options(category: &CharacterCountCategory) -> Vec<&CharacterTagOption> {
    category
        .tag_options
        .iter()
        .filter(|o| o.enabled && o.weight > 0)
        .collect()
}

/// Draw a character count, then one casting option for that count.
///
/// Counts above zero are only eligible when they have a drawable option.
/// Returns `None` when nothing can be drawn, which callers treat as a
/// preset without characters.
pub fn resolve_characters(
    config: &CharacterCountConfig,
    rng: &mut StdRng,
) -> Option<CharacterAssignment> {
    let eligible: Vec<&CharacterCountCategory> = config
        .categories
        .iter()
        .filter(|c| c.count == 0 || !drawable_options(c).is_empty())
        .collect();

    let weights: Vec<u32> = eligible.iter().map(|c| c.weight).collect();
    let category = eligible[pick_weighted(&weights, rng)?];

    let options = drawable_options(category);
    let option_weights: Vec<u32> = options.iter().map(|o| o.weight).collect();
    let assignment = match pick_weighted(&option_weights, rng) {
        Some(i) => {
            let option = options[i];
            CharacterAssignment {
                count: category.count,
                main_tag: option.main_tag.clone(),
                slots: option
                    .slots
                    .iter()
                    .enumerate()
                    .map(|(index, slot)| CharacterSlot {
                        index,
                        gender: slot.gender,
                        tag: slot.tag.clone(),
                    })
                    .collect(),
            }
        }
        // Only reachable for a zero count without options.
        None => CharacterAssignment::default(),
    };

    tracing::debug!(
        count = assignment.count,
        main_tag = %assignment.main_tag,
        "resolved characters"
    );
    Some(assignment)
}
