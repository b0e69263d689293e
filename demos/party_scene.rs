/// Party Scene example — builds a preset in code and prints a few prompts.
///
/// Run with: cargo run --example party_scene

use prompt_engine::core::generator::PromptGenerator;
use prompt_engine::core::pool::StaticPoolProvider;
use prompt_engine::schema::category::{RandomCategory, Scope};
use prompt_engine::schema::character::{CharacterCountConfig, Gender};
use prompt_engine::schema::group::{SelectionMode, SourceType, TagGroup};
use prompt_engine::schema::preset::Preset;
use prompt_engine::schema::tag::WeightedTag;

fn main() {
    // --- Built-in tag library ---
    let pools = StaticPoolProvider::new().with_pool(
        SourceType::Builtin,
        "expression",
        vec![
            WeightedTag::new("smile", 5),
            WeightedTag::new("laughing", 3),
            WeightedTag::new("blush", 2),
            WeightedTag::new(":o", 1),
        ],
    );

    // --- Preset ---
    let preset = Preset::new(
        "party",
        vec![
            RandomCategory::new(
                "quality",
                Scope::Global,
                vec![TagGroup::leaf("quality", WeightedTag::uniform(&["masterpiece", "best quality"]))
                    .with_mode(SelectionMode::All, 1)
                    .with_brackets(1, 2)],
            ),
            RandomCategory::new(
                "venue",
                Scope::Global,
                vec![TagGroup::leaf(
                    "venue",
                    vec![
                        WeightedTag::new("ballroom", 3),
                        WeightedTag::new("rooftop", 2),
                        WeightedTag::new("garden party", 1),
                    ],
                )],
            ),
            RandomCategory::new(
                "face",
                Scope::Character,
                vec![TagGroup::pool("expression", SourceType::Builtin, "expression")],
            ),
            RandomCategory::new(
                "attire",
                Scope::Character,
                vec![TagGroup::container(
                    "attire",
                    vec![
                        TagGroup::leaf("dress", WeightedTag::uniform(&["evening gown", "cocktail dress"])),
                        TagGroup::leaf("suit", WeightedTag::uniform(&["tuxedo", "suit"])),
                    ],
                )],
            )
            .restricted_to(&[Gender::Female, Gender::Male]),
            RandomCategory::new(
                "accessory",
                Scope::Character,
                vec![TagGroup::leaf("jewelry", WeightedTag::uniform(&["necklace", "earrings"]))
                    .with_brackets(-1, 0)],
            )
            .with_probability(0.4)
            .restricted_to(&[Gender::Female]),
        ],
    )
    .with_characters(CharacterCountConfig::nai_default());

    let generator = PromptGenerator::builder().pools(pools).build();

    // --- Generate ---
    for seed in 2026..2031 {
        let result = generator
            .generate(&preset, seed, true)
            .expect("Failed to generate prompt");

        println!("=== Seed {} ===", seed);
        println!("main: {}", result.main_prompt);
        for (i, character) in result.characters.iter().enumerate() {
            println!("  char {} [{}]: {}", i + 1, character.gender.as_str(), character.prompt);
        }

        let legacy = generator
            .generate(&preset, seed, false)
            .expect("Failed to generate prompt");
        println!("legacy: {}\n", legacy.main_prompt);
    }
}
