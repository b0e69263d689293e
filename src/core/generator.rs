/// The prompt generator: preset + seed → structured prompt.
///
/// Wires together character assignment, category resolution and prompt
/// assembly over a single seeded RNG stream.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use thiserror::Error;

use crate::core::characters::resolve_characters;
use crate::core::pool::{NoPools, TagPoolProvider};
use crate::core::resolve::{Resolver, Scene};
use crate::core::selector::ConditionPolicy;
use crate::core::sequence::{MemorySequenceStore, SequenceStore};
use crate::schema::preset::{ConfigError, Preset};
use crate::schema::result::{CharacterResult, GenerationResult};

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Token separator in every rendered prompt.
pub const SEPARATOR: &str = ", ";

/// The top-level generator. Built via `PromptGenerator::builder()`.
///
/// A generator holds no per-call state, so it can serve concurrent calls;
/// each call owns its RNG stream. The sequence store is the only shared
/// mutable resource.
pub struct PromptGenerator {
    pools: Box<dyn TagPoolProvider>,
    sequences: Arc<dyn SequenceStore>,
    policy: ConditionPolicy,
}

/// Builder for constructing a `PromptGenerator`.
pub struct PromptGeneratorBuilder {
    pools: Option<Box<dyn TagPoolProvider>>,
    sequences: Option<Arc<dyn SequenceStore>>,
    policy: ConditionPolicy,
}

impl Default for PromptGenerator {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl PromptGenerator {
    pub fn builder() -> PromptGeneratorBuilder {
        PromptGeneratorBuilder {
            pools: None,
            sequences: None,
            policy: ConditionPolicy::default(),
        }
    }

    pub fn condition_policy(&self) -> ConditionPolicy {
        self.policy
    }

    /// Generate one prompt.
    ///
    /// With `character_slots`, each character gets its own sub-prompt;
    /// otherwise character tokens are folded into the main prompt after
    /// the scene tokens. Only malformed configuration fails the call.
    pub fn generate(
        &self,
        preset: &Preset,
        seed: u64,
        character_slots: bool,
    ) -> Result<GenerationResult, GenerateError> {
        preset.validate()?;
        Ok(self.generate_validated(preset, seed, character_slots))
    }

    /// Generate `count` results for consecutive seeds starting at `base_seed`.
    pub fn generate_variants(
        &self,
        preset: &Preset,
        base_seed: u64,
        count: usize,
        character_slots: bool,
    ) -> Result<Vec<GenerationResult>, GenerateError> {
        preset.validate()?;
        Ok((0..count as u64)
            .map(|i| self.generate_validated(preset, base_seed.wrapping_add(i), character_slots))
            .collect())
    }

    fn generate_validated(
        &self,
        preset: &Preset,
        seed: u64,
        character_slots: bool,
    ) -> GenerationResult {
        let mut rng = StdRng::seed_from_u64(seed);

        // 1. Cast the scene
        let cast = preset
            .character_count
            .as_ref()
            .and_then(|config| resolve_characters(config, &mut rng));
        let mut scene = Scene::new(cast);

        // 2. Seed the buffers
        let mut main: Vec<String> = Vec::new();
        if let Some(ref cast) = scene.cast {
            if !cast.main_tag.is_empty() {
                main.push(cast.main_tag.clone());
            }
        }
        let mut slot_buffers: Vec<Vec<String>> = scene
            .slots()
            .iter()
            .map(|slot| {
                if slot.tag.is_empty() {
                    Vec::new()
                } else {
                    vec![slot.tag.clone()]
                }
            })
            .collect();

        // 3. Resolve categories in order
        let resolver = Resolver {
            pools: self.pools.as_ref(),
            sequences: self.sequences.as_ref(),
            policy: self.policy,
        };
        for category in &preset.categories {
            let output = resolver.resolve_category(category, &scene, &mut rng);
            scene.record(&output);
            main.extend(output.global);
            for (index, tokens) in output.per_character {
                if let Some(buffer) = slot_buffers.get_mut(index) {
                    buffer.extend(tokens);
                }
            }
        }

        // 4. Render
        let no_humans = scene.cast.as_ref().is_some_and(|c| c.no_humans());
        let characters = if character_slots {
            scene
                .slots()
                .iter()
                .zip(&slot_buffers)
                .map(|(slot, tokens)| CharacterResult {
                    prompt: tokens.join(SEPARATOR),
                    gender: slot.gender,
                })
                .collect()
        } else {
            main.extend(slot_buffers.into_iter().flatten());
            Vec::new()
        };

        let result = GenerationResult {
            main_prompt: main.join(SEPARATOR),
            characters,
            no_humans,
        };
        tracing::debug!(
            preset = %preset.name,
            seed,
            characters = result.characters.len(),
            no_humans,
            "generated prompt"
        );
        result
    }
}

impl PromptGeneratorBuilder {
    /// Provider for built-in and dynamic groups. Defaults to `NoPools`.
    pub fn pools<P: TagPoolProvider + 'static>(mut self, pools: P) -> Self {
        self.pools = Some(Box::new(pools));
        self
    }

    /// Store for `sequential` positions. Defaults to a fresh in-memory store.
    pub fn sequences(mut self, sequences: Arc<dyn SequenceStore>) -> Self {
        self.sequences = Some(sequences);
        self
    }

    pub fn condition_policy(mut self, policy: ConditionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> PromptGenerator {
        PromptGenerator {
            pools: self.pools.unwrap_or_else(|| Box::new(NoPools)),
            sequences: self
                .sequences
                .unwrap_or_else(|| Arc::new(MemorySequenceStore::new())),
            policy: self.policy,
        }
    }
}
