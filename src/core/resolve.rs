/// Tree resolution — categories to groups to tokens.

use rand::rngs::StdRng;
use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::core::bracket::{apply_brackets, strip_brackets};
use crate::core::characters::{CharacterAssignment, CharacterSlot};
use crate::core::pool::TagPoolProvider;
use crate::core::selector::{
    roll, select, select_tags, Candidate, ConditionPolicy, SelectionSpec, TagContext,
};
use crate::core::sequence::{SequenceStore, Sequencer};
use crate::schema::category::{RandomCategory, Scope};
use crate::schema::group::{SourceType, TagGroup};
use crate::schema::tag::WeightedTag;

/// What has been decided so far in one generation call: the cast, and the
/// tokens each prompt buffer already holds (for conditional tags).
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub cast: Option<CharacterAssignment>,
    pub global_context: TagContext,
    pub slot_contexts: Vec<TagContext>,
}

impl Scene {
    pub fn new(cast: Option<CharacterAssignment>) -> Self {
        let mut global_context = TagContext::default();
        if let Some(ref cast) = cast {
            global_context.extend(
                cast.main_tag
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            );
        }

        let slot_contexts = cast
            .iter()
            .flat_map(|c| c.slots.iter())
            .map(|slot| {
                let mut ctx = global_context.clone();
                ctx.insert(slot.gender.as_str().to_string());
                if !slot.tag.is_empty() {
                    ctx.insert(slot.tag.clone());
                }
                ctx
            })
            .collect();

        Self {
            cast,
            global_context,
            slot_contexts,
        }
    }

    pub fn slots(&self) -> &[CharacterSlot] {
        match self.cast {
            Some(ref cast) => cast.slots.as_slice(),
            None => &[],
        }
    }

    /// Make a category's output visible to later conditional tags. Main
    /// prompt tokens are visible to every character too.
    pub fn record(&mut self, output: &CategoryOutput) {
        for token in &output.global {
            let bare = strip_brackets(token).to_string();
            for ctx in &mut self.slot_contexts {
                ctx.insert(bare.clone());
            }
            self.global_context.insert(bare);
        }
        for (index, tokens) in &output.per_character {
            if let Some(ctx) = self.slot_contexts.get_mut(*index) {
                ctx.extend(tokens.iter().map(|t| strip_brackets(t).to_string()));
            }
        }
    }
}

/// Tokens one category contributes, already bracket-weighted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryOutput {
    pub global: Vec<String>,
    /// Keyed by slot index; slots that received nothing are absent.
    pub per_character: BTreeMap<usize, Vec<String>>,
}

impl CategoryOutput {
    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.per_character.is_empty()
    }
}

/// A group offered to a selection over groups. Groups carry no weight of
/// their own, so weighted draws between them are uniform.
struct GroupCandidate<'a> {
    group: &'a TagGroup,
    chance: f64,
}

impl Candidate for GroupCandidate<'_> {
    fn weight(&self) -> u32 {
        1
    }

    fn inclusion_chance(&self) -> f64 {
        self.chance
    }
}

/// Walks the configuration tree with the collaborators of one generator.
pub struct Resolver<'a> {
    pub pools: &'a dyn TagPoolProvider,
    pub sequences: &'a dyn SequenceStore,
    pub policy: ConditionPolicy,
}

impl<'a> Resolver<'a> {
    /// Resolve one category against the scene.
    ///
    /// Global and scene-wide categories roll their gate once; character
    /// categories roll it again for every slot they apply to.
    pub fn resolve_category(
        &self,
        category: &RandomCategory,
        scene: &Scene,
        rng: &mut StdRng,
    ) -> CategoryOutput {
        let mut output = CategoryOutput::default();
        if !category.enabled {
            return output;
        }

        match category.scope {
            Scope::Global | Scope::All => {
                if category.gender_restriction_enabled
                    && !scene
                        .cast
                        .as_ref()
                        .is_some_and(|c| c.has_any(&category.applicable_genders))
                {
                    tracing::trace!(category = %category.key, "no character matches restriction");
                    return output;
                }
                if !roll(rng, category.probability) {
                    tracing::trace!(category = %category.key, "category gate failed");
                    return output;
                }
                output.global = self.resolve_category_groups(category, &scene.global_context, rng);
            }
            Scope::Character => {
                for slot in scene.slots() {
                    if !category.applies_to(slot.gender) {
                        continue;
                    }
                    if !roll(rng, category.probability) {
                        tracing::trace!(category = %category.key, slot = slot.index, "category gate failed");
                        continue;
                    }
                    let context = scene
                        .slot_contexts
                        .get(slot.index)
                        .unwrap_or(&scene.global_context);
                    let tokens = self.resolve_category_groups(category, context, rng);
                    if !tokens.is_empty() {
                        output.per_character.insert(slot.index, tokens);
                    }
                }
            }
        }

        output
    }

    fn resolve_category_groups(
        &self,
        category: &RandomCategory,
        context: &TagContext,
        rng: &mut StdRng,
    ) -> Vec<String> {
        let spec = SelectionSpec::new(
            category.group_selection_mode,
            category.group_select_count,
            category.shuffle,
        );
        self.resolve_groups(
            &category.groups,
            &spec,
            category.group_select_prob,
            &Sequencer::new(self.sequences, category.sequence_key()),
            context,
            rng,
        )
    }

    /// Select among `groups` and concatenate the tokens of each selected
    /// group, in selection order.
    pub fn resolve_groups(
        &self,
        groups: &[TagGroup],
        spec: &SelectionSpec,
        select_prob: f64,
        sequencer: &Sequencer<'_>,
        context: &TagContext,
        rng: &mut StdRng,
    ) -> Vec<String> {
        let candidates: Vec<GroupCandidate<'_>> = groups
            .iter()
            .filter(|g| g.enabled)
            .map(|group| GroupCandidate {
                group,
                chance: select_prob,
            })
            .collect();
        let pool: Vec<&GroupCandidate<'_>> = candidates.iter().collect();

        let mut tokens = Vec::new();
        for candidate in select(&pool, spec, sequencer, rng) {
            tokens.extend(self.resolve_group(candidate.group, context, rng));
        }
        tokens
    }

    /// Resolve a single group to bracket-weighted tokens.
    ///
    /// Disabled groups, failed gates and empty pools all yield nothing.
    pub fn resolve_group(
        &self,
        group: &TagGroup,
        context: &TagContext,
        rng: &mut StdRng,
    ) -> Vec<String> {
        if !group.enabled {
            return Vec::new();
        }
        if !roll(rng, group.probability) {
            tracing::trace!(group = %group.id, "group gate failed");
            return Vec::new();
        }

        let spec = SelectionSpec::new(group.selection_mode, group.select_count, group.shuffle);
        let sequencer = Sequencer::new(self.sequences, group.sequence_key());

        let tokens = if group.is_container() {
            self.resolve_groups(
                &group.children,
                &spec,
                group.select_prob,
                &sequencer,
                context,
                rng,
            )
        } else {
            let pool = self.pool_for(group);
            select_tags(&pool, &spec, context, self.policy, &sequencer, rng)
        };

        apply_brackets(tokens, group.bracket_min, group.bracket_max, rng)
    }

    fn pool_for<'g>(&self, group: &'g TagGroup) -> Cow<'g, [WeightedTag]> {
        if group.source_type == SourceType::Custom {
            return Cow::Borrowed(group.tags.as_slice());
        }
        let Some(source_id) = group.source_id.as_deref() else {
            return Cow::Owned(Vec::new());
        };
        match self.pools.get_pool(group.source_type, source_id) {
            Ok(tags) => Cow::Owned(tags),
            Err(e) => {
                tracing::warn!(
                    group = %group.id,
                    source = group.source_type.as_str(),
                    id = source_id,
                    error = %e,
                    "pool lookup failed, treating as empty"
                );
                Cow::Owned(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pool::{NoPools, PoolError, StaticPoolProvider};
    use crate::core::sequence::MemorySequenceStore;
    use crate::schema::character::Gender;
    use crate::schema::group::SelectionMode;
    use rand::SeedableRng;

    struct FailingPools;

    impl TagPoolProvider for FailingPools {
        fn get_pool(&self, _: SourceType, id: &str) -> Result<Vec<WeightedTag>, PoolError> {
            Err(PoolError::Unavailable(id.to_string()))
        }
    }

    fn resolve(group: &TagGroup, pools: &dyn TagPoolProvider, seed: u64) -> Vec<String> {
        let store = MemorySequenceStore::new();
        let resolver = Resolver {
            pools,
            sequences: &store,
            policy: ConditionPolicy::All,
        };
        let mut rng = StdRng::seed_from_u64(seed);
        resolver.resolve_group(group, &TagContext::default(), &mut rng)
    }

    fn duo() -> CharacterAssignment {
        CharacterAssignment {
            count: 2,
            main_tag: "1girl, 1boy".to_string(),
            slots: vec![
                CharacterSlot {
                    index: 0,
                    gender: Gender::Female,
                    tag: "girl".to_string(),
                },
                CharacterSlot {
                    index: 1,
                    gender: Gender::Male,
                    tag: "boy".to_string(),
                },
            ],
        }
    }

    #[test]
    fn disabled_and_zero_probability_groups_yield_nothing() {
        let tags = WeightedTag::uniform(&["a"]);
        for seed in 0..100 {
            assert!(resolve(&TagGroup::leaf("g", tags.clone()).disabled(), &NoPools, seed).is_empty());
            assert!(resolve(
                &TagGroup::leaf("g", tags.clone()).with_probability(0.0),
                &NoPools,
                seed
            )
            .is_empty());
        }
    }

    #[test]
    fn container_concatenates_children() {
        let group = TagGroup::container(
            "outfit",
            vec![
                TagGroup::leaf("top", WeightedTag::uniform(&["shirt"])),
                TagGroup::leaf("bottom", WeightedTag::uniform(&["skirt"])),
            ],
        )
        .with_mode(SelectionMode::All, 1);
        assert_eq!(resolve(&group, &NoPools, 1), vec!["shirt", "skirt"]);
    }

    #[test]
    fn container_brackets_wrap_child_output() {
        let group = TagGroup::container(
            "outer",
            vec![TagGroup::leaf("inner", WeightedTag::uniform(&["hat"])).with_brackets(1, 1)],
        )
        .with_mode(SelectionMode::All, 1)
        .with_brackets(-1, -1);
        assert_eq!(resolve(&group, &NoPools, 1), vec!["[{hat}]"]);
    }

    #[test]
    fn container_single_mode_picks_one_child() {
        let group = TagGroup::container(
            "either",
            vec![
                TagGroup::leaf("a", WeightedTag::uniform(&["a"])),
                TagGroup::leaf("b", WeightedTag::uniform(&["b"])),
            ],
        );
        for seed in 0..20 {
            assert_eq!(resolve(&group, &NoPools, seed).len(), 1);
        }
    }

    #[test]
    fn builtin_pools_resolve_through_provider() {
        let pools = StaticPoolProvider::new().with_pool(
            SourceType::Builtin,
            "expression",
            WeightedTag::uniform(&["smile"]),
        );
        let group = TagGroup::pool("face", SourceType::Builtin, "expression");
        assert_eq!(resolve(&group, &pools, 0), vec!["smile"]);
    }

    #[test]
    fn provider_failure_is_an_empty_pool() {
        let group = TagGroup::pool("face", SourceType::DynamicPool, "remote");
        assert!(resolve(&group, &FailingPools, 0).is_empty());
    }

    #[test]
    fn character_scope_respects_gender_restriction() {
        let category = RandomCategory::new(
            "skirt",
            Scope::Character,
            vec![TagGroup::leaf("g", WeightedTag::uniform(&["skirt"]))],
        )
        .restricted_to(&[Gender::Female]);
        let scene = Scene::new(Some(duo()));
        let store = MemorySequenceStore::new();
        let resolver = Resolver {
            pools: &NoPools,
            sequences: &store,
            policy: ConditionPolicy::All,
        };
        let mut rng = StdRng::seed_from_u64(0);
        let output = resolver.resolve_category(&category, &scene, &mut rng);
        assert!(output.global.is_empty());
        assert_eq!(output.per_character.len(), 1);
        assert_eq!(output.per_character[&0], vec!["skirt"]);
    }

    #[test]
    fn global_restriction_needs_a_matching_character() {
        let category = RandomCategory::new(
            "yuri",
            Scope::Global,
            vec![TagGroup::leaf("g", WeightedTag::uniform(&["x"]))],
        )
        .restricted_to(&[Gender::Other]);
        let store = MemorySequenceStore::new();
        let resolver = Resolver {
            pools: &NoPools,
            sequences: &store,
            policy: ConditionPolicy::All,
        };
        let mut rng = StdRng::seed_from_u64(0);
        assert!(resolver
            .resolve_category(&category, &Scene::new(Some(duo())), &mut rng)
            .is_empty());
        assert!(resolver
            .resolve_category(&category, &Scene::new(None), &mut rng)
            .is_empty());
    }

    fn resolve_in(category: &RandomCategory, scene: &Scene, seed: u64) -> CategoryOutput {
        let store = MemorySequenceStore::new();
        let resolver = Resolver {
            pools: &NoPools,
            sequences: &store,
            policy: ConditionPolicy::All,
        };
        let mut rng = StdRng::seed_from_u64(seed);
        resolver.resolve_category(category, scene, &mut rng)
    }

    fn three_groups() -> Vec<TagGroup> {
        vec![
            TagGroup::leaf("x", WeightedTag::uniform(&["x"])),
            TagGroup::leaf("y", WeightedTag::uniform(&["y"])),
            TagGroup::leaf("z", WeightedTag::uniform(&["z"])),
        ]
    }

    #[test]
    fn category_single_mode_picks_one_group() {
        let category = RandomCategory::new("pick", Scope::Global, three_groups())
            .with_group_mode(SelectionMode::Single, 1);
        let mut seen = std::collections::BTreeSet::new();
        for seed in 0..60 {
            let output = resolve_in(&category, &Scene::new(None), seed);
            assert_eq!(output.global.len(), 1);
            seen.insert(output.global[0].clone());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn category_multiple_num_picks_distinct_groups() {
        let category = RandomCategory::new("pair", Scope::Global, three_groups())
            .with_group_mode(SelectionMode::MultipleNum, 2);
        for seed in 0..30 {
            let output = resolve_in(&category, &Scene::new(None), seed);
            assert_eq!(output.global.len(), 2);
            assert_ne!(output.global[0], output.global[1]);
        }
    }

    #[test]
    fn category_multiple_prob_uses_group_select_prob() {
        let never = RandomCategory::new("never", Scope::Global, three_groups())
            .with_group_mode(SelectionMode::MultipleProb, 1)
            .with_group_select_prob(0.0);
        let always = RandomCategory::new("always", Scope::Global, three_groups())
            .with_group_mode(SelectionMode::MultipleProb, 1)
            .with_group_select_prob(1.0);
        for seed in 0..30 {
            assert!(resolve_in(&never, &Scene::new(None), seed).is_empty());
            assert_eq!(resolve_in(&always, &Scene::new(None), seed).global, vec!["x", "y", "z"]);
        }
    }

    #[test]
    fn container_multiple_prob_uses_select_prob() {
        let never = TagGroup::container("none", three_groups())
            .with_mode(SelectionMode::MultipleProb, 1)
            .with_select_prob(0.0);
        let always = TagGroup::container("every", three_groups())
            .with_mode(SelectionMode::MultipleProb, 1)
            .with_select_prob(1.0);
        for seed in 0..30 {
            assert!(resolve(&never, &NoPools, seed).is_empty());
            assert_eq!(resolve(&always, &NoPools, seed), vec!["x", "y", "z"]);
        }
    }

    #[test]
    fn character_gate_rolls_per_slot() {
        let category = RandomCategory::new(
            "hat",
            Scope::Character,
            vec![TagGroup::leaf("g", WeightedTag::uniform(&["hat"]))],
        )
        .with_probability(0.5);
        let scene = Scene::new(Some(duo()));
        let outcomes: Vec<Vec<usize>> = (0..100)
            .map(|seed| {
                resolve_in(&category, &scene, seed)
                    .per_character
                    .keys()
                    .copied()
                    .collect()
            })
            .collect();
        assert!(outcomes.iter().any(|o| o == &vec![0usize]));
        assert!(outcomes.iter().any(|o| o == &vec![1usize]));
        assert!(outcomes.iter().any(|o| o == &vec![0usize, 1]));
        assert!(outcomes.iter().any(|o| o.is_empty()));
    }

    #[test]
    fn scene_wide_restriction_needs_a_matching_character() {
        let male_only = RandomCategory::new(
            "stubble",
            Scope::All,
            vec![TagGroup::leaf("g", WeightedTag::uniform(&["stubble"]))],
        )
        .restricted_to(&[Gender::Male]);
        let output = resolve_in(&male_only, &Scene::new(Some(duo())), 0);
        assert_eq!(output.global, vec!["stubble"]);
        assert!(output.per_character.is_empty());

        let other_only = male_only.clone().restricted_to(&[Gender::Other]);
        assert!(resolve_in(&other_only, &Scene::new(Some(duo())), 0).is_empty());
        assert!(resolve_in(&male_only, &Scene::new(None), 0).is_empty());
    }

    #[test]
    fn scene_contexts_feed_conditions() {
        let mut scene = Scene::new(Some(duo()));
        assert!(scene.global_context.contains("1girl"));
        assert!(scene.global_context.contains("1boy"));
        assert!(scene.slot_contexts[0].contains("female"));
        assert!(scene.slot_contexts[1].contains("boy"));

        let mut output = CategoryOutput::default();
        output.global.push("{outdoors}".to_string());
        output.per_character.insert(1, vec!["[beard]".to_string()]);
        scene.record(&output);
        assert!(scene.slot_contexts[0].contains("outdoors"));
        assert!(scene.slot_contexts[1].contains("beard"));
        assert!(!scene.global_context.contains("beard"));
    }
}
