//! Prompt Engine — seeded, weighted tag-prompt generation.
//!
//! Turns a user-authored tree of categories and tag groups into a main
//! prompt plus per-character sub-prompts, through a sequence of weighted,
//! conditional and probabilistic draws. The same preset and seed always
//! produce the same prompt.

pub mod core;
pub mod schema;
