pub mod bracket;
pub mod characters;
pub mod generator;
pub mod pool;
pub mod resolve;
pub mod selector;
pub mod sequence;
