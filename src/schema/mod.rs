pub mod category;
pub mod character;
pub mod group;
pub mod preset;
pub mod result;
pub mod tag;
