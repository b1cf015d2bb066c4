//! Identity module - pseudonyms derived from opaque seeds.
//!
//! # Module Structure
//!
//! - `tables` - Versioned animal and gradient lookup tables
//! - `generator` - Pure seed-to-name derivation

mod generator;
mod tables;

pub use generator::{
    animal_for, display_name, gradient_for, participant_seed, suffix_for, SUFFIX_MODULUS,
};
pub use tables::{GradientColor, ANIMALS, ANIMAL_COUNT, GRADIENT_COLORS};
