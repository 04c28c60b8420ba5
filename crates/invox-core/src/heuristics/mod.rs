//! Heuristic text parsing: ordered regex cascades per canonical field.

mod parser;
pub mod patterns;

pub use parser::{
    HeuristicFields, HeuristicParser, TIER_GENERIC, TIER_KNOWN_ENTITY, TIER_LABELED,
};
