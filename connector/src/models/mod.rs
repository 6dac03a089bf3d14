pub mod entity;
pub mod relationship;

pub use entity::{entity_key, AttributeValue, Entity};
pub use relationship::{relationship_key, Relationship};

/// Anything addressable by a stable, deterministic key. The diff engine
/// relies on this being a pure function of provider identity.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Entity {
    fn key(&self) -> &str {
        &self.key
    }
}

impl Keyed for Relationship {
    fn key(&self) -> &str {
        &self.key
    }
}
