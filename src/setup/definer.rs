//! Pluggable component-definition records.
//!
//! The core never hard-codes definer-specific fields: a [`ComponentDefiner`]
//! owns its wire layout and is looked up by its type token.

use anyhow::Result;

use crate::scene::{NodeId, Scene};

/// One kind of per-object annotation record.
pub trait ComponentDefiner {
    /// Token written as the record's second field.
    fn type_token(&self) -> &str;

    /// True when the node carries this definer's component.
    fn applies(&self, scene: &Scene, node: NodeId) -> bool;

    /// Fields following the type token on export.
    fn serialize(&self, scene: &Scene, node: NodeId) -> Vec<String>;

    /// Apply a record's fields to the node.
    fn deserialize(&self, fields: &[String], scene: &mut Scene, node: NodeId) -> Result<()>;
}

/// Definers resolved by type token, first registration wins.
#[derive(Default)]
pub struct DefinerRegistry {
    definers: Vec<Box<dyn ComponentDefiner>>,
}

impl DefinerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definer: impl ComponentDefiner + 'static) {
        self.definers.push(Box::new(definer));
    }

    pub fn find(&self, token: &str) -> Option<&dyn ComponentDefiner> {
        self.definers
            .iter()
            .map(Box::as_ref)
            .find(|definer| definer.type_token().eq_ignore_ascii_case(token))
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ComponentDefiner> {
        self.definers.iter().map(Box::as_ref)
    }

    pub fn is_empty(&self) -> bool {
        self.definers.is_empty()
    }
}
