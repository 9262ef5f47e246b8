//! `springrig` converts a character rig's spring bone configuration to and
//! from a compact sectioned text format, and reconciles that configuration
//! against a live, named-node scene graph.

pub mod diag;
pub mod scene;
pub mod setup;
