//! Referential validation of deserialized records.
//!
//! Each validator visits every input record and splits the batch into a
//! valid subset and a message list; nothing short-circuits. Name universes
//! thread functionally from one pass to the next: scene object names feed
//! pivot validation, whose valid names feed bone validation; valid
//! dynamics-null names feed collider validation.

use std::collections::HashSet;

use log::debug;

use crate::scene::{NodeId, Scene};

use super::records::{
    BoneRecord, ColliderRecord, ParseMessage, PivotRecord, TransformRecord,
};

/// Case-insensitive set of node names.
#[derive(Debug, Default, Clone)]
pub struct NameSet {
    names: HashSet<String>,
}

impl NameSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name.to_ascii_lowercase())
    }

    /// Returns false if the name was already present.
    pub fn insert(&mut self, name: &str) -> bool {
        self.names.insert(name.to_ascii_lowercase())
    }

    pub fn merge(&mut self, other: &NameSet) {
        self.names.extend(other.names.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for NameSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = NameSet::new();

        for name in iter {
            set.insert(name.as_ref());
        }

        set
    }
}

/// Names of `root` and every live node under it.
pub fn scene_names(scene: &Scene, root: NodeId) -> NameSet {
    let mut names = NameSet::new();
    names.insert(scene.name(root));

    for id in scene.descendants(root) {
        names.insert(scene.name(id));
    }

    names
}

/// First failing condition wins the message; later checks still run.
#[derive(Default)]
struct Failure(Option<String>);

impl Failure {
    fn note(&mut self, message: impl Into<String>) {
        if self.0.is_none() {
            self.0 = Some(message.into());
        }
    }
}

pub fn validate_pivots(
    records: Vec<PivotRecord>,
    objects: &NameSet,
) -> (Vec<PivotRecord>, NameSet, Vec<ParseMessage>) {
    let mut valid = Vec::new();
    let mut names = NameSet::new();
    let mut messages = Vec::new();

    for record in records {
        let mut failure = Failure::default();

        if record.name.is_empty() {
            failure.note("Pivot name is empty");
        } else if names.contains(&record.name) {
            failure.note("Duplicate pivot name");
        }

        if record.parent_name.is_empty() {
            failure.note("Pivot parent name is empty");
        } else if !objects.contains(&record.parent_name) {
            failure.note("Pivot parent not found");
        }

        match failure.0 {
            Some(message) => messages.push(
                ParseMessage::error_with_fields(
                    message,
                    format!("{},{}", record.name, record.parent_name),
                )
                .with_context(record.name.clone()),
            ),
            None => {
                names.insert(&record.name);
                valid.push(record);
            }
        }
    }

    (valid, names, messages)
}

pub fn validate_transforms(
    records: Vec<TransformRecord>,
    objects: &NameSet,
) -> (Vec<TransformRecord>, NameSet, Vec<ParseMessage>) {
    let mut valid = Vec::new();
    let mut names = NameSet::new();
    let mut messages = Vec::new();

    for record in records {
        let mut failure = Failure::default();

        if record.name.is_empty() {
            failure.note("Dynamics null name is empty");
        } else if names.contains(&record.name) {
            failure.note("Duplicate dynamics null name");
        }

        if record.parent_name.is_empty() {
            failure.note("Dynamics null parent name is empty");
        } else if !objects.contains(&record.parent_name) {
            failure.note("Dynamics null parent not found");
        }

        match failure.0 {
            Some(message) => messages.push(
                ParseMessage::error_with_fields(
                    message,
                    format!("{},{}", record.name, record.parent_name),
                )
                .with_context(record.name.clone()),
            ),
            None => {
                names.insert(&record.name);
                valid.push(record);
            }
        }
    }

    (valid, names, messages)
}

/// `parents` is the object universe extended with validated dynamics-null
/// names. Linked renderers must resolve under `renderer_root`.
pub fn validate_colliders(
    records: Vec<ColliderRecord>,
    parents: &NameSet,
    scene: &Scene,
    renderer_root: NodeId,
) -> (Vec<ColliderRecord>, NameSet, Vec<ParseMessage>) {
    let mut valid = Vec::new();
    let mut names = NameSet::new();
    let mut messages = Vec::new();

    for record in records {
        let mut failure = Failure::default();

        if record.name.is_empty() {
            failure.note("Collider name is empty");
        } else if names.contains(&record.name) {
            failure.note("Duplicate collider name");
        }

        if record.parent_name.is_empty() {
            failure.note("Collider parent name is empty");
        } else if !parents.contains(&record.parent_name) {
            failure.note("Collider parent not found");
        }

        if !record.linked_renderer_name.is_empty()
            && scene.find_renderer(renderer_root, &record.linked_renderer_name).is_none()
        {
            failure.note(format!(
                "Linked renderer not found: {}",
                record.linked_renderer_name
            ));
        }

        match failure.0 {
            Some(message) => messages.push(
                ParseMessage::error_with_fields(
                    message,
                    format!("{},{},{}", record.kind(), record.name, record.parent_name),
                )
                .with_context(record.name.clone()),
            ),
            None => {
                names.insert(&record.name);
                valid.push(record);
            }
        }
    }

    (valid, names, messages)
}

/// `pivots` holds the pivot names validated this parse; `colliders` the
/// collider name universe. A missing collider is a warning, never a
/// validation failure: the name is dropped at build time.
pub fn validate_bones(
    records: Vec<BoneRecord>,
    objects: &NameSet,
    pivots: &NameSet,
    colliders: &NameSet,
) -> (Vec<BoneRecord>, Vec<ParseMessage>) {
    let mut valid = Vec::new();
    let mut names = NameSet::new();
    let mut messages = Vec::new();

    for record in records {
        let mut failure = Failure::default();

        if record.bone_name.is_empty() {
            failure.note("Bone name is empty");
        } else if names.contains(&record.bone_name) {
            failure.note("Duplicate bone name");
        } else if !objects.contains(&record.bone_name) {
            failure.note("Bone not found in scene");
        }

        if record.pivot_name.is_empty() {
            failure.note("Bone pivot name is empty");
        } else if !objects.contains(&record.pivot_name) && !pivots.contains(&record.pivot_name) {
            failure.note("Bone pivot not found");
        }

        // Warnings are collected even when the record itself failed above.
        for collider_name in &record.collider_names {
            if !colliders.contains(collider_name) {
                messages.push(
                    ParseMessage::warning(
                        format!("Collider not found: {collider_name}"),
                        record.bone_name.clone(),
                    )
                    .with_context(record.bone_name.clone()),
                );
            }
        }

        match failure.0 {
            Some(message) => messages.push(
                ParseMessage::error_with_fields(
                    message,
                    format!("{},{}", record.bone_name, record.pivot_name),
                )
                .with_context(record.bone_name.clone()),
            ),
            None => {
                names.insert(&record.bone_name);
                valid.push(record);
            }
        }
    }

    debug!("{} bone records validated", valid.len());

    (valid, messages)
}
