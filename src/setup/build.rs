//! Object-graph builder.
//!
//! Rebuilding is destructive and idempotent: generated bone and manager
//! components and probably-safe pivots are destroyed first, then recreated
//! from the validated records, so building the same text twice yields the
//! same graph instead of an accumulation.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};

use crate::scene::{
    AngleLimits, Collider, LengthLimit, ManagerSettings, NodeId, Scene,
    SpringBone, SpringManager,
};

use super::definer::DefinerRegistry;
use super::records::{BoneRecord, ParseMessage};
use super::validate::NameSet;
use super::{BoneSetup, ColliderSetup, ParsedSetup};

/// Name endings that mark a pivot as generated, matched case-insensitively.
pub const SAFE_PIVOT_SUFFIXES: &[&str] = &["pivot"];

/// Read-only view of a node for the destruction gate.
#[derive(Debug, Copy, Clone)]
pub struct DestroySnapshot<'a> {
    pub is_skin_bone: bool,
    pub child_count: usize,
    pub has_renderer: bool,
    pub has_pivot_marker: bool,
    pub name: &'a str,
}

/// The sole protection against a rebuild destroying hand-authored nodes.
///
/// Skin bones, nodes with children, and renderer carriers are never safe.
/// The synthetic-pivot marker is definitive; otherwise the name suffix
/// decides heuristically.
pub fn probably_safe_to_destroy(node: &DestroySnapshot) -> bool {
    if node.is_skin_bone || node.child_count > 0 || node.has_renderer {
        return false;
    }

    if node.has_pivot_marker {
        return true;
    }

    let name = node.name.to_ascii_lowercase();
    SAFE_PIVOT_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

fn is_probably_safe(scene: &Scene, id: NodeId) -> bool {
    let Some(node) = scene.get(id) else {
        return false;
    };

    probably_safe_to_destroy(&DestroySnapshot {
        is_skin_bone: node.skin_bone,
        child_count: scene.children(id).len(),
        has_renderer: node.renderer,
        has_pivot_marker: node.pivot_marker,
        name: &node.name,
    })
}

#[derive(Debug, Default, Clone)]
pub struct BuildOptions {
    /// When present, bone records outside the list are dropped and listed
    /// names without a record get default physics.
    pub required_bones: Option<Vec<String>>,
}

#[derive(Debug, Default)]
pub struct BuildReport {
    pub bones_built: usize,
    pub pivots_created: usize,
    pub colliders_built: usize,
    pub nulls_created: usize,
    pub components_applied: usize,
    /// Per-entity build problems; none of them abort the batch.
    pub messages: Vec<ParseMessage>,
}

/// Rebuild the graph from a successful parse. The caller decides whether a
/// parse with warnings is acceptable to build from.
pub fn build(
    scene: &mut Scene,
    root: NodeId,
    collider_root: NodeId,
    parsed: &ParsedSetup,
    options: &BuildOptions,
    registry: &DefinerRegistry,
) -> BuildReport {
    let mut report = BuildReport::default();

    // Colliders go first so bone wiring can resolve them by name.
    if parsed.settings.import_collision {
        if let Some(setup) = &parsed.colliders {
            build_collider_setup(scene, root, collider_root, setup, &mut report);
        }
    }

    if parsed.settings.import_spring_bones {
        if let Some(setup) = &parsed.bones {
            build_bone_setup(scene, root, collider_root, setup, options, &mut report);
        }
    }

    // Component annotations run over the fully built graph.
    if parsed.settings.import_collision {
        if let Some(setup) = &parsed.colliders {
            apply_components(scene, root, collider_root, setup, registry, &mut report);
        }
    }

    report
}

/// Strip generated bone state under `root`. Destruction candidates are the
/// pivots referenced by the bones being destroyed plus marker carriers; the
/// safety gate protects hand-authored nodes among them. The rebuild
/// recreates the ones the records still name.
fn destroy_generated(scene: &mut Scene, root: NodeId) {
    if let Some(node) = scene.get_mut(root) {
        node.manager = None;
    }

    let descendants = scene.descendants(root);
    let mut candidates = Vec::new();

    for id in &descendants {
        if let Some(bone) = scene.get(*id).and_then(|node| node.bone.as_ref()) {
            if let Some(pivot) = bone.pivot {
                if !candidates.contains(&pivot) {
                    candidates.push(pivot);
                }
            }
        }

        if scene.get(*id).is_some_and(|node| node.pivot_marker) && !candidates.contains(id) {
            candidates.push(*id);
        }
    }

    for id in &descendants {
        if let Some(node) = scene.get_mut(*id) {
            node.bone = None;
        }
    }

    let mut destroyed = 0;

    for id in candidates {
        if scene.is_alive(id) && is_probably_safe(scene, id) {
            scene.destroy(id);
            destroyed += 1;
        }
    }

    debug!("Destroyed {destroyed} generated pivot nodes under {}", scene.name(root));
}

/// Lowercased name to node map; the first occurrence of a name wins.
fn name_map(scene: &Scene, root: NodeId) -> HashMap<String, NodeId> {
    let mut map = HashMap::new();

    for id in scene.descendants(root) {
        map.entry(scene.name(id).to_ascii_lowercase()).or_insert(id);
    }

    map
}

/// Colliders may live under either root; scan both.
fn collider_name_map(scene: &Scene, root: NodeId, collider_root: NodeId) -> HashMap<String, NodeId> {
    let mut map = HashMap::new();

    let mut ids = scene.descendants(root);
    ids.extend(scene.descendants(collider_root));

    for id in ids {
        if scene.get(id).is_some_and(|node| node.collider.is_some()) {
            map.entry(scene.name(id).to_ascii_lowercase()).or_insert(id);
        }
    }

    map
}

fn build_bone_setup(
    scene: &mut Scene,
    root: NodeId,
    collider_root: NodeId,
    setup: &BoneSetup,
    options: &BuildOptions,
    report: &mut BuildReport,
) {
    // Manager-level settings survive the rebuild: read before destruction,
    // reapplied after.
    let snapshot = scene
        .get(root)
        .and_then(|node| node.manager.as_ref())
        .map(|manager| manager.settings);

    destroy_generated(scene, root);

    let mut records: Vec<&BoneRecord> = setup.bones.iter().collect();

    if let Some(required) = &options.required_bones {
        let required_set: NameSet = required.iter().collect();

        records.retain(|record| {
            let keep = required_set.contains(&record.bone_name);

            if !keep {
                report.messages.push(
                    ParseMessage::warning(
                        "Bone record excluded by required list",
                        record.bone_name.clone(),
                    )
                    .with_context(record.bone_name.clone()),
                );
            }

            keep
        });

        let present: NameSet = records.iter().map(|record| record.bone_name.as_str()).collect();

        for name in required {
            if present.contains(name) {
                continue;
            }

            match scene.find(root, name) {
                Some(node) => {
                    if let Some(node) = scene.get_mut(node) {
                        node.bone = Some(SpringBone::default());
                    }

                    report.messages.push(
                        ParseMessage::warning("Bone synthesized with default physics", name.clone())
                            .with_context(name.clone()),
                    );
                }
                None => report.messages.push(
                    ParseMessage::warning("Required bone not found in scene", name.clone())
                        .with_context(name.clone()),
                ),
            }
        }
    }

    for record in &setup.pivots {
        let Some(parent) = scene.find(root, &record.parent_name) else {
            warn!("Pivot parent vanished before build: {}", record.parent_name);
            report.messages.push(
                ParseMessage::error_with_fields(
                    "Pivot parent not found at build time",
                    format!("{},{}", record.name, record.parent_name),
                )
                .with_context(record.name.clone()),
            );
            continue;
        };

        let node = match scene.find(parent, &record.name) {
            Some(existing) => existing,
            None => {
                let created = scene.create_child(parent, &record.name);

                if let Some(node) = scene.get_mut(created) {
                    node.pivot_marker = true;
                }

                report.pivots_created += 1;
                created
            }
        };

        // Unit scale, record rotation, recentered on the parent's origin.
        if let Some(node) = scene.get_mut(node) {
            node.scale = glam::Vec3::ONE;
            node.euler = record.euler_angles;
            node.position = glam::Vec3::ZERO;
        }
    }

    let collider_map = collider_name_map(scene, root, collider_root);
    let object_map = name_map(scene, root);
    let mut used_pivots: HashSet<NodeId> = HashSet::new();

    for record in records {
        // Bones are never synthesized by name; the node must already exist.
        let Some(node) = scene.find(root, &record.bone_name) else {
            warn!("Bone node not found at build time: {}", record.bone_name);
            report.messages.push(
                ParseMessage::error_with_fields(
                    "Bone node not found at build time",
                    record.bone_name.clone(),
                )
                .with_context(record.bone_name.clone()),
            );
            continue;
        };

        // A missing pivot falls back to the bone's own parent.
        let pivot = scene.find(root, &record.pivot_name).or_else(|| scene.parent(node));

        if let Some(pivot) = pivot {
            if used_pivots.contains(&pivot) && is_probably_safe(scene, pivot) {
                // A synthetic pivot shared by several bones follows the
                // latest bone so co-located bones stay anchored together.
                let world = scene.world_position(node);
                scene.set_world_position(pivot, world);
            }

            used_pivots.insert(pivot);
        }

        let colliders: Vec<NodeId> = record
            .collider_names
            .iter()
            .filter_map(|name| collider_map.get(&name.to_ascii_lowercase()).copied())
            .collect();

        let mut length_limits = Vec::with_capacity(record.length_limits.len());

        for limit in &record.length_limits {
            match object_map.get(&limit.object_name.to_ascii_lowercase()) {
                Some(target) => length_limits.push(LengthLimit {
                    target: *target,
                    ratio: limit.ratio,
                }),
                None => report.messages.push(
                    ParseMessage::warning(
                        format!("Length limit target not found: {}", limit.object_name),
                        record.bone_name.clone(),
                    )
                    .with_context(record.bone_name.clone()),
                ),
            }
        }

        if let Some(node) = scene.get_mut(node) {
            node.bone = Some(SpringBone {
                radius: record.radius,
                stiffness: record.stiffness,
                drag: record.drag,
                spring_force: record.spring_force,
                wind_influence: record.wind_influence,
                pivot,
                y_limit: AngleLimits {
                    active: record.y_limit.enabled,
                    min: record.y_limit.min,
                    max: record.y_limit.max,
                },
                z_limit: AngleLimits {
                    active: record.z_limit.enabled,
                    min: record.z_limit.min,
                    max: record.z_limit.max,
                },
                angular_stiffness: record.angular_stiffness,
                length_limits,
                colliders,
            });

            report.bones_built += 1;
        }
    }

    rebuild_manager(scene, root, snapshot);
}

/// Manager goes last: its bone list orders parents before children so they
/// simulate in hierarchy order.
fn rebuild_manager(scene: &mut Scene, root: NodeId, snapshot: Option<ManagerSettings>) {
    let mut bones: Vec<NodeId> = scene
        .descendants(root)
        .into_iter()
        .filter(|id| scene.get(*id).is_some_and(|node| node.bone.is_some()))
        .collect();

    // Stable: equal depths keep their pre-order position.
    bones.sort_by_key(|id| scene.depth(*id));

    let mut manager = SpringManager::with_settings(snapshot.unwrap_or_default());
    manager.bones = bones;

    if let Some(node) = scene.get_mut(root) {
        node.manager = Some(manager);
    }
}

fn find_under_either(scene: &Scene, first: NodeId, second: NodeId, name: &str) -> Option<NodeId> {
    scene.find(first, name).or_else(|| scene.find(second, name))
}

fn build_collider_setup(
    scene: &mut Scene,
    root: NodeId,
    collider_root: NodeId,
    setup: &ColliderSetup,
    report: &mut BuildReport,
) {
    // Strip the previous collision build; nodes are reused by name below.
    let mut stripped = scene.descendants(collider_root);
    stripped.extend(scene.descendants(root));

    for id in stripped {
        if let Some(node) = scene.get_mut(id) {
            node.collider = None;
        }
    }

    for record in &setup.nulls {
        let Some(parent) = find_under_either(scene, collider_root, root, &record.parent_name) else {
            report.messages.push(
                ParseMessage::error_with_fields(
                    "Dynamics null parent not found at build time",
                    format!("{},{}", record.name, record.parent_name),
                )
                .with_context(record.name.clone()),
            );
            continue;
        };

        let node = match scene.find(parent, &record.name) {
            Some(existing) => existing,
            None => {
                report.nulls_created += 1;
                scene.create_child(parent, &record.name)
            }
        };

        if let Some(node) = scene.get_mut(node) {
            node.position = record.position;
            node.euler = record.euler_angles;
            node.scale = record.scale;
        }
    }

    for record in &setup.colliders {
        let Some(parent) = find_under_either(scene, collider_root, root, &record.parent_name) else {
            report.messages.push(
                ParseMessage::error_with_fields(
                    "Collider parent not found at build time",
                    format!("{},{}", record.name, record.parent_name),
                )
                .with_context(record.name.clone()),
            );
            continue;
        };

        let node = match scene.find(parent, &record.name) {
            Some(existing) => existing,
            None => scene.create_child(parent, &record.name),
        };

        let linked = if record.linked_renderer_name.is_empty() {
            None
        } else {
            scene.find_renderer(root, &record.linked_renderer_name)
        };

        if let Some(node) = scene.get_mut(node) {
            node.position = record.position;
            node.euler = record.euler_angles;
            node.scale = record.scale;
            node.collider = Some(Collider {
                shape: record.shape,
                linked_renderer: linked,
            });

            report.colliders_built += 1;
        }
    }
}

fn apply_components(
    scene: &mut Scene,
    root: NodeId,
    collider_root: NodeId,
    setup: &ColliderSetup,
    registry: &DefinerRegistry,
    report: &mut BuildReport,
) {
    for record in &setup.components {
        let Some(node) = find_under_either(scene, root, collider_root, &record.object_name) else {
            report.messages.push(
                ParseMessage::error_with_fields(
                    "Component object not found",
                    format!("{},{}", record.object_name, record.type_token),
                )
                .with_context(record.object_name.clone()),
            );
            continue;
        };

        let Some(definer) = registry.find(&record.type_token) else {
            report.messages.push(
                ParseMessage::error_with_fields(
                    format!("No definer registered for component type: {}", record.type_token),
                    record.object_name.clone(),
                )
                .with_context(record.object_name.clone()),
            );
            continue;
        };

        match definer.deserialize(&record.fields, scene, node) {
            Ok(()) => report.components_applied += 1,
            Err(err) => report.messages.push(
                ParseMessage::error_with_fields(
                    "Component definition failed to apply",
                    format!("{},{}", record.object_name, record.type_token),
                )
                .with_detail(format!("{err:#}"))
                .with_context(record.object_name.clone()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::scene::ColliderShape;
    use crate::setup::records::{AngleLimitsRecord, ColliderRecord, PivotRecord, TransformRecord};
    use crate::setup::{ImportSettings, Version};

    fn snapshot(name: &str) -> DestroySnapshot<'_> {
        DestroySnapshot {
            is_skin_bone: false,
            child_count: 0,
            has_renderer: false,
            has_pivot_marker: false,
            name,
        }
    }

    #[test]
    fn destroy_gate_protects_scene_structure() {
        // A skin bone is never safe, even with the marker or a safe suffix.
        assert!(!probably_safe_to_destroy(&DestroySnapshot {
            is_skin_bone: true,
            has_pivot_marker: true,
            ..snapshot("Hair_Pivot")
        }));

        assert!(!probably_safe_to_destroy(&DestroySnapshot {
            child_count: 2,
            ..snapshot("Hair_Pivot")
        }));

        assert!(!probably_safe_to_destroy(&DestroySnapshot {
            has_renderer: true,
            ..snapshot("Hair_Pivot")
        }));

        // The marker is definitive for plain nodes.
        assert!(probably_safe_to_destroy(&DestroySnapshot {
            has_pivot_marker: true,
            ..snapshot("Anything")
        }));

        // Otherwise the suffix decides, case-insensitively.
        assert!(probably_safe_to_destroy(&snapshot("Head_PIVOT")));
        assert!(!probably_safe_to_destroy(&snapshot("Head")));
    }

    fn bone_record(name: &str, pivot: &str) -> BoneRecord {
        BoneRecord {
            bone_name: name.to_string(),
            radius: 0.1,
            stiffness: 0.2,
            drag: 0.1,
            spring_force: Vec3::ZERO,
            wind_influence: 0.5,
            pivot_name: pivot.to_string(),
            y_limit: AngleLimitsRecord {
                enabled: false,
                min: -20.0,
                max: 20.0,
            },
            z_limit: AngleLimitsRecord::default(),
            angular_stiffness: 0.3,
            length_limits: Vec::new(),
            collider_names: Vec::new(),
        }
    }

    fn parsed(bones: BoneSetup) -> ParsedSetup {
        ParsedSetup {
            version: Version::Numbered(4),
            settings: ImportSettings::default(),
            bones: Some(bones),
            colliders: None,
            errors: Vec::new(),
        }
    }

    fn head_rig() -> (Scene, NodeId) {
        let mut scene = Scene::new();
        let root = scene.create_root("Root");
        let head = scene.create_child(root, "Head");
        scene.create_child(head, "Head_Pivot");
        (scene, root)
    }

    #[test]
    fn decorates_existing_bone_and_wires_pivot() {
        let (mut scene, root) = head_rig();

        let setup = BoneSetup {
            pivots: Vec::new(),
            bones: vec![bone_record("Head", "Head_Pivot")],
        };

        let report = build(
            &mut scene,
            root,
            root,
            &parsed(setup),
            &BuildOptions::default(),
            &DefinerRegistry::new(),
        );

        assert_eq!(report.bones_built, 1);
        assert!(report.messages.is_empty());

        let head = scene.find(root, "Head").unwrap();
        let pivot = scene.find(root, "Head_Pivot").unwrap();
        let bone = scene.get(head).unwrap().bone.as_ref().unwrap();

        assert_eq!(bone.radius, 0.1);
        assert_eq!(bone.pivot, Some(pivot));
        assert!(bone.colliders.is_empty());

        let manager = scene.get(root).unwrap().manager.as_ref().unwrap();
        assert_eq!(manager.bones, vec![head]);
    }

    #[test]
    fn missing_bone_node_is_per_record_error() {
        let (mut scene, root) = head_rig();

        let setup = BoneSetup {
            pivots: Vec::new(),
            bones: vec![bone_record("Ghost", "Head_Pivot"), bone_record("Head", "Head_Pivot")],
        };

        let report = build(
            &mut scene,
            root,
            root,
            &parsed(setup),
            &BuildOptions::default(),
            &DefinerRegistry::new(),
        );

        // The batch continues past the missing node.
        assert_eq!(report.bones_built, 1);
        assert_eq!(report.messages.len(), 1);
        assert!(report.messages[0].is_error());
    }

    #[test]
    fn missing_pivot_falls_back_to_parent() {
        let mut scene = Scene::new();
        let root = scene.create_root("Root");
        let neck = scene.create_child(root, "Neck");
        let head = scene.create_child(neck, "Head");

        let setup = BoneSetup {
            pivots: Vec::new(),
            bones: vec![bone_record("Head", "Vanished_Pivot")],
        };

        build(
            &mut scene,
            root,
            root,
            &parsed(setup),
            &BuildOptions::default(),
            &DefinerRegistry::new(),
        );

        let bone = scene.get(head).unwrap().bone.as_ref().unwrap();
        assert_eq!(bone.pivot, Some(neck));
    }

    #[test]
    fn pivot_nodes_are_created_and_reset() {
        let mut scene = Scene::new();
        let root = scene.create_root("Root");
        let head = scene.create_child(root, "Head");
        scene.get_mut(head).unwrap().position = Vec3::new(0.0, 1.5, 0.0);

        let setup = BoneSetup {
            pivots: vec![PivotRecord {
                name: "Head_Pivot".into(),
                parent_name: "Head".into(),
                euler_angles: Vec3::new(0.0, 30.0, 0.0),
            }],
            bones: vec![bone_record("Head", "Head_Pivot")],
        };

        let report = build(
            &mut scene,
            root,
            root,
            &parsed(setup),
            &BuildOptions::default(),
            &DefinerRegistry::new(),
        );

        assert_eq!(report.pivots_created, 1);

        let pivot = scene.find(root, "Head_Pivot").unwrap();
        let node = scene.get(pivot).unwrap();

        assert!(node.pivot_marker);
        assert_eq!(node.position, Vec3::ZERO);
        assert_eq!(node.scale, Vec3::ONE);
        assert_eq!(scene.parent(pivot), Some(head));
    }

    #[test]
    fn rebuild_is_idempotent() {
        let mut scene = Scene::new();
        let root = scene.create_root("Root");
        scene.create_child(root, "Head");

        let setup = || BoneSetup {
            pivots: vec![PivotRecord {
                name: "Head_Pivot".into(),
                parent_name: "Head".into(),
                euler_angles: Vec3::ZERO,
            }],
            bones: vec![bone_record("Head", "Head_Pivot")],
        };

        let first = build(
            &mut scene,
            root,
            root,
            &parsed(setup()),
            &BuildOptions::default(),
            &DefinerRegistry::new(),
        );

        let second = build(
            &mut scene,
            root,
            root,
            &parsed(setup()),
            &BuildOptions::default(),
            &DefinerRegistry::new(),
        );

        assert_eq!(first.bones_built, 1);
        assert_eq!(second.bones_built, 1);

        // One pivot both times, not an accumulation.
        let pivots: Vec<_> = scene
            .descendants(root)
            .into_iter()
            .filter(|id| scene.get(*id).unwrap().pivot_marker)
            .collect();
        assert_eq!(pivots.len(), 1);

        let manager = scene.get(root).unwrap().manager.as_ref().unwrap();
        assert_eq!(manager.bones.len(), 1);
    }

    #[test]
    fn unreferenced_generated_pivot_is_removed_on_rebuild() {
        let mut scene = Scene::new();
        let root = scene.create_root("Root");
        scene.create_child(root, "Head");
        scene.create_child(root, "Tail");

        let with_tail = BoneSetup {
            pivots: vec![
                PivotRecord {
                    name: "Head_Pivot".into(),
                    parent_name: "Head".into(),
                    euler_angles: Vec3::ZERO,
                },
                PivotRecord {
                    name: "Tail_Pivot".into(),
                    parent_name: "Tail".into(),
                    euler_angles: Vec3::ZERO,
                },
            ],
            bones: vec![bone_record("Head", "Head_Pivot"), bone_record("Tail", "Tail_Pivot")],
        };

        let without_tail = BoneSetup {
            pivots: vec![PivotRecord {
                name: "Head_Pivot".into(),
                parent_name: "Head".into(),
                euler_angles: Vec3::ZERO,
            }],
            bones: vec![bone_record("Head", "Head_Pivot")],
        };

        build(
            &mut scene,
            root,
            root,
            &parsed(with_tail),
            &BuildOptions::default(),
            &DefinerRegistry::new(),
        );
        assert!(scene.find(root, "Tail_Pivot").is_some());

        build(
            &mut scene,
            root,
            root,
            &parsed(without_tail),
            &BuildOptions::default(),
            &DefinerRegistry::new(),
        );
        assert!(scene.find(root, "Tail_Pivot").is_none());
        assert!(scene.find(root, "Head_Pivot").is_some());
    }

    #[test]
    fn hand_authored_lookalikes_survive_rebuild() {
        let mut scene = Scene::new();
        let root = scene.create_root("Root");
        let head = scene.create_child(root, "Head");
        let neck = scene.create_child(root, "Neck");

        // Carries a renderer, so the suffix heuristic must not win.
        let prop = scene.create_child(root, "Hat_Pivot");
        scene.get_mut(prop).unwrap().renderer = true;

        // A skin bone with a matching suffix.
        let skin = scene.create_child(root, "Spine_Pivot");
        scene.get_mut(skin).unwrap().skin_bone = true;

        // Both are referenced by bones the rebuild destroys, which makes
        // them destruction candidates.
        scene.get_mut(head).unwrap().bone = Some(SpringBone {
            pivot: Some(prop),
            ..Default::default()
        });
        scene.get_mut(neck).unwrap().bone = Some(SpringBone {
            pivot: Some(skin),
            ..Default::default()
        });

        let setup = BoneSetup {
            pivots: Vec::new(),
            bones: vec![bone_record("Head", "Head")],
        };

        build(
            &mut scene,
            root,
            root,
            &parsed(setup),
            &BuildOptions::default(),
            &DefinerRegistry::new(),
        );

        assert!(scene.is_alive(prop));
        assert!(scene.is_alive(skin));
        assert!(scene.get(neck).unwrap().bone.is_none());
    }

    #[test]
    fn required_bones_filter_and_synthesis() {
        let mut scene = Scene::new();
        let root = scene.create_root("Root");
        let head = scene.create_child(root, "Head");
        let tail = scene.create_child(root, "Tail");

        let setup = BoneSetup {
            pivots: Vec::new(),
            bones: vec![bone_record("Head", "Head"), bone_record("Tail", "Tail")],
        };

        let options = BuildOptions {
            required_bones: Some(vec!["Head".into(), "Mane".into()]),
        };

        let report = build(
            &mut scene,
            root,
            root,
            &parsed(setup),
            &options,
            &DefinerRegistry::new(),
        );

        // Tail dropped, Head built, Mane reported missing.
        assert_eq!(report.bones_built, 1);
        assert!(scene.get(head).unwrap().bone.is_some());
        assert!(scene.get(tail).unwrap().bone.is_none());

        let warnings: Vec<_> = report.messages.iter().filter(|m| !m.is_error()).collect();
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn required_bone_present_in_scene_gets_default_physics() {
        let mut scene = Scene::new();
        let root = scene.create_root("Root");
        let mane = scene.create_child(root, "Mane");

        let setup = BoneSetup {
            pivots: Vec::new(),
            bones: Vec::new(),
        };

        let options = BuildOptions {
            required_bones: Some(vec!["Mane".into()]),
        };

        let report = build(
            &mut scene,
            root,
            root,
            &parsed(setup),
            &options,
            &DefinerRegistry::new(),
        );

        let bone = scene.get(mane).unwrap().bone.as_ref().unwrap();
        assert_eq!(bone.angular_stiffness, SpringBone::default().angular_stiffness);
        assert!(report.messages.iter().any(|m| m.message.contains("synthesized")));

        // Synthesized bones still join the manager list.
        let manager = scene.get(root).unwrap().manager.as_ref().unwrap();
        assert_eq!(manager.bones, vec![mane]);
    }

    #[test]
    fn manager_orders_bones_shallowest_first() {
        let mut scene = Scene::new();
        let root = scene.create_root("Root");
        let a = scene.create_child(root, "A");
        let b = scene.create_child(a, "B");
        let c = scene.create_child(b, "C");

        // Records deliberately deepest-first.
        let setup = BoneSetup {
            pivots: Vec::new(),
            bones: vec![bone_record("C", "B"), bone_record("B", "A"), bone_record("A", "Root")],
        };

        build(
            &mut scene,
            root,
            root,
            &parsed(setup),
            &BuildOptions::default(),
            &DefinerRegistry::new(),
        );

        let manager = scene.get(root).unwrap().manager.as_ref().unwrap();
        assert_eq!(manager.bones, vec![a, b, c]);
    }

    #[test]
    fn manager_settings_survive_rebuild() {
        let mut scene = Scene::new();
        let root = scene.create_root("Root");
        scene.create_child(root, "Head");

        let custom = ManagerSettings {
            dynamic_ratio: 0.5,
            gravity: Vec3::new(0.0, -3.0, 0.0),
            bounce: 0.2,
            friction: 0.7,
        };
        scene.get_mut(root).unwrap().manager = Some(SpringManager::with_settings(custom));

        let setup = BoneSetup {
            pivots: Vec::new(),
            bones: vec![bone_record("Head", "Head")],
        };

        build(
            &mut scene,
            root,
            root,
            &parsed(setup),
            &BuildOptions::default(),
            &DefinerRegistry::new(),
        );

        let manager = scene.get(root).unwrap().manager.as_ref().unwrap();
        assert_eq!(manager.settings, custom);
        assert_eq!(manager.bones.len(), 1);
    }

    #[test]
    fn shared_synthetic_pivot_recenters_to_latest_bone() {
        let mut scene = Scene::new();
        let root = scene.create_root("Root");
        let a = scene.create_child(root, "HairA");
        let b = scene.create_child(root, "HairB");
        scene.get_mut(a).unwrap().position = Vec3::new(1.0, 0.0, 0.0);
        scene.get_mut(b).unwrap().position = Vec3::new(2.0, 0.0, 0.0);

        let setup = BoneSetup {
            pivots: vec![PivotRecord {
                name: "Shared_Pivot".into(),
                parent_name: "HairA".into(),
                euler_angles: Vec3::ZERO,
            }],
            bones: vec![bone_record("HairA", "Shared_Pivot"), bone_record("HairB", "Shared_Pivot")],
        };

        build(
            &mut scene,
            root,
            root,
            &parsed(setup),
            &BuildOptions::default(),
            &DefinerRegistry::new(),
        );

        let pivot = scene.find(root, "Shared_Pivot").unwrap();
        assert!((scene.world_position(pivot) - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn collider_build_creates_nulls_and_colliders() {
        let mut scene = Scene::new();
        let root = scene.create_root("Root");
        let colliders = scene.create_child(root, "Colliders");
        scene.create_child(root, "Hips");

        let setup = ColliderSetup {
            nulls: vec![TransformRecord {
                name: "HipGroup".into(),
                parent_name: "Colliders".into(),
                position: Vec3::new(0.0, 1.0, 0.0),
                euler_angles: Vec3::ZERO,
                scale: Vec3::ONE,
            }],
            colliders: vec![ColliderRecord {
                name: "HipSphere".into(),
                parent_name: "HipGroup".into(),
                position: Vec3::ZERO,
                euler_angles: Vec3::ZERO,
                scale: Vec3::ONE,
                linked_renderer_name: String::new(),
                shape: ColliderShape::Sphere { radius: 0.12 },
            }],
            components: Vec::new(),
        };

        let parsed = ParsedSetup {
            version: Version::Numbered(4),
            settings: ImportSettings::default(),
            bones: None,
            colliders: Some(setup),
            errors: Vec::new(),
        };

        let report = build(
            &mut scene,
            root,
            colliders,
            &parsed,
            &BuildOptions::default(),
            &DefinerRegistry::new(),
        );

        assert_eq!(report.nulls_created, 1);
        assert_eq!(report.colliders_built, 1);

        let sphere = scene.find_collider(colliders, "HipSphere").unwrap();
        let group = scene.find(colliders, "HipGroup").unwrap();

        assert_eq!(scene.parent(sphere), Some(group));
        assert_eq!(
            scene.get(sphere).unwrap().collider.unwrap().shape,
            ColliderShape::Sphere { radius: 0.12 }
        );

        // Collider-only import leaves bone state alone.
        assert!(scene.get(root).unwrap().manager.is_none());
    }
}
