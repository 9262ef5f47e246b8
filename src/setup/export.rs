//! Deterministic text export of a built rig.
//!
//! Entities are serialized with the same positional grammar the importer
//! reads, so the representation round-trips. Traversal order is fixed:
//! bones in child-enumeration order, then referenced pivots, then colliders
//! grouped by kind, then dynamics nulls, then component definitions.

use strum::IntoEnumIterator;

use crate::scene::{NodeId, Scene, SpringBone};

use super::definer::DefinerRegistry;
use super::records::ColliderKind;
use super::version;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    pub export_spring_bones: bool,
    pub export_collision: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            export_spring_bones: true,
            export_collision: true,
        }
    }
}

fn fmt_bool(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn push_vec3(fields: &mut Vec<String>, value: glam::Vec3) {
    fields.push(value.x.to_string());
    fields.push(value.y.to_string());
    fields.push(value.z.to_string());
}

fn push_line(out: &mut String, fields: &[String]) {
    out.push_str(&fields.join(","));
    out.push('\n');
}

/// Bones in pre-order under `root`.
fn bone_nodes(scene: &Scene, root: NodeId) -> Vec<NodeId> {
    scene
        .descendants(root)
        .into_iter()
        .filter(|id| scene.get(*id).is_some_and(|node| node.bone.is_some()))
        .collect()
}

/// The pivot name written for a bone: its resolved pivot node, or the
/// bone's own parent when no pivot survives.
fn pivot_name(scene: &Scene, bone_node: NodeId, bone: &SpringBone) -> String {
    bone.pivot
        .filter(|id| scene.is_alive(*id))
        .or_else(|| scene.parent(bone_node))
        .map(|id| scene.name(id).to_string())
        .unwrap_or_default()
}

fn bone_fields(scene: &Scene, id: NodeId, bone: &SpringBone) -> Vec<String> {
    let mut fields = vec![scene.name(id).to_string()];

    fields.push(bone.radius.to_string());
    fields.push(bone.stiffness.to_string());
    fields.push(bone.drag.to_string());
    push_vec3(&mut fields, bone.spring_force);
    fields.push(bone.wind_influence.to_string());
    fields.push(pivot_name(scene, id, bone));

    for limit in [&bone.y_limit, &bone.z_limit] {
        fields.push(fmt_bool(limit.active).to_string());
        fields.push(limit.min.to_string());
        fields.push(limit.max.to_string());
    }

    fields.push(bone.angular_stiffness.to_string());

    let limits: Vec<_> = bone
        .length_limits
        .iter()
        .filter(|limit| scene.is_alive(limit.target))
        .collect();

    fields.push(limits.len().to_string());

    for limit in limits {
        fields.push(scene.name(limit.target).to_string());
        fields.push(limit.ratio.to_string());
    }

    for collider in &bone.colliders {
        if scene.is_alive(*collider) {
            fields.push(scene.name(*collider).to_string());
        }
    }

    fields
}

fn export_bones(out: &mut String, scene: &Scene, bones: &[NodeId]) {
    out.push_str("[SpringBones]\n");
    out.push_str(
        "// bone,radius,stiffness,drag,springForceX,springForceY,springForceZ,windInfluence,\
         pivot,yLimitOn,yMin,yMax,zLimitOn,zMin,zMax,angularStiffness,lengthLimitCount,lengthLimits,colliders\n",
    );

    for id in bones {
        if let Some(bone) = scene.get(*id).and_then(|node| node.bone.as_ref()) {
            push_line(out, &bone_fields(scene, *id, bone));
        }
    }
}

/// Distinct referenced pivots, excluding each bone's own parent.
fn referenced_pivots(scene: &Scene, bones: &[NodeId]) -> Vec<NodeId> {
    let mut seen = Vec::new();

    for id in bones {
        let Some(bone) = scene.get(*id).and_then(|node| node.bone.as_ref()) else {
            continue;
        };

        let Some(pivot) = bone.pivot.filter(|pivot| scene.is_alive(*pivot)) else {
            continue;
        };

        if scene.parent(*id) == Some(pivot) || seen.contains(&pivot) {
            continue;
        }

        seen.push(pivot);
    }

    seen
}

fn export_pivots(out: &mut String, scene: &Scene, pivots: &[NodeId]) {
    out.push_str("[Pivots]\n");
    out.push_str("// name,parent,angleX,angleY,angleZ\n");

    for id in pivots {
        let Some(node) = scene.get(*id) else {
            continue;
        };

        let parent = scene
            .parent(*id)
            .map(|parent| scene.name(parent).to_string())
            .unwrap_or_default();

        let mut fields = vec![node.name.clone(), parent];
        push_vec3(&mut fields, node.euler);
        push_line(out, &fields);
    }
}

fn collider_fields(scene: &Scene, id: NodeId) -> Option<Vec<String>> {
    let node = scene.get(id)?;
    let collider = node.collider?;

    let parent = scene
        .parent(id)
        .map(|parent| scene.name(parent).to_string())
        .unwrap_or_default();

    let mut fields = vec![
        ColliderKind::of(collider.shape).to_string(),
        node.name.clone(),
        parent,
    ];

    push_vec3(&mut fields, node.position);
    push_vec3(&mut fields, node.euler);
    push_vec3(&mut fields, node.scale);

    let renderer = collider
        .linked_renderer
        .filter(|renderer| scene.is_alive(*renderer))
        .map(|renderer| scene.name(renderer).to_string())
        .unwrap_or_default();
    fields.push(renderer);

    match collider.shape {
        crate::scene::ColliderShape::Sphere { radius } => {
            fields.push(radius.to_string());
        }
        crate::scene::ColliderShape::Capsule { radius, height } => {
            fields.push(radius.to_string());
            fields.push(height.to_string());
        }
        crate::scene::ColliderShape::Panel { width, height } => {
            fields.push(width.to_string());
            fields.push(height.to_string());
        }
    }

    Some(fields)
}

/// Colliders grouped sphere, capsule, panel; pre-order within a group.
/// Both subtrees are scanned: colliders may hang off skeleton nodes under
/// the character root as well as under the collider root.
fn collider_nodes(scene: &Scene, root: NodeId, collider_root: NodeId) -> Vec<NodeId> {
    let mut ids = scene.descendants(root);

    for id in scene.descendants(collider_root) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    let all: Vec<NodeId> = ids
        .into_iter()
        .filter(|id| scene.get(*id).is_some_and(|node| node.collider.is_some()))
        .collect();

    let mut ordered = Vec::with_capacity(all.len());

    for kind in ColliderKind::iter() {
        for id in &all {
            let matches = scene
                .get(*id)
                .and_then(|node| node.collider)
                .is_some_and(|collider| ColliderKind::of(collider.shape) == kind);

            if matches {
                ordered.push(*id);
            }
        }
    }

    ordered
}

fn export_colliders(out: &mut String, scene: &Scene, colliders: &[NodeId]) {
    out.push_str("[Colliders]\n");
    out.push_str(
        "// kind,name,parent,posX,posY,posZ,angleX,angleY,angleZ,scaleX,scaleY,scaleZ,linkedRenderer,dimensions\n",
    );

    for id in colliders {
        if let Some(fields) = collider_fields(scene, *id) {
            push_line(out, &fields);
        }
    }
}

/// Grouping transforms a re-import must recreate: ancestors of exported
/// colliders strictly below the collider root, parent-first. Skin bones and
/// renderer carriers are left out; every target scene has those already.
fn null_nodes(scene: &Scene, root: NodeId, collider_root: NodeId, colliders: &[NodeId]) -> Vec<NodeId> {
    let mut nulls: Vec<NodeId> = Vec::new();

    for id in colliders {
        let mut current = scene.parent(*id);

        while let Some(ancestor) = current {
            if ancestor == collider_root || ancestor == root {
                break;
            }

            let keep = scene.get(ancestor).is_some_and(|node| {
                node.collider.is_none() && !node.renderer && !node.skin_bone
            });

            if keep && !nulls.contains(&ancestor) {
                nulls.push(ancestor);
            }

            current = scene.parent(ancestor);
        }
    }

    nulls.sort_by_key(|id| scene.depth(*id));
    nulls
}

fn export_nulls(out: &mut String, scene: &Scene, nulls: &[NodeId]) {
    out.push_str("[DynamicsNulls]\n");
    out.push_str("// name,parent,posX,posY,posZ,angleX,angleY,angleZ,scaleX,scaleY,scaleZ\n");

    for id in nulls {
        let Some(node) = scene.get(*id) else {
            continue;
        };

        let parent = scene
            .parent(*id)
            .map(|parent| scene.name(parent).to_string())
            .unwrap_or_default();

        let mut fields = vec![node.name.clone(), parent];
        push_vec3(&mut fields, node.position);
        push_vec3(&mut fields, node.euler);
        push_vec3(&mut fields, node.scale);
        push_line(out, &fields);
    }
}

fn export_components(
    out: &mut String,
    scene: &Scene,
    root: NodeId,
    collider_root: NodeId,
    registry: &DefinerRegistry,
) {
    out.push_str("[Components]\n");
    out.push_str("// object,type,fields\n");

    // Same lookup scope as the importer: either root, inclusive.
    let mut nodes = vec![root];
    nodes.extend(scene.descendants(root));

    if !nodes.contains(&collider_root) {
        nodes.push(collider_root);
    }

    for id in scene.descendants(collider_root) {
        if !nodes.contains(&id) {
            nodes.push(id);
        }
    }

    for id in nodes {
        for definer in registry.iter() {
            if !definer.applies(scene, id) {
                continue;
            }

            let mut fields = vec![scene.name(id).to_string(), definer.type_token().to_string()];
            fields.extend(definer.serialize(scene, id));
            push_line(out, &fields);
        }
    }
}

/// Serialize the live graph back into setup text.
pub fn export(
    scene: &Scene,
    root: NodeId,
    collider_root: NodeId,
    settings: &ExportSettings,
    registry: &DefinerRegistry,
) -> String {
    let mut out = String::new();

    out.push_str(&format!("version,{}\n", version::CURRENT));

    if settings.export_spring_bones {
        let bones = bone_nodes(scene, root);

        export_bones(&mut out, scene, &bones);

        let pivots = referenced_pivots(scene, &bones);
        export_pivots(&mut out, scene, &pivots);
    }

    if settings.export_collision {
        let colliders = collider_nodes(scene, root, collider_root);

        export_colliders(&mut out, scene, &colliders);
        export_nulls(&mut out, scene, &null_nodes(scene, root, collider_root, &colliders));
        export_components(&mut out, scene, root, collider_root, registry);
    }

    out
}
