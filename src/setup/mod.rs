//! Bidirectional setup pipeline: text to records to validated sub-setups to
//! object graph, and the object graph back to text.
//!
//! `parse_setup` never panics and never throws past a record batch; fatal
//! conditions come back as a [`ParsedSetup`] with both sub-setups `None`.
//! Building is a separate step so callers can inspect diagnostics first.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;

use crate::diag::DiagnosticsSink;
use crate::scene::{NodeId, Scene};

pub mod build;
pub mod de;
pub mod definer;
pub mod export;
pub mod records;
pub mod tok;
pub mod validate;
pub mod version;

pub use build::{probably_safe_to_destroy, BuildOptions, BuildReport, DestroySnapshot};
pub use definer::{ComponentDefiner, DefinerRegistry};
pub use export::ExportSettings;
pub use records::{
    BoneRecord, ColliderKind, ColliderRecord, ComponentDefinitionRecord, ParseMessage,
    PivotRecord, Record, Section, Severity, TransformRecord,
};
pub use validate::NameSet;
pub use version::Version;

/// What the importer is allowed to touch. Only detection narrows these.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ImportSettings {
    pub import_spring_bones: bool,
    pub import_collision: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            import_spring_bones: true,
            import_collision: true,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct BoneSetup {
    pub pivots: Vec<PivotRecord>,
    pub bones: Vec<BoneRecord>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ColliderSetup {
    pub nulls: Vec<TransformRecord>,
    pub colliders: Vec<ColliderRecord>,
    pub components: Vec<ComponentDefinitionRecord>,
}

/// Result of one parse call. Transient; a fresh one is produced per call.
#[derive(Debug)]
pub struct ParsedSetup {
    pub version: Version,
    pub settings: ImportSettings,
    /// `Some` means valid enough to build from, even with errors collected.
    pub bones: Option<BoneSetup>,
    pub colliders: Option<ColliderSetup>,
    /// Errors and warnings, in input order.
    pub errors: Vec<ParseMessage>,
}

impl ParsedSetup {
    pub fn succeeded(&self) -> bool {
        self.bones.is_some() || self.colliders.is_some()
    }

    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(ParseMessage::is_error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ParseMessage> {
        self.errors.iter().filter(|message| !message.is_error())
    }

    fn failed(settings: ImportSettings, err: anyhow::Error) -> Self {
        Self {
            version: Version::Unknown,
            settings,
            bones: None,
            colliders: None,
            errors: vec![
                ParseMessage::error_with_fields("Import failed", String::new())
                    .with_detail(format!("{err:#}")),
            ],
        }
    }
}

/// Parse and validate setup text against the live scene.
///
/// `root` is the character subtree bones and pivots resolve under;
/// `collider_root` hosts collision primitives and dynamics nulls.
pub fn parse_setup(
    text: &str,
    scene: &Scene,
    root: NodeId,
    collider_root: NodeId,
    settings: ImportSettings,
) -> ParsedSetup {
    let mut settings = settings;
    let records = tok::parse_records(text);

    let version = match version::detect(&records, text, &mut settings) {
        Ok(version) => version,
        Err(err) => return ParsedSetup::failed(settings, err),
    };

    let mut errors = Vec::new();

    let mut pivot_records = Vec::new();
    let mut bone_records = Vec::new();
    let mut collider_records = Vec::new();
    let mut null_records = Vec::new();
    let mut component_records = Vec::new();

    for record in &records {
        match Section::of(record) {
            Some(Section::Pivots) if settings.import_spring_bones => {
                match de::pivot(&record.fields) {
                    Ok(pivot) => pivot_records.push(pivot),
                    Err(err) => errors.push(ParseMessage::from_err(record, err)),
                }
            }
            Some(Section::SpringBones) if settings.import_spring_bones => {
                match de::bone(&record.fields) {
                    Ok(bone) => bone_records.push(bone),
                    Err(err) => errors.push(ParseMessage::from_err(record, err)),
                }
            }
            Some(Section::Colliders) if settings.import_collision => {
                match de::collider(&record.fields) {
                    Ok(collider) => collider_records.push(collider),
                    Err(err) => errors.push(ParseMessage::from_err(record, err)),
                }
            }
            Some(Section::DynamicsNulls) if settings.import_collision => {
                match de::transform(&record.fields) {
                    Ok(transform) => null_records.push(transform),
                    Err(err) => errors.push(ParseMessage::from_err(record, err)),
                }
            }
            Some(Section::Components) if settings.import_collision => {
                match de::component(&record.fields) {
                    Ok(component) => component_records.push(component),
                    Err(err) => errors.push(ParseMessage::from_err(record, err)),
                }
            }
            // Section disabled by the settings.
            Some(_) => {}
            None if record.is_root() => {
                let directive = record
                    .fields
                    .first()
                    .is_some_and(|field| field.eq_ignore_ascii_case(version::DIRECTIVE));

                if !directive {
                    debug!("Skipping root-section record: {}", record.joined());
                }
            }
            None => debug!("Skipping record in unknown section {:?}", record.section),
        }
    }

    // Base universe: live object names under both roots.
    let mut objects = validate::scene_names(scene, root);
    objects.merge(&validate::scene_names(scene, collider_root));

    let colliders = if settings.import_collision {
        let (nulls, null_names, messages) = validate::validate_transforms(null_records, &objects);
        errors.extend(messages);

        // Validated null names extend the parent universe for colliders.
        let mut parents = objects.clone();
        parents.merge(&null_names);

        let (colliders, collider_names, messages) =
            validate::validate_colliders(collider_records, &parents, scene, root);
        errors.extend(messages);

        Some((
            ColliderSetup {
                nulls,
                colliders,
                components: component_records,
            },
            collider_names,
        ))
    } else {
        None
    };

    // Bone collider references resolve against this parse's validated
    // colliders plus whatever already lives under the collider root.
    let mut collider_names = match &colliders {
        Some((_, names)) => names.clone(),
        None => NameSet::new(),
    };

    let mut live_ids = scene.descendants(root);
    live_ids.extend(scene.descendants(collider_root));

    for id in live_ids {
        if scene.get(id).is_some_and(|node| node.collider.is_some()) {
            collider_names.insert(scene.name(id));
        }
    }

    let bones = if settings.import_spring_bones {
        let (pivots, pivot_names, messages) = validate::validate_pivots(pivot_records, &objects);
        errors.extend(messages);

        let (bones, messages) =
            validate::validate_bones(bone_records, &objects, &pivot_names, &collider_names);
        errors.extend(messages);

        Some(BoneSetup { pivots, bones })
    } else {
        None
    };

    ParsedSetup {
        version,
        settings,
        bones,
        colliders: colliders.map(|(setup, _)| setup),
        errors,
    }
}

/// File wrapper; unreadable input is the one fatal `Err` here.
pub fn parse_file(
    path: impl AsRef<Path>,
    scene: &Scene,
    root: NodeId,
    collider_root: NodeId,
    settings: ImportSettings,
) -> Result<ParsedSetup> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Unable to read setup file: {}", path.display()))?;

    Ok(parse_setup(&text, scene, root, collider_root, settings))
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Passed through to [`BuildOptions::required_bones`].
    pub required_bones: Option<Vec<String>>,
    /// Build the valid subset even when validation errors are present.
    pub build_with_errors: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            required_bones: None,
            build_with_errors: true,
        }
    }
}

#[derive(Debug)]
pub struct ImportOutcome {
    pub parsed: ParsedSetup,
    /// `None` when the parse failed or the caller opted out of building
    /// with errors present.
    pub report: Option<BuildReport>,
}

/// Parse-then-build entry point. All messages flow through the sink; the
/// caller still gets them on the returned structs.
pub fn import_setup(
    scene: &mut Scene,
    root: NodeId,
    collider_root: NodeId,
    text: &str,
    settings: ImportSettings,
    options: &ImportOptions,
    registry: &DefinerRegistry,
    sink: &mut dyn DiagnosticsSink,
) -> ImportOutcome {
    let parsed = parse_setup(text, scene, root, collider_root, settings);

    for message in &parsed.errors {
        sink.report(message);
    }

    let buildable = parsed.succeeded() && (options.build_with_errors || !parsed.has_errors());

    let report = if buildable {
        let build_options = BuildOptions {
            required_bones: options.required_bones.clone(),
        };

        let report = build::build(scene, root, collider_root, &parsed, &build_options, registry);

        for message in &report.messages {
            sink.report(message);
        }

        Some(report)
    } else {
        None
    };

    ImportOutcome { parsed, report }
}

/// Serialize the live graph back into setup text.
pub fn export_setup(
    scene: &Scene,
    root: NodeId,
    collider_root: NodeId,
    settings: &ExportSettings,
    registry: &DefinerRegistry,
) -> String {
    export::export(scene, root, collider_root, settings, registry)
}
