//! Typed records of the setup text format.

use std::fmt;
use std::str::FromStr;

use glam::Vec3;
use strum::{Display, EnumIter, EnumString};

use crate::scene::ColliderShape;

/// One parsed line of comma-separated fields, tagged with the section it was
/// read from. `None` is the default/root section before any marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub section: Option<String>,
    pub fields: Vec<String>,
}

impl Record {
    pub fn is_root(&self) -> bool {
        self.section.is_none()
    }

    /// Fields joined back for display in diagnostics.
    pub fn joined(&self) -> String {
        self.fields.join(",")
    }
}

/// Section names recognized by the pipeline. Marker lines preserve their
/// case in [`Record::section`]; matching is case-insensitive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Section {
    SpringBones,
    Pivots,
    Colliders,
    DynamicsNulls,
    Components,
}

impl Section {
    pub fn of(record: &Record) -> Option<Section> {
        record
            .section
            .as_deref()
            .and_then(|name| Section::from_str(name).ok())
    }
}

/// Collider discriminant tokens. Matched by exact string equality.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum ColliderKind {
    #[strum(serialize = "sp")]
    Sphere,
    #[strum(serialize = "cp")]
    Capsule,
    #[strum(serialize = "pa")]
    Panel,
}

impl ColliderKind {
    pub fn of(shape: ColliderShape) -> ColliderKind {
        match shape {
            ColliderShape::Sphere { .. } => ColliderKind::Sphere,
            ColliderShape::Capsule { .. } => ColliderKind::Capsule,
            ColliderShape::Panel { .. } => ColliderKind::Panel,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PivotRecord {
    pub name: String,
    pub parent_name: String,
    /// Local rotation in degrees.
    pub euler_angles: Vec3,
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct AngleLimitsRecord {
    pub enabled: bool,
    pub min: f32,
    pub max: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LengthLimitRecord {
    pub object_name: String,
    pub ratio: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoneRecord {
    pub bone_name: String,
    pub radius: f32,
    pub stiffness: f32,
    pub drag: f32,
    pub spring_force: Vec3,
    pub wind_influence: f32,
    pub pivot_name: String,
    pub y_limit: AngleLimitsRecord,
    pub z_limit: AngleLimitsRecord,
    pub angular_stiffness: f32,
    pub length_limits: Vec<LengthLimitRecord>,
    pub collider_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColliderRecord {
    pub name: String,
    pub parent_name: String,
    pub position: Vec3,
    /// Local rotation in degrees.
    pub euler_angles: Vec3,
    pub scale: Vec3,
    /// Empty when the collider follows no renderer.
    pub linked_renderer_name: String,
    pub shape: ColliderShape,
}

impl ColliderRecord {
    pub fn kind(&self) -> ColliderKind {
        ColliderKind::of(self.shape)
    }
}

/// Dynamics-null grouping node.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRecord {
    pub name: String,
    pub parent_name: String,
    pub position: Vec3,
    pub euler_angles: Vec3,
    pub scale: Vec3,
}

/// Opaque per-object annotation, dispatched through the definer registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDefinitionRecord {
    pub object_name: String,
    pub type_token: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
pub enum Severity {
    Error,
    Warning,
}

/// A collected parse, validation, or build problem. Never thrown past a
/// record batch; callers read these off [`super::ParsedSetup::errors`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParseMessage {
    pub severity: Severity,
    pub message: String,
    /// Offending record fields, joined for display.
    pub fields: String,
    /// Underlying coercion error, when one exists.
    pub detail: Option<String>,
    /// Name of the scene object the message refers to.
    pub context: Option<String>,
}

impl ParseMessage {
    pub fn error(message: impl Into<String>, record: &Record) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            fields: record.joined(),
            detail: None,
            context: None,
        }
    }

    pub fn warning(message: impl Into<String>, fields: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            fields: fields.into(),
            detail: None,
            context: None,
        }
    }

    pub fn error_with_fields(message: impl Into<String>, fields: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            fields: fields.into(),
            detail: None,
            context: None,
        }
    }

    /// Wrap a failed record deserialization.
    pub fn from_err(record: &Record, err: anyhow::Error) -> Self {
        Self {
            severity: Severity::Error,
            message: "Failed to read record".to_string(),
            fields: record.joined(),
            detail: Some(format!("{err:#}")),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ParseMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;

        if !self.fields.is_empty() {
            write!(f, " [{}]", self.fields)?;
        }

        if let Some(detail) = &self.detail {
            write!(f, " ({detail})")?;
        }

        Ok(())
    }
}
