//! Version directive and legacy content detection.

use anyhow::{ensure, Context, Result};

use super::records::Record;
use super::ImportSettings;

pub const MIN_SUPPORTED: i32 = 3;
pub const MAX_SUPPORTED: i32 = 4;

/// Version written on export.
pub const CURRENT: i32 = 4;

/// First field of the directive record, matched case-insensitively.
pub const DIRECTIVE: &str = "version";

/// Marker searched for in legacy files that carry no version directive.
const SPRING_SECTION_MARKER: &str = "[springbones]";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Version {
    /// No directive present; legacy file.
    Unknown,
    Numbered(i32),
}

/// Find the version directive and narrow `settings` accordingly.
///
/// Settings are only ever narrowed here; no later stage re-widens them.
/// A directive outside the supported range is fatal.
pub fn detect(records: &[Record], text: &str, settings: &mut ImportSettings) -> Result<Version> {
    let directive = records.iter().find(|record| {
        record.is_root()
            && record
                .fields
                .first()
                .is_some_and(|field| field.eq_ignore_ascii_case(DIRECTIVE))
    });

    let Some(record) = directive else {
        // Legacy files are collider-only unless a spring bone section exists
        // somewhere in the raw text.
        let has_bones = text.to_ascii_lowercase().contains(SPRING_SECTION_MARKER);

        if !has_bones {
            settings.import_spring_bones = false;
        }

        return Ok(Version::Unknown);
    };

    let value = record.fields.get(1).map(String::as_str).unwrap_or_default();
    let version: i32 = value
        .parse()
        .with_context(|| format!("Malformed version directive: {value:?}"))?;

    ensure!(
        (MIN_SUPPORTED..=MAX_SUPPORTED).contains(&version),
        "Unsupported setup version {} (supported {}..={})",
        version,
        MIN_SUPPORTED,
        MAX_SUPPORTED
    );

    // Version 3 predates collision sections.
    if version < 4 {
        settings.import_collision = false;
    }

    Ok(Version::Numbered(version))
}
