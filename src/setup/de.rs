//! Positional record deserializers.
//!
//! Fields map positionally onto each record kind's declared order; a typed
//! cursor advances through the flat field list. A failed record yields one
//! error and leaves the rest of the batch untouched.

use std::str::FromStr;

use anyhow::{anyhow, bail, ensure, Context, Result};
use glam::Vec3;

use crate::scene::{ColliderShape, SpringBone};

use super::records::{
    AngleLimitsRecord, BoneRecord, ColliderKind, ColliderRecord, ComponentDefinitionRecord,
    LengthLimitRecord, PivotRecord, TransformRecord,
};

/// Typed cursor over a record's flat field list.
pub struct FieldReader<'a> {
    fields: &'a [String],
    cursor: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(fields: &'a [String]) -> Self {
        Self { fields, cursor: 0 }
    }

    fn next(&mut self) -> Result<&'a str> {
        let field = self
            .fields
            .get(self.cursor)
            .with_context(|| format!("Record ended at field {}", self.cursor + 1))?;

        self.cursor += 1;
        Ok(field.as_str())
    }

    fn parse<T: FromStr>(&mut self) -> Result<T>
    where
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let index = self.cursor;
        let field = self.next()?;

        field
            .parse()
            .with_context(|| format!("Bad value {:?} at field {}", field, index + 1))
    }

    pub fn next_str(&mut self) -> Result<String> {
        Ok(self.next()?.to_string())
    }

    pub fn next_f32(&mut self) -> Result<f32> {
        self.parse()
    }

    pub fn next_bool(&mut self) -> Result<bool> {
        let index = self.cursor;
        let field = self.next()?;

        parse_bool(field).with_context(|| format!("Bad value {:?} at field {}", field, index + 1))
    }

    pub fn next_vec3(&mut self) -> Result<Vec3> {
        Ok(Vec3::new(self.next_f32()?, self.next_f32()?, self.next_f32()?))
    }

    pub fn next_angle_limits(&mut self) -> Result<AngleLimitsRecord> {
        Ok(AngleLimitsRecord {
            enabled: self.next_bool()?,
            min: self.next_f32()?,
            max: self.next_f32()?,
        })
    }

    /// Default once the record has ended; present fields must still parse.
    pub fn next_f32_or(&mut self, default: f32) -> Result<f32> {
        if self.exhausted() {
            Ok(default)
        } else {
            self.next_f32()
        }
    }

    /// Count prefix of a pair list. Absent or empty means none.
    pub fn next_count(&mut self) -> Result<usize> {
        if self.exhausted() {
            return Ok(0);
        }

        let index = self.cursor;
        let field = self.next()?;

        if field.is_empty() {
            return Ok(0);
        }

        field
            .parse()
            .with_context(|| format!("Bad count {:?} at field {}", field, index + 1))
    }

    pub fn exhausted(&self) -> bool {
        self.cursor >= self.fields.len()
    }

    /// Consume the remaining fields as-is.
    pub fn tail(&mut self) -> Vec<String> {
        let rest = self.fields[self.cursor.min(self.fields.len())..].to_vec();
        self.cursor = self.fields.len();
        rest
    }

    /// Consume the remaining fields, skipping empty entries.
    pub fn tail_non_empty(&mut self) -> Vec<String> {
        self.tail().into_iter().filter(|field| !field.is_empty()).collect()
    }

    /// Trailing empty fields are tolerated; anything else is an arity error.
    pub fn finish(&mut self) -> Result<()> {
        let extra = self.tail();

        ensure!(
            extra.iter().all(String::is_empty),
            "Unexpected trailing fields: {}",
            extra.join(",")
        );

        Ok(())
    }
}

fn parse_bool(field: &str) -> Result<bool> {
    match field {
        "0" => Ok(false),
        "1" => Ok(true),
        _ if field.eq_ignore_ascii_case("true") => Ok(true),
        _ if field.eq_ignore_ascii_case("false") => Ok(false),
        _ => bail!("Expected boolean"),
    }
}

pub fn pivot(fields: &[String]) -> Result<PivotRecord> {
    let mut reader = FieldReader::new(fields);

    let name = reader.next_str()?;
    let parent_name = reader.next_str()?;
    let euler_angles = reader.next_vec3().context("Pivot angles")?;
    reader.finish()?;

    Ok(PivotRecord {
        name,
        parent_name,
        euler_angles,
    })
}

pub fn bone(fields: &[String]) -> Result<BoneRecord> {
    let mut reader = FieldReader::new(fields);

    let bone_name = reader.next_str()?;
    let radius = reader.next_f32()?;
    let stiffness = reader.next_f32()?;
    let drag = reader.next_f32()?;
    let spring_force = reader.next_vec3().context("Spring force")?;
    let wind_influence = reader.next_f32()?;
    let pivot_name = reader.next_str()?;
    let y_limit = reader.next_angle_limits().context("Y angle limit")?;
    let z_limit = reader.next_angle_limits().context("Z angle limit")?;

    // Fields from here on were added later and may be absent in older files.
    let angular_stiffness = reader.next_f32_or(SpringBone::default().angular_stiffness)?;

    let count = reader.next_count().context("Length limit count")?;
    let mut length_limits = Vec::with_capacity(count);

    for _ in 0..count {
        length_limits.push(LengthLimitRecord {
            object_name: reader.next_str()?,
            ratio: reader.next_f32()?,
        });
    }

    let collider_names = reader.tail_non_empty();

    Ok(BoneRecord {
        bone_name,
        radius,
        stiffness,
        drag,
        spring_force,
        wind_influence,
        pivot_name,
        y_limit,
        z_limit,
        angular_stiffness,
        length_limits,
        collider_names,
    })
}

pub fn collider(fields: &[String]) -> Result<ColliderRecord> {
    let mut reader = FieldReader::new(fields);

    // Common base first; its discriminant selects the concrete reader for
    // the remaining fields.
    let kind_token = reader.next_str()?;
    let kind = ColliderKind::from_str(&kind_token)
        .map_err(|_| anyhow!("Unrecognized collider kind: {:?}", kind_token))?;

    let name = reader.next_str()?;
    let parent_name = reader.next_str()?;
    let position = reader.next_vec3().context("Collider position")?;
    let euler_angles = reader.next_vec3().context("Collider angles")?;
    let scale = reader.next_vec3().context("Collider scale")?;
    let linked_renderer_name = reader.next_str()?;

    let shape = match kind {
        ColliderKind::Sphere => ColliderShape::Sphere {
            radius: reader.next_f32()?,
        },
        ColliderKind::Capsule => ColliderShape::Capsule {
            radius: reader.next_f32()?,
            height: reader.next_f32()?,
        },
        ColliderKind::Panel => ColliderShape::Panel {
            width: reader.next_f32()?,
            height: reader.next_f32()?,
        },
    };

    reader.finish()?;

    Ok(ColliderRecord {
        name,
        parent_name,
        position,
        euler_angles,
        scale,
        linked_renderer_name,
        shape,
    })
}

pub fn transform(fields: &[String]) -> Result<TransformRecord> {
    let mut reader = FieldReader::new(fields);

    let name = reader.next_str()?;
    let parent_name = reader.next_str()?;
    let position = reader.next_vec3().context("Null position")?;
    let euler_angles = reader.next_vec3().context("Null angles")?;
    let scale = reader.next_vec3().context("Null scale")?;
    reader.finish()?;

    Ok(TransformRecord {
        name,
        parent_name,
        position,
        euler_angles,
        scale,
    })
}

pub fn component(fields: &[String]) -> Result<ComponentDefinitionRecord> {
    let mut reader = FieldReader::new(fields);

    let object_name = reader.next_str()?;
    let type_token = reader.next_str()?;

    ensure!(!object_name.is_empty(), "Component object name is empty");
    ensure!(!type_token.is_empty(), "Component type token is empty");

    Ok(ComponentDefinitionRecord {
        object_name,
        type_token,
        fields: reader.tail(),
    })
}
