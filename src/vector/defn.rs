use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::errors::{GeoDataError, Result};
use crate::spatial_ref::SpatialRef;
use crate::vector::{FieldSubType, FieldType, GeometryType, Justification};

/// Keywords a default value may use regardless of the format.
const DEFAULT_KEYWORDS: &[&str] = &["NULL", "CURRENT_TIMESTAMP", "CURRENT_TIME", "CURRENT_DATE"];

/// Attribute field definition.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDefn {
    name: String,
    alternative_name: String,
    field_type: FieldType,
    sub_type: FieldSubType,
    justify: Justification,
    width: i32,
    precision: i32,
    default: Option<String>,
    nullable: bool,
    unique: bool,
    ignored: bool,
}

impl FieldDefn {
    /// Creates a new field definition.
    ///
    /// The field is nullable, not ignored, has no default, width and precision 0.
    pub fn new(name: &str, field_type: FieldType) -> FieldDefn {
        FieldDefn {
            name: name.to_string(),
            alternative_name: String::new(),
            field_type,
            sub_type: FieldSubType::None,
            justify: Justification::Undefined,
            width: 0,
            precision: 0,
            default: None,
            nullable: true,
            unique: false,
            ignored: false,
        }
    }

    /// Sets name, type, width, precision and justification at once.
    pub fn set(
        &mut self,
        name: &str,
        field_type: FieldType,
        width: i32,
        precision: i32,
        justify: Justification,
    ) {
        self.set_name(name);
        self.set_field_type(field_type);
        self.set_width(width);
        self.set_precision(precision);
        self.set_justify(justify);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Get the alternative name (alias) of this field.
    pub fn alternative_name(&self) -> &str {
        &self.alternative_name
    }

    pub fn set_alternative_name(&mut self, alternative_name: &str) {
        self.alternative_name = alternative_name.to_string();
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Changes the type; a sub-type that no longer fits is reset.
    pub fn set_field_type(&mut self, field_type: FieldType) {
        self.field_type = field_type;
        if !self.sub_type.is_compatible_with(field_type) {
            self.sub_type = FieldSubType::None;
        }
    }

    pub fn sub_type(&self) -> FieldSubType {
        self.sub_type
    }

    pub fn set_sub_type(&mut self, sub_type: FieldSubType) -> Result<()> {
        if !sub_type.is_compatible_with(self.field_type) {
            return Err(GeoDataError::BadArgument(format!(
                "sub-type {} does not apply to {} fields",
                sub_type.name(),
                self.field_type
            )));
        }
        self.sub_type = sub_type;
        Ok(())
    }

    pub fn justify(&self) -> Justification {
        self.justify
    }

    pub fn set_justify(&mut self, justify: Justification) {
        self.justify = justify;
    }

    /// Get the formatting width for this field.
    ///
    /// Zero means no specified width.
    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn set_width(&mut self, width: i32) {
        self.width = width.max(0);
    }

    /// Get the formatting precision for this field.
    ///
    /// This should normally be zero for fields of types other than Real.
    pub fn precision(&self) -> i32 {
        self.precision
    }

    pub fn set_precision(&mut self, precision: i32) {
        self.precision = precision;
    }

    /// Return whether this field can receive null values.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn set_nullable(&mut self, nullable: bool) {
        self.nullable = nullable;
    }

    /// Return whether this field has a unique constraint.
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn set_unique(&mut self, unique: bool) {
        self.unique = unique;
    }

    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    pub fn set_ignored(&mut self, ignored: bool) {
        self.ignored = ignored;
    }

    /// Get default field value.
    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Sets the default value, or removes it with `None`.
    ///
    /// The value is an SQL-like expression: a number, a `'quoted'` literal
    /// with embedded quotes doubled, `NULL`, one of the `CURRENT_*` keywords,
    /// or something only the originating format understands. A literal that
    /// opens a quote but is not correctly quoted is rejected and the previous
    /// default is kept.
    pub fn set_default(&mut self, default: Option<&str>) -> Result<()> {
        let Some(default) = default else {
            self.default = None;
            return Ok(());
        };
        if default.starts_with('\'') && !is_quoted_literal(default) {
            return Err(GeoDataError::BadArgument(format!(
                "incorrectly quoted string literal: {default}"
            )));
        }
        self.default = Some(default.to_string());
        Ok(())
    }

    /// Sets a string default, quoting it.
    pub fn set_default_string(&mut self, value: &str) {
        self.default = Some(format!("'{}'", value.replace('\'', "''")));
    }

    /// Sets a date-time default as `'YYYY/MM/DD HH:MM:SS[.sss]'`.
    pub fn set_default_datetime(&mut self, value: NaiveDateTime) {
        let mut literal = format!(
            "'{:04}/{:02}/{:02} {:02}:{:02}:{:02}",
            value.year(),
            value.month(),
            value.day(),
            value.hour(),
            value.minute(),
            value.second()
        );
        let millis = value.nanosecond() / 1_000_000 % 1000;
        if millis != 0 {
            literal.push_str(&format!(".{millis:03}"));
        }
        literal.push('\'');
        self.default = Some(literal);
    }

    /// The default as a date-time, if it is a `'YYYY/MM/DD HH:MM:SS[.sss]'`
    /// (or `-` separated) literal.
    pub fn default_as_datetime(&self) -> Option<NaiveDateTime> {
        let literal = self.default.as_deref()?;
        let body = literal.strip_prefix('\'')?.strip_suffix('\'')?;
        parse_datetime(body)
    }

    /// The default value as an unquoted string, if it is a quoted literal.
    pub fn default_as_string(&self) -> Option<String> {
        let literal = self.default.as_deref()?;
        if !is_quoted_literal(literal) {
            return None;
        }
        Some(literal[1..literal.len() - 1].replace("''", "'"))
    }

    /// Returns `true` if the default value is only meaningful to the format
    /// that produced it and must not be interpreted.
    pub fn is_default_driver_specific(&self) -> bool {
        let Some(default) = self.default.as_deref() else {
            return false;
        };
        if DEFAULT_KEYWORDS
            .iter()
            .any(|keyword| keyword.eq_ignore_ascii_case(default))
        {
            return false;
        }
        if default.len() >= 2 && default.starts_with('\'') && default.ends_with('\'') {
            return false;
        }
        let number = default.trim_start();
        if number.is_empty() || number.parse::<f64>().is_ok() {
            return false;
        }
        true
    }
}

/// `'...'` with every embedded quote doubled.
fn is_quoted_literal(value: &str) -> bool {
    let Some(body) = value
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    else {
        return false;
    };
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\'' && chars.next() != Some('\'') {
            return false;
        }
    }
    true
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let (date, time) = text.trim().split_once(' ')?;
    let mut date_parts = date.split(['/', '-']);
    let year = date_parts.next()?.parse::<i32>().ok()?;
    let month = date_parts.next()?.parse::<u32>().ok()?;
    let day = date_parts.next()?.parse::<u32>().ok()?;
    if date_parts.next().is_some() {
        return None;
    }

    let (hms, fraction) = match time.split_once('.') {
        Some((hms, fraction)) => (hms, Some(fraction)),
        None => (time, None),
    };
    let mut time_parts = hms.split(':');
    let hour = time_parts.next()?.parse::<u32>().ok()?;
    let minute = time_parts.next()?.parse::<u32>().ok()?;
    let second = time_parts.next()?.parse::<u32>().ok()?;
    if time_parts.next().is_some() {
        return None;
    }
    let millis = match fraction {
        Some(f) if !f.is_empty() && f.len() <= 3 && f.chars().all(|c| c.is_ascii_digit()) => {
            f.parse::<u32>().ok()? * 10u32.pow(3 - f.len() as u32)
        }
        Some(_) => return None,
        None => 0,
    };

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_milli_opt(hour, minute, second, millis)
}

/// Geometry field definition.
#[derive(Clone, Debug, PartialEq)]
pub struct GeomFieldDefn {
    name: String,
    geometry_type: GeometryType,
    spatial_ref: Option<SpatialRef>,
    nullable: bool,
    ignored: bool,
}

impl GeomFieldDefn {
    pub fn new(name: &str, geometry_type: GeometryType) -> GeomFieldDefn {
        GeomFieldDefn {
            name: name.to_string(),
            geometry_type,
            spatial_ref: None,
            nullable: true,
            ignored: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn field_type(&self) -> GeometryType {
        self.geometry_type
    }

    pub fn set_field_type(&mut self, geometry_type: GeometryType) {
        self.geometry_type = geometry_type;
    }

    pub fn spatial_ref(&self) -> Option<&SpatialRef> {
        self.spatial_ref.as_ref()
    }

    pub fn set_spatial_ref(&mut self, spatial_ref: Option<SpatialRef>) {
        self.spatial_ref = spatial_ref;
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn set_nullable(&mut self, nullable: bool) {
        self.nullable = nullable;
    }

    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    pub fn set_ignored(&mut self, ignored: bool) {
        self.ignored = ignored;
    }
}

/// Layer definition
///
/// Defines the fields available for features in a layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Defn {
    name: String,
    fields: Vec<FieldDefn>,
    geom_fields: Vec<GeomFieldDefn>,
}

impl Defn {
    pub fn new(name: &str) -> Defn {
        Defn {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a field, returning its index.
    pub fn add_field_defn(&mut self, field: FieldDefn) -> usize {
        self.fields.push(field);
        self.fields.len() - 1
    }

    /// Appends a geometry field, returning its index.
    pub fn add_geom_field_defn(&mut self, field: GeomFieldDefn) -> usize {
        self.geom_fields.push(field);
        self.geom_fields.len() - 1
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn geom_field_count(&self) -> usize {
        self.geom_fields.len()
    }

    /// Index of the field named `name` (case-insensitive).
    pub fn field_index(&self, name: &str) -> Result<usize> {
        self.fields
            .iter()
            .position(|f| f.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| GeoDataError::NotFound {
                what: format!("Field '{name}'"),
            })
    }

    /// Index of the geometry field named `name` (case-insensitive).
    pub fn geom_field_index(&self, name: &str) -> Result<usize> {
        self.geom_fields
            .iter()
            .position(|f| f.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| GeoDataError::NotFound {
                what: format!("Geometry field '{name}'"),
            })
    }

    pub fn field(&self, index: usize) -> Result<&FieldDefn> {
        self.fields.get(index).ok_or(GeoDataError::IndexOutOfRange {
            what: "Field",
            index,
            count: self.fields.len(),
        })
    }

    pub fn field_mut(&mut self, index: usize) -> Result<&mut FieldDefn> {
        let count = self.fields.len();
        self.fields.get_mut(index).ok_or(GeoDataError::IndexOutOfRange {
            what: "Field",
            index,
            count,
        })
    }

    /// Removes the field at `index`.
    pub fn delete_field_defn(&mut self, index: usize) -> Result<FieldDefn> {
        if index >= self.fields.len() {
            return Err(GeoDataError::IndexOutOfRange {
                what: "Field",
                index,
                count: self.fields.len(),
            });
        }
        Ok(self.fields.remove(index))
    }

    /// Iterate over the field schema of this layer.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDefn> {
        self.fields.iter()
    }

    /// Iterate over the geometry field schema of this layer.
    pub fn geom_fields(&self) -> impl Iterator<Item = &GeomFieldDefn> {
        self.geom_fields.iter()
    }

    /// Get the geometry type of the first geometry field
    pub fn geometry_type(&self) -> GeometryType {
        self.geom_fields
            .first()
            .map(GeomFieldDefn::field_type)
            .unwrap_or(GeometryType::None)
    }
}
