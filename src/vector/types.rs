use std::fmt::{Display, Formatter};

/// Attribute field types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    Integer,
    IntegerList,
    Real,
    RealList,
    String,
    StringList,
    Binary,
    Date,
    Time,
    DateTime,
    Integer64,
    Integer64List,
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Integer => "Integer",
            FieldType::IntegerList => "IntegerList",
            FieldType::Real => "Real",
            FieldType::RealList => "RealList",
            FieldType::String => "String",
            FieldType::StringList => "StringList",
            FieldType::Binary => "Binary",
            FieldType::Date => "Date",
            FieldType::Time => "Time",
            FieldType::DateTime => "DateTime",
            FieldType::Integer64 => "Integer64",
            FieldType::Integer64List => "Integer64List",
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(
            self,
            FieldType::IntegerList
                | FieldType::RealList
                | FieldType::StringList
                | FieldType::Integer64List
        )
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Refinement of a [`FieldType`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FieldSubType {
    #[default]
    None,
    Boolean,
    Int16,
    Float32,
    Json,
    Uuid,
}

impl FieldSubType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldSubType::None => "None",
            FieldSubType::Boolean => "Boolean",
            FieldSubType::Int16 => "Int16",
            FieldSubType::Float32 => "Float32",
            FieldSubType::Json => "JSON",
            FieldSubType::Uuid => "UUID",
        }
    }

    /// Whether this subtype may refine `field_type`.
    pub fn is_compatible_with(&self, field_type: FieldType) -> bool {
        match self {
            FieldSubType::None => true,
            FieldSubType::Boolean | FieldSubType::Int16 => matches!(
                field_type,
                FieldType::Integer | FieldType::IntegerList
            ) || (*self == FieldSubType::Boolean
                && matches!(field_type, FieldType::Integer64 | FieldType::Integer64List)),
            FieldSubType::Float32 => matches!(field_type, FieldType::Real | FieldType::RealList),
            FieldSubType::Json | FieldSubType::Uuid => field_type == FieldType::String,
        }
    }
}

/// Text alignment of a field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Justification {
    #[default]
    Undefined,
    Left,
    Right,
}

/// Geometry types of geometry fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GeometryType {
    #[default]
    Unknown,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
    /// Layers without geometry.
    None,
}

impl GeometryType {
    pub fn name(&self) -> &'static str {
        match self {
            GeometryType::Unknown => "Unknown (any)",
            GeometryType::Point => "Point",
            GeometryType::LineString => "Line String",
            GeometryType::Polygon => "Polygon",
            GeometryType::MultiPoint => "Multi Point",
            GeometryType::MultiLineString => "Multi Line String",
            GeometryType::MultiPolygon => "Multi Polygon",
            GeometryType::GeometryCollection => "Geometry Collection",
            GeometryType::None => "None",
        }
    }
}

impl Display for GeometryType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
