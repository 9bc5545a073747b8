//! Vector layer schemas
//!
//! ```
//! use geodata::vector::{Defn, FieldDefn, FieldType, GeomFieldDefn, GeometryType};
//!
//! let mut defn = Defn::new("roads");
//! let mut name = FieldDefn::new("name", FieldType::String);
//! name.set_width(80);
//! defn.add_field_defn(name);
//! defn.add_geom_field_defn(GeomFieldDefn::new("geom", GeometryType::LineString));
//!
//! assert_eq!(defn.field_index("NAME").unwrap(), 0);
//! assert_eq!(defn.geometry_type(), GeometryType::LineString);
//! ```

mod defn;
mod types;

pub use defn::{Defn, FieldDefn, GeomFieldDefn};
pub use types::{FieldSubType, FieldType, GeometryType, Justification};
