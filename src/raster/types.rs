use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::errors::{GeoDataError, Result};

/// Pixel data types a band can hold.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum DataType {
    #[default]
    Unknown,
    UInt8,
    Int8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    UInt64,
    Int64,
    Float32,
    Float64,
}

impl DataType {
    /// Every concrete type, smallest first.
    pub fn available_types() -> &'static [DataType] {
        use DataType::*;
        &[
            UInt8, Int8, UInt16, Int16, UInt32, Int32, UInt64, Int64, Float32, Float64,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataType::Unknown => "Unknown",
            DataType::UInt8 => "Byte",
            DataType::Int8 => "Int8",
            DataType::UInt16 => "UInt16",
            DataType::Int16 => "Int16",
            DataType::UInt32 => "UInt32",
            DataType::Int32 => "Int32",
            DataType::UInt64 => "UInt64",
            DataType::Int64 => "Int64",
            DataType::Float32 => "Float32",
            DataType::Float64 => "Float64",
        }
    }

    /// Get the type size in **bits**.
    pub fn bits(&self) -> u8 {
        self.bytes() * 8
    }

    /// Get the type size in **bytes**.
    pub fn bytes(&self) -> u8 {
        match self {
            DataType::Unknown => 0,
            DataType::UInt8 | DataType::Int8 => 1,
            DataType::UInt16 | DataType::Int16 => 2,
            DataType::UInt32 | DataType::Int32 | DataType::Float32 => 4,
            DataType::UInt64 | DataType::Int64 | DataType::Float64 => 8,
        }
    }

    /// Returns `true` if data type is integral (non-floating point)
    pub fn is_integer(&self) -> bool {
        !matches!(
            self,
            DataType::Unknown | DataType::Float32 | DataType::Float64
        )
    }

    /// Returns `true` if data type is floating point (non-integral)
    pub fn is_floating(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    /// Returns `true` if data type supports negative values.
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::Float32
                | DataType::Float64
        )
    }

    /// Representable range, as `f64`.
    pub fn range(&self) -> (f64, f64) {
        match self {
            DataType::Unknown => (f64::NEG_INFINITY, f64::INFINITY),
            DataType::UInt8 => (u8::MIN as f64, u8::MAX as f64),
            DataType::Int8 => (i8::MIN as f64, i8::MAX as f64),
            DataType::UInt16 => (u16::MIN as f64, u16::MAX as f64),
            DataType::Int16 => (i16::MIN as f64, i16::MAX as f64),
            DataType::UInt32 => (u32::MIN as f64, u32::MAX as f64),
            DataType::Int32 => (i32::MIN as f64, i32::MAX as f64),
            DataType::UInt64 => (u64::MIN as f64, u64::MAX as f64),
            DataType::Int64 => (i64::MIN as f64, i64::MAX as f64),
            DataType::Float32 => (f32::MIN as f64, f32::MAX as f64),
            DataType::Float64 => (f64::MIN, f64::MAX),
        }
    }

    /// Adjusts `value` so that it is representable by this type.
    ///
    /// Values are saturated to the type's range; integer types truncate the
    /// fractional part and map NaN to 0. Float types keep NaN and infinities
    /// (finite values beyond `Float32` are saturated).
    pub fn adjust_value(&self, value: f64) -> f64 {
        match self {
            DataType::Unknown | DataType::Float64 => value,
            DataType::Float32 => {
                if value.is_finite() {
                    (value.clamp(f32::MIN as f64, f32::MAX as f64) as f32) as f64
                } else {
                    value
                }
            }
            _ => {
                if value.is_nan() {
                    return 0.0;
                }
                let (min, max) = self.range();
                value.trunc().clamp(min, max)
            }
        }
    }

    /// Smallest type able to hold values of both `self` and `other`.
    pub fn union(&self, other: DataType) -> DataType {
        if self == &other {
            return *self;
        }
        if *self == DataType::Unknown {
            return other;
        }
        if other == DataType::Unknown {
            return *self;
        }
        let (min_a, max_a) = self.range();
        let (min_b, max_b) = other.range();
        let (min, max) = (min_a.min(min_b), max_a.max(max_b));
        let floating = self.is_floating() || other.is_floating();
        DataType::available_types()
            .iter()
            .copied()
            .find(|t| {
                let (tmin, tmax) = t.range();
                (!floating || t.is_floating()) && tmin <= min && tmax >= max
            })
            .unwrap_or(DataType::Float64)
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = GeoDataError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        DataType::available_types()
            .iter()
            .copied()
            .find(|t| t.name().to_ascii_lowercase() == lower)
            .or_else(|| (lower == "uint8").then_some(DataType::UInt8))
            .ok_or_else(|| GeoDataError::BadArgument(format!("unknown data type '{s}'")))
    }
}

/// Type-level constraint for limiting which primitive numeric values can be passed
/// to functions needing target data type.
///
/// Pixel values cross the driver seam as `f64`; `from_f64` applies the
/// saturating conversion of [`DataType::adjust_value`].
pub trait PixelType: Copy {
    fn data_type() -> DataType;
    fn to_f64(self) -> f64;
    fn from_f64(value: f64) -> Self;
}

macro_rules! impl_pixel_type {
    ($t:ty, $dt:expr) => {
        impl PixelType for $t {
            fn data_type() -> DataType {
                $dt
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn from_f64(value: f64) -> Self {
                $dt.adjust_value(value) as $t
            }
        }
    };
}

impl_pixel_type!(u8, DataType::UInt8);
impl_pixel_type!(i8, DataType::Int8);
impl_pixel_type!(u16, DataType::UInt16);
impl_pixel_type!(i16, DataType::Int16);
impl_pixel_type!(u32, DataType::UInt32);
impl_pixel_type!(i32, DataType::Int32);
impl_pixel_type!(u64, DataType::UInt64);
impl_pixel_type!(i64, DataType::Int64);
impl_pixel_type!(f32, DataType::Float32);
impl_pixel_type!(f64, DataType::Float64);
