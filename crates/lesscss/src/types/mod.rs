//! Value types produced by expression evaluation.

pub mod color;
pub mod units;
pub mod value;

pub use color::{Color, ColorParseError};
pub use units::{Conversion, UnitGroup};
pub use value::{DataKind, Separator, Value, format_number};
