//! Unit groups and conversion factors.
//!
//! Units in the same group convert into each other through a fixed factor
//! relative to the group's base unit (`px`, `s`, `deg`, `dppx`). Units that
//! belong to no group (`em`, `rem`, `vw`, `%`, ...) never convert.

/// A family of mutually convertible units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitGroup {
    Length,
    Duration,
    Angle,
    Resolution,
}

static FACTORS: phf::Map<&'static str, (UnitGroup, f64)> = phf::phf_map! {
    "px" => (UnitGroup::Length, 1.0),
    "cm" => (UnitGroup::Length, 96.0 / 2.54),
    "mm" => (UnitGroup::Length, 96.0 / 25.4),
    "q" => (UnitGroup::Length, 96.0 / 101.6),
    "in" => (UnitGroup::Length, 96.0),
    "pt" => (UnitGroup::Length, 96.0 / 72.0),
    "pc" => (UnitGroup::Length, 16.0),
    "s" => (UnitGroup::Duration, 1.0),
    "ms" => (UnitGroup::Duration, 0.001),
    "deg" => (UnitGroup::Angle, 1.0),
    "rad" => (UnitGroup::Angle, 180.0 / std::f64::consts::PI),
    "grad" => (UnitGroup::Angle, 0.9),
    "turn" => (UnitGroup::Angle, 360.0),
    "dppx" => (UnitGroup::Resolution, 1.0),
    "x" => (UnitGroup::Resolution, 1.0),
    "dpi" => (UnitGroup::Resolution, 1.0 / 96.0),
    "dpcm" => (UnitGroup::Resolution, 2.54 / 96.0),
};

/// Returns the group of `unit`, or `None` if it does not convert.
pub fn group_of(unit: &str) -> Option<UnitGroup> {
    FACTORS
        .get(unit.to_ascii_lowercase().as_str())
        .map(|(group, _)| *group)
}

/// Outcome of trying to express a value of one unit in another.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Conversion {
    /// Converted value in the target unit.
    Converted(f64),
    /// At least one unit is outside every group; nothing to convert.
    Unrelated,
    /// Both units are known but belong to different groups.
    Incompatible,
}

/// Converts `value` from unit `from` into unit `to`.
///
/// ```
/// use lesscss::types::units::{convert, Conversion};
///
/// assert_eq!(convert(96.0, "px", "in"), Conversion::Converted(1.0));
/// assert_eq!(convert(1.0, "px", "em"), Conversion::Unrelated);
/// assert_eq!(convert(1.0, "px", "s"), Conversion::Incompatible);
/// ```
pub fn convert(value: f64, from: &str, to: &str) -> Conversion {
    if from.eq_ignore_ascii_case(to) {
        return Conversion::Converted(value);
    }
    let from_entry = FACTORS.get(from.to_ascii_lowercase().as_str());
    let to_entry = FACTORS.get(to.to_ascii_lowercase().as_str());
    match (from_entry, to_entry) {
        (Some((from_group, from_factor)), Some((to_group, to_factor))) => {
            if from_group == to_group {
                Conversion::Converted(value * from_factor / to_factor)
            } else {
                Conversion::Incompatible
            }
        }
        _ => Conversion::Unrelated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converted(value: f64, from: &str, to: &str) -> f64 {
        match convert(value, from, to) {
            Conversion::Converted(v) => v,
            other => panic!("expected conversion, got {:?}", other),
        }
    }

    #[test]
    fn test_length_conversions() {
        assert!((converted(1.0, "in", "cm") - 2.54).abs() < 1e-9);
        assert!((converted(10.0, "mm", "cm") - 1.0).abs() < 1e-9);
        assert!((converted(72.0, "pt", "in") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_other_groups() {
        assert!((converted(1500.0, "ms", "s") - 1.5).abs() < 1e-9);
        assert!((converted(1.0, "turn", "deg") - 360.0).abs() < 1e-9);
        assert!((converted(96.0, "dpi", "dppx") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_case_and_identity() {
        assert_eq!(convert(3.0, "PX", "px"), Conversion::Converted(3.0));
        assert_eq!(group_of("MS"), Some(UnitGroup::Duration));
        assert_eq!(group_of("em"), None);
    }
}
