//! Canonical column types and the widening-conversion policy.
//!
//! Column types are declared as free text (`varchar(255)`,
//! `character varying`, `int4`). [`ColumnType`] canonicalizes common
//! aliases so that a type declared in code compares equal to the spelling
//! reported by the catalog, and decides which type changes are safe to
//! apply in place.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

fn type_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([a-z_][a-z0-9_ ]*?)\s*(?:\(\s*(\d+)\s*(?:,\s*(\d+)\s*)?\))?\s*((?:\[\])*)$")
            .expect("column type pattern is valid")
    })
}

/// A parsed, alias-normalized column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnType {
    base: String,
    modifiers: Vec<u32>,
    array_depth: usize,
    opaque: bool,
}

impl ColumnType {
    /// Parses a textual type. Never fails; unrecognized shapes are kept as
    /// opaque lowercase text that only equals an identical spelling.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let normalized = text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase();

        let Some(caps) = type_pattern().captures(&normalized) else {
            return Self {
                base: normalized,
                modifiers: Vec::new(),
                array_depth: 0,
                opaque: true,
            };
        };

        let base = canonical_base(caps.get(1).map_or("", |m| m.as_str().trim()));
        let modifiers = [caps.get(2), caps.get(3)]
            .into_iter()
            .flatten()
            .filter_map(|m| m.as_str().parse().ok())
            .collect();
        let array_depth = caps.get(4).map_or(0, |m| m.as_str().len() / 2);

        Self {
            base: base.to_string(),
            modifiers,
            array_depth,
            opaque: false,
        }
    }

    /// Canonical base name, e.g. `varchar` or `double precision`.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Length / precision / scale modifiers, in declaration order.
    #[must_use]
    pub fn modifiers(&self) -> &[u32] {
        &self.modifiers
    }

    /// Whether this is an array type.
    #[must_use]
    pub const fn is_array(&self) -> bool {
        self.array_depth > 0
    }

    /// Returns `true` if a column of type `actual` can be converted to this
    /// type in place without losing data.
    #[must_use]
    pub fn can_convert_from(&self, actual: &Self) -> bool {
        if self == actual {
            return true;
        }
        if self.opaque || actual.opaque || self.array_depth != actual.array_depth {
            return false;
        }

        let from = actual.base.as_str();
        let to = self.base.as_str();

        if is_string_family(from) && is_string_family(to) {
            return string_widens(from, actual.length(), to, self.length());
        }
        if from == "varbinary" && to == "varbinary" {
            return length_widens(actual.length(), self.length());
        }
        if let (Some(from_rank), Some(to_rank)) = (integer_rank(from), integer_rank(to)) {
            return to_rank >= from_rank;
        }
        if from == "real" && to == "double precision" {
            return true;
        }
        if to == "numeric" {
            if let Some(digits) = integer_digits(from) {
                return match self.modifiers.as_slice() {
                    [] => true,
                    [precision] => *precision >= digits,
                    [precision, scale] => precision.saturating_sub(*scale) >= digits,
                    _ => false,
                };
            }
            if from == "numeric" {
                return numeric_widens(&actual.modifiers, &self.modifiers);
            }
        }
        false
    }

    fn length(&self) -> Option<u32> {
        self.modifiers.first().copied()
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)?;
        if !self.modifiers.is_empty() {
            let mods: Vec<String> = self.modifiers.iter().map(ToString::to_string).collect();
            write!(f, "({})", mods.join(", "))?;
        }
        for _ in 0..self.array_depth {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

fn canonical_base(base: &str) -> &str {
    match base {
        "int" | "int4" | "integer" | "serial" | "serial4" => "integer",
        "int2" | "smallint" | "smallserial" => "smallint",
        "int8" | "bigint" | "bigserial" | "serial8" => "bigint",
        "character varying" | "varchar" | "nvarchar" => "varchar",
        "character" | "char" | "bpchar" | "nchar" => "char",
        "bool" | "boolean" => "boolean",
        "float4" | "real" => "real",
        "float8" | "double precision" | "double" => "double precision",
        "decimal" | "numeric" => "numeric",
        "timestamp without time zone" | "timestamp" => "timestamp",
        "timestamp with time zone" | "timestamptz" => "timestamptz",
        "time without time zone" | "time" => "time",
        "varbinary" | "binary varying" => "varbinary",
        other => other,
    }
}

fn is_string_family(base: &str) -> bool {
    matches!(base, "varchar" | "char" | "text")
}

/// `None` means unbounded.
fn string_widens(from: &str, from_len: Option<u32>, to: &str, to_len: Option<u32>) -> bool {
    match (from, to) {
        (_, "text") => true,
        ("text", "varchar") => to_len.is_none(),
        ("varchar" | "char", "varchar") => length_widens(from_len, to_len),
        ("char", "char") => from_len == to_len,
        _ => false,
    }
}

fn length_widens(from: Option<u32>, to: Option<u32>) -> bool {
    match (from, to) {
        (_, None) => true,
        (None, Some(_)) => false,
        (Some(from), Some(to)) => to >= from,
    }
}

fn integer_rank(base: &str) -> Option<u8> {
    match base {
        "smallint" => Some(1),
        "integer" => Some(2),
        "bigint" => Some(3),
        _ => None,
    }
}

fn integer_digits(base: &str) -> Option<u32> {
    match base {
        "smallint" => Some(5),
        "integer" => Some(10),
        "bigint" => Some(19),
        _ => None,
    }
}

fn numeric_widens(from: &[u32], to: &[u32]) -> bool {
    let (from_precision, from_scale) = match from {
        [] => return to.is_empty(),
        [p] => (*p, 0),
        [p, s, ..] => (*p, *s),
    };
    let (to_precision, to_scale) = match to {
        [] => return true,
        [p] => (*p, 0),
        [p, s, ..] => (*p, *s),
    };
    to_scale >= from_scale
        && to_precision.saturating_sub(to_scale) >= from_precision.saturating_sub(from_scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(text: &str) -> ColumnType {
        ColumnType::parse(text)
    }

    #[test]
    fn aliases_are_canonical() {
        assert_eq!(ty("int4"), ty("INTEGER"));
        assert_eq!(ty("character varying(255)"), ty("varchar(255)"));
        assert_eq!(ty("timestamp without time zone"), ty("timestamp"));
        assert_eq!(ty("float8"), ty("double  precision"));
        assert_eq!(ty("decimal(10,2)"), ty("numeric(10, 2)"));
        assert_ne!(ty("varchar(10)"), ty("varchar(20)"));
    }

    #[test]
    fn parses_modifiers_and_arrays() {
        let t = ty("numeric(12, 4)");
        assert_eq!(t.base(), "numeric");
        assert_eq!(t.modifiers(), &[12, 4]);
        assert!(!t.is_array());

        let t = ty("text[]");
        assert!(t.is_array());
        assert_eq!(t.to_string(), "text[]");
    }

    #[test]
    fn string_widening_is_safe() {
        assert!(ty("varchar(100)").can_convert_from(&ty("varchar(50)")));
        assert!(ty("varchar").can_convert_from(&ty("varchar(50)")));
        assert!(ty("text").can_convert_from(&ty("varchar(50)")));
        assert!(ty("varchar(20)").can_convert_from(&ty("char(10)")));
    }

    #[test]
    fn string_narrowing_is_unsafe() {
        assert!(!ty("varchar(50)").can_convert_from(&ty("varchar(100)")));
        assert!(!ty("varchar(50)").can_convert_from(&ty("text")));
        assert!(!ty("char(5)").can_convert_from(&ty("char(10)")));
    }

    #[test]
    fn integer_rules() {
        assert!(ty("bigint").can_convert_from(&ty("int")));
        assert!(ty("integer").can_convert_from(&ty("smallint")));
        assert!(!ty("smallint").can_convert_from(&ty("bigint")));
        assert!(ty("numeric").can_convert_from(&ty("bigint")));
        assert!(ty("numeric(12, 2)").can_convert_from(&ty("integer")));
        assert!(!ty("numeric(8, 2)").can_convert_from(&ty("integer")));
    }

    #[test]
    fn numeric_rules() {
        assert!(ty("numeric(12, 4)").can_convert_from(&ty("numeric(10, 2)")));
        assert!(!ty("numeric(10, 1)").can_convert_from(&ty("numeric(10, 2)")));
        assert!(ty("numeric").can_convert_from(&ty("numeric(10, 2)")));
        assert!(!ty("numeric(10, 2)").can_convert_from(&ty("numeric")));
    }

    #[test]
    fn cross_family_is_unsafe() {
        assert!(!ty("integer").can_convert_from(&ty("text")));
        assert!(!ty("text").can_convert_from(&ty("integer")));
        assert!(!ty("timestamptz").can_convert_from(&ty("timestamp")));
        assert!(!ty("text[]").can_convert_from(&ty("text")));
        assert!(ty("double precision").can_convert_from(&ty("real")));
    }

    #[test]
    fn opaque_types_only_match_themselves() {
        let weird = ty("geometry(Point, 4326)");
        assert!(weird.can_convert_from(&ty("geometry(point, 4326)")));
        assert!(!weird.can_convert_from(&ty("geometry")));
    }
}
