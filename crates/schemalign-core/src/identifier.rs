//! Qualified, case-insensitive schema object names.
//!
//! An [`Identifier`] pairs a container (the database schema) with a local
//! name. Comparisons ignore case on both parts while the original
//! spelling is kept for rendering.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Container used when a name carries no qualifier.
pub const DEFAULT_CONTAINER: &str = "public";

/// Number of hex digits appended to a truncated identifier.
const HASH_SUFFIX_LEN: usize = 8;

/// A qualified name such as `public.orders`.
///
/// Serializes as its qualified text form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Identifier {
    container: String,
    name: String,
}

impl Identifier {
    /// Creates an identifier from its two parts.
    #[must_use]
    pub fn new(container: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            name: name.into(),
        }
    }

    /// Parses `container.name` or a bare `name`.
    ///
    /// A bare name (or one with an empty container part) lands in
    /// [`DEFAULT_CONTAINER`]. Surrounding double quotes are stripped from
    /// each part. Parsing never fails.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        match text.split_once('.') {
            Some((container, name)) if !unquote(container).is_empty() => {
                Self::new(unquote(container), unquote(name))
            }
            Some((_, name)) => Self::new(DEFAULT_CONTAINER, unquote(name)),
            None => Self::new(DEFAULT_CONTAINER, unquote(text)),
        }
    }

    /// Returns the container (schema) part.
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Returns the local name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `container.name`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.container, self.name)
    }

    /// Returns the quoted, schema-qualified form used in DDL.
    #[must_use]
    pub fn quoted(&self) -> String {
        format!("{}.{}", quote(&self.container), quote(&self.name))
    }

    /// Returns a copy of this identifier in another container.
    #[must_use]
    pub fn with_container(&self, container: impl Into<String>) -> Self {
        Self::new(container, self.name.clone())
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.container.eq_ignore_ascii_case(&other.container)
            && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.container.to_ascii_lowercase().hash(state);
        self.name.to_ascii_lowercase().hash(state);
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.container, self.name)
    }
}

impl From<String> for Identifier {
    fn from(text: String) -> Self {
        Self::parse(&text)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.qualified_name()
    }
}

impl From<&str> for Identifier {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

fn unquote(part: &str) -> &str {
    let part = part.trim();
    part.strip_prefix('"')
        .and_then(|p| p.strip_suffix('"'))
        .unwrap_or(part)
}

/// Double-quotes an identifier, doubling embedded quotes.
#[must_use]
pub fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Shortens `name` to at most `max_len` characters, deterministically.
///
/// Names that already fit are returned unchanged. Longer names keep a
/// prefix followed by `_` and the first hex digits of the SHA-256 of the
/// whole name, so distinct long names stay distinct and the same input
/// always yields the same output.
#[must_use]
pub fn truncate_identifier(name: &str, max_len: usize) -> String {
    if name.chars().count() <= max_len {
        return name.to_string();
    }

    let digest = Sha256::digest(name.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();

    if max_len <= HASH_SUFFIX_LEN + 1 {
        return hex.chars().take(max_len).collect();
    }

    let prefix: String = name.chars().take(max_len - HASH_SUFFIX_LEN - 1).collect();
    format!("{prefix}_{}", &hex[..HASH_SUFFIX_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_qualified_name() {
        let id = Identifier::parse("sales.orders");
        assert_eq!(id.container(), "sales");
        assert_eq!(id.name(), "orders");
        assert_eq!(id.qualified_name(), "sales.orders");
    }

    #[test]
    fn parse_bare_name_uses_default_container() {
        let id = Identifier::parse("orders");
        assert_eq!(id.container(), DEFAULT_CONTAINER);
        assert_eq!(id.name(), "orders");

        let id = Identifier::parse(".orders");
        assert_eq!(id.container(), DEFAULT_CONTAINER);
    }

    #[test]
    fn parse_strips_quotes() {
        let id = Identifier::parse("\"Sales\".\"Orders\"");
        assert_eq!(id.container(), "Sales");
        assert_eq!(id.name(), "Orders");
    }

    #[test]
    fn equality_ignores_case() {
        let a = Identifier::parse("Public.Orders");
        let b = Identifier::parse("public.orders");
        assert_eq!(a, b);
        assert_ne!(a, Identifier::parse("sales.orders"));

        let set: std::collections::HashSet<Identifier> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn display_keeps_spelling() {
        assert_eq!(Identifier::new("Sales", "Orders").to_string(), "Sales.Orders");
        assert_eq!(Identifier::new("s", "o").quoted(), "\"s\".\"o\"");
    }

    #[test]
    fn quote_doubles_embedded_quotes() {
        assert_eq!(quote("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn truncation_is_noop_for_short_names() {
        assert_eq!(truncate_identifier("ix_orders_email", 63), "ix_orders_email");
    }

    #[test]
    fn truncation_is_deterministic() {
        let long = "ix_customer_order_line_items_customer_identifier_and_created_timestamp";
        let first = truncate_identifier(long, 30);
        let second = truncate_identifier(long, 30);
        assert_eq!(first, second);
        assert_eq!(first.chars().count(), 30);
        assert!(first.starts_with("ix_customer_order_lin"));
    }

    #[test]
    fn truncation_keeps_distinct_names_distinct() {
        let a = truncate_identifier("ix_some_really_long_table_name_column_a", 20);
        let b = truncate_identifier("ix_some_really_long_table_name_column_b", 20);
        assert_ne!(a, b);
    }

    #[test]
    fn truncation_with_tiny_limit_uses_digest() {
        let short = truncate_identifier("a_name_longer_than_six", 6);
        assert_eq!(short.len(), 6);
        assert!(short.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
