//! Product variant selection.

use serde::{Deserialize, Serialize};

/// A shopper's variant selection for a cart line.
///
/// Both axes are optional: products without colorways or sizes leave them
/// unset. Two lines for the same product with different selections are
/// distinct cart lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variant {
    /// Selected color, if the product has colorways.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Selected size, if the product is sized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl Variant {
    /// A selection with neither color nor size.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            color: None,
            size: None,
        }
    }

    /// Whether no axis is selected.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.color.is_none() && self.size.is_none()
    }

    /// Key form used for uniqueness: unset axes collapse to the empty
    /// string, matching the database's unique index expression.
    #[must_use]
    pub fn key(&self) -> (&str, &str) {
        (
            self.color.as_deref().unwrap_or(""),
            self.size.as_deref().unwrap_or(""),
        )
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.color, &self.size) {
            (Some(color), Some(size)) => write!(f, "{color}/{size}"),
            (Some(color), None) => f.write_str(color),
            (None, Some(size)) => f.write_str(size),
            (None, None) => f.write_str("-"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_collapses_unset_axes() {
        assert_eq!(Variant::none().key(), ("", ""));

        let variant = Variant {
            color: Some("Indigo".to_string()),
            size: None,
        };
        assert_eq!(variant.key(), ("Indigo", ""));
    }

    #[test]
    fn equal_selections_share_a_key() {
        let a = Variant {
            color: Some("Indigo".to_string()),
            size: Some("M".to_string()),
        };
        let b = a.clone();
        assert_eq!(a.key(), b.key());
        assert_eq!(a, b);
    }
}
