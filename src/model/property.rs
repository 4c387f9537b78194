use std::str::FromStr;

use serde::Serialize;

/// Simplified classification of a navigation property: either it points at a
/// single entity or at a collection of them, ignoring the full type detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RoughType {
    SingleValued,
    CollectionValued,
}

/// A spatial reference system id. CSDL allows the literal `variable` in
/// addition to a non-negative integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Srid {
    Variable,
    Value(u32),
}

impl FromStr for Srid {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "variable" {
            Ok(Self::Variable)
        } else {
            s.parse::<u32>().map(Self::Value)
        }
    }
}

/// A structural (non-navigation) property declared on an entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalProperty {
    pub name: String,
    pub type_name: String,

    /// Whether the property is referenced by the entity type's `Key`.
    pub is_key: bool,

    /// `Nullable` defaults to true when the attribute is absent.
    pub is_nullable: bool,

    /// Scratch flag set by payload comparison when a response carried an
    /// explicit null for this property.
    pub is_value_null: bool,

    pub srid: Option<Srid>,
}

impl NormalProperty {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            is_key: false,
            is_nullable: true,
            is_value_null: false,
            srid: None,
        }
    }

    pub fn with_key(mut self, is_key: bool) -> Self {
        self.is_key = is_key;
        self
    }

    pub fn with_nullable(mut self, is_nullable: bool) -> Self {
        self.is_nullable = is_nullable;
        self
    }

    pub fn with_srid(mut self, srid: Srid) -> Self {
        self.srid = Some(srid);
        self
    }
}

/// A navigation property declared on an entity type: a typed reference to
/// another entity type, or to a collection of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationProperty {
    pub name: String,
    pub type_name: String,
    pub partner: Option<String>,

    /// `ContainsTarget` defaults to false when the attribute is absent.
    pub contains_target: bool,
}

impl NavigationProperty {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            partner: None,
            contains_target: false,
        }
    }

    pub fn with_partner(mut self, partner: impl Into<String>) -> Self {
        self.partner = Some(partner.into());
        self
    }

    pub fn with_contains_target(mut self, contains_target: bool) -> Self {
        self.contains_target = contains_target;
        self
    }

    /// Collection-valued iff the declared type is wrapped as `Collection(...)`.
    pub fn rough_type(&self) -> RoughType {
        if self.type_name.starts_with("Collection(") && self.type_name.ends_with(')') {
            RoughType::CollectionValued
        } else {
            RoughType::SingleValued
        }
    }

    /// Unqualified short name of the target entity type, with any
    /// `Collection(...)` wrapper and namespace/alias qualifier removed.
    pub fn target_short_name(&self) -> &str {
        short_name_of(unwrap_collection(&self.type_name))
    }
}

/// Strip a `Collection(...)` wrapper, leaving the element type name. Names
/// that are not collection-wrapped pass through unchanged.
pub fn unwrap_collection(type_name: &str) -> &str {
    type_name
        .strip_prefix("Collection(")
        .and_then(|inner| inner.strip_suffix(')'))
        .unwrap_or(type_name)
}

/// Reduce a (possibly namespace- or alias-qualified) type name to its
/// trailing short-name segment.
pub fn short_name_of(type_name: &str) -> &str {
    match type_name.rfind('.') {
        Some(dot) => &type_name[dot + 1..],
        None => type_name,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn single_valued_navigation() {
        let nav = NavigationProperty::new("Category", "ODataDemo.Category");
        assert_eq!(nav.rough_type(), RoughType::SingleValued);
        assert_eq!(nav.target_short_name(), "Category");
    }

    #[test]
    fn collection_valued_navigation() {
        let nav = NavigationProperty::new("Products", "Collection(ODataDemo.Product)");
        assert_eq!(nav.rough_type(), RoughType::CollectionValued);
        assert_eq!(nav.target_short_name(), "Product");
    }

    #[test]
    fn unqualified_type_passes_through() {
        assert_eq!(short_name_of("Category"), "Category");
        assert_eq!(unwrap_collection("Category"), "Category");
    }

    #[test]
    fn srid_parsing() {
        assert_eq!("variable".parse::<Srid>().unwrap(), Srid::Variable);
        assert_eq!("4326".parse::<Srid>().unwrap(), Srid::Value(4326));
        assert!("Variable".parse::<Srid>().is_err());
        assert!("-1".parse::<Srid>().is_err());
    }

    #[test]
    fn normal_property_defaults() {
        let property = NormalProperty::new("Id", "Edm.Int32");
        assert!(property.is_nullable);
        assert!(!property.is_key);
        assert!(!property.is_value_null);
        assert_eq!(property.srid, None);
    }
}
