use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::{NavigationProperty, NormalProperty};

/// The alias/namespace context of the `Schema` element a type was declared
/// under. Either half may be absent on malformed documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AliasNamespacePair {
    pub alias: Option<String>,
    pub namespace: Option<String>,
}

impl AliasNamespacePair {
    pub fn new(alias: Option<String>, namespace: Option<String>) -> Self {
        Self { alias, namespace }
    }

    /// Qualify a short name, preferring the namespace over the alias. With
    /// neither available the short name is returned as-is.
    pub fn qualify(&self, short_name: &str) -> String {
        if let Some(namespace) = &self.namespace {
            format!("{namespace}.{short_name}")
        } else if let Some(alias) = &self.alias {
            format!("{alias}.{short_name}")
        } else {
            short_name.to_string()
        }
    }
}

impl fmt::Display for AliasNamespacePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Alias: {}, Namespace: {}",
            self.alias.as_deref().unwrap_or("<none>"),
            self.namespace.as_deref().unwrap_or("<none>"),
        )
    }
}

/// A flattened view of an `EntityType` declaration with its whole inheritance
/// chain merged in. Base members come before the type's own declarations and
/// each member name appears exactly once; a name redeclared on a derived type
/// replaces the inherited entry in place.
///
/// Descriptors are built once per resolution from the metadata snapshot and
/// not mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityTypeDescriptor {
    pub short_name: String,
    pub namespace: Option<String>,
    pub alias: Option<String>,

    /// `{namespace}.{name}`, falling back to `{alias}.{name}`, falling back
    /// to the bare short name.
    pub full_name: String,

    pub base_type_full_name: Option<String>,
    pub has_stream: bool,
    pub is_open_type: bool,

    pub normal_properties: Vec<NormalProperty>,
    pub navigation_properties: Vec<NavigationProperty>,

    /// Property name -> full name of the type that declared it, in member
    /// order. Answers "which type in the chain declared this member".
    pub property_declaring_type: IndexMap<String, String>,

    /// Navigation property name -> full name of the type that declared it.
    pub navigation_declaring_type: IndexMap<String, String>,
}

impl EntityTypeDescriptor {
    /// The key properties, i.e. the normal properties referenced by `Key`
    /// elements anywhere in the inheritance chain.
    pub fn key_properties(&self) -> impl Iterator<Item = &NormalProperty> {
        self.normal_properties.iter().filter(|p| p.is_key)
    }

    pub fn key_property_names(&self) -> Vec<&str> {
        self.key_properties().map(|p| p.name.as_str()).collect()
    }

    pub fn normal_property(&self, name: &str) -> Option<&NormalProperty> {
        self.normal_properties.iter().find(|p| p.name == name)
    }

    pub fn navigation_property(&self, name: &str) -> Option<&NavigationProperty> {
        self.navigation_properties.iter().find(|p| p.name == name)
    }

    /// Full name of the type that declared the given member, searching normal
    /// properties first, then navigation properties.
    pub fn declaring_type_of(&self, member_name: &str) -> Option<&str> {
        self.property_declaring_type
            .get(member_name)
            .or_else(|| self.navigation_declaring_type.get(member_name))
            .map(String::as_str)
    }
}
