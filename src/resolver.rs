use std::collections::HashMap;

use indexmap::IndexMap;
use roxmltree::Node;
use tracing::{debug, trace};

use crate::document::{bool_attr, required_attr};
use crate::{
    EntityTypeDescriptor, EnumMember, EnumTypeDescriptor, MetadataDocument, MetadataError,
    NavigationProperty, NormalProperty, Result, Srid, short_name_of,
};

/// Resolves `EntityType` declarations into flattened [`EntityTypeDescriptor`]s,
/// merging everything inherited from the base type chain.
///
/// Resolution recurses through base types, so descriptors are memoized by full
/// name within one resolver: resolving every descendant of a deep hierarchy
/// walks each chain segment once instead of once per descendant.
pub struct TypeResolver<'a, 'input> {
    doc: &'a MetadataDocument<'input>,
    cache: HashMap<String, EntityTypeDescriptor>,
}

impl<'a, 'input> TypeResolver<'a, 'input> {
    pub fn new(doc: &'a MetadataDocument<'input>) -> Self {
        Self {
            doc,
            cache: HashMap::new(),
        }
    }

    /// Resolve an entity type by its short name.
    pub fn resolve(&mut self, short_name: &str) -> Result<EntityTypeDescriptor> {
        let node = self
            .doc
            .entity_type_node(short_name)
            .ok_or_else(|| MetadataError::TypeNotFound(short_name.to_string()))?;
        self.resolve_node(node)
    }

    /// Resolve an `EntityType` element directly.
    ///
    /// Walks the declaration in document order: `Key` references are collected
    /// first (a `/`-qualified path into a complex-typed member keys on its
    /// leading segment), then `Property` and `NavigationProperty` children are
    /// appended after anything inherited from the base type. A member name
    /// redeclared on a derived type replaces the inherited entry in place, so
    /// names stay unique across the chain.
    pub fn resolve_node(&mut self, node: Node<'a, 'input>) -> Result<EntityTypeDescriptor> {
        if node.tag_name().name() != "EntityType" {
            return Err(MetadataError::InvalidInput {
                expected: "EntityType",
                found: node.tag_name().name().to_string(),
            });
        }

        let short_name = required_attr(node, "Name")?;
        let context = self.doc.alias_namespace_of(node);
        let full_name = context.qualify(short_name);
        if let Some(cached) = self.cache.get(&full_name) {
            trace!(%full_name, "entity type resolved from cache");
            return Ok(cached.clone());
        }
        debug!(%full_name, "resolving entity type");

        let mut descriptor = EntityTypeDescriptor {
            short_name: short_name.to_string(),
            namespace: context.namespace.clone(),
            alias: context.alias.clone(),
            full_name: full_name.clone(),
            base_type_full_name: None,
            has_stream: bool_attr(node, "HasStream", false)?,
            is_open_type: bool_attr(node, "OpenType", false)?,
            normal_properties: Vec::new(),
            navigation_properties: Vec::new(),
            property_declaring_type: IndexMap::new(),
            navigation_declaring_type: IndexMap::new(),
        };

        // Key property names accumulated across the chain. Base keys come
        // first so membership checks see the whole set.
        let mut key_names: Vec<String> = Vec::new();

        if let Some(base_reference) = node.attribute("BaseType") {
            let base_node = find_base_sibling(node, base_reference)
                .ok_or_else(|| MetadataError::TypeNotFound(base_reference.to_string()))?;
            let base = self.resolve_node(base_node)?;

            key_names.extend(base.key_properties().map(|p| p.name.clone()));
            descriptor.base_type_full_name = Some(base.full_name.clone());
            descriptor.normal_properties = base.normal_properties;
            descriptor.navigation_properties = base.navigation_properties;
            descriptor.property_declaring_type = base.property_declaring_type;
            descriptor.navigation_declaring_type = base.navigation_declaring_type;
        }

        for key in element_children(node, "Key") {
            for property_ref in element_children(key, "PropertyRef") {
                let name = required_attr(property_ref, "Name")?;
                // A path into a complex-typed member keys on its first segment.
                let leading = match name.find('/') {
                    Some(slash) => &name[..slash],
                    None => name,
                };
                if !key_names.iter().any(|k| k == leading) {
                    key_names.push(leading.to_string());
                }
            }
        }

        for child in node.children().filter(Node::is_element) {
            match child.tag_name().name() {
                "Property" => {
                    let property = parse_normal_property(child, &key_names)?;
                    descriptor
                        .property_declaring_type
                        .insert(property.name.clone(), full_name.clone());
                    upsert(&mut descriptor.normal_properties, property, |p| p.name.as_str());
                }
                "NavigationProperty" => {
                    let navigation = parse_navigation_property(child)?;
                    descriptor
                        .navigation_declaring_type
                        .insert(navigation.name.clone(), full_name.clone());
                    upsert(&mut descriptor.navigation_properties, navigation, |p| p.name.as_str());
                }
                _ => {}
            }
        }

        self.cache.insert(full_name, descriptor.clone());
        Ok(descriptor)
    }

    /// Resolve an `EnumType` declaration by its short name.
    pub fn resolve_enum(&mut self, short_name: &str) -> Result<EnumTypeDescriptor> {
        let node = self
            .doc
            .enum_type_node(short_name)
            .ok_or_else(|| MetadataError::TypeNotFound(short_name.to_string()))?;
        self.resolve_enum_node(node)
    }

    /// Resolve an `EnumType` element directly. Members must either all carry
    /// explicit `Value` attributes or all omit them; implicit values number
    /// the members 0..n in declaration order.
    pub fn resolve_enum_node(&mut self, node: Node<'a, 'input>) -> Result<EnumTypeDescriptor> {
        if node.tag_name().name() != "EnumType" {
            return Err(MetadataError::InvalidInput {
                expected: "EnumType",
                found: node.tag_name().name().to_string(),
            });
        }

        let short_name = required_attr(node, "Name")?;
        let context = self.doc.alias_namespace_of(node);

        let member_nodes: Vec<Node<'a, 'input>> = element_children(node, "Member").collect();
        let explicit = member_nodes
            .iter()
            .filter(|m| m.attribute("Value").is_some())
            .count();
        if explicit != 0 && explicit != member_nodes.len() {
            return Err(MetadataError::MixedEnumMemberValues(short_name.to_string()));
        }

        let mut members = Vec::with_capacity(member_nodes.len());
        for (position, member) in member_nodes.iter().enumerate() {
            let name = required_attr(*member, "Name")?;
            let value = match member.attribute("Value") {
                Some(raw) => raw.parse::<i64>().map_err(|_| MetadataError::Format {
                    attribute: "Value".to_string(),
                    value: raw.to_string(),
                    expected: "integer",
                })?,
                None => position as i64,
            };
            members.push(EnumMember {
                name: name.to_string(),
                value,
            });
        }

        Ok(EnumTypeDescriptor {
            short_name: short_name.to_string(),
            namespace: context.namespace.clone(),
            alias: context.alias.clone(),
            full_name: context.qualify(short_name),
            underlying_type: node
                .attribute("UnderlyingType")
                .unwrap_or("Edm.Int32")
                .to_string(),
            is_flags: bool_attr(node, "IsFlags", false)?,
            members,
        })
    }
}

/// Locate the base type among sibling `EntityType` declarations under the
/// same parent, matching the unqualified tail of the `BaseType` reference.
fn find_base_sibling<'a, 'input>(
    node: Node<'a, 'input>,
    base_reference: &str,
) -> Option<Node<'a, 'input>> {
    let base_short = short_name_of(base_reference);
    node.parent()?.children().find(|sibling| {
        sibling.is_element()
            && sibling.tag_name().name() == "EntityType"
            && sibling.attribute("Name") == Some(base_short)
    })
}

fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == tag)
}

fn parse_normal_property(node: Node<'_, '_>, key_names: &[String]) -> Result<NormalProperty> {
    let name = required_attr(node, "Name")?;
    let type_name = required_attr(node, "Type")?;

    let mut property = NormalProperty::new(name, type_name)
        .with_key(key_names.iter().any(|k| k == name))
        .with_nullable(bool_attr(node, "Nullable", true)?);

    if let Some(raw) = node.attribute("SRID") {
        let srid = raw.parse::<Srid>().map_err(|_| MetadataError::Format {
            attribute: "SRID".to_string(),
            value: raw.to_string(),
            expected: "non-negative integer or `variable`",
        })?;
        property = property.with_srid(srid);
    }

    Ok(property)
}

fn parse_navigation_property(node: Node<'_, '_>) -> Result<NavigationProperty> {
    let name = required_attr(node, "Name")?;
    let type_name = required_attr(node, "Type")?;

    let mut navigation = NavigationProperty::new(name, type_name)
        .with_contains_target(bool_attr(node, "ContainsTarget", false)?);
    if let Some(partner) = node.attribute("Partner") {
        navigation = navigation.with_partner(partner);
    }
    Ok(navigation)
}

/// Append an item keyed by name, replacing any existing entry with the same
/// name in place so member order is preserved.
fn upsert<T, F: Fn(&T) -> &str>(items: &mut Vec<T>, item: T, name_of: F) {
    match items.iter().position(|existing| name_of(existing) == name_of(&item)) {
        Some(index) => items[index] = item,
        None => items.push(item),
    }
}
