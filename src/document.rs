use roxmltree::{Document, Node};

use crate::{AliasNamespacePair, MetadataError, Result, short_name_of};

/// A parsed CSDL/EDMX metadata document. This is a read-only wrapper around
/// the XML tree: all lookups match elements by local tag name so the usual
/// edmx/edm namespace prefixes never get in the way.
///
/// The document borrows the XML text it was parsed from, so the caller keeps
/// the text alive for as long as lookups run against it.
#[derive(Debug)]
pub struct MetadataDocument<'input> {
    doc: Document<'input>,
}

impl<'input> MetadataDocument<'input> {
    pub fn parse(xml: &'input str) -> Result<Self> {
        let doc = Document::parse(xml)?;
        Ok(Self { doc })
    }

    /// All `Schema` elements, in document order.
    pub fn schemas(&self) -> impl Iterator<Item = Node<'_, 'input>> {
        self.doc
            .root()
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "Schema")
    }

    /// All `EntityType` declarations across every schema, in document order.
    pub fn entity_types(&self) -> impl Iterator<Item = Node<'_, 'input>> {
        self.doc
            .root()
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "EntityType")
    }

    /// All `EnumType` declarations across every schema, in document order.
    pub fn enum_types(&self) -> impl Iterator<Item = Node<'_, 'input>> {
        self.doc
            .root()
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "EnumType")
    }

    /// Find an `EntityType` declaration by its short name.
    pub fn entity_type_node(&self, short_name: &str) -> Option<Node<'_, 'input>> {
        self.entity_types()
            .find(|n| n.attribute("Name") == Some(short_name))
    }

    /// Find an `EnumType` declaration by its short name.
    pub fn enum_type_node(&self, short_name: &str) -> Option<Node<'_, 'input>> {
        self.enum_types()
            .find(|n| n.attribute("Name") == Some(short_name))
    }

    pub fn entity_type_exists(&self, short_name: &str) -> bool {
        self.entity_type_node(short_name).is_some()
    }

    pub fn entity_type_names(&self) -> Vec<&str> {
        self.entity_types()
            .filter_map(|n| n.attribute("Name"))
            .collect()
    }

    /// The alias/namespace pair of the nearest enclosing `Schema` element.
    /// Nodes outside any schema get an empty pair.
    pub fn alias_namespace_of(&self, node: Node<'_, 'input>) -> AliasNamespacePair {
        for ancestor in node.ancestors() {
            if ancestor.is_element() && ancestor.tag_name().name() == "Schema" {
                return AliasNamespacePair::new(
                    ancestor.attribute("Alias").map(str::to_string),
                    ancestor.attribute("Namespace").map(str::to_string),
                );
            }
        }
        AliasNamespacePair::default()
    }

    /// Short names of the type and its transitive base types, nearest first.
    /// The chain ends early when a `BaseType` reference points at a type the
    /// document does not define, and self-referential inheritance loops in
    /// malformed metadata are cut rather than walked forever.
    pub fn base_type_chain(&self, short_name: &str) -> Vec<String> {
        let mut chain: Vec<String> = Vec::new();
        let mut current = short_name.to_string();
        while let Some(node) = self.entity_type_node(&current) {
            if chain.contains(&current) {
                break;
            }
            chain.push(current.clone());
            match node.attribute("BaseType") {
                Some(base) => current = short_name_of(base).to_string(),
                None => break,
            }
        }
        chain
    }
}

/// Fetch an attribute the schema requires, erroring with the element's tag
/// name for context when it is absent.
pub(crate) fn required_attr<'a, 'input>(
    node: Node<'a, 'input>,
    attribute: &'static str,
) -> Result<&'a str> {
    node.attribute(attribute)
        .ok_or_else(|| MetadataError::MissingAttribute {
            element: node.tag_name().name().to_string(),
            attribute,
        })
}

/// Parse a boolean attribute. Absent attributes take the given default;
/// anything other than the literal `true`/`false` is a format error.
pub(crate) fn bool_attr(node: Node<'_, '_>, attribute: &'static str, default: bool) -> Result<bool> {
    match node.attribute(attribute) {
        Some(raw) => raw.parse::<bool>().map_err(|_| MetadataError::Format {
            attribute: attribute.to_string(),
            value: raw.to_string(),
            expected: "boolean",
        }),
        None => Ok(default),
    }
}
