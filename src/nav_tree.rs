use std::collections::VecDeque;

use serde::Serialize;
use tracing::debug;

use crate::{
    MetadataDocument, NavigationProperty, Result, RoughType, TypeResolver, unwrap_collection,
};

/// Identifies a node within one [`NavigationTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodeId(usize);

/// One navigation property reachable from the tree's root entity type. The
/// root itself is a synthetic node carrying the sentinel name `"root"` and an
/// empty path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationTreeNode {
    /// The navigation property name this node was reached through.
    pub name: String,

    pub target_type_short_name: String,
    pub target_type_full_name: String,

    /// `/{navigation name}/{target full name}` segments accumulated from the
    /// root down to this node.
    pub path: String,

    pub is_collection: bool,
    pub partner: Option<String>,
    pub contains_target: bool,

    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NavigationTreeNode {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// The tree of navigation properties reachable from one root entity type.
///
/// Nodes live in an arena indexed by [`NodeId`]: children are owned through
/// their ids and the parent link is a plain back-index, used only for
/// ancestor-chain walks, never for ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationTree {
    nodes: Vec<NavigationTreeNode>,
}

impl NavigationTree {
    pub const ROOT: NodeId = NodeId(0);

    pub fn root(&self) -> &NavigationTreeNode {
        &self.nodes[Self::ROOT.0]
    }

    pub fn node(&self, id: NodeId) -> &NavigationTreeNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in creation order, root first.
    pub fn iter(&self) -> impl Iterator<Item = &NavigationTreeNode> {
        self.nodes.iter()
    }

    /// Breadth-first search by navigation property name. The shallowest match
    /// wins; among equally shallow matches, the first child discovered during
    /// construction wins.
    ///
    /// With a declaring-type filter, a matched node only counts when its
    /// parent's type is the filter type or any of the filter type's base
    /// types, so navigation properties inherited from an ancestor still match
    /// a query naming the derived type.
    pub fn search(
        &self,
        navigation_name: &str,
        declaring_type_short_name: Option<&str>,
        doc: &MetadataDocument<'_>,
    ) -> Option<&NavigationTreeNode> {
        let declaring_chain = declaring_type_short_name.map(|short| doc.base_type_chain(short));

        let mut queue = VecDeque::from([Self::ROOT]);
        while let Some(id) = queue.pop_front() {
            let node = self.node(id);
            if node.name == navigation_name {
                let accepted = match (&declaring_chain, node.parent) {
                    (None, _) => true,
                    (Some(chain), Some(parent)) => chain
                        .iter()
                        .any(|t| *t == self.node(parent).target_type_short_name),
                    (Some(_), None) => false,
                };
                if accepted {
                    return Some(node);
                }
            }
            queue.extend(node.children.iter().copied());
        }
        None
    }
}

/// Builds a [`NavigationTree`] from a root entity type short name.
///
/// Every navigation property of a visited type becomes a child node. Only
/// containment navigation properties (`ContainsTarget="true"`) are expanded
/// further, and only when their target type has not already appeared on the
/// path from the root, so mutually containing types terminate as leaves on
/// their second occurrence. Node paths are threaded through the recursion as
/// values, so concurrent builds never share state.
pub struct NavigationTreeBuilder<'a, 'input> {
    doc: &'a MetadataDocument<'input>,
    resolver: TypeResolver<'a, 'input>,
}

impl<'a, 'input> NavigationTreeBuilder<'a, 'input> {
    pub fn new(doc: &'a MetadataDocument<'input>) -> Self {
        Self {
            doc,
            resolver: TypeResolver::new(doc),
        }
    }

    /// Build the tree. Fails with [`crate::MetadataError::TypeNotFound`] when
    /// the root type itself is absent from the document.
    pub fn build(mut self, root_short_name: &str) -> Result<NavigationTree> {
        let root_descriptor = self.resolver.resolve(root_short_name)?;
        debug!(root = %root_descriptor.full_name, "building navigation tree");

        let mut tree = NavigationTree {
            nodes: vec![NavigationTreeNode {
                name: "root".to_string(),
                target_type_short_name: root_descriptor.short_name.clone(),
                target_type_full_name: root_descriptor.full_name.clone(),
                path: String::new(),
                is_collection: false,
                partner: None,
                contains_target: false,
                parent: None,
                children: Vec::new(),
            }],
        };
        self.expand(&mut tree, NavigationTree::ROOT)?;
        Ok(tree)
    }

    /// Populate the children of `id` from its target type's effective
    /// navigation properties (inherited ones included), recursing into
    /// containment children that pass the cycle guard.
    fn expand(&mut self, tree: &mut NavigationTree, id: NodeId) -> Result<()> {
        let (type_short_name, parent_path) = {
            let node = tree.node(id);
            (node.target_type_short_name.clone(), node.path.clone())
        };
        let descriptor = self.resolver.resolve(&type_short_name)?;

        for navigation in &descriptor.navigation_properties {
            let target_short_name = navigation.target_short_name().to_string();
            let target_full_name = self.target_full_name(navigation, &target_short_name)?;
            let target_exists = self.doc.entity_type_exists(&target_short_name);

            let child_id = NodeId(tree.nodes.len());
            tree.nodes.push(NavigationTreeNode {
                name: navigation.name.clone(),
                target_type_short_name: target_short_name.clone(),
                target_type_full_name: target_full_name.clone(),
                path: format!("{parent_path}/{}/{target_full_name}", navigation.name),
                is_collection: navigation.rough_type() == RoughType::CollectionValued,
                partner: navigation.partner.clone(),
                contains_target: navigation.contains_target,
                parent: Some(id),
                children: Vec::new(),
            });
            tree.nodes[id.0].children.push(child_id);

            // Containment edges recurse unless the target type already sits on
            // the path root -> here; everything else stays one level deep.
            if navigation.contains_target
                && target_exists
                && !on_ancestor_path(tree, id, &target_short_name)
            {
                self.expand(tree, child_id)?;
            }
        }
        Ok(())
    }

    /// The target's own full name when the document defines it, otherwise the
    /// qualified name as written on the navigation property.
    fn target_full_name(
        &mut self,
        navigation: &NavigationProperty,
        target_short_name: &str,
    ) -> Result<String> {
        if self.doc.entity_type_exists(target_short_name) {
            Ok(self.resolver.resolve(target_short_name)?.full_name)
        } else {
            Ok(unwrap_collection(&navigation.type_name).to_string())
        }
    }
}

/// True when `short_name` appears among the target types on the path
/// root -> `from`, inclusive of `from` itself.
fn on_ancestor_path(tree: &NavigationTree, from: NodeId, short_name: &str) -> bool {
    let mut current = Some(from);
    while let Some(id) = current {
        let node = tree.node(id);
        if node.target_type_short_name == short_name {
            return true;
        }
        current = node.parent;
    }
    false
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::MetadataError;

    const PRODUCT_METADATA: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<edmx:Edmx xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx" Version="4.0">
  <edmx:DataServices>
    <Schema xmlns="http://docs.oasis-open.org/odata/ns/edm" Namespace="ODataDemo">
      <EntityType Name="Product">
        <Key>
          <PropertyRef Name="Id" />
        </Key>
        <Property Name="Id" Type="Edm.Int32" Nullable="false" />
        <NavigationProperty Name="Category" Type="ODataDemo.Category" ContainsTarget="true" />
      </EntityType>
      <EntityType Name="Category">
        <Key>
          <PropertyRef Name="Id" />
        </Key>
        <Property Name="Id" Type="Edm.Int32" Nullable="false" />
        <NavigationProperty Name="Supplier" Type="ODataDemo.Supplier" />
        <NavigationProperty Name="Reviews" Type="Collection(ODataDemo.Review)" ContainsTarget="true" />
      </EntityType>
      <EntityType Name="Supplier">
        <Key>
          <PropertyRef Name="Id" />
        </Key>
        <Property Name="Id" Type="Edm.Int32" Nullable="false" />
        <NavigationProperty Name="Products" Type="Collection(ODataDemo.Product)" />
      </EntityType>
      <EntityType Name="Review">
        <Key>
          <PropertyRef Name="Id" />
        </Key>
        <Property Name="Id" Type="Edm.Int32" Nullable="false" />
      </EntityType>
    </Schema>
  </edmx:DataServices>
</edmx:Edmx>"#;

    const CYCLIC_METADATA: &str = r#"<Schema Namespace="N">
      <EntityType Name="A">
        <Key><PropertyRef Name="Id" /></Key>
        <Property Name="Id" Type="Edm.Int32" Nullable="false" />
        <NavigationProperty Name="ToB" Type="N.B" ContainsTarget="true" />
      </EntityType>
      <EntityType Name="B">
        <Key><PropertyRef Name="Id" /></Key>
        <Property Name="Id" Type="Edm.Int32" Nullable="false" />
        <NavigationProperty Name="ToA" Type="N.A" ContainsTarget="true" />
      </EntityType>
    </Schema>"#;

    const INHERITED_METADATA: &str = r#"<Schema Namespace="N">
      <EntityType Name="PartyBase" Abstract="true">
        <Key><PropertyRef Name="Id" /></Key>
        <Property Name="Id" Type="Edm.Int32" Nullable="false" />
        <NavigationProperty Name="Customer" Type="N.Customer" />
      </EntityType>
      <EntityType Name="Order" BaseType="N.PartyBase">
        <NavigationProperty Name="Items" Type="Collection(N.OrderItem)" ContainsTarget="true" />
      </EntityType>
      <EntityType Name="Customer">
        <Key><PropertyRef Name="Id" /></Key>
        <Property Name="Id" Type="Edm.Int32" Nullable="false" />
      </EntityType>
      <EntityType Name="OrderItem">
        <Key><PropertyRef Name="Id" /></Key>
        <Property Name="Id" Type="Edm.Int32" Nullable="false" />
      </EntityType>
    </Schema>"#;

    fn build(xml: &str, root: &str) -> NavigationTree {
        let doc = MetadataDocument::parse(xml).unwrap();
        NavigationTreeBuilder::new(&doc).build(root).unwrap()
    }

    #[test]
    fn root_node_carries_the_sentinel_name_and_empty_path() {
        let doc = MetadataDocument::parse(PRODUCT_METADATA).unwrap();
        let tree = NavigationTreeBuilder::new(&doc).build("Product").unwrap();

        let root = tree.root();
        assert_eq!(root.name, "root");
        assert_eq!(root.target_type_short_name, "Product");
        assert_eq!(root.target_type_full_name, "ODataDemo.Product");
        assert_eq!(root.path, "");
        assert_eq!(root.parent(), None);
    }

    #[test]
    fn contained_navigation_is_expanded_with_accumulated_paths() {
        let doc = MetadataDocument::parse(PRODUCT_METADATA).unwrap();
        let tree = NavigationTreeBuilder::new(&doc).build("Product").unwrap();

        let category = tree.node(tree.root().children()[0]);
        assert_eq!(category.name, "Category");
        assert_eq!(category.path, "/Category/ODataDemo.Category");
        assert!(category.contains_target);
        assert!(!category.is_collection);

        let child_names: Vec<&str> = category
            .children()
            .iter()
            .map(|id| tree.node(*id).name.as_str())
            .collect();
        assert_eq!(child_names, vec!["Supplier", "Reviews"]);

        let reviews = tree
            .search("Reviews", None, &doc)
            .expect("Reviews should be reachable");
        assert_eq!(
            reviews.path,
            "/Category/ODataDemo.Category/Reviews/ODataDemo.Review"
        );
        assert!(reviews.is_collection);
    }

    #[test]
    fn non_containment_navigation_stays_one_level_deep() {
        let doc = MetadataDocument::parse(PRODUCT_METADATA).unwrap();
        let tree = NavigationTreeBuilder::new(&doc).build("Product").unwrap();

        // Supplier is reached through a non-containment edge, so its own
        // Products navigation never shows up.
        let supplier = tree.search("Supplier", None, &doc).unwrap();
        assert!(supplier.is_leaf());
        assert!(tree.search("Products", None, &doc).is_none());
    }

    #[test]
    fn mutually_containing_types_terminate_as_leaves() {
        let tree = build(CYCLIC_METADATA, "A");

        // root(A) -> ToB(B) -> ToA(A): the second A is cycle-terminated.
        assert_eq!(tree.len(), 3);
        let to_b = tree.node(tree.root().children()[0]);
        assert_eq!(to_b.target_type_short_name, "B");
        let to_a = tree.node(to_b.children()[0]);
        assert_eq!(to_a.target_type_short_name, "A");
        assert!(to_a.is_leaf());
    }

    #[test]
    fn self_containing_type_is_not_expanded() {
        let xml = r#"<Schema Namespace="N">
          <EntityType Name="Folder">
            <Key><PropertyRef Name="Id" /></Key>
            <Property Name="Id" Type="Edm.Int32" Nullable="false" />
            <NavigationProperty Name="Subfolders" Type="Collection(N.Folder)" ContainsTarget="true" />
          </EntityType>
        </Schema>"#;
        let tree = build(xml, "Folder");

        assert_eq!(tree.len(), 2);
        let subfolders = tree.node(tree.root().children()[0]);
        assert_eq!(subfolders.target_type_short_name, "Folder");
        assert!(subfolders.is_leaf());
    }

    #[test]
    fn missing_target_type_becomes_a_leaf_with_the_declared_name() {
        let xml = r#"<Schema Namespace="N">
          <EntityType Name="T">
            <Key><PropertyRef Name="Id" /></Key>
            <Property Name="Id" Type="Edm.Int32" Nullable="false" />
            <NavigationProperty Name="Elsewhere" Type="Other.External" ContainsTarget="true" />
          </EntityType>
        </Schema>"#;
        let tree = build(xml, "T");

        let elsewhere = tree.node(tree.root().children()[0]);
        assert_eq!(elsewhere.target_type_short_name, "External");
        assert_eq!(elsewhere.target_type_full_name, "Other.External");
        assert!(elsewhere.is_leaf());
    }

    #[test]
    fn missing_root_type_is_not_found() {
        let doc = MetadataDocument::parse(PRODUCT_METADATA).unwrap();
        let err = NavigationTreeBuilder::new(&doc).build("Nope").unwrap_err();
        assert!(matches!(err, MetadataError::TypeNotFound(name) if name == "Nope"));
    }

    #[test]
    fn search_matches_breadth_first_in_insertion_order() {
        let xml = r#"<Schema Namespace="N">
          <EntityType Name="Root">
            <Key><PropertyRef Name="Id" /></Key>
            <Property Name="Id" Type="Edm.Int32" Nullable="false" />
            <NavigationProperty Name="Left" Type="N.Left" ContainsTarget="true" />
            <NavigationProperty Name="Shared" Type="N.Other" />
          </EntityType>
          <EntityType Name="Left">
            <Key><PropertyRef Name="Id" /></Key>
            <Property Name="Id" Type="Edm.Int32" Nullable="false" />
            <NavigationProperty Name="Shared" Type="N.Other" />
          </EntityType>
          <EntityType Name="Other">
            <Key><PropertyRef Name="Id" /></Key>
            <Property Name="Id" Type="Edm.Int32" Nullable="false" />
          </EntityType>
        </Schema>"#;
        let doc = MetadataDocument::parse(xml).unwrap();
        let tree = NavigationTreeBuilder::new(&doc).build("Root").unwrap();

        // Both Root and Left declare "Shared"; the shallower one wins.
        let shared = tree.search("Shared", None, &doc).unwrap();
        assert_eq!(shared.path, "/Shared/N.Other");
    }

    #[test]
    fn search_filter_accepts_inherited_declarations() {
        let doc = MetadataDocument::parse(INHERITED_METADATA).unwrap();
        let tree = NavigationTreeBuilder::new(&doc).build("Order").unwrap();

        // Customer is declared on PartyBase, but Order derives from it, so a
        // filter naming Order still matches.
        let by_derived = tree.search("Customer", Some("Order"), &doc);
        assert!(by_derived.is_some());
        assert_eq!(
            by_derived.unwrap().target_type_full_name,
            "N.Customer"
        );

        let by_unrelated = tree.search("Customer", Some("Customer"), &doc);
        assert!(by_unrelated.is_none());
    }

    #[test]
    fn search_without_a_match_returns_none() {
        let doc = MetadataDocument::parse(PRODUCT_METADATA).unwrap();
        let tree = NavigationTreeBuilder::new(&doc).build("Product").unwrap();
        assert!(tree.search("Nonexistent", None, &doc).is_none());
    }
}
