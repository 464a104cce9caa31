//! Global identifier parsing and the nested resource registry
//!
//! Every record in a bulk export carries an `id` of the form
//! `gid://shopify/ProductVariant/123`. For child lines the resource type
//! embedded in that id decides which node type the line decodes into and
//! which connection field of the parent it is stitched onto.
//!
//! [`ResourceKind`] is the closed set of resource types that can appear as
//! nested children. Supporting another nested resource means adding a variant
//! here and a matching [`crate::model::ChildNode`] variant.

use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

#[allow(clippy::expect_used)]
static GID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^gid://(\w+)/(\w+)/(\d+)$").expect("global id pattern is a valid regex")
});

static REGISTRY: LazyLock<HashMap<&'static str, ResourceKind>> = LazyLock::new(|| {
    ResourceKind::ALL
        .iter()
        .map(|kind| (kind.type_name(), *kind))
        .collect()
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("malformed global id `{0}`")]
    MalformedId(String),

    #[error("`{0}` is not a supported nested resource type")]
    UnsupportedResource(String),
}

/// A parsed `gid://namespace/Type/123` identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalId<'a> {
    pub namespace: &'a str,
    pub resource_type: &'a str,
    pub numeric_id: &'a str,
}

impl<'a> GlobalId<'a> {
    pub fn parse(gid: &'a str) -> Result<Self, ResourceError> {
        let captures = GID_PATTERN
            .captures(gid)
            .ok_or_else(|| ResourceError::MalformedId(gid.to_string()))?;

        let part = |i: usize| captures.get(i).map(|m| m.as_str()).unwrap_or_default();

        Ok(Self {
            namespace: part(1),
            resource_type: part(2),
            numeric_id: part(3),
        })
    }
}

/// Resource types that may appear as child lines in a bulk export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Collection,
    Customer,
    FulfillmentOrderLineItem,
    LineItem,
    Metafield,
    Order,
    Product,
    ProductVariant,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 8] = [
        ResourceKind::Collection,
        ResourceKind::Customer,
        ResourceKind::FulfillmentOrderLineItem,
        ResourceKind::LineItem,
        ResourceKind::Metafield,
        ResourceKind::Order,
        ResourceKind::Product,
        ResourceKind::ProductVariant,
    ];

    /// Type name as it appears inside a global id
    pub fn type_name(self) -> &'static str {
        match self {
            ResourceKind::Collection => "Collection",
            ResourceKind::Customer => "Customer",
            ResourceKind::FulfillmentOrderLineItem => "FulfillmentOrderLineItem",
            ResourceKind::LineItem => "LineItem",
            ResourceKind::Metafield => "Metafield",
            ResourceKind::Order => "Order",
            ResourceKind::Product => "Product",
            ResourceKind::ProductVariant => "ProductVariant",
        }
    }

    /// Name of the parent's connection field that receives this resource
    ///
    /// Defaults to the lowerCamel plural of the type name.
    pub fn connection_field(self) -> &'static str {
        match self {
            ResourceKind::Collection => "collections",
            ResourceKind::Customer => "customers",
            // fulfillment order line items live under the parent's `lineItems`
            ResourceKind::FulfillmentOrderLineItem | ResourceKind::LineItem => "lineItems",
            ResourceKind::Metafield => "metafields",
            ResourceKind::Order => "orders",
            ResourceKind::Product => "products",
            ResourceKind::ProductVariant => "variants",
        }
    }

    pub fn from_type_name(name: &str) -> Result<Self, ResourceError> {
        REGISTRY
            .get(name)
            .copied()
            .ok_or_else(|| ResourceError::UnsupportedResource(name.to_string()))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Resolve a child record's global id to its kind and destination field
pub fn resolve(gid: &str) -> Result<(ResourceKind, &'static str), ResourceError> {
    let parsed = GlobalId::parse(gid)?;
    let kind = ResourceKind::from_type_name(parsed.resource_type)?;
    Ok((kind, kind.connection_field()))
}
