//! Typed Admin API shapes returned by bulk queries
//!
//! Nested lists follow the GraphQL connection pattern: a [`Connection`] holds
//! ordered [`Edge`]s, each wrapping one node. Connection fields on the models
//! are always `Option<Connection<_>>`; `None` means the export carried no
//! child lines for that field.

use crate::resource::ResourceKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub has_previous_page: bool,
}

/// One entry of a connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge<N> {
    pub node: N,

    /// Pagination cursor; bulk exports never carry one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl<N> Edge<N> {
    pub fn new(node: N) -> Self {
        Self { node, cursor: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<N> {
    #[serde(default)]
    pub edges: Vec<Edge<N>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_info: Option<PageInfo>,
}

impl<N> Default for Connection<N> {
    fn default() -> Self {
        Self {
            edges: Vec::new(),
            page_info: None,
        }
    }
}

impl<N> Connection<N> {
    pub fn from_edges(edges: Vec<Edge<N>>) -> Self {
        Self {
            edges,
            page_info: None,
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.edges.iter().map(|edge| &edge.node)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyV2 {
    pub amount: String,
    pub currency_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyBag {
    #[serde(default)]
    pub shop_money: Option<MoneyV2>,
    #[serde(default)]
    pub presentment_money: Option<MoneyV2>,
}

/// Bare reference to another resource, e.g. a variant's inventory item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub legacy_resource_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectedOption {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub legacy_resource_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub description_html: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub total_inventory: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<Connection<ProductVariant>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metafields: Option<Connection<Metafield>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub legacy_resource_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub compare_at_price: Option<String>,
    #[serde(default)]
    pub inventory_quantity: Option<i64>,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
    #[serde(default)]
    pub inventory_item: Option<ResourceRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metafield {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub legacy_resource_id: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default, rename = "type")]
    pub value_type: Option<String>,
    /// Deprecated `valueType`, kept apart from `type` so a query may select both
    #[serde(default, rename = "valueType", skip_serializing_if = "Option::is_none")]
    pub legacy_value_type: Option<String>,
}

impl Metafield {
    /// `type` if selected, otherwise the deprecated `valueType`
    pub fn type_name(&self) -> Option<&str> {
        self.value_type
            .as_deref()
            .or(self.legacy_value_type.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub legacy_resource_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub display_financial_status: Option<String>,
    #[serde(default)]
    pub display_fulfillment_status: Option<String>,
    #[serde(default)]
    pub total_price_set: Option<MoneyBag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Connection<LineItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metafields: Option<Connection<Metafield>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub variant: Option<ResourceRef>,
    #[serde(default)]
    pub original_unit_price_set: Option<MoneyBag>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentOrder {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub order: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Connection<FulfillmentOrderLineItem>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentOrderLineItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub total_quantity: Option<i64>,
    #[serde(default)]
    pub remaining_quantity: Option<i64>,
    #[serde(default)]
    pub line_item: Option<ResourceRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub legacy_resource_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<Connection<Product>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub legacy_resource_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orders: Option<Connection<Order>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metafields: Option<Connection<Metafield>>,
}

/// A decoded child line, tagged by the resource kind named in its id
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChildNode {
    Collection(Collection),
    Customer(Customer),
    FulfillmentOrderLineItem(FulfillmentOrderLineItem),
    LineItem(LineItem),
    Metafield(Metafield),
    Order(Order),
    Product(Product),
    ProductVariant(ProductVariant),
}

impl ChildNode {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ChildNode::Collection(_) => ResourceKind::Collection,
            ChildNode::Customer(_) => ResourceKind::Customer,
            ChildNode::FulfillmentOrderLineItem(_) => ResourceKind::FulfillmentOrderLineItem,
            ChildNode::LineItem(_) => ResourceKind::LineItem,
            ChildNode::Metafield(_) => ResourceKind::Metafield,
            ChildNode::Order(_) => ResourceKind::Order,
            ChildNode::Product(_) => ResourceKind::Product,
            ChildNode::ProductVariant(_) => ResourceKind::ProductVariant,
        }
    }
}

/// Conversion from the [`ChildNode`] union into one concrete node type
pub trait FromChildNode: Sized {
    const KIND: ResourceKind;

    /// Unwrap the matching variant, handing the node back on mismatch
    fn from_child(node: ChildNode) -> Result<Self, ChildNode>;
}

macro_rules! child_node_types {
    ($($ty:ident),+ $(,)?) => {
        impl ChildNode {
            /// Decode a child line body as the node type registered for `kind`
            pub fn decode(
                kind: ResourceKind,
                value: serde_json::Value,
            ) -> Result<Self, serde_json::Error> {
                match kind {
                    $(ResourceKind::$ty => serde_json::from_value(value).map(ChildNode::$ty),)+
                }
            }
        }

        $(
            impl FromChildNode for $ty {
                const KIND: ResourceKind = ResourceKind::$ty;

                fn from_child(node: ChildNode) -> Result<Self, ChildNode> {
                    match node {
                        ChildNode::$ty(inner) => Ok(inner),
                        other => Err(other),
                    }
                }
            }
        )+
    };
}

child_node_types!(
    Collection,
    Customer,
    FulfillmentOrderLineItem,
    LineItem,
    Metafield,
    Order,
    Product,
    ProductVariant,
);

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_child_by_kind() {
        let node = ChildNode::decode(
            ResourceKind::ProductVariant,
            json!({"id": "gid://shopify/ProductVariant/9", "sku": "X", "inventoryQuantity": 3}),
        )
        .unwrap();

        assert_eq!(node.kind(), ResourceKind::ProductVariant);
        let variant = ProductVariant::from_child(node).unwrap();
        assert_eq!(variant.sku.as_deref(), Some("X"));
        assert_eq!(variant.inventory_quantity, Some(3));
    }

    #[test]
    fn test_from_child_mismatch_returns_node() {
        let node = ChildNode::Metafield(Metafield::default());
        let back = ProductVariant::from_child(node).unwrap_err();
        assert_eq!(back.kind(), ResourceKind::Metafield);
    }

    #[test]
    fn test_metafield_legacy_value_type() {
        let metafield: Metafield =
            serde_json::from_value(json!({"id": "gid://shopify/Metafield/1", "valueType": "STRING"}))
                .unwrap();
        assert_eq!(metafield.value_type, None);
        assert_eq!(metafield.type_name(), Some("STRING"));
    }

    #[test]
    fn test_metafield_type_and_value_type_together() {
        let metafield: Metafield = serde_json::from_value(json!({
            "id": "gid://shopify/Metafield/1",
            "type": "single_line_text_field",
            "valueType": "STRING"
        }))
        .unwrap();
        assert_eq!(metafield.type_name(), Some("single_line_text_field"));
        assert_eq!(metafield.legacy_value_type.as_deref(), Some("STRING"));
    }

    #[test]
    fn test_connection_deserializes_inline() {
        let product: Product = serde_json::from_value(json!({
            "id": "gid://shopify/Product/1",
            "variants": {"edges": [{"node": {"id": "gid://shopify/ProductVariant/2"}, "cursor": "c1"}]}
        }))
        .unwrap();

        let variants = product.variants.unwrap();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants.edges[0].cursor.as_deref(), Some("c1"));
        assert_eq!(variants.nodes().next().unwrap().id, "gid://shopify/ProductVariant/2");
    }
}
