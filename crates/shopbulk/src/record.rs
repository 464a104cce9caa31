//! Destination element types for materialization
//!
//! A bulk export can only be rebuilt into types that know their own primary
//! id and which connection fields they own. [`BulkRecord`] captures exactly
//! that; decoding itself is plain serde.

use crate::model::{
    ChildNode, Collection, Connection, Customer, Edge, FromChildNode, FulfillmentOrder,
    FulfillmentOrderLineItem, LineItem, Metafield, Order, Product, ProductVariant,
};
use crate::resource::ResourceKind;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttachError {
    #[error("no connection field `{0}` on the parent type")]
    UnknownField(String),

    #[error("connection `{field}` holds {expected} nodes, got {found}")]
    NodeTypeMismatch {
        field: String,
        expected: ResourceKind,
        found: ResourceKind,
    },
}

/// Node representation used for a record's child edges
pub trait DecodeNode: Sized {
    fn decode(kind: ResourceKind, value: Value) -> Result<Self, serde_json::Error>;
}

impl DecodeNode for ChildNode {
    fn decode(kind: ResourceKind, value: Value) -> Result<Self, serde_json::Error> {
        ChildNode::decode(kind, value)
    }
}

impl DecodeNode for Value {
    fn decode(_kind: ResourceKind, value: Value) -> Result<Self, serde_json::Error> {
        Ok(value)
    }
}

/// A top-level element of a bulk query result
pub trait BulkRecord: DeserializeOwned {
    type Node: DecodeNode;

    /// Primary identifier matched against child lines' `__parentId`
    fn id(&self) -> Option<&str>;

    /// Replace the named connection with `edges`, in the given order
    fn attach_connection(
        &mut self,
        field: &str,
        edges: Vec<Edge<Self::Node>>,
    ) -> Result<(), AttachError>;
}

/// Convert child edges to `N` and store them in `slot`
pub fn fill_connection<N: FromChildNode>(
    slot: &mut Option<Connection<N>>,
    field: &str,
    edges: Vec<Edge<ChildNode>>,
) -> Result<(), AttachError> {
    let edges = edges
        .into_iter()
        .map(|Edge { node, cursor }| {
            N::from_child(node)
                .map(|node| Edge { node, cursor })
                .map_err(|other| AttachError::NodeTypeMismatch {
                    field: field.to_string(),
                    expected: N::KIND,
                    found: other.kind(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    *slot = Some(Connection::from_edges(edges));
    Ok(())
}

fn non_empty(id: &str) -> Option<&str> {
    (!id.is_empty()).then_some(id)
}

impl BulkRecord for Product {
    type Node = ChildNode;

    fn id(&self) -> Option<&str> {
        non_empty(&self.id)
    }

    fn attach_connection(&mut self, field: &str, edges: Vec<Edge<ChildNode>>) -> Result<(), AttachError> {
        match field {
            "variants" => fill_connection(&mut self.variants, field, edges),
            "metafields" => fill_connection(&mut self.metafields, field, edges),
            _ => Err(AttachError::UnknownField(field.to_string())),
        }
    }
}

impl BulkRecord for Order {
    type Node = ChildNode;

    fn id(&self) -> Option<&str> {
        non_empty(&self.id)
    }

    fn attach_connection(&mut self, field: &str, edges: Vec<Edge<ChildNode>>) -> Result<(), AttachError> {
        match field {
            "lineItems" => fill_connection(&mut self.line_items, field, edges),
            "metafields" => fill_connection(&mut self.metafields, field, edges),
            _ => Err(AttachError::UnknownField(field.to_string())),
        }
    }
}

impl BulkRecord for FulfillmentOrder {
    type Node = ChildNode;

    fn id(&self) -> Option<&str> {
        non_empty(&self.id)
    }

    fn attach_connection(&mut self, field: &str, edges: Vec<Edge<ChildNode>>) -> Result<(), AttachError> {
        match field {
            "lineItems" => fill_connection(&mut self.line_items, field, edges),
            _ => Err(AttachError::UnknownField(field.to_string())),
        }
    }
}

impl BulkRecord for Collection {
    type Node = ChildNode;

    fn id(&self) -> Option<&str> {
        non_empty(&self.id)
    }

    fn attach_connection(&mut self, field: &str, edges: Vec<Edge<ChildNode>>) -> Result<(), AttachError> {
        match field {
            "products" => fill_connection(&mut self.products, field, edges),
            _ => Err(AttachError::UnknownField(field.to_string())),
        }
    }
}

impl BulkRecord for Customer {
    type Node = ChildNode;

    fn id(&self) -> Option<&str> {
        non_empty(&self.id)
    }

    fn attach_connection(&mut self, field: &str, edges: Vec<Edge<ChildNode>>) -> Result<(), AttachError> {
        match field {
            "orders" => fill_connection(&mut self.orders, field, edges),
            "metafields" => fill_connection(&mut self.metafields, field, edges),
            _ => Err(AttachError::UnknownField(field.to_string())),
        }
    }
}

// Leaf resources can be queried at the top level but own no connections.
macro_rules! leaf_records {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl BulkRecord for $ty {
                type Node = ChildNode;

                fn id(&self) -> Option<&str> {
                    non_empty(&self.id)
                }

                fn attach_connection(
                    &mut self,
                    field: &str,
                    _edges: Vec<Edge<ChildNode>>,
                ) -> Result<(), AttachError> {
                    Err(AttachError::UnknownField(field.to_string()))
                }
            }
        )+
    };
}

leaf_records!(ProductVariant, Metafield, LineItem, FulfillmentOrderLineItem);

/// Schemaless destination: connections become `{"edges": [{"node": ...}]}`
impl BulkRecord for Map<String, Value> {
    type Node = Value;

    fn id(&self) -> Option<&str> {
        self.get("id").and_then(Value::as_str).and_then(non_empty)
    }

    fn attach_connection(&mut self, field: &str, edges: Vec<Edge<Value>>) -> Result<(), AttachError> {
        let edges = edges
            .into_iter()
            .map(|edge| {
                let mut entry = Map::new();
                entry.insert("node".to_string(), edge.node);
                if let Some(cursor) = edge.cursor {
                    entry.insert("cursor".to_string(), Value::String(cursor));
                }
                Value::Object(entry)
            })
            .collect();

        let mut connection = Map::new();
        connection.insert("edges".to_string(), Value::Array(edges));
        self.insert(field.to_string(), Value::Object(connection));
        Ok(())
    }
}
