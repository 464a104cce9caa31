//! Bulk query documents for the built-in resource listings
//!
//! Every nested connection selects `id`; child lines cannot be stitched back
//! onto their parent without it.

const PRODUCT_FIELDS: &str = r#"
        id
        legacyResourceId
        title
        handle
        status
        vendor
        productType
        descriptionHtml
        tags
        totalInventory
        createdAt
        updatedAt"#;

const METAFIELDS: &str = r#"
        metafields {
          edges {
            node {
              id
              legacyResourceId
              namespace
              key
              value
              type
            }
          }
        }"#;

const VARIANTS: &str = r#"
        variants {
          edges {
            node {
              id
              legacyResourceId
              title
              sku
              selectedOptions {
                name
                value
              }
              compareAtPrice
              price
              inventoryQuantity
              inventoryItem {
                id
                legacyResourceId
              }
            }
          }
        }"#;

const ORDER_FIELDS: &str = r#"
        id
        legacyResourceId
        name
        email
        createdAt
        displayFinancialStatus
        displayFulfillmentStatus
        totalPriceSet {
          shopMoney {
            amount
            currencyCode
          }
          presentmentMoney {
            amount
            currencyCode
          }
        }"#;

const LINE_ITEMS: &str = r#"
        lineItems {
          edges {
            node {
              id
              name
              sku
              quantity
              variant {
                id
                legacyResourceId
              }
              originalUnitPriceSet {
                shopMoney {
                  amount
                  currencyCode
                }
              }
            }
          }
        }"#;

const COLLECTION_FIELDS: &str = r#"
        id
        legacyResourceId
        title
        handle
        products {
          edges {
            node {
              id
              title
              handle
            }
          }
        }"#;

const CUSTOMER_FIELDS: &str = r#"
        id
        legacyResourceId
        email
        firstName
        lastName"#;

/// Wrap a node selection in `root(query: "...") { edges { node { ... } } }`
pub fn connection_query(root: &str, filter: Option<&str>, selection: &str) -> String {
    let arguments = match filter.map(str::trim).filter(|f| !f.is_empty()) {
        Some(filter) => format!("(query: \"{}\")", escape(filter)),
        None => String::new(),
    };

    format!(
        "{{\n  {root}{arguments} {{\n    edges {{\n      node {{{selection}\n      }}\n    }}\n  }}\n}}\n"
    )
}

/// Products with their variants and metafields
///
/// `filter` uses the Admin API search syntax, e.g. `status:active`.
pub fn products_query(filter: Option<&str>) -> String {
    connection_query(
        "products",
        filter,
        &format!("{PRODUCT_FIELDS}{METAFIELDS}{VARIANTS}"),
    )
}

/// Orders with their line items
pub fn orders_query(filter: Option<&str>) -> String {
    connection_query("orders", filter, &format!("{ORDER_FIELDS}{LINE_ITEMS}"))
}

/// Collections with their member products
pub fn collections_query() -> String {
    connection_query("collections", None, COLLECTION_FIELDS)
}

/// Customers with their metafields
pub fn customers_query() -> String {
    connection_query("customers", None, &format!("{CUSTOMER_FIELDS}{METAFIELDS}"))
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
