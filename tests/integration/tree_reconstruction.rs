//! Hierarchy reconstruction over realistic bulk query output

use serde_json::json;
use shopify_bulk::tree::{flat_to_tree, tree_to_flat, FlatRecord};

const PRODUCTS_WITH_VARIANTS: &str = r#"{"id":"gid://shopify/Product/1","title":"Hat","__typename":"Product"}
{"id":"gid://shopify/ProductVariant/11","sku":"HAT-S","__typename":"ProductVariant","__parentId":"gid://shopify/Product/1"}
{"id":"gid://shopify/ProductVariant/12","sku":"HAT-M","__typename":"ProductVariant","__parentId":"gid://shopify/Product/1"}
{"id":"gid://shopify/Metafield/101","key":"fabric","value":"wool","__typename":"Metafield","__parentId":"gid://shopify/ProductVariant/12"}
{"id":"gid://shopify/Product/2","title":"Scarf","__typename":"Product"}
{"id":"gid://shopify/Metafield/201","key":"care","value":"hand wash","__typename":"Metafield","__parentId":"gid://shopify/Product/2"}
{"id":"gid://shopify/Metafield/999","key":"stale","__typename":"Metafield","__parentId":"gid://shopify/Product/404"}
{"id":"gid://shopify/ProductVariant/21","sku":"SCARF","__typename":"ProductVariant","__parentId":"gid://shopify/Product/2"}"#;

fn parse(text: &str) -> Vec<FlatRecord> {
    text.lines().map(|line| FlatRecord::parse_line(line).unwrap()).collect()
}

#[test]
fn test_products_variants_and_metafields() {
    let forest: Vec<_> = flat_to_tree(&parse(PRODUCTS_WITH_VARIANTS))
        .iter()
        .map(|r| r.to_value())
        .collect();

    assert_eq!(
        forest,
        vec![
            json!({
                "id": "gid://shopify/Product/1",
                "__typename": "Product",
                "title": "Hat",
                "productVariants": [
                    {"id": "gid://shopify/ProductVariant/11", "__typename": "ProductVariant", "sku": "HAT-S"},
                    {
                        "id": "gid://shopify/ProductVariant/12",
                        "__typename": "ProductVariant",
                        "sku": "HAT-M",
                        "metafields": [{
                            "id": "gid://shopify/Metafield/101",
                            "__typename": "Metafield",
                            "key": "fabric",
                            "value": "wool",
                        }],
                    },
                ],
            }),
            json!({
                "id": "gid://shopify/Product/2",
                "__typename": "Product",
                "title": "Scarf",
                "metafields": [{
                    "id": "gid://shopify/Metafield/201",
                    "__typename": "Metafield",
                    "key": "care",
                    "value": "hand wash",
                }],
                "productVariants": [
                    {"id": "gid://shopify/ProductVariant/21", "__typename": "ProductVariant", "sku": "SCARF"},
                ],
            }),
        ]
    );
}

#[test]
fn test_orphans_are_absent() {
    let tree = flat_to_tree(&parse(PRODUCTS_WITH_VARIANTS));
    let flattened = tree_to_flat(&tree);

    assert_eq!(flattened.len(), 7);
    assert!(flattened
        .iter()
        .all(|r| r.id.as_deref() != Some("gid://shopify/Metafield/999")));
}

#[test]
fn test_flattening_restores_parent_references() {
    let tree = flat_to_tree(&parse(PRODUCTS_WITH_VARIANTS));
    let flattened = tree_to_flat(&tree);

    let metafield = flattened
        .iter()
        .find(|r| r.id.as_deref() == Some("gid://shopify/Metafield/101"))
        .unwrap();
    assert_eq!(
        metafield.parent_id.as_deref(),
        Some("gid://shopify/ProductVariant/12")
    );
    assert_eq!(flat_to_tree(&flattened), tree);
}

#[test]
fn test_records_without_ids_stay_leaves() {
    let flat = parse(concat!(
        "{\"id\":\"gid://shopify/Order/1\",\"__typename\":\"Order\"}\n",
        "{\"title\":\"Line\",\"__typename\":\"LineItem\",\"__parentId\":\"gid://shopify/Order/1\"}\n",
        "{\"sku\":\"X\",\"__parentId\":\"gid://shopify/Order/1\"}",
    ));
    let tree = flat_to_tree(&flat);

    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].collection("lineItems").map(<[_]>::len), Some(1));
    assert_eq!(
        tree[0].collection("children").unwrap()[0].fields["sku"],
        json!("X")
    );
}
