//! Record Hierarchy
//!
//! Bulk query results arrive as a flat JSONL list where nested connections are flattened
//! into separate records carrying `__parentId` and `__typename`. This module rebuilds the
//! nested shape and can flatten it again.

pub mod builder;
pub mod record;

pub use builder::{collection_key, flat_to_tree, tree_to_flat, TreeBuilder};
pub use record::{
    forest_to_values, FlatRecord, TreeRecord, MAX_JSON_DEPTH, PARENT_ID_KEY, TYPENAME_KEY,
};
