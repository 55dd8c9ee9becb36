//! Forest builder for flat bulk query records

use crate::tree::record::{FlatRecord, TreeRecord};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Group name for records that carry no `__typename`
const UNKNOWN_TYPENAME: &str = "Unknown";

/// Collection key for children that carry no `__typename`
const UNTYPED_COLLECTION: &str = "children";

/// Key a child collection is filed under: first character lowercased, then `s`
pub fn collection_key(typename: Option<&str>) -> String {
    let Some(typename) = typename.filter(|t| !t.is_empty()) else {
        return UNTYPED_COLLECTION.to_string();
    };
    let mut chars = typename.chars();
    let mut key = String::with_capacity(typename.len() + 1);
    if let Some(first) = chars.next() {
        key.extend(first.to_lowercase());
    }
    key.push_str(chars.as_str());
    key.push('s');
    key
}

/// Arena slot: the record copy plus child slots per collection key
struct Slot {
    record: TreeRecord,
    children: Vec<(String, Vec<usize>)>,
}

impl Slot {
    fn push_child(&mut self, key: &str, child: usize) {
        match self.children.iter_mut().find(|(k, _)| k == key) {
            Some((_, slots)) => slots.push(child),
            None => self.children.push((key.to_string(), vec![child])),
        }
    }
}

/// Rebuilds parent/child structure from flat records.
///
/// Records are grouped by type and keyed by id; within a type a later record with the
/// same id replaces the earlier one. Parent references resolve through one global id index
/// built by walking the type groups in first-seen order, so when two types share an id the
/// type seen first wins. Records whose parent is missing are dropped.
pub struct TreeBuilder<'a> {
    records: &'a [FlatRecord],
}

impl<'a> TreeBuilder<'a> {
    pub fn new(records: &'a [FlatRecord]) -> Self {
        Self { records }
    }

    #[instrument(skip(self), fields(records = self.records.len()))]
    pub fn build(&self) -> Vec<TreeRecord> {
        // Step 1: one arena slot per record, grouped by type and id
        let mut arena: Vec<Slot> = Vec::with_capacity(self.records.len());
        let mut group_of_type: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<HashMap<&str, usize>> = Vec::new();

        for record in self.records {
            let typename = group_name(record);
            let group = *group_of_type.entry(typename).or_insert_with(|| {
                groups.push(HashMap::new());
                groups.len() - 1
            });

            arena.push(Slot {
                record: TreeRecord::from_flat(record),
                children: Vec::new(),
            });
            if let Some(id) = record.id.as_deref() {
                groups[group].insert(id, arena.len() - 1);
            }
        }

        // Step 2: resolve each record to its surviving slot
        let resolved: Vec<usize> = self
            .records
            .iter()
            .enumerate()
            .map(|(position, record)| {
                record
                    .id
                    .as_deref()
                    .and_then(|id| groups[group_of_type[group_name(record)]].get(id).copied())
                    .unwrap_or(position)
            })
            .collect();

        // Step 3: global id index, earlier type groups take precedence
        let mut by_id: HashMap<&str, usize> = HashMap::new();
        for group in &groups {
            for (&id, &slot) in group {
                by_id.entry(id).or_insert(slot);
            }
        }

        // Step 4: attach children in input order
        let mut keys: HashMap<Option<&str>, String> = HashMap::new();
        let mut roots = Vec::new();
        let mut placed = vec![false; arena.len()];
        let mut dropped = 0usize;

        for (record, &slot) in self.records.iter().zip(&resolved) {
            // A replaced duplicate keeps the position of its first occurrence
            if placed[slot] {
                continue;
            }
            match record.parent_id.as_deref() {
                None => {
                    placed[slot] = true;
                    roots.push(slot);
                }
                Some(parent_id) => match by_id.get(parent_id) {
                    Some(&parent) => {
                        placed[slot] = true;
                        let typename = record.typename.as_deref();
                        let key = keys
                            .entry(typename)
                            .or_insert_with(|| collection_key(typename));
                        arena[parent].push_child(key, slot);
                    }
                    None => dropped += 1,
                },
            }
        }

        if dropped > 0 {
            debug!(dropped, "Dropped records whose parent is not in the result set");
        }

        // Step 5: materialize from the roots
        let mut on_path = vec![false; arena.len()];
        roots
            .into_iter()
            .map(|root| materialize(&arena, root, &mut on_path))
            .collect()
    }
}

fn group_name(record: &FlatRecord) -> &str {
    record
        .typename
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(UNKNOWN_TYPENAME)
}

/// A slot being assembled, with a cursor over its child slots
struct Frame {
    slot: usize,
    /// Index of the collection this slot is filed under in its parent
    key: usize,
    record: TreeRecord,
    next_key: usize,
    next_child: usize,
}

impl Frame {
    fn enter(arena: &[Slot], slot: usize, key: usize) -> Self {
        Self {
            slot,
            key,
            record: arena[slot].record.clone(),
            next_key: 0,
            next_child: 0,
        }
    }

    /// Next child slot in collection order, with its collection index
    fn advance(&mut self, arena: &[Slot]) -> Option<(usize, usize)> {
        while let Some((_, children)) = arena[self.slot].children.get(self.next_key) {
            if let Some(&child) = children.get(self.next_child) {
                self.next_child += 1;
                return Some((self.next_key, child));
            }
            self.next_key += 1;
            self.next_child = 0;
        }
        None
    }
}

/// Post-order assembly over an explicit stack, so nesting depth never touches the call stack
fn materialize(arena: &[Slot], root: usize, on_path: &mut [bool]) -> TreeRecord {
    on_path[root] = true;
    let mut stack = vec![Frame::enter(arena, root, 0)];
    let mut finished = None;

    while let Some(frame) = stack.last_mut() {
        match frame.advance(arena) {
            // A record never nests inside itself
            Some((_, child)) if on_path[child] => {}
            Some((key, child)) => {
                on_path[child] = true;
                stack.push(Frame::enter(arena, child, key));
            }
            None => {
                let Some(done) = stack.pop() else { break };
                on_path[done.slot] = false;
                match stack.last_mut() {
                    Some(parent) => {
                        let key = &arena[parent.slot].children[done.key].0;
                        parent.record.push_child(key, done.record);
                    }
                    None => finished = Some(done.record),
                }
            }
        }
    }
    finished.unwrap_or_default()
}

/// Rebuild the nested hierarchy of a bulk query result
pub fn flat_to_tree(records: &[FlatRecord]) -> Vec<TreeRecord> {
    TreeBuilder::new(records).build()
}

/// Flatten a forest back into records, parents before their children
pub fn tree_to_flat(forest: &[TreeRecord]) -> Vec<FlatRecord> {
    let mut out = Vec::new();
    let mut stack: Vec<(&TreeRecord, Option<&str>)> =
        forest.iter().rev().map(|root| (root, None)).collect();

    while let Some((record, parent_id)) = stack.pop() {
        out.push(FlatRecord {
            id: record.id.clone(),
            typename: record.typename.clone(),
            parent_id: parent_id.map(str::to_string),
            fields: record.fields.clone(),
        });
        // Reversed so the first child of the first collection comes off the stack next
        for (_, children) in record.children.iter().rev() {
            for child in children.iter().rev() {
                stack.push((child, record.id.as_deref()));
            }
        }
    }
    out
}
