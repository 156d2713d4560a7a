//! Parent-before-child ordering for discovered notebooks.
//!
//! The foreign format only declares `children` lists; the hierarchy is
//! rebuilt by inverting those into a child → parent lookup and walking each
//! record's parent chain. Records are kept in an id-indexed arena rather
//! than an object graph, so there are no ownership cycles to manage.

use crate::core::import::library::NotebookEntry;
use crate::{NotchError, Result};
use std::collections::{HashMap, HashSet};

/// A notebook entry annotated with its resolved parent, ordered so that the
/// parent (when present in the discovered set) appears strictly earlier.
#[derive(Debug)]
pub struct OrderedNotebook {
    pub entry: NotebookEntry,
    /// Foreign UUID of the declared parent, `None` when the parent is absent
    /// from the discovered set (the notebook imports as a root).
    pub parent_uuid: Option<String>,
}

/// Orders `entries` so every notebook follows its declared parent.
///
/// The walk is iterative: for each record the parent chain is followed
/// upward until it reaches a root, an absent parent, or an already-emitted
/// record, then the chain is emitted top-down. A chain that revisits itself
/// is a malformed cyclic declaration.
///
/// # Errors
///
/// Returns [`NotchError::ImportCycle`] naming one notebook on the cycle.
pub fn order_by_dependency(entries: Vec<NotebookEntry>) -> Result<Vec<OrderedNotebook>> {
    // Invert each record's declared children into a child -> parent map.
    let mut parent_of: HashMap<String, String> = HashMap::new();
    for entry in &entries {
        for child in &entry.meta.children {
            parent_of.insert(child.clone(), entry.meta.uuid.clone());
        }
    }

    let index: HashMap<String, usize> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| (e.meta.uuid.clone(), i))
        .collect();

    let mut emitted: HashSet<String> = HashSet::new();
    let mut order: Vec<usize> = Vec::with_capacity(entries.len());

    for entry in &entries {
        if emitted.contains(&entry.meta.uuid) {
            continue;
        }

        // Collect the not-yet-emitted ancestor chain, nearest first.
        let mut chain: Vec<&str> = Vec::new();
        let mut on_chain: HashSet<&str> = HashSet::new();
        let mut cursor: Option<&str> = Some(&entry.meta.uuid);
        while let Some(uuid) = cursor {
            if emitted.contains(uuid) || !index.contains_key(uuid) {
                break;
            }
            if !on_chain.insert(uuid) {
                return Err(NotchError::ImportCycle(uuid.to_string()));
            }
            chain.push(uuid);
            cursor = parent_of.get(uuid).map(String::as_str);
        }

        for uuid in chain.into_iter().rev() {
            emitted.insert(uuid.to_string());
            order.push(index[uuid]);
        }
    }

    // Reorder by taking entries out in the computed sequence.
    let mut slots: Vec<Option<NotebookEntry>> = entries.into_iter().map(Some).collect();
    let ordered = order
        .into_iter()
        .map(|i| {
            let entry = slots[i].take().expect("each index emitted once");
            let parent_uuid = parent_of
                .get(&entry.meta.uuid)
                .filter(|p| index.contains_key(*p))
                .cloned();
            OrderedNotebook { entry, parent_uuid }
        })
        .collect();

    Ok(ordered)
}
