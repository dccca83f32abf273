//! Stream table: `slab` storage indexed by a `StreamId -> usize` map.
//! `Store<B>` wraps `slab::Slab` plus a `HashMap<StreamId, usize>`.

use std::collections::HashMap;

use slab::Slab;

use crate::frame::StreamId;

use super::StreamEntry;

pub(crate) struct Store {
    slab: Slab<StreamEntry>,
    ids: HashMap<StreamId, usize>,
}

impl Store {
    pub fn new() -> Store {
        Store {
            slab: Slab::new(),
            ids: HashMap::new(),
        }
    }

    pub fn insert(&mut self, id: StreamId, entry: StreamEntry) {
        let key = self.slab.insert(entry);
        self.ids.insert(id, key);
    }

    pub fn get_mut(&mut self, id: StreamId) -> Option<&mut StreamEntry> {
        let key = *self.ids.get(&id)?;
        self.slab.get_mut(key)
    }

    pub fn remove(&mut self, id: StreamId) -> Option<StreamEntry> {
        let key = self.ids.remove(&id)?;
        Some(self.slab.remove(key))
    }

    pub fn ids_greater_than(&self, last: StreamId) -> Vec<StreamId> {
        self.ids
            .keys()
            .filter(|id| id.as_u32() > last.as_u32())
            .copied()
            .collect()
    }

    pub fn drain_ids(&mut self) -> Vec<StreamId> {
        let ids: Vec<StreamId> = self.ids.keys().copied().collect();
        self.slab.clear();
        self.ids.clear();
        ids
    }
}
