use crate::models::Entity;

/// Ordered, id-keyed cache of one entity kind.
///
/// Order is server order for fetched lists and insertion order for created
/// records. At most one record per id.
#[derive(Debug, Clone)]
pub struct EntityCache<T> {
    items: Vec<T>,
}

impl<T> Default for EntityCache<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Entity> EntityCache<T> {
    /// Replace the whole cache with a fresh server list.
    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items.clear();
        self.extend(items);
    }

    pub fn get(&self, id: i64) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.get(id).is_some()
    }

    /// Replace the record with the same id, or append it.
    pub fn upsert(&mut self, item: T) {
        match self.items.iter_mut().find(|existing| existing.id() == item.id()) {
            Some(slot) => *slot = item,
            None => self.items.push(item),
        }
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) {
        for item in items {
            self.upsert(item);
        }
    }

    pub fn remove(&mut self, id: i64) -> Option<T> {
        let pos = self.items.iter().position(|item| item.id() == id)?;
        Some(self.items.remove(pos))
    }

    /// Remove every record whose id is listed; returns how many went.
    pub fn remove_many(&mut self, ids: &[i64]) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !ids.contains(&item.id()));
        before - self.items.len()
    }

    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        self.items.retain(keep);
    }

    pub fn update(&mut self, id: i64, f: impl FnOnce(&mut T)) -> bool {
        match self.items.iter_mut().find(|item| item.id() == id) {
            Some(item) => {
                f(item);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.items.clone()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
