use indexmap::IndexMap;

/// Id translation table (old id -> new id)
///
/// Iteration follows insertion order. Feature selection inserts in ascending
/// old-id order with new ids `0..n-1`, so a selection result iterates in both
/// old-id and new-id order at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdMap {
    pairs: IndexMap<u32, u32>,
}

impl IdMap {
    pub fn new() -> Self {
        Self {
            pairs: IndexMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pairs: IndexMap::with_capacity(capacity),
        }
    }

    /// Assign ids `0..n-1` to `old_ids` in the order given
    pub fn dense_from_ordered<I>(old_ids: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        let mut map = Self::new();
        for old in old_ids {
            let new = map.len() as u32;
            map.insert(old, new);
        }
        map
    }

    /// Insert a translation, returning the previous target of `old` if any
    #[inline]
    pub fn insert(&mut self, old: u32, new: u32) -> Option<u32> {
        self.pairs.insert(old, new)
    }

    #[inline]
    pub fn get(&self, old: u32) -> Option<u32> {
        self.pairs.get(&old).copied()
    }

    #[inline]
    pub fn contains(&self, old: u32) -> bool {
        self.pairs.contains_key(&old)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// (old id, new id) pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.pairs.iter().map(|(&old, &new)| (old, new))
    }
}

impl FromIterator<(u32, u32)> for IdMap {
    fn from_iter<T: IntoIterator<Item = (u32, u32)>>(iter: T) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}
