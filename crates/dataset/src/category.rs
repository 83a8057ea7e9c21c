use std::fmt;

/// Functional role of a mesh node, as reported by the nodes endpoint (`type`).
///
/// Codes outside 1..=4 are preserved as `Unknown` so a newer server never
/// breaks ingestion or rendering.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Client,
    Repeater,
    RoomServer,
    Sensor,
    Unknown(u8),
}

impl Category {
    /// The selectable categories, in code order.
    pub const ALL: [Category; 4] = [
        Category::Client,
        Category::Repeater,
        Category::RoomServer,
        Category::Sensor,
    ];

    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Category::Client,
            2 => Category::Repeater,
            3 => Category::RoomServer,
            4 => Category::Sensor,
            other => Category::Unknown(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Category::Client => 1,
            Category::Repeater => 2,
            Category::RoomServer => 3,
            Category::Sensor => 4,
            Category::Unknown(code) => code,
        }
    }

    pub fn is_known(self) -> bool {
        !matches!(self, Category::Unknown(_))
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Client => "Client",
            Category::Repeater => "Repeater",
            Category::RoomServer => "Room Server",
            Category::Sensor => "Sensor",
            Category::Unknown(_) => "Unknown",
        }
    }

    fn bit(self) -> Option<u8> {
        match self {
            Category::Unknown(_) => None,
            known => Some(1u8 << (known.code() - 1)),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Set of selectable categories backed by a bitmask.
///
/// Ordering contract:
/// - Iteration yields categories in ascending code order.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct CategorySet {
    bits: u8,
}

impl CategorySet {
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    pub const fn all() -> Self {
        Self { bits: 0b1111 }
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn contains(&self, category: Category) -> bool {
        category.bit().is_some_and(|b| self.bits & b != 0)
    }

    /// Returns `true` if the set changed. Unknown categories are never stored.
    pub fn insert(&mut self, category: Category) -> bool {
        let Some(b) = category.bit() else {
            return false;
        };
        let before = self.bits;
        self.bits |= b;
        before != self.bits
    }

    /// Returns `true` if the set changed.
    pub fn remove(&mut self, category: Category) -> bool {
        let Some(b) = category.bit() else {
            return false;
        };
        let before = self.bits;
        self.bits &= !b;
        before != self.bits
    }

    /// Flips membership; returns whether `category` is now selected.
    pub fn toggle(&mut self, category: Category) -> bool {
        if self.contains(category) {
            self.remove(category);
            false
        } else {
            self.insert(category)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Category> + '_ {
        Category::ALL.into_iter().filter(|c| self.contains(*c))
    }

    pub fn codes(&self) -> Vec<u8> {
        self.iter().map(Category::code).collect()
    }
}

impl FromIterator<Category> for CategorySet {
    fn from_iter<I: IntoIterator<Item = Category>>(iter: I) -> Self {
        let mut set = CategorySet::empty();
        for c in iter {
            set.insert(c);
        }
        set
    }
}

impl fmt::Debug for CategorySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_and_unknown_is_preserved() {
        for c in Category::ALL {
            assert_eq!(Category::from_code(c.code()), c);
        }
        assert_eq!(Category::from_code(9), Category::Unknown(9));
        assert_eq!(Category::from_code(9).code(), 9);
        assert!(!Category::Unknown(0).is_known());
    }

    #[test]
    fn insert_remove_toggle() {
        let mut s = CategorySet::empty();
        assert!(s.is_empty());
        assert!(s.insert(Category::Repeater));
        assert!(!s.insert(Category::Repeater));
        assert!(s.contains(Category::Repeater));
        assert!(!s.insert(Category::Unknown(7)));
        assert!(!s.contains(Category::Unknown(7)));

        assert!(s.toggle(Category::Client));
        assert!(!s.toggle(Category::Repeater));
        assert_eq!(s.codes(), vec![1]);
        assert!(s.remove(Category::Client));
        assert!(s.is_empty());
    }

    #[test]
    fn iteration_is_in_code_order() {
        let s: CategorySet = [Category::Sensor, Category::Client, Category::RoomServer]
            .into_iter()
            .collect();
        assert_eq!(s.codes(), vec![1, 3, 4]);
        assert_eq!(CategorySet::all().len(), 4);
    }
}
