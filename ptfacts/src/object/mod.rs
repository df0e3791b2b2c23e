//! Object identities.
//!
//! Every referenceable entity of the module receives a dense [`ObjectId`].
//! Some ids stand for entities the IR never exposes as values: the memory
//! region behind a stack allocation, the storage of a global or the heap
//! object returned by an allocator. Those *affiliated* objects are reserved
//! right after the id of the value that owns them, so the id space looks
//! like this:
//!
//! ```text
//! | special objects | value | value | +1 | value | +1 | +2 | ...
//! 0                 N
//! ```
//!
//! All slots live in one arena. A [`Slot::Placeholder`] stores its base id,
//! which makes resolving an affiliated object to its owning value O(1).
use std::{collections::HashMap, fmt::Debug, hash::Hash};

use log::trace;
use strum::EnumIs;
use thiserror::Error;

/// Dense object identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub u32);

impl ObjectId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Entry of the object arena.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs)]
pub enum Slot<V> {
    /// Slot owned by a registered value, followed by `affiliated` placeholders.
    Owning { value: V, affiliated: u32 },
    /// Affiliated object of the value owning `base`.
    Placeholder { base: ObjectId },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// The value was never registered.
    #[error("No object identity was assigned to `{value}`.")]
    Unregistered { value: String },

    /// The id is a special object or lies past the allocated range.
    #[error("Object id {id} is outside of the allocated range [{first}, {end}).")]
    OutOfRange { id: ObjectId, first: u32, end: u32 },

    /// Offset zero of an affiliated lookup designates the base value itself.
    #[error("Affiliated offset 0 of {base} designates the base value, not an affiliated object.")]
    AffiliatedBase { base: ObjectId },

    /// The id passed as a base belongs to an affiliated object.
    #[error("Object id {id} is an affiliated object and cannot own other objects.")]
    NotABase { id: ObjectId },

    /// The requested offset exceeds the number of objects reserved at
    /// registration.
    #[error("Affiliated offset {offset} of {base} exceeds the {reserved} reserved object(s).")]
    AffiliatedOverflow {
        base: ObjectId,
        offset: u32,
        reserved: u32,
    },
}

/// Bidirectional map between values and their object ids.
///
/// `value -> id` lookups go through a hash map, `id -> value` through the
/// arena. Both are only written by [`ObjectIndex::register`].
#[derive(Debug, Clone)]
pub struct ObjectIndex<V> {
    special: u32,
    slots: Vec<Slot<V>>,
    lookup: HashMap<V, ObjectId>,
}

impl<V: Copy + Eq + Hash + Debug> ObjectIndex<V> {
    /// Create an empty index whose first `special` ids are reserved.
    pub fn new(special: u32) -> Self {
        Self {
            special,
            slots: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    /// Assign an id to `value`, reserving `affiliated` placeholder ids right
    /// after it. Registering a value twice returns its existing id and
    /// ignores `affiliated`.
    pub fn register(&mut self, value: V, affiliated: u32) -> ObjectId {
        if let Some(id) = self.lookup.get(&value) {
            return *id;
        }

        let base = ObjectId(self.end());
        self.slots.push(Slot::Owning { value, affiliated });
        self.slots
            .extend((0..affiliated).map(|_| Slot::Placeholder { base }));
        self.lookup.insert(value, base);
        trace!("Registered {:?} as {} (+{} affiliated)", value, base, affiliated);
        base
    }

    pub fn contains(&self, value: &V) -> bool {
        self.lookup.contains_key(value)
    }

    pub fn id_of(&self, value: &V) -> Result<ObjectId, IndexError> {
        self.lookup
            .get(value)
            .copied()
            .ok_or_else(|| IndexError::Unregistered {
                value: format!("{:?}", value),
            })
    }

    /// Whether `id` was allocated by this index. Special objects are not.
    pub fn is_valid(&self, id: ObjectId) -> bool {
        self.position(id).is_some()
    }

    pub fn slot(&self, id: ObjectId) -> Result<&Slot<V>, IndexError> {
        self.position(id)
            .map(|position| &self.slots[position])
            .ok_or(IndexError::OutOfRange {
                id,
                first: self.special,
                end: self.end(),
            })
    }

    /// Value owning `id`, or `None` if `id` is an affiliated object.
    pub fn value_of(&self, id: ObjectId) -> Result<Option<&V>, IndexError> {
        Ok(match self.slot(id)? {
            Slot::Owning { value, .. } => Some(value),
            Slot::Placeholder { .. } => None,
        })
    }

    /// The `offset`-th affiliated object of `base` (counting from 1).
    pub fn affiliated_id(&self, base: ObjectId, offset: u32) -> Result<ObjectId, IndexError> {
        if offset == 0 {
            return Err(IndexError::AffiliatedBase { base });
        }
        match self.slot(base)? {
            Slot::Owning { affiliated, .. } if offset <= *affiliated => {
                Ok(ObjectId(base.0 + offset))
            }
            Slot::Owning { affiliated, .. } => Err(IndexError::AffiliatedOverflow {
                base,
                offset,
                reserved: *affiliated,
            }),
            Slot::Placeholder { .. } => Err(IndexError::NotABase { id: base }),
        }
    }

    /// Id of the value owning `id`: `id` itself for a value, its base for an
    /// affiliated object.
    pub fn main_id_of(&self, id: ObjectId) -> Result<ObjectId, IndexError> {
        Ok(match self.slot(id)? {
            Slot::Owning { .. } => id,
            Slot::Placeholder { base } => *base,
        })
    }

    /// Value owning `id`, following the back-reference of affiliated objects.
    pub fn main_value_of(&self, id: ObjectId) -> Result<&V, IndexError> {
        let main = self.main_id_of(id)?;
        match self.slot(main)? {
            Slot::Owning { value, .. } => Ok(value),
            // Placeholders always point at an owning slot.
            Slot::Placeholder { .. } => Err(IndexError::NotABase { id: main }),
        }
    }

    /// Number of allocated ids, placeholders included, special ids excluded.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn special_count(&self) -> u32 {
        self.special
    }

    /// Allocated slots in id order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &Slot<V>)> {
        let special = self.special;
        self.slots
            .iter()
            .enumerate()
            .map(move |(i, slot)| (ObjectId(special + i as u32), slot))
    }

    fn end(&self) -> u32 {
        self.special + self.slots.len() as u32
    }

    fn position(&self, id: ObjectId) -> Option<usize> {
        id.0.checked_sub(self.special)
            .map(|position| position as usize)
            .filter(|position| *position < self.slots.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_idempotent() {
        let mut index = ObjectIndex::new(2);
        let a = index.register('a', 0);
        assert_eq!(index.register('a', 5), a);
        assert_eq!(index.len(), 1, "second registration must not allocate");
        assert_eq!(a, ObjectId(2));
    }

    #[test]
    fn affiliated_objects_follow_their_base() {
        let mut index = ObjectIndex::new(1);
        let x = index.register('x', 0);
        let y = index.register('y', 2);
        let z = index.register('z', 0);

        assert_eq!((x.0, y.0, z.0), (1, 2, 5));
        assert_eq!(index.affiliated_id(y, 1), Ok(ObjectId(3)));
        assert_eq!(index.affiliated_id(y, 2), Ok(ObjectId(4)));
        assert!(index.slot(ObjectId(3)).unwrap().is_placeholder());
        assert_eq!(index.value_of(ObjectId(4)), Ok(None));
        assert_eq!(index.main_value_of(ObjectId(4)), Ok(&'y'));
        assert_eq!(index.main_id_of(ObjectId(3)), Ok(y));
        assert_eq!(index.main_value_of(z), Ok(&'z'));
    }

    #[test]
    fn affiliated_lookups_reject_bad_offsets() {
        let mut index = ObjectIndex::new(0);
        let y = index.register('y', 1);

        assert_eq!(
            index.affiliated_id(y, 0),
            Err(IndexError::AffiliatedBase { base: y })
        );
        assert!(matches!(
            index.affiliated_id(y, 2),
            Err(IndexError::AffiliatedOverflow { reserved: 1, .. })
        ));
        assert_eq!(
            index.affiliated_id(ObjectId(1), 1),
            Err(IndexError::NotABase { id: ObjectId(1) })
        );
    }

    #[test]
    fn validity_excludes_special_and_unallocated_ids() {
        let mut index = ObjectIndex::new(3);
        index.register('a', 1);

        assert!(!index.is_valid(ObjectId(0)));
        assert!(!index.is_valid(ObjectId(2)));
        assert!(index.is_valid(ObjectId(3)));
        assert!(index.is_valid(ObjectId(4)));
        assert!(!index.is_valid(ObjectId(5)));
        assert!(matches!(
            index.value_of(ObjectId(5)),
            Err(IndexError::OutOfRange { first: 3, end: 5, .. })
        ));
        assert!(index.value_of(ObjectId(1)).is_err());
    }

    #[test]
    fn unregistered_lookup_fails() {
        let index = ObjectIndex::<char>::new(0);
        assert!(!index.contains(&'q'));
        assert!(matches!(
            index.id_of(&'q'),
            Err(IndexError::Unregistered { value }) if value == "'q'"
        ));
    }

    #[test]
    fn iteration_reports_every_slot_in_id_order() {
        let mut index = ObjectIndex::new(2);
        index.register(10u8, 1);
        index.register(20u8, 0);
        let ids: Vec<u32> = index.iter().map(|(id, _)| id.0).collect();
        assert_eq!(ids, vec![2, 3, 4]);
        assert_eq!(index.special_count(), 2);
    }
}
