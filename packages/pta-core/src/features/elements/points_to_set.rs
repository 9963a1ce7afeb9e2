//! Points-to set backed by a sorted vec
//!
//! Sets are small-to-medium and iterated far more often than mutated, so
//! a sorted `Vec` beats a hash set here: membership is a binary search,
//! union and difference are linear merges, and iteration is a slice walk
//! in deterministic order.

use crate::features::elements::CsObjId;

/// Set of context-sensitive abstract objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointsToSet {
    objs: Vec<CsObjId>,
}

impl PointsToSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(obj: CsObjId) -> Self {
        Self { objs: vec![obj] }
    }

    /// Insert one object. Returns `true` if the set grew.
    pub fn insert(&mut self, obj: CsObjId) -> bool {
        match self.objs.binary_search(&obj) {
            Ok(_) => false,
            Err(pos) => {
                self.objs.insert(pos, obj);
                true
            }
        }
    }

    pub fn contains(&self, obj: CsObjId) -> bool {
        self.objs.binary_search(&obj).is_ok()
    }

    pub fn len(&self) -> usize {
        self.objs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = CsObjId> + '_ {
        self.objs.iter().copied()
    }

    /// Merge `other` into `self`. Returns `true` if `self` grew.
    pub fn union_with(&mut self, other: &PointsToSet) -> bool {
        if other.is_empty() {
            return false;
        }
        let mut merged = Vec::with_capacity(self.objs.len() + other.objs.len());
        let (mut i, mut j) = (0, 0);
        let mut grew = false;
        while i < self.objs.len() && j < other.objs.len() {
            match self.objs[i].cmp(&other.objs[j]) {
                std::cmp::Ordering::Less => {
                    merged.push(self.objs[i]);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    merged.push(other.objs[j]);
                    grew = true;
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    merged.push(self.objs[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&self.objs[i..]);
        if j < other.objs.len() {
            merged.extend_from_slice(&other.objs[j..]);
            grew = true;
        }
        self.objs = merged;
        grew
    }

    /// Objects in `self` but not in `other`.
    pub fn difference(&self, other: &PointsToSet) -> PointsToSet {
        PointsToSet {
            objs: self.iter().filter(|o| !other.contains(*o)).collect(),
        }
    }
}

impl FromIterator<CsObjId> for PointsToSet {
    fn from_iter<I: IntoIterator<Item = CsObjId>>(iter: I) -> Self {
        let mut set = PointsToSet::new();
        for obj in iter {
            set.insert(obj);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(n: u32) -> CsObjId {
        CsObjId(n)
    }

    #[test]
    fn test_insert_dedup_and_order() {
        let mut set = PointsToSet::new();
        assert!(set.insert(obj(3)));
        assert!(set.insert(obj(1)));
        assert!(!set.insert(obj(3)));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![obj(1), obj(3)]);
    }

    #[test]
    fn test_union_reports_growth() {
        let mut a: PointsToSet = [obj(1), obj(3)].into_iter().collect();
        let b: PointsToSet = [obj(2), obj(3)].into_iter().collect();
        assert!(a.union_with(&b));
        assert_eq!(a.len(), 3);
        // already a superset
        assert!(!a.union_with(&b));
    }

    #[test]
    fn test_difference() {
        let a: PointsToSet = [obj(1), obj(2), obj(3)].into_iter().collect();
        let b: PointsToSet = [obj(2)].into_iter().collect();
        let d = a.difference(&b);
        assert_eq!(d.iter().collect::<Vec<_>>(), vec![obj(1), obj(3)]);
        assert!(b.difference(&a).is_empty());
    }
}
