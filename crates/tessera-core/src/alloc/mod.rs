//! Hash collections used across the renderer.
//!
//! Draw-call and sampler caches are keyed by small plain-data structs, which
//! AHash handles much faster than SipHash.

pub use ahash::{AHashMap as HashMap, AHashSet as HashSet};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashmap_ahash() {
        let mut map = HashMap::new();
        map.insert((1u64, 2u64), "draw");
        assert_eq!(map.get(&(1, 2)), Some(&"draw"));
    }

    #[test]
    fn test_hashset_ahash() {
        let mut set = HashSet::new();
        set.insert(42u32);
        assert!(set.contains(&42));
    }
}
