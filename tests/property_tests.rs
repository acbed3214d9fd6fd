//! Property-based checks for the pipeline's algebraic pieces.

use proptest::prelude::*;

use mediadupe::cluster::UnionFind;
use mediadupe::hashing::PerceptualSignature;

proptest! {
    #[test]
    fn similarity_is_bounded(a in prop::collection::vec(any::<u64>(), 0..8),
                             b in prop::collection::vec(any::<u64>(), 0..8)) {
        let sa = PerceptualSignature(a);
        let sb = PerceptualSignature(b);
        let sim = sa.similarity(&sb);
        prop_assert!((0.0..=1.0).contains(&sim));
    }

    #[test]
    fn similarity_is_symmetric(a in prop::collection::vec(any::<u64>(), 1..8),
                               b in prop::collection::vec(any::<u64>(), 1..8)) {
        let sa = PerceptualSignature(a);
        let sb = PerceptualSignature(b);
        prop_assert_eq!(sa.similarity(&sb), sb.similarity(&sa));
    }

    #[test]
    fn identical_signatures_score_one(a in prop::collection::vec(any::<u64>(), 1..8)) {
        let sig = PerceptualSignature(a);
        prop_assert_eq!(sig.similarity(&sig.clone()), 1.0);
    }

    #[test]
    fn empty_signature_matches_nothing(a in prop::collection::vec(any::<u64>(), 0..8)) {
        let sig = PerceptualSignature(a);
        let empty = PerceptualSignature::empty();
        prop_assert_eq!(sig.similarity(&empty), 0.0);
        prop_assert_eq!(empty.similarity(&sig), 0.0);
    }

    #[test]
    fn union_find_classes_ignore_union_order(
        pairs in prop::collection::vec((0u8..16, 0u8..16), 0..32)
    ) {
        let mut forward = UnionFind::new();
        for (a, b) in &pairs {
            forward.union(a, b);
        }
        let mut reverse = UnionFind::new();
        for (a, b) in pairs.iter().rev() {
            reverse.union(a, b);
        }
        for x in 0u8..16 {
            for y in 0u8..16 {
                prop_assert_eq!(forward.same(&x, &y), reverse.same(&x, &y));
            }
        }
    }

    #[test]
    fn union_find_same_is_an_equivalence(
        pairs in prop::collection::vec((0u8..12, 0u8..12), 0..24),
        x in 0u8..12, y in 0u8..12, z in 0u8..12
    ) {
        let mut uf = UnionFind::new();
        for (a, b) in &pairs {
            uf.union(a, b);
        }
        prop_assert!(uf.same(&x, &x));
        prop_assert_eq!(uf.same(&x, &y), uf.same(&y, &x));
        if uf.same(&x, &y) && uf.same(&y, &z) {
            prop_assert!(uf.same(&x, &z));
        }
    }
}
