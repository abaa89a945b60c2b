use std::collections::BTreeSet;

use formscrape_core::{ConfigError, Partition};

#[test]
fn partitions_cover_pending_set_disjointly() {
    let pending: Vec<i64> = vec![1, 2, 3, 5, 8, 13, 21, 34, 55, 89, 144];
    for n in 1..=5u64 {
        let mut seen = BTreeSet::new();
        for k in 1..=n {
            let part = Partition::new(k, n).unwrap();
            for id in part.select(pending.iter().copied(), |id| *id) {
                assert!(seen.insert(id), "id {id} in two partitions for n={n}");
            }
        }
        let all: BTreeSet<i64> = pending.iter().copied().collect();
        assert_eq!(seen, all, "partitions for n={n} do not cover the pending set");
    }
}

#[test]
fn kth_partition_is_residue_k_minus_one() {
    let part = Partition::new(2, 3).unwrap();
    let ids: Vec<i64> = part.select(0..10, |id| *id);
    assert_eq!(ids, vec![1, 4, 7]);
}

#[test]
fn invalid_partitions_are_rejected() {
    assert_eq!(
        Partition::new(0, 3).unwrap_err(),
        ConfigError::BadPartition { k: 0, n: 3 }
    );
    assert!(Partition::new(4, 3).is_err());
    assert!(Partition::new(1, 0).is_err());
    assert!(Partition::whole().contains(12345));
}
