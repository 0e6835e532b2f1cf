//! Property Tests
//!
//! Any seed and any bank size: sequential transfers keep the total and
//! never create a second record for a key.

use crate::common::*;
use bankstress::{check_total, execute_transfer, TransferOutcome};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn transfers_conserve_total(
        seed in any::<u64>(),
        users in 2u64..8,
        balance in 1u64..25,
        rounds in 1usize..60,
    ) {
        let (_cluster, store) = bank(users, balance);
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..rounds {
            let outcome = execute_transfer(store.as_ref(), &mut rng, users).unwrap();
            if let TransferOutcome::Committed(record) = &outcome {
                prop_assert!(record.amount <= record.src.bal);
                prop_assert_eq!(
                    record.src.bal + record.dst.bal,
                    record.src_after.as_ref().map_or(0, |a| a.bal) + record.dst_after.bal
                );
            }
        }

        let report = check_total(store.as_ref(), users, balance).unwrap();
        prop_assert_eq!(report.total, users * balance);
        prop_assert!(report.materialized as u64 <= users);
        let mut keys: Vec<u64> = report.accounts.iter().map(|a| a.key).collect();
        keys.dedup();
        prop_assert_eq!(keys.len(), report.materialized);
    }
}
