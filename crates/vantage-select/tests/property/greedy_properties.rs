use std::collections::BTreeSet;

use proptest::prelude::*;
use vantage_select::greedy::GreedyPrioritizer;
use vantage_select::objective::{
    CombinedObjective, CoverageObjective, DiversityObjective, FacilityLocationObjective, Objective,
};
use vantage_suite::types::{TestCase, TestSuite};

fn coverage_sets() -> impl Strategy<Value = Vec<BTreeSet<u8>>> {
    prop::collection::vec(prop::collection::btree_set(0u8..16, 0..6), 0..10)
}

fn suite_from(sets: &[BTreeSet<u8>]) -> TestSuite {
    TestSuite::new(
        sets.iter()
            .enumerate()
            .map(|(i, s)| TestCase::new(format!("t{i}")).with_coverage(s.iter().map(|e| format!("e{e}"))))
            .collect(),
    )
    .unwrap()
}

fn nonzero_vec() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-1.0f32..1.0, 3).prop_filter("non-zero norm", |v| {
        v.iter().map(|x| x * x).sum::<f32>() > 1e-3
    })
}

proptest! {
    #[test]
    fn coverage_gain_is_non_negative_and_diminishing(sets in coverage_sets(), split in 0usize..10) {
        let suite = suite_from(&sets);
        let obj = CoverageObjective::from_suite(&suite);
        let tests: Vec<&TestCase> = suite.tests().iter().collect();
        let split = split.min(tests.len());
        let (larger, _) = tests.split_at(split);
        let smaller = &larger[..split / 2];

        for candidate in suite.tests() {
            let g_small = obj.evaluate(smaller, candidate).unwrap();
            let g_large = obj.evaluate(larger, candidate).unwrap();
            prop_assert!(g_large >= 0.0);
            prop_assert!(g_small >= g_large);
        }
    }

    #[test]
    fn facility_location_gain_is_non_negative(
        refs in prop::collection::vec(nonzero_vec(), 0..4),
        picks in prop::collection::vec(nonzero_vec(), 1..5),
    ) {
        let obj = FacilityLocationObjective::new(refs);
        let tests: Vec<TestCase> = picks
            .into_iter()
            .enumerate()
            .map(|(i, e)| TestCase::new(format!("t{i}")).with_embedding(e))
            .collect();
        let selected: Vec<&TestCase> = tests.iter().take(tests.len() - 1).collect();
        let candidate = tests.last().unwrap();
        prop_assert!(obj.evaluate(&[], candidate).unwrap() >= 0.0);
        prop_assert!(obj.evaluate(&selected, candidate).unwrap() >= 0.0);
    }

    #[test]
    fn greedy_is_deterministic(sets in coverage_sets(), alpha in 0.0f64..=1.0) {
        let suite = suite_from(&sets);
        let obj = CombinedObjective::from_suite(&suite, alpha).unwrap();
        let p = GreedyPrioritizer::default();
        let first = p.prioritize_all(&suite, &obj).unwrap();
        let second = p.prioritize_all(&suite, &obj).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn greedy_order_is_a_duplicate_free_subset(sets in coverage_sets(), k in 0usize..12) {
        let suite = suite_from(&sets);
        let order = GreedyPrioritizer::default()
            .prioritize(&suite, &DiversityObjective::new(), k)
            .unwrap();
        prop_assert_eq!(order.len(), k.min(suite.len()));
        let unique: BTreeSet<&str> = order.ids().collect();
        prop_assert_eq!(unique.len(), order.len());
        for id in order.ids() {
            prop_assert!(suite.contains(id));
        }
    }

    #[test]
    fn greedy_coverage_gains_never_increase(sets in coverage_sets()) {
        let suite = suite_from(&sets);
        let obj = CoverageObjective::from_suite(&suite);
        let order = GreedyPrioritizer::default().prioritize_all(&suite, &obj).unwrap();
        let gains: Vec<f64> = order.entries.iter().filter_map(|e| e.score).collect();
        for pair in gains.windows(2) {
            prop_assert!(pair[0] >= pair[1]);
        }
    }
}
