use proptest::prelude::*;
use vantage_eval::apfd::{ApfdEvaluator, UndetectedPolicy};
use vantage_select::order::PrioritizedOrder;
use vantage_suite::types::FaultModel;

/// (order length, per-fault detector indices; indices may fall outside the
/// order to produce undetected faults)
fn scenario() -> impl Strategy<Value = (usize, Vec<Vec<usize>>)> {
    (1usize..12).prop_flat_map(|n| {
        (
            Just(n),
            prop::collection::vec(prop::collection::vec(0..n + 3, 0..4), 0..8),
        )
    })
}

fn order(n: usize) -> PrioritizedOrder {
    PrioritizedOrder::from_ids("prop", (0..n).map(|i| format!("t{i}")))
}

fn model(faults: &[Vec<usize>], names: impl Fn(usize) -> String) -> FaultModel {
    faults
        .iter()
        .enumerate()
        .map(|(i, detectors)| (names(i), detectors.iter().map(|d| format!("t{d}")).collect::<Vec<_>>()))
        .collect()
}

fn policy() -> impl Strategy<Value = UndetectedPolicy> {
    prop_oneof![Just(UndetectedPolicy::Exclude), Just(UndetectedPolicy::Penalize)]
}

proptest! {
    #[test]
    fn apfd_stays_in_unit_interval((n, faults) in scenario(), policy in policy()) {
        let m = ApfdEvaluator::new(policy)
            .evaluate(&order(n), &model(&faults, |i| format!("f{i}")))
            .unwrap();
        prop_assert!((0.0..=1.0).contains(&m.apfd));
    }

    #[test]
    fn apfd_ignores_fault_insertion_order((n, faults) in scenario()) {
        let forward = model(&faults, |i| format!("f{i:02}"));
        let reversed: FaultModel = faults
            .iter()
            .enumerate()
            .rev()
            .map(|(i, d)| (format!("f{i:02}"), d.iter().map(|d| format!("t{d}")).collect::<Vec<_>>()))
            .collect();
        let eval = ApfdEvaluator::default();
        let a = eval.evaluate(&order(n), &forward).unwrap();
        let b = eval.evaluate(&order(n), &reversed).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn curve_is_monotone_and_bounded((n, faults) in scenario()) {
        let fm = model(&faults, |i| format!("f{i}"));
        let m = ApfdEvaluator::default().evaluate(&order(n), &fm).unwrap();
        for pair in m.curve.windows(2) {
            prop_assert!(pair[0].faults_found <= pair[1].faults_found);
        }
        if let Some(last) = m.curve.last() {
            prop_assert!(last.faults_found <= fm.len());
            prop_assert_eq!(last.faults_found, m.detected_faults);
        }
    }
}
