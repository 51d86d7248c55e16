// Property-based testing for the workflow registry
// Random sequences of lifecycle operations must never break the registry's
// bookkeeping: bounded history, disjoint active/history sets, sticky
// terminal states and consistent counters.

use proptest::prelude::*;
use scaffolder::workflow::{WorkflowKind, WorkflowRegistry, WorkflowState};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone)]
enum Op {
    Register,
    Start(usize),
    Complete(usize),
    Fail(usize),
    Cancel(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => Just(Op::Register),
        2 => (0..24usize).prop_map(Op::Start),
        1 => (0..24usize).prop_map(Op::Complete),
        1 => (0..24usize).prop_map(Op::Fail),
        1 => (0..24usize).prop_map(Op::Cancel),
    ]
}

fn kind_for(index: usize) -> WorkflowKind {
    match index % 3 {
        0 => WorkflowKind::Validation,
        1 => WorkflowKind::Audit,
        _ => WorkflowKind::Offline,
    }
}

proptest! {
    #[test]
    fn registry_invariants_hold(
        limit in 1usize..8,
        ops in prop::collection::vec(op_strategy(), 1..80),
    ) {
        let registry = WorkflowRegistry::new(limit);
        let mut ids: Vec<String> = Vec::new();
        let mut terminal: HashMap<String, WorkflowState> = HashMap::new();

        for op in ops {
            match op {
                Op::Register => {
                    let id = format!("workflow_{}", ids.len());
                    registry.register(&id, kind_for(ids.len()), BTreeMap::new()).unwrap();
                    ids.push(id);
                }
                Op::Start(i) => {
                    if let Some(id) = ids.get(i) {
                        let _ = registry.mark_running(id);
                    }
                }
                Op::Complete(i) => {
                    if let Some(id) = ids.get(i) {
                        registry.finish(id, Ok(()));
                    }
                }
                Op::Fail(i) => {
                    if let Some(id) = ids.get(i) {
                        registry.finish(id, Err("boom".to_string()));
                    }
                }
                Op::Cancel(i) => {
                    if let Some(id) = ids.get(i) {
                        let _ = registry.cancel(id);
                    }
                }
            }

            let active = registry.list_active();
            let history = registry.list_history();
            prop_assert!(history.len() <= limit);

            let active_ids: HashSet<&str> = active.iter().map(|i| i.id.as_str()).collect();
            prop_assert!(history.iter().all(|info| !active_ids.contains(info.id.as_str())));
            prop_assert!(active.iter().all(|info| !info.state.is_terminal()));
            prop_assert!(history.iter().all(|info| info.state.is_terminal()));
            prop_assert!(history.iter().all(|info| info.end_time.is_some()));

            // Once terminal, a workflow never changes state again
            for info in &history {
                if let Some(previous) = terminal.insert(info.id.clone(), info.state) {
                    prop_assert_eq!(previous, info.state);
                }
            }
            for (id, state) in &terminal {
                if let Ok(status) = registry.status(id) {
                    prop_assert_eq!(status.state, *state);
                }
            }

            let stats = registry.metrics().get_stats();
            prop_assert_eq!(stats.registered as usize, ids.len());
            prop_assert_eq!(
                stats.completed + stats.failed + stats.cancelled,
                stats.evicted + history.len() as u64
            );
            prop_assert_eq!(active.len() + terminal.len(), ids.len());
        }
    }

    #[test]
    fn duplicate_ids_are_rejected(count in 1usize..20) {
        let registry = WorkflowRegistry::default();
        for i in 0..count {
            let id = format!("workflow_{i}");
            registry.register(&id, WorkflowKind::Audit, BTreeMap::new()).unwrap();
            prop_assert!(registry.register(&id, WorkflowKind::Audit, BTreeMap::new()).is_err());
        }
        prop_assert_eq!(registry.list_active().len(), count);
    }
}
