//! # Propagation Tests
//!
//! Raise order across edges, duplicate edges, reentrant raises, and the
//! closure property over randomly shaped trees.

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use simharness::config::GeneralConfig;
use simharness::irq::{IrqId, IrqValue, OwnedIrq};
use simharness::SimContext;

type Log = Rc<RefCell<Vec<(String, IrqValue)>>>;

fn context() -> SimContext {
    SimContext::new(1_000_000, &GeneralConfig::default())
}

/// Allocates `names` and subscribes a logger to each.
fn logged(ctx: &mut SimContext, names: &[&str]) -> (Vec<OwnedIrq>, Log) {
    let log: Log = Rc::default();
    let irqs = names
        .iter()
        .map(|name| {
            let irq = ctx.alloc_irq(name);
            let sink = Rc::clone(&log);
            let label = (*name).to_owned();
            ctx.on_change(&irq, move |_, value| sink.borrow_mut().push((label.clone(), value)));
            irq
        })
        .collect();
    (irqs, log)
}

fn names(log: &Log) -> Vec<String> {
    log.borrow().iter().map(|(n, _)| n.clone()).collect()
}

#[test]
fn test_propagation_is_depth_first_in_connection_order() {
    let mut ctx = context();
    let (irqs, log) = logged(&mut ctx, &["a", "b", "c", "d"]);
    ctx.connect(&irqs[0], &irqs[1]);
    ctx.connect(&irqs[0], &irqs[2]);
    ctx.connect(&irqs[1], &irqs[3]);

    ctx.raise(&irqs[0], 1);

    assert_eq!(names(&log), vec!["a", "b", "d", "c"]);
    assert!(log.borrow().iter().all(|(_, v)| *v == 1));
    assert!(irqs.iter().all(|irq| ctx.value(irq) == 1));
}

#[test]
fn test_duplicate_edges_propagate_twice() {
    let mut ctx = context();
    let (irqs, log) = logged(&mut ctx, &["src", "dst"]);
    ctx.connect(&irqs[0], &irqs[1]);
    ctx.connect(&irqs[0], &irqs[1]);

    ctx.raise(&irqs[0], 1);

    assert_eq!(names(&log), vec!["src", "dst", "dst"]);
}

#[test]
fn test_subscribers_run_before_edges() {
    let mut ctx = context();
    let (irqs, log) = logged(&mut ctx, &["src", "dst"]);
    ctx.connect(&irqs[0], &irqs[1]);
    let sink = Rc::clone(&log);
    ctx.on_change(&irqs[0], move |_, v| sink.borrow_mut().push(("src-late".to_owned(), v)));

    ctx.raise(&irqs[0], 0);

    assert_eq!(names(&log), vec!["src", "src-late", "dst"]);
}

#[test]
fn test_subscriber_may_raise_other_signals() {
    let mut ctx = context();
    let (irqs, log) = logged(&mut ctx, &["button", "led"]);
    let led = irqs[1].id();
    ctx.on_change(&irqs[0], move |ctx, value| ctx.raise(led, u32::from(value == 0)));

    ctx.raise(&irqs[0], 0);

    assert_eq!(
        *log.borrow(),
        vec![("button".to_owned(), 0), ("led".to_owned(), 1)]
    );
}

fn preorder(children: &[Vec<usize>], node: usize, out: &mut Vec<usize>) {
    out.push(node);
    for &child in &children[node] {
        preorder(children, child, out);
    }
}

proptest! {
    #[test]
    fn prop_tree_raise_notifies_each_reachable_node_once(
        parents in prop::collection::vec(any::<prop::sample::Index>(), 0..12),
        value in any::<u32>(),
    ) {
        let mut ctx = context();
        let count = parents.len() + 1;
        let labels: Vec<String> = (0..count).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
        let (irqs, log) = logged(&mut ctx, &refs);

        let mut children = vec![Vec::new(); count];
        for (i, parent) in parents.iter().enumerate() {
            let child = i + 1;
            let parent = parent.index(child);
            ctx.connect(&irqs[parent], &irqs[child]);
            children[parent].push(child);
        }

        ctx.raise(&irqs[0], value);

        let mut expected = Vec::new();
        preorder(&children, 0, &mut expected);
        let expected: Vec<String> = expected.iter().map(ToString::to_string).collect();
        prop_assert_eq!(names(&log), expected);
        prop_assert!(log.borrow().iter().all(|(_, v)| *v == value));
        prop_assert!(irqs.iter().all(|irq| ctx.value(IrqId::from(irq)) == value));
    }
}
