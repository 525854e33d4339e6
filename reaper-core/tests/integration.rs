//! Integration Tests for Reactive System
//!
//! These tests verify that signals, reactions, memos and deferred reactions
//! work together correctly through the public API.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use reaper_core::reactive::{
    create_deferred_reaction, create_reaction, create_state, on_cleanup, run_deferred_turn,
};
use reaper_core::{
    Binding, FailurePolicy, GraphStats, LocalTaskQueue, MacrotaskQueue, ReactiveError, Runtime,
    RuntimeConfig,
};

fn counter() -> Rc<Cell<u32>> {
    Rc::new(Cell::new(0))
}

fn runtime_with_queue() -> (Runtime, Rc<MacrotaskQueue>) {
    let queue = Rc::new(MacrotaskQueue::new());
    (Runtime::with_queue(queue.clone()), queue)
}

/// Test that a reaction runs once on creation and once per write.
#[test]
fn reaction_counts_one_run_per_write() {
    let rt = Runtime::new();
    let (count, set_count) = rt.create_state(0);
    let calls = counter();

    let c = calls.clone();
    rt.create_reaction(move || {
        c.set(c.get() + 1);
        count.get();
    });

    set_count.set(1);
    set_count.set(8);
    assert_eq!(calls.get(), 3);
}

/// Test that a memo calls its function once per dependency change,
/// however often it is read.
#[test]
fn memo_invokes_instrumented_function_once_per_change() {
    let rt = Runtime::new();
    let (count, set_count) = rt.create_state(10);
    let calls = counter();

    let instrumented = {
        let (count, calls) = (count.clone(), calls.clone());
        Rc::new(move || {
            calls.set(calls.get() + 1);
            count.get() * 2
        })
    };

    // A direct call outside any subscriber.
    assert_eq!(instrumented(), 20);
    assert_eq!(calls.get(), 1);

    let f = instrumented.clone();
    let memo = rt.create_memo(move || f());
    assert_eq!(calls.get(), 2);

    for _ in 0..10 {
        assert_eq!(memo.get(), 20);
    }
    assert_eq!(calls.get(), 2);

    set_count.set(count.get_untracked() + 1);
    assert_eq!(calls.get(), 3);
    assert_eq!(memo.get(), 22);
}

/// Test a plain and a deferred reaction over the same two signals.
#[test]
fn plain_and_deferred_reactions_over_two_signals() {
    let (rt, queue) = runtime_with_queue();
    let (a, set_a) = rt.create_state(2);
    let (b, set_b) = rt.create_state(5);
    let plain = counter();
    let deferred = counter();
    let last_product = Rc::new(Cell::new(0));

    {
        let (a, b, plain) = (a.clone(), b.clone(), plain.clone());
        rt.create_reaction(move || {
            plain.set(plain.get() + 1);
            let _ = a.get() * b.get();
        });
    }
    {
        let (deferred, last) = (deferred.clone(), last_product.clone());
        rt.create_deferred_reaction(move || {
            deferred.set(deferred.get() + 1);
            last.set(a.get() * b.get());
        });
    }

    assert_eq!((plain.get(), deferred.get()), (1, 0));

    set_a.set(9);
    set_b.set(10);
    assert_eq!((plain.get(), deferred.get()), (3, 0));

    queue.run_turn();
    assert_eq!((plain.get(), deferred.get()), (3, 1));
    assert_eq!(last_product.get(), 90);

    // Dependencies from the first firing are live now.
    set_a.set(1);
    set_b.set(2);
    queue.run_turn();
    assert_eq!((plain.get(), deferred.get()), (5, 2));
    assert_eq!(last_product.get(), 2);
}

/// Test that alternating dependencies never leave stale edges behind.
#[test]
fn alternating_dependencies_leave_no_stale_edges() {
    let rt = Runtime::new();
    let (use_left, set_use_left) = rt.create_state(true);
    let left = rt.create_signal(0);
    let right = rt.create_signal(0);
    let runs = counter();

    {
        let (left, right, runs) = (left.clone(), right.clone(), runs.clone());
        rt.create_reaction(move || {
            runs.set(runs.get() + 1);
            if use_left.get() {
                left.get();
            } else {
                right.get();
            }
        });
    }

    for i in 0..100 {
        let on_left = i % 2 == 1;
        set_use_left.set(on_left);

        assert_eq!(left.subscriber_count(), usize::from(on_left));
        assert_eq!(right.subscriber_count(), usize::from(!on_left));
        assert_eq!(rt.stats().edges, 2);
    }

    // The last write selected `left`; writes to `right` reach nobody.
    let before = runs.get();
    right.set(1);
    assert_eq!(runs.get(), before);
    left.set(1);
    assert_eq!(runs.get(), before + 1);
}

/// Test that a burst of writes fires a deferred reaction once with the
/// final state.
#[test]
fn burst_of_writes_coalesces_into_one_firing() {
    let (rt, queue) = runtime_with_queue();
    let (x, set_x) = rt.create_state(0);
    let (y, set_y) = rt.create_state(0);
    let seen = Rc::new(RefCell::new(Vec::new()));

    let out = seen.clone();
    rt.create_deferred_reaction(move || out.borrow_mut().push((x.get(), y.get())));
    queue.run_turn();

    for i in 1..=5 {
        set_x.set(i);
        set_y.set(i * 10);
    }
    assert_eq!(queue.pending(), 1);
    queue.run_until_idle();

    assert_eq!(*seen.borrow(), vec![(0, 0), (5, 50)]);
}

/// Test that the first call of a deferred reaction is never inline, even
/// when created inside another reaction.
#[test]
fn deferred_first_call_is_never_inline() {
    let (rt, queue) = runtime_with_queue();
    let (trigger, set_trigger) = rt.create_state(0);
    let calls = counter();

    let rt2 = rt.clone();
    let c = calls.clone();
    rt.create_reaction(move || {
        if trigger.get() == 1 {
            let c = c.clone();
            rt2.create_deferred_reaction(move || c.set(c.get() + 1));
        }
    });

    set_trigger.set(1);
    assert_eq!(calls.get(), 0);
    queue.run_turn();
    assert_eq!(calls.get(), 1);
}

/// Test the function-level API on the thread's default runtime.
#[test]
fn free_functions_drive_the_default_runtime() {
    let (count, set_count) = create_state(0);
    let log = Rc::new(RefCell::new(Vec::new()));

    {
        let (count, log) = (count.clone(), log.clone());
        create_reaction(move || {
            let value = count.get();
            log.borrow_mut().push(format!("run {value}"));
            let log = log.clone();
            on_cleanup(move || log.borrow_mut().push(format!("cleanup {value}")));
        });
    }

    let deferred = counter();
    {
        let deferred = deferred.clone();
        create_deferred_reaction(move || {
            count.get();
            deferred.set(deferred.get() + 1);
        });
    }

    set_count.set(1);
    assert_eq!(*log.borrow(), vec!["run 0", "cleanup 0", "run 1"]);
    assert_eq!(deferred.get(), 0);

    assert_eq!(run_deferred_turn(), 1);
    assert_eq!(deferred.get(), 1);
}

/// Test deferred reactions on a tokio `LocalSet`.
#[tokio::test]
async fn deferred_reaction_on_local_task_queue() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let rt = Runtime::with_queue(Rc::new(LocalTaskQueue::new()));
            let (value, set_value) = rt.create_state(1);
            let seen = Rc::new(Cell::new(0));

            let out = seen.clone();
            rt.create_deferred_reaction(move || out.set(value.get()));
            assert_eq!(seen.get(), 0);

            tokio::time::sleep(Duration::from_millis(10)).await;
            assert_eq!(seen.get(), 1);

            set_value.set(2);
            set_value.set(3);
            assert_eq!(seen.get(), 1);

            tokio::time::sleep(Duration::from_millis(10)).await;
            assert_eq!(seen.get(), 3);
        })
        .await;
}

/// Test that a self-writing reaction is stopped by the depth limit.
#[test]
fn self_writing_reaction_hits_recursion_limit() {
    let rt = Runtime::builder().max_depth(8).build().unwrap();
    let signal = rt.create_signal(0);

    let s = signal.clone();
    rt.create_reaction(move || s.set(s.get() + 1));

    // One increment per nesting level before the run at depth 9 is refused.
    assert_eq!(signal.get_untracked(), 8);
    assert_eq!(rt.depth(), 0);
}

#[test]
fn recursion_limit_propagates_under_propagate_policy() {
    let rt = Runtime::builder()
        .max_depth(8)
        .failure_policy(FailurePolicy::Propagate)
        .build()
        .unwrap();
    let signal = rt.create_signal(0);

    let s = signal.clone();
    let err = rt
        .try_create_reaction(move || s.set(s.get() + 1))
        .unwrap_err();

    assert_eq!(err, ReactiveError::RecursionLimit { depth: 9, limit: 8 });
    assert_eq!(rt.depth(), 0);
}

/// Test that memos compose and each recomputes once per change.
#[test]
fn memo_of_memo_chains_updates() {
    let rt = Runtime::new();
    let count = rt.create_signal(1);
    let (inner_calls, outer_calls) = (counter(), counter());

    let doubled = {
        let (count, calls) = (count.clone(), inner_calls.clone());
        rt.create_memo(move || {
            calls.set(calls.get() + 1);
            count.get() * 2
        })
    };
    let quadrupled = {
        let (doubled, calls) = (doubled.clone(), outer_calls.clone());
        rt.create_memo(move || {
            calls.set(calls.get() + 1);
            doubled.get() * 2
        })
    };

    let seen = Rc::new(Cell::new(0));
    let (q, out) = (quadrupled.clone(), seen.clone());
    rt.create_reaction(move || out.set(q.get()));
    assert_eq!(seen.get(), 4);

    count.set(3);
    assert_eq!(seen.get(), 12);
    assert_eq!((inner_calls.get(), outer_calls.get()), (2, 2));
}

/// Test that dropping the last handle of a signal retires subscribers that
/// only depended on it.
#[test]
fn dropping_a_signal_retires_its_only_subscribers() {
    let rt = Runtime::new();
    let slot = Rc::new(RefCell::new(Some(rt.create_signal(0))));

    let s = slot.clone();
    let id = rt.create_reaction(move || {
        if let Some(signal) = &*s.borrow() {
            signal.get();
        }
    });
    assert!(rt.is_alive(id));
    assert_eq!(rt.stats().edges, 1);

    let signal = slot.borrow_mut().take();
    drop(signal);

    assert!(!rt.is_alive(id));
    assert_eq!(rt.stats(), GraphStats::default());
}

/// Test that configuration loaded from JSON drives the runtime.
#[test]
fn runtime_from_json_config() {
    let config =
        RuntimeConfig::from_json(r#"{ "max_depth": 2, "failure_policy": "propagate" }"#).unwrap();
    let rt = Runtime::builder().config(config).build().unwrap();

    let (a, set_a) = rt.create_state(0);
    let (b, set_b) = rt.create_state(0);
    rt.create_reaction(move || set_b.set(a.get()));
    rt.create_reaction(move || {
        b.get();
    });

    // Writer at depth 0, mirror at 1, reader of `b` at 2.
    assert!(set_a.try_set(1).is_ok());

    assert!(matches!(
        RuntimeConfig::from_json(r#"{ "max_depth": 0 }"#),
        Err(ReactiveError::InvalidConfig(_))
    ));
}

/// Test a derived binding re-applying through the public API.
#[test]
fn derived_binding_tracks_signal() {
    let rt = Runtime::new();
    let (name, set_name) = rt.create_state("world".to_string());
    let text = Rc::new(RefCell::new(String::new()));

    let out = text.clone();
    Binding::derived(move || format!("hello {}", name.get()))
        .apply(&rt, move |value| *out.borrow_mut() = value);
    assert_eq!(*text.borrow(), "hello world");

    set_name.set("reaper".to_string());
    assert_eq!(*text.borrow(), "hello reaper");
}
