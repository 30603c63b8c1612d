// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use mroutine_runtime::{
    sequence, LifetimeSignal, RoutineError, RoutineState, Scheduler, SchedulerConfig, Script,
    TimeStep, Yielded,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

const STEP: TimeStep = TimeStep {
    delta: 1.0 / 60.0,
    unscaled_delta: 1.0 / 60.0,
};

fn waiting_routine(scheduler: &Scheduler, frames: u64) -> mroutine_runtime::Handle {
    scheduler.create(Script::new().step(move |cx| Some(cx.scheduler().wait_frames(frames))))
}

#[test]
fn test_start_runs_first_advance_and_rejects_second_start() {
    let scheduler = Scheduler::default();
    let ran = Rc::new(Cell::new(false));
    let flag = ran.clone();
    let handle = scheduler.create(Script::new().step(move |cx| {
        flag.set(true);
        Some(cx.scheduler().wait_frames(5))
    }));

    assert_eq!(handle.state(), RoutineState::Idle);
    assert!(!ran.get(), "Creating a routine must not run it");

    handle.start().unwrap();
    assert!(ran.get(), "Start must perform the first advance");
    assert_eq!(handle.state(), RoutineState::Running);

    let id = handle.id().unwrap();
    assert_eq!(
        handle.start().err(),
        Some(RoutineError::AlreadyStarted { id })
    );
}

#[test]
fn test_start_on_finished_handle_is_invalid() {
    let scheduler = Scheduler::default();
    let handle = scheduler.create(Script::new());
    handle.start().unwrap();

    assert_eq!(handle.start().err(), Some(RoutineError::InvalidHandle));
}

#[test]
fn test_handles_are_invalidated_across_slot_reuse() {
    let scheduler = Scheduler::default();

    // --- 1. ARRANGE ---
    let first = scheduler.create(Script::new());
    let copy = first.clone();
    first.start().unwrap();

    // --- 2. ACT ---
    // The freed slot is handed to an unrelated run.
    let second = waiting_routine(&scheduler, 1);

    // --- 3. ASSERT ---
    let (old, new) = (first.id().unwrap(), second.id().unwrap());
    assert_eq!(old.index, new.index, "The slot should be reused");
    assert_ne!(old.generation, new.generation);

    assert!(!first.is_valid());
    assert!(!copy.is_valid());
    assert_eq!(copy.state(), RoutineState::Complete);
    assert!(second.is_valid());

    // Operations through the stale handle must not touch the new run.
    assert!(!first.stop());
    assert_eq!(second.state(), RoutineState::Idle);
}

#[test]
fn test_routine_without_waits_completes_inside_start() {
    let scheduler = Scheduler::default();
    let finished = Rc::new(Cell::new(false));
    let flag = finished.clone();

    let handle = scheduler.create(Script::new().step(|_| None).step(|_| None));
    handle.callback(move || flag.set(true));
    handle.start().unwrap();

    assert!(!handle.is_valid());
    assert!(finished.get());
    assert_eq!(scheduler.active_count(), 0);
    assert_eq!(scheduler.frame(), 0);
}

#[test]
fn test_steps_before_first_wait_run_in_starting_tick() {
    let scheduler = Scheduler::default();
    let log = Rc::new(RefCell::new(Vec::new()));

    let (a, b, c, d) = (log.clone(), log.clone(), log.clone(), log.clone());
    let handle = scheduler.create(
        Script::new()
            .step(move |cx| {
                a.borrow_mut().push(("one", cx.frame()));
                None
            })
            .step(move |cx| {
                b.borrow_mut().push(("two", cx.frame()));
                None
            })
            .step(move |cx| {
                c.borrow_mut().push(("three", cx.frame()));
                Some(cx.scheduler().wait_frames(1))
            })
            .step(move |cx| {
                d.borrow_mut().push(("after", cx.frame()));
                None
            }),
    );
    handle.start().unwrap();
    assert_eq!(
        *log.borrow(),
        vec![("one", 0), ("two", 0), ("three", 0)],
        "All three steps should drain before suspending"
    );

    scheduler.tick(STEP).unwrap();
    assert_eq!(log.borrow().last(), Some(&("after", 1)));
    assert_eq!(log.borrow().len(), 4);
    assert!(!handle.is_valid());
}

#[test]
fn test_nested_sequence_runs_to_exhaustion_before_parent_resumes() {
    let scheduler = Scheduler::default();
    let log = Rc::new(RefCell::new(Vec::new()));

    let (outer_a, outer_b) = (log.clone(), log.clone());
    let inner_log = log.clone();
    let handle = scheduler.create(
        Script::new()
            .step(move |cx| {
                outer_a.borrow_mut().push(("outer-a", cx.frame()));
                None
            })
            .step(move |_| {
                let (x, y) = (inner_log.clone(), inner_log);
                Some(Yielded::nested(
                    Script::new()
                        .step(move |cx| {
                            x.borrow_mut().push(("inner-a", cx.frame()));
                            Some(cx.scheduler().wait_frames(1))
                        })
                        .step(move |cx| {
                            y.borrow_mut().push(("inner-b", cx.frame()));
                            Some(cx.scheduler().wait_frames(1))
                        }),
                ))
            })
            .step(move |cx| {
                outer_b.borrow_mut().push(("outer-b", cx.frame()));
                None
            }),
    );
    handle.start().unwrap();

    let mut ticks = 0;
    while handle.is_valid() {
        scheduler.tick(STEP).unwrap();
        ticks += 1;
    }

    assert_eq!(ticks, 2);
    assert_eq!(
        *log.borrow(),
        vec![
            ("outer-a", 0),
            ("inner-a", 0),
            ("inner-b", 1),
            ("outer-b", 2)
        ]
    );
}

#[test]
fn test_sequential_runs_reuse_one_processor() {
    let scheduler = Scheduler::new(SchedulerConfig {
        initial_capacity: 0,
        ..Default::default()
    });
    assert_eq!(scheduler.allocated_processors(), 0);

    let mut index = None;
    for _ in 0..5 {
        let handle = waiting_routine(&scheduler, 2);
        handle.start().unwrap();
        let id = handle.id().unwrap();
        assert_eq!(*index.get_or_insert(id.index), id.index);

        while handle.is_valid() {
            scheduler.tick(STEP).unwrap();
        }
    }

    assert_eq!(scheduler.allocated_processors(), 1);
}

#[test]
fn test_overlapping_runs_grow_the_arena() {
    let scheduler = Scheduler::new(SchedulerConfig {
        initial_capacity: 1,
        ..Default::default()
    });
    let handles: Vec<_> = (0..3).map(|_| waiting_routine(&scheduler, 1)).collect();
    assert_eq!(scheduler.allocated_processors(), 3);

    for handle in &handles {
        handle.start().unwrap();
    }
    scheduler.tick(STEP).unwrap();
    assert!(handles.iter().all(|h| !h.is_valid()));
    assert_eq!(scheduler.allocated_processors(), 3);
}

#[test]
fn test_stop_finishes_running_routine_on_next_tick() {
    let scheduler = Scheduler::default();
    let finished = Rc::new(Cell::new(0));
    let counter = finished.clone();

    let handle = waiting_routine(&scheduler, 100);
    handle.callback(move || counter.set(counter.get() + 1));
    handle.start().unwrap();

    assert!(handle.stop());
    assert_eq!(handle.state(), RoutineState::Stopping);
    assert!(!handle.stop(), "A second stop request must be rejected");
    assert!(handle.is_valid());

    scheduler.tick(STEP).unwrap();
    assert!(!handle.is_valid());
    assert_eq!(finished.get(), 1);
    assert!(!handle.stop());
}

#[test]
fn test_stop_before_start_finishes_immediately() {
    let scheduler = Scheduler::default();
    let finished = Rc::new(Cell::new(false));
    let flag = finished.clone();

    let handle = waiting_routine(&scheduler, 1);
    handle.callback(move || flag.set(true));

    assert!(handle.stop());
    assert!(!handle.is_valid());
    assert!(finished.get());
}

#[test]
fn test_routine_can_stop_itself() {
    let scheduler = Scheduler::default();
    let reached = Rc::new(Cell::new(false));
    let flag = reached.clone();

    let handle = scheduler.create(
        Script::new()
            .step(|cx| {
                assert!(cx.handle().stop());
                Some(cx.scheduler().wait_frames(1))
            })
            .step(move |_| {
                flag.set(true);
                None
            }),
    );
    handle.start().unwrap();

    assert!(!handle.is_valid());
    assert!(!reached.get());
}

#[test]
fn test_callbacks_fire_in_order_once() {
    let scheduler = Scheduler::default();
    let order = Rc::new(RefCell::new(Vec::new()));

    let handle = waiting_routine(&scheduler, 1);
    for i in 0..3 {
        let order = order.clone();
        handle.callback(move || order.borrow_mut().push(i));
    }
    handle.start().unwrap();
    scheduler.tick(STEP).unwrap();
    scheduler.tick(STEP).unwrap();

    assert_eq!(*order.borrow(), vec![0, 1, 2]);

    // Registering on a finished handle is a silent no-op.
    let late = order.clone();
    handle.callback(move || late.borrow_mut().push(99));
    assert_eq!(order.borrow().len(), 3);
}

#[test]
fn test_callback_may_start_a_new_routine() {
    let scheduler = Scheduler::new(SchedulerConfig {
        initial_capacity: 0,
        ..Default::default()
    });
    let follow_up = Rc::new(RefCell::new(None));

    let first = waiting_routine(&scheduler, 1);
    let host = scheduler.clone();
    let slot = follow_up.clone();
    first.callback(move || {
        let next = host.create(Script::new().step(|cx| Some(cx.scheduler().wait_frames(1))));
        next.start().unwrap();
        *slot.borrow_mut() = Some(next);
    });
    first.start().unwrap();
    scheduler.tick(STEP).unwrap();

    let next = follow_up.borrow().clone().unwrap();
    assert!(!first.is_valid());
    assert!(next.is_valid());
    // The finishing slot is still claimed while its callbacks run.
    assert_ne!(next.id().unwrap().index, first.id().unwrap().index);
    assert_eq!(scheduler.allocated_processors(), 2);

    scheduler.tick(STEP).unwrap();
    scheduler.tick(STEP).unwrap();
    assert!(!next.is_valid());
    let reused = scheduler.create(Script::new());
    assert_eq!(scheduler.allocated_processors(), 2, "Both slots are back in the pool");
    assert!(reused.is_valid());
}

#[test]
fn test_handle_stays_valid_inside_its_callbacks() {
    let scheduler = Scheduler::default();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let handle = waiting_routine(&scheduler, 1);
    for _ in 0..2 {
        let inside = handle.clone();
        let seen = seen.clone();
        handle.callback(move || {
            seen.borrow_mut()
                .push((inside.is_valid(), inside.state(), inside.stop()));
        });
    }
    handle.start().unwrap();
    scheduler.tick(STEP).unwrap();

    assert_eq!(
        *seen.borrow(),
        vec![
            (true, RoutineState::Stopping, false),
            (true, RoutineState::Stopping, false),
        ]
    );
    assert!(!handle.is_valid());
    assert_eq!(handle.state(), RoutineState::Complete);
}

#[test]
fn test_callbacks_see_the_routine_torn_down() {
    let scheduler = Scheduler::default();
    let signal = LifetimeSignal::new();
    let seen = Rc::new(Cell::new(None));

    let handle = waiting_routine(&scheduler, 10);
    handle.attach(signal.clone()).unwrap();
    let sink = seen.clone();
    let listeners = signal.clone();
    let host = scheduler.clone();
    handle.callback(move || sink.set(Some((listeners.listener_count(), host.active_count()))));
    handle.start().unwrap();
    assert!(handle.stop());
    scheduler.tick(STEP).unwrap();

    // Detached before the callback, unsubscribed only after it.
    assert_eq!(seen.get(), Some((0, 1)));
    assert_eq!(scheduler.active_count(), 0);
}

#[test]
fn test_stop_from_earlier_routine_takes_effect_in_the_same_tick() {
    let scheduler = Scheduler::default();
    let order = Rc::new(RefCell::new(Vec::new()));

    let log = order.clone();
    let later = scheduler.create(
        Script::new()
            .step(|cx| Some(cx.scheduler().wait_frames(1)))
            .step(move |_| {
                log.borrow_mut().push("later resumed");
                None
            }),
    );
    let log = order.clone();
    later.callback(move || log.borrow_mut().push("later finished"));

    let target = later.clone();
    let log = order.clone();
    let earlier = scheduler.create(
        Script::new()
            .step(|cx| Some(cx.scheduler().wait_frames(1)))
            .step(move |_| {
                log.borrow_mut().push("earlier stops later");
                assert!(target.stop());
                None
            }),
    );

    earlier.start().unwrap();
    later.start().unwrap();
    scheduler.tick(STEP).unwrap();

    assert!(!earlier.is_valid());
    assert!(!later.is_valid());
    assert_eq!(*order.borrow(), vec!["earlier stops later", "later finished"]);
}

#[test]
fn test_lifetime_deactivation_stops_routine() {
    let scheduler = Scheduler::default();
    let signal = LifetimeSignal::new();

    let handle = waiting_routine(&scheduler, 100);
    handle.attach(signal.clone()).unwrap();
    handle.start().unwrap();
    assert_eq!(signal.listener_count(), 1);

    let id = handle.id().unwrap();
    assert_eq!(
        handle.attach(LifetimeSignal::new()).err(),
        Some(RoutineError::AlreadyAttached { id })
    );

    signal.deactivate();
    assert_eq!(handle.state(), RoutineState::Stopping);

    scheduler.tick(STEP).unwrap();
    assert!(!handle.is_valid());
    assert_eq!(signal.listener_count(), 0);
}

#[test]
fn test_finishing_detaches_from_lifetime() {
    let scheduler = Scheduler::default();
    let signal = LifetimeSignal::new();

    let handle = waiting_routine(&scheduler, 1);
    handle.attach(signal.clone()).unwrap();
    handle.start().unwrap();
    scheduler.tick(STEP).unwrap();

    assert!(!handle.is_valid());
    assert_eq!(signal.listener_count(), 0);
}

#[test]
fn test_attaching_inactive_lifetime_stops_routine() {
    let scheduler = Scheduler::default();
    let signal = LifetimeSignal::new();
    signal.deactivate();

    let handle = waiting_routine(&scheduler, 1);
    handle.attach(signal.clone()).unwrap();

    assert!(!handle.is_valid());
    assert_eq!(signal.listener_count(), 0);
}

#[test]
fn test_continuation_check_stops_routine() {
    let scheduler = Scheduler::default();
    let keep_going = Rc::new(Cell::new(true));
    let flag = keep_going.clone();

    let handle = waiting_routine(&scheduler, 100);
    handle.check(move || flag.get()).unwrap();
    handle.start().unwrap();

    scheduler.tick(STEP).unwrap();
    assert!(handle.is_valid());

    keep_going.set(false);
    scheduler.tick(STEP).unwrap();
    assert!(!handle.is_valid());
}

#[test]
fn test_check_installed_from_inside_the_routine_is_kept() {
    let scheduler = Scheduler::default();
    let keep_going = Rc::new(Cell::new(true));
    let flag = keep_going.clone();

    let handle = scheduler.create(sequence::from_fn(move |cx| {
        if cx.frame() == 0 {
            let flag = flag.clone();
            cx.handle().check(move || flag.get()).unwrap();
        }
        Some(cx.scheduler().wait_frames(1))
    }));
    handle.start().unwrap();

    scheduler.tick(STEP).unwrap();
    scheduler.tick(STEP).unwrap();
    assert!(handle.is_valid());

    keep_going.set(false);
    scheduler.tick(STEP).unwrap();
    assert!(!handle.is_valid());
}

#[test]
fn test_usage_error_tears_down_only_the_failing_routine() {
    let scheduler = Scheduler::default();

    let failing = scheduler.create(
        Script::new()
            .step(|cx| Some(cx.scheduler().wait_frames(1)))
            .step(|_| Some(Yielded::value("not awaitable"))),
    );
    let healthy = waiting_routine(&scheduler, 2);
    failing.start().unwrap();
    healthy.start().unwrap();

    let result = scheduler.tick(STEP);
    assert_eq!(
        result,
        Err(RoutineError::UnsupportedYield { type_name: "&str" })
    );
    assert!(!failing.is_valid());
    assert!(healthy.is_valid());

    scheduler.tick(STEP).unwrap();
    assert!(!healthy.is_valid());
}
