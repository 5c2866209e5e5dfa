//! Integration test: processes that suspend and resume.
//!
//! Covers timed waits, conditional waits, starting child processes, and
//! interrupting or terminating a parked process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::bounded;
use simkern_engine::{
    EventManager, FnTarget, KernelError, Process, ProcessError, ProcessState, MAX_TICK,
};
use simkern_test_utils::{test_manager, Recorder};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn zero_tick_wait_yields_to_same_tick_work() {
    let evt = test_manager("yield");
    let rec = Recorder::new();
    let rec2 = rec.clone();
    let x = FnTarget::shared("x", move |evt: &EventManager| {
        rec2.record("x1");
        evt.wait_ticks(0, 0, true)?;
        rec2.record("x2");
        Ok(())
    });
    evt.schedule_process(0, 0, true, x).unwrap();
    evt.schedule_process(0, 0, true, rec.target("y")).unwrap();

    evt.run_until(MAX_TICK).unwrap();

    assert_eq!(rec.entries(), vec!["x1", "y@0", "x2"]);
    evt.shutdown().unwrap();
}

#[test]
fn waits_advance_the_clock() {
    let evt = test_manager("waits");
    let rec = Recorder::new();
    evt.schedule_process(2, 0, true, rec.waiting_target("p", 5)).unwrap();
    evt.schedule_process(4, 0, true, rec.target("q")).unwrap();

    evt.run_until(MAX_TICK).unwrap();

    assert_eq!(rec.entries(), vec!["p@2", "q@4", "p@7"]);
    evt.shutdown().unwrap();
}

#[test]
fn wait_seconds_rounds_to_ticks() {
    let evt = test_manager("seconds");
    evt.set_ticks_per_second(10.0).unwrap();
    let rec = Recorder::new();
    let rec2 = rec.clone();
    let p = FnTarget::shared("p", move |evt: &EventManager| {
        evt.wait_seconds(1.26, 0, true)?;
        rec2.record(format!("p@{}", evt.current_tick()));
        Ok(())
    });
    evt.schedule_process(0, 0, true, p).unwrap();
    evt.run_until(MAX_TICK).unwrap();
    assert_eq!(rec.entries(), vec!["p@13"]);
    evt.shutdown().unwrap();
}

#[test]
fn negative_wait_fails_without_suspending() {
    let evt = test_manager("neg-wait");
    let (tx, rx) = bounded(1);
    let p = FnTarget::shared("p", move |evt: &EventManager| {
        let result = evt.wait_ticks(-3, 0, true);
        let _ = tx.send(matches!(
            result,
            Err(ProcessError::Kernel(KernelError::NegativeDuration { ticks: -3, .. }))
        ));
        Ok(())
    });
    evt.schedule_process(0, 0, true, p).unwrap();
    evt.run_until(MAX_TICK).unwrap();
    assert!(rx.recv_timeout(RECV_TIMEOUT).unwrap());
    assert_eq!(evt.pending_count(), 0);
    evt.shutdown().unwrap();
}

#[test]
fn wait_until_resumes_at_the_satisfying_tick() {
    let evt = test_manager("cond");
    let rec = Recorder::new();
    let flag = Arc::new(AtomicBool::new(false));

    let waiter = {
        let rec = rec.clone();
        let flag = Arc::clone(&flag);
        FnTarget::shared("waiter", move |evt: &EventManager| {
            while !flag.load(Ordering::SeqCst) {
                evt.wait_until()?;
            }
            evt.wait_until_ended()?;
            rec.record(format!("w@{}", evt.current_tick()));
            Ok(())
        })
    };
    let setter = {
        let rec = rec.clone();
        let flag = Arc::clone(&flag);
        FnTarget::shared("setter", move |evt: &EventManager| {
            flag.store(true, Ordering::SeqCst);
            rec.record(format!("s@{}", evt.current_tick()));
            Ok(())
        })
    };
    evt.schedule_process(0, 0, true, waiter).unwrap();
    evt.schedule_process(10, 0, true, setter).unwrap();
    evt.schedule_process(20, 0, true, rec.target("end")).unwrap();

    evt.run_until(MAX_TICK).unwrap();

    assert_eq!(rec.entries(), vec!["s@10", "w@10", "end@20"]);
    assert_eq!(evt.conditional_count(), 0);
    evt.shutdown().unwrap();
}

#[test]
fn wait_until_ended_without_wait_until_returns_immediately() {
    let evt = test_manager("cond-noop");
    let rec = Recorder::new();
    let rec2 = rec.clone();
    let p = FnTarget::shared("p", move |evt: &EventManager| {
        evt.wait_until_ended()?;
        rec2.record(format!("p@{}", evt.current_tick()));
        Ok(())
    });
    evt.schedule_process(3, 0, true, p).unwrap();
    evt.run_until(MAX_TICK).unwrap();
    assert_eq!(rec.entries(), vec!["p@3"]);
    evt.shutdown().unwrap();
}

#[test]
fn start_process_runs_child_first() {
    let evt = test_manager("start");
    let rec = Recorder::new();
    let child = rec.waiting_target("child", 5);
    let rec2 = rec.clone();
    let parent = FnTarget::shared("parent", move |evt: &EventManager| {
        rec2.record("p1");
        evt.start_process(Arc::clone(&child))?;
        rec2.record("p2");
        Ok(())
    });
    evt.schedule_process(0, 0, true, parent).unwrap();

    evt.run_until(MAX_TICK).unwrap();

    assert_eq!(rec.entries(), vec!["p1", "child@0", "p2", "child@5"]);
    evt.shutdown().unwrap();
}

#[test]
fn interrupt_process_pulls_wait_forward() {
    let evt = test_manager("interrupt");
    let rec = Recorder::new();
    let handle: Arc<Mutex<Option<Process>>> = Arc::new(Mutex::new(None));

    let x = {
        let rec = rec.clone();
        let handle = Arc::clone(&handle);
        FnTarget::shared("x", move |evt: &EventManager| {
            *handle.lock().unwrap() = evt.current_process();
            rec.record(format!("x-start@{}", evt.current_tick()));
            evt.wait_ticks(100, 0, true)?;
            rec.record(format!("x-resumed@{}", evt.current_tick()));
            Ok(())
        })
    };
    let y = {
        let rec = rec.clone();
        let handle = Arc::clone(&handle);
        FnTarget::shared("y", move |evt: &EventManager| {
            rec.record(format!("y-before@{}", evt.current_tick()));
            let x = handle.lock().unwrap().clone().expect("x started");
            assert_eq!(x.state(), ProcessState::SchedWait);
            evt.interrupt_process(&x)?;
            rec.record(format!("y-after@{}", evt.current_tick()));
            Ok(())
        })
    };
    evt.schedule_process(0, 0, true, x).unwrap();
    evt.schedule_process(10, 0, true, y).unwrap();

    evt.run_until(MAX_TICK).unwrap();

    assert_eq!(
        rec.entries(),
        vec!["x-start@0", "y-before@10", "x-resumed@10", "y-after@10"]
    );
    assert_eq!(evt.pending_count(), 0);
    assert_eq!(evt.current_tick(), 10);
    evt.shutdown().unwrap();
}

#[test]
fn interrupt_target_runs_pending_event_now() {
    let evt = test_manager("interrupt-target");
    let rec = Recorder::new();
    let later = rec.target("later");
    let pending = Arc::clone(&later);
    let rec2 = rec.clone();
    let caller = FnTarget::shared("caller", move |evt: &EventManager| {
        evt.interrupt(&pending)?;
        rec2.record(format!("caller@{}", evt.current_tick()));
        Ok(())
    });
    evt.schedule_process(50, 0, true, later).unwrap();
    evt.schedule_process(1, 0, true, caller).unwrap();

    evt.run_until(MAX_TICK).unwrap();

    assert_eq!(rec.entries(), vec!["later@1", "caller@1"]);
    assert_eq!(evt.current_tick(), 1);
    evt.shutdown().unwrap();
}

#[test]
fn terminate_process_cancels_parked_wait() {
    let evt = test_manager("terminate");
    let (tx, rx) = bounded(1);
    let handle: Arc<Mutex<Option<Process>>> = Arc::new(Mutex::new(None));

    let sleeper = {
        let handle = Arc::clone(&handle);
        FnTarget::shared("sleeper", move |evt: &EventManager| {
            *handle.lock().unwrap() = evt.current_process();
            let result = evt.wait_ticks(100, 0, true);
            let _ = tx.send(result.as_ref().is_err_and(ProcessError::is_terminated));
            result
        })
    };
    let killer = {
        let handle = Arc::clone(&handle);
        FnTarget::shared("killer", move |evt: &EventManager| {
            let sleeper = handle.lock().unwrap().clone().expect("sleeper started");
            evt.terminate_process(&sleeper)?;
            Ok(())
        })
    };
    evt.schedule_process(0, 0, true, sleeper).unwrap();
    evt.schedule_process(5, 0, true, killer).unwrap();

    evt.run_until(MAX_TICK).unwrap();

    assert!(rx.recv_timeout(RECV_TIMEOUT).unwrap());
    assert_eq!(evt.pending_count(), 0);
    assert_eq!(evt.current_tick(), 5);
    evt.shutdown().unwrap();
}

#[test]
fn terminate_process_cancels_conditional_waiter() {
    let evt = test_manager("terminate-cond");
    let rec = Recorder::new();
    let (tx, rx) = bounded(1);
    let handle: Arc<Mutex<Option<Process>>> = Arc::new(Mutex::new(None));

    let waiter = {
        let handle = Arc::clone(&handle);
        FnTarget::shared("waiter", move |evt: &EventManager| {
            *handle.lock().unwrap() = evt.current_process();
            let err = loop {
                if let Err(e) = evt.wait_until() {
                    break e;
                }
            };
            let _ = tx.send(err.is_terminated());
            Err(err)
        })
    };
    let killer = {
        let handle = Arc::clone(&handle);
        FnTarget::shared("killer", move |evt: &EventManager| {
            let waiter = handle.lock().unwrap().clone().expect("waiter started");
            evt.terminate_process(&waiter)?;
            Ok(())
        })
    };
    evt.schedule_process(0, 0, true, waiter).unwrap();
    evt.schedule_process(5, 0, true, killer).unwrap();
    evt.schedule_process(10, 0, true, rec.target("end")).unwrap();

    evt.run_until(MAX_TICK).unwrap();

    assert!(rx.recv_timeout(RECV_TIMEOUT).unwrap());
    assert_eq!(rec.entries(), vec!["end@10"]);
    assert_eq!(evt.conditional_count(), 0);
    evt.shutdown().unwrap();
}

#[test]
fn terminating_a_chained_waiter_keeps_the_pass_alive() {
    let evt = test_manager("terminate-chain");
    let rec = Recorder::new();
    let flag = Arc::new(AtomicBool::new(false));
    let (tx, rx) = bounded(1);
    let second: Arc<Mutex<Option<Process>>> = Arc::new(Mutex::new(None));

    // Both waiters are offered the same pass; the first cancels the second
    // before handing control along the chain.
    let first = {
        let rec = rec.clone();
        let flag = Arc::clone(&flag);
        let second = Arc::clone(&second);
        FnTarget::shared("first", move |evt: &EventManager| {
            let mut killed = false;
            while !flag.load(Ordering::SeqCst) {
                evt.wait_until()?;
                if !killed {
                    let peer = second.lock().unwrap().clone().expect("second started");
                    evt.terminate_process(&peer)?;
                    killed = true;
                }
            }
            evt.wait_until_ended()?;
            rec.record(format!("w@{}", evt.current_tick()));
            Ok(())
        })
    };
    let second_target = {
        let second = Arc::clone(&second);
        FnTarget::shared("second", move |evt: &EventManager| {
            *second.lock().unwrap() = evt.current_process();
            let result = evt.wait_until();
            let _ = tx.send(result.as_ref().is_err_and(ProcessError::is_terminated));
            result
        })
    };
    let setter = {
        let rec = rec.clone();
        let flag = Arc::clone(&flag);
        FnTarget::shared("setter", move |evt: &EventManager| {
            flag.store(true, Ordering::SeqCst);
            rec.record(format!("s@{}", evt.current_tick()));
            Ok(())
        })
    };
    evt.schedule_process(0, 0, true, first).unwrap();
    evt.schedule_process(0, 1, true, second_target).unwrap();
    evt.schedule_process(10, 0, true, setter).unwrap();
    evt.schedule_process(20, 0, true, rec.target("end")).unwrap();

    let (done_tx, done_rx) = bounded(1);
    let runner = evt.clone();
    thread::spawn(move || {
        let _ = done_tx.send(runner.run_until(MAX_TICK));
    });
    done_rx.recv_timeout(RECV_TIMEOUT).unwrap().unwrap();

    assert!(rx.recv_timeout(RECV_TIMEOUT).unwrap());
    assert_eq!(rec.entries(), vec!["s@10", "w@10", "end@20"]);
    assert_eq!(evt.conditional_count(), 0);
    evt.shutdown().unwrap();
}

#[test]
fn terminated_process_cannot_schedule_while_unwinding() {
    let evt = test_manager("terminate-unwind");
    let rec = Recorder::new();
    let (tx, rx) = bounded(1);
    let handle: Arc<Mutex<Option<Process>>> = Arc::new(Mutex::new(None));

    let sleeper = {
        let rec = rec.clone();
        let handle = Arc::clone(&handle);
        FnTarget::shared("sleeper", move |evt: &EventManager| {
            *handle.lock().unwrap() = evt.current_process();
            let _ = evt.wait_ticks(100, 0, true);
            let result = evt.schedule_process(1, 0, true, rec.target("late"));
            let _ = tx.send(matches!(result, Err(KernelError::ProcessTerminated { .. })));
            Ok(())
        })
    };
    let killer = {
        let handle = Arc::clone(&handle);
        FnTarget::shared("killer", move |evt: &EventManager| {
            let sleeper = handle.lock().unwrap().clone().expect("sleeper started");
            evt.terminate_process(&sleeper)?;
            Ok(())
        })
    };
    evt.schedule_process(0, 0, true, sleeper).unwrap();
    evt.schedule_process(5, 0, true, killer).unwrap();

    evt.run_until(MAX_TICK).unwrap();

    assert!(rx.recv_timeout(RECV_TIMEOUT).unwrap());
    assert_eq!(evt.pending_count(), 0);
    assert!(rec.is_empty());
    evt.shutdown().unwrap();
}

#[test]
fn wait_for_pause_from_a_process_is_rejected() {
    let evt = test_manager("self-wait");
    let (tx, rx) = bounded(1);
    let p = FnTarget::shared("p", move |evt: &EventManager| {
        let _ = tx.send(evt.wait_for_pause());
        Ok(())
    });
    evt.schedule_process(0, 0, true, p).unwrap();
    evt.run_until(MAX_TICK).unwrap();
    assert!(matches!(
        rx.recv_timeout(RECV_TIMEOUT).unwrap(),
        Err(KernelError::CalledFromProcess { .. })
    ));
    evt.shutdown().unwrap();
}
