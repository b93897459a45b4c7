//! Background task contract and runners.
//!
//! # Responsibility
//! - Split work into a background half and a foreground completion half.
//! - Provide an inline runner and a worker-thread runner.
//!
//! # Invariants
//! - `on_post_execute` consumes the task, so completion fires at most once.
//! - Completion always runs after `do_in_background` returned (or panicked).
//! - The threaded runner delivers completions only on the thread that drains
//!   them (`run_pending_callbacks` / `wait_until_idle`).

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{error, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// Unit of work submitted to a `TaskRunner`.
pub trait Task: Send {
    /// Stable name used in log events.
    fn name(&self) -> &'static str;

    /// Runs off the foreground sequence.
    fn do_in_background(&mut self);

    /// Runs on the foreground sequence once the background half finished.
    fn on_post_execute(self: Box<Self>) {}
}

/// Execution substrate for tasks.
pub trait TaskRunner: Send + Sync {
    fn execute(&self, task: Box<dyn Task>);

    /// Tasks submitted whose completion has not run yet.
    fn active_task_count(&self) -> usize;
}

/// Runs both halves inline on the calling thread.
#[derive(Debug, Default)]
pub struct SingleThreadTaskRunner;

impl SingleThreadTaskRunner {
    pub fn new() -> Self {
        Self
    }
}

impl TaskRunner for SingleThreadTaskRunner {
    fn execute(&self, mut task: Box<dyn Task>) {
        run_background_half(task.as_mut());
        task.on_post_execute();
    }

    fn active_task_count(&self) -> usize {
        0
    }
}

/// Runs background halves on worker threads and queues completions for the
/// foreground.
pub struct ThreadTaskRunner {
    completed_tx: Sender<Box<dyn Task>>,
    completed_rx: Receiver<Box<dyn Task>>,
    active: Arc<AtomicUsize>,
}

impl Default for ThreadTaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadTaskRunner {
    pub fn new() -> Self {
        // Unbounded: a finished task is never dropped or blocked on.
        let (completed_tx, completed_rx) = unbounded();
        Self {
            completed_tx,
            completed_rx,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Runs every completion already delivered. Returns how many ran.
    pub fn run_pending_callbacks(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.completed_rx.try_recv() {
            self.complete(task);
            ran += 1;
        }
        ran
    }

    /// Blocks the calling thread until every submitted task completed.
    pub fn wait_until_idle(&self) {
        while self.active.load(Ordering::SeqCst) > 0 {
            match self.completed_rx.recv() {
                Ok(task) => self.complete(task),
                Err(_) => return,
            }
        }
    }

    fn complete(&self, task: Box<dyn Task>) {
        task.on_post_execute();
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl TaskRunner for ThreadTaskRunner {
    fn execute(&self, task: Box<dyn Task>) {
        self.active.fetch_add(1, Ordering::SeqCst);
        let name = task.name();

        // Hand-off slot; the foreground keeps a receiver to reclaim the task
        // when no worker could be spawned. Sending cannot fail while `job_rx`
        // is alive and the slot is empty.
        let (job_tx, job_rx) = bounded::<Box<dyn Task>>(1);
        let _ = job_tx.send(task);
        let worker_rx = job_rx.clone();
        let completed_tx = self.completed_tx.clone();

        let spawned = thread::Builder::new()
            .name(format!("habitloop-{name}"))
            .spawn(move || {
                if let Ok(mut task) = worker_rx.try_recv() {
                    run_background_half(task.as_mut());
                    let _ = completed_tx.send(task);
                }
            });

        if let Err(err) = spawned {
            warn!(
                "event=task_spawn module=task status=error task={name} fallback=inline error={err}"
            );
            if let Ok(mut task) = job_rx.try_recv() {
                run_background_half(task.as_mut());
                let _ = self.completed_tx.send(task);
            }
        }
    }

    fn active_task_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

fn run_background_half(task: &mut dyn Task) {
    let name = task.name();
    if catch_unwind(AssertUnwindSafe(|| task.do_in_background())).is_err() {
        error!("event=task_background module=task status=error task={name} error=panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::{SingleThreadTaskRunner, Task, TaskRunner, ThreadTaskRunner};
    use std::sync::{Arc, Mutex};
    use std::thread::{self, ThreadId};
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct Trace {
        steps: Vec<&'static str>,
        background_thread: Option<ThreadId>,
        completion_thread: Option<ThreadId>,
    }

    struct TracingTask {
        trace: Arc<Mutex<Trace>>,
        panic_in_background: bool,
    }

    impl Task for TracingTask {
        fn name(&self) -> &'static str {
            "tracing"
        }

        fn do_in_background(&mut self) {
            {
                let mut trace = self.trace.lock().expect("trace lock");
                trace.steps.push("background");
                trace.background_thread = Some(thread::current().id());
            }
            if self.panic_in_background {
                panic!("background failure");
            }
        }

        fn on_post_execute(self: Box<Self>) {
            let mut trace = self.trace.lock().expect("trace lock");
            trace.steps.push("completion");
            trace.completion_thread = Some(thread::current().id());
        }
    }

    fn task(trace: &Arc<Mutex<Trace>>, panic_in_background: bool) -> Box<dyn Task> {
        Box::new(TracingTask {
            trace: Arc::clone(trace),
            panic_in_background,
        })
    }

    #[test]
    fn single_thread_runner_runs_both_halves_in_order() {
        let trace = Arc::new(Mutex::new(Trace::default()));
        SingleThreadTaskRunner::new().execute(task(&trace, false));
        let trace = trace.lock().expect("trace lock");
        assert_eq!(trace.steps, vec!["background", "completion"]);
        assert_eq!(trace.completion_thread, Some(thread::current().id()));
    }

    #[test]
    fn thread_runner_completes_on_draining_thread() {
        let trace = Arc::new(Mutex::new(Trace::default()));
        let runner = ThreadTaskRunner::new();
        runner.execute(task(&trace, false));
        runner.wait_until_idle();

        assert_eq!(runner.active_task_count(), 0);
        let trace = trace.lock().expect("trace lock");
        assert_eq!(trace.steps, vec!["background", "completion"]);
        assert_ne!(trace.background_thread, Some(thread::current().id()));
        assert_eq!(trace.completion_thread, Some(thread::current().id()));
    }

    #[test]
    fn panicking_background_half_still_completes_once() {
        let trace = Arc::new(Mutex::new(Trace::default()));
        let runner = ThreadTaskRunner::new();
        runner.execute(task(&trace, true));
        runner.wait_until_idle();
        assert_eq!(runner.run_pending_callbacks(), 0);

        let steps = trace.lock().map(|t| t.steps.clone()).unwrap_or_default();
        assert_eq!(steps, vec!["background", "completion"]);
    }

    #[test]
    fn pending_callbacks_drain_every_finished_task() {
        let trace = Arc::new(Mutex::new(Trace::default()));
        let runner = ThreadTaskRunner::new();
        for _ in 0..3 {
            runner.execute(task(&trace, false));
        }

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut ran = 0;
        while ran < 3 && Instant::now() < deadline {
            ran += runner.run_pending_callbacks();
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(ran, 3);
        assert_eq!(runner.active_task_count(), 0);
        let trace = trace.lock().expect("trace lock");
        let completions = trace.steps.iter().filter(|s| **s == "completion").count();
        assert_eq!(completions, 3);
    }

    #[test]
    fn completions_run_on_whichever_thread_drains_the_runner() {
        let trace = Arc::new(Mutex::new(Trace::default()));
        let runner = Arc::new(ThreadTaskRunner::new());
        runner.execute(task(&trace, false));

        let drainer = Arc::clone(&runner);
        let drain_thread = thread::spawn(move || {
            drainer.wait_until_idle();
            thread::current().id()
        })
        .join()
        .expect("drainer thread");

        assert_eq!(runner.active_task_count(), 0);
        let trace = trace.lock().expect("trace lock");
        assert_eq!(trace.completion_thread, Some(drain_thread));
    }
}
