//! Work-stealing thread pool
//!
//! Fixed worker set with one deque per worker: owners pop from the back
//! for cache warmth, thieves pop from the front after scanning victims in
//! round-robin order. A pending counter guarded by an explicit mutex
//! tracks outstanding jobs; `wait_for_all` sleeps on its condition
//! variable with a 500 ms re-check against lost wakeups. Idle workers park
//! for at most a millisecond before rescanning.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// How long an idle worker parks before rescanning the queues
const IDLE_PARK: Duration = Duration::from_millis(1);
/// Safety re-check interval for `wait_for_all`
const WAIT_RECHECK: Duration = Duration::from_millis(500);

struct PoolState {
    queues: Vec<Mutex<VecDeque<Job>>>,
    pending: Mutex<u64>,
    all_done: Condvar,
    sleep_lock: Mutex<()>,
    work_available: Condvar,
    shutdown: Mutex<bool>,
    next_queue: Mutex<usize>,
}

impl PoolState {
    fn is_shutdown(&self) -> bool {
        *self.shutdown.lock().unwrap()
    }

    fn take_job(&self, worker: usize) -> Option<Job> {
        // Own queue first, newest job (LIFO)
        if let Some(job) = self.queues[worker].lock().unwrap().pop_back() {
            return Some(job);
        }
        // Steal oldest job from victims in round-robin order (FIFO)
        let n = self.queues.len();
        for offset in 1..n {
            let victim = (worker + offset) % n;
            if let Some(job) = self.queues[victim].lock().unwrap().pop_front() {
                return Some(job);
            }
        }
        None
    }

    fn complete_one(&self) {
        let mut pending = self.pending.lock().unwrap();
        *pending -= 1;
        if *pending == 0 {
            self.all_done.notify_all();
        }
    }
}

fn worker_loop(state: Arc<PoolState>, worker: usize) {
    loop {
        if state.is_shutdown() {
            break;
        }
        match state.take_job(worker) {
            Some(job) => {
                job();
                state.complete_one();
            }
            None => {
                let guard = state.sleep_lock.lock().unwrap();
                let _ = state.work_available.wait_timeout(guard, IDLE_PARK);
            }
        }
    }
}

/// Fixed-size work-stealing pool
pub struct WorkStealingPool {
    state: Arc<PoolState>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkStealingPool {
    /// Pool with one worker per detected core.
    pub fn new() -> Self {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::with_workers(workers)
    }

    pub fn with_workers(worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let state = Arc::new(PoolState {
            queues: (0..worker_count)
                .map(|_| Mutex::new(VecDeque::new()))
                .collect(),
            pending: Mutex::new(0),
            all_done: Condvar::new(),
            sleep_lock: Mutex::new(()),
            work_available: Condvar::new(),
            shutdown: Mutex::new(false),
            next_queue: Mutex::new(0),
        });
        let workers = (0..worker_count)
            .map(|i| {
                let state = Arc::clone(&state);
                thread::Builder::new()
                    .name(format!("luxel-worker-{}", i))
                    .spawn(move || worker_loop(state, i))
                    .expect("failed to spawn pool worker")
            })
            .collect();
        Self {
            state,
            workers: Mutex::new(workers),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.state.queues.len()
    }

    /// Submit one job. The pending counter is raised before the job
    /// becomes visible to any worker, so `wait_for_all` can never miss it.
    pub fn submit<F: FnOnce() + Send + 'static>(&self, job: F) {
        {
            let mut pending = self.state.pending.lock().unwrap();
            *pending += 1;
        }
        let target = {
            let mut next = self.state.next_queue.lock().unwrap();
            let target = *next % self.state.queues.len();
            *next = next.wrapping_add(1);
            target
        };
        self.state.queues[target]
            .lock()
            .unwrap()
            .push_back(Box::new(job));
        self.state.work_available.notify_one();
    }

    /// Block until every submitted job has completed.
    pub fn wait_for_all(&self) {
        let mut pending = self.state.pending.lock().unwrap();
        while *pending > 0 {
            let (guard, _timeout) = self
                .state
                .all_done
                .wait_timeout(pending, WAIT_RECHECK)
                .unwrap();
            pending = guard;
        }
    }

    /// Stop the pool: queued jobs are dropped, in-flight jobs finish,
    /// workers exit. Safe to call more than once.
    pub fn shutdown(&self) {
        {
            let mut shutdown = self.state.shutdown.lock().unwrap();
            if *shutdown {
                return;
            }
            *shutdown = true;
        }
        self.state.work_available.notify_all();

        let handles: Vec<_> = self.workers.lock().unwrap().drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }

        // Abort queued work and release any waiter
        let mut dropped = 0u64;
        for queue in &self.state.queues {
            let mut queue = queue.lock().unwrap();
            dropped += queue.len() as u64;
            queue.clear();
        }
        if dropped > 0 {
            let mut pending = self.state.pending.lock().unwrap();
            *pending = pending.saturating_sub(dropped);
            if *pending == 0 {
                self.state.all_done.notify_all();
            }
        }
    }
}

impl Default for WorkStealingPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WorkStealingPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
