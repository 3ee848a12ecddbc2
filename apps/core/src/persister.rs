//! Debounced persistence of selection state.
//!
//! Every store mutation hands the persister a fresh snapshot and restarts the
//! quiet window. A background thread writes the latest snapshot once the
//! window elapses without further activity, so a burst of clicks costs one
//! write. [`DebouncedPersister::flush_now`] cancels the pending deadline and
//! writes synchronously; it is the teardown path.
//!
//! Each activity bumps a generation under the schedule lock, and a write
//! records the generation it saved only when it succeeds. The state is dirty
//! while the two differ. A failed timer write re-arms itself on the quiet
//! window unless newer activity or a successful flush got there first.
//!
//! Lock order is always `schedule` then `writes`. The timer thread takes the
//! write lock before it releases the schedule lock, so a flush issued after
//! the timer picked up its snapshot waits for that write and lands last.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::storage::{FileStorage, StorageError};
use crate::store::{ActivityListener, StoreState, Urgency};

pub const DEFAULT_QUIET_WINDOW: Duration = Duration::from_secs(10);
pub const DEFAULT_SOON_WINDOW: Duration = Duration::from_secs(1);

/// Durable destination for serialized state.
pub trait StateSink: Send + Sync {
    fn write_state(&self, state: &StoreState) -> Result<(), StorageError>;
}

impl StateSink for FileStorage {
    fn write_state(&self, state: &StoreState) -> Result<(), StorageError> {
        self.save(state)
    }
}

impl<S: StateSink + ?Sized> StateSink for Arc<S> {
    fn write_state(&self, state: &StoreState) -> Result<(), StorageError> {
        (**self).write_state(state)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceWindows {
    pub quiet: Duration,
    pub soon: Duration,
}

impl Default for DebounceWindows {
    fn default() -> Self {
        Self {
            quiet: DEFAULT_QUIET_WINDOW,
            soon: DEFAULT_SOON_WINDOW,
        }
    }
}

impl DebounceWindows {
    pub fn for_urgency(&self, urgency: Urgency) -> Duration {
        match urgency {
            Urgency::Normal => self.quiet,
            Urgency::Soon => self.soon,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistState {
    Idle,
    Pending { deadline: Instant },
}

struct Pending {
    deadline: Instant,
    generation: u64,
    state: StoreState,
}

#[derive(Default)]
struct Schedule {
    pending: Option<Pending>,
    generation: u64,
    shutdown: bool,
}

#[derive(Default)]
struct WriteLog {
    writes: u64,
    saved_generation: u64,
    last_error: Option<StorageError>,
}

struct Shared {
    schedule: Mutex<Schedule>,
    wake: Condvar,
    writes: Mutex<WriteLog>,
    sink: Box<dyn StateSink>,
    windows: DebounceWindows,
}

impl Shared {
    fn lock_schedule(&self) -> MutexGuard<'_, Schedule> {
        self.schedule.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_writes(&self) -> MutexGuard<'_, WriteLog> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn arm(&self, state: StoreState, urgency: Urgency) {
        let deadline = deadline_after(self.windows.for_urgency(urgency));
        let mut schedule = self.lock_schedule();
        schedule.generation += 1;
        let generation = schedule.generation;
        schedule.pending = Some(Pending {
            deadline,
            generation,
            state,
        });
        drop(schedule);
        self.wake.notify_one();
    }

    fn write(
        &self,
        write_log: &mut WriteLog,
        state: &StoreState,
        generation: u64,
    ) -> Result<(), StorageError> {
        self.sink.write_state(state)?;
        write_log.writes += 1;
        write_log.saved_generation = write_log.saved_generation.max(generation);
        Ok(())
    }
}

pub struct DebouncedPersister {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl DebouncedPersister {
    pub fn new(sink: impl StateSink + 'static, windows: DebounceWindows) -> Self {
        let shared = Arc::new(Shared {
            schedule: Mutex::new(Schedule::default()),
            wake: Condvar::new(),
            writes: Mutex::new(WriteLog::default()),
            sink: Box::new(sink),
            windows,
        });
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("seltrack-persist".to_string())
            .spawn(move || run_timer(&worker_shared));
        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(error) => {
                log::error!("failed to start persistence timer, only flushes will save: {error}");
                None
            }
        };
        Self { shared, worker }
    }

    /// Listener to inject into the store so its mutations arm this persister.
    pub fn handle(&self) -> PersisterHandle {
        PersisterHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn windows(&self) -> DebounceWindows {
        self.shared.windows
    }

    /// Schedules `state` for writing after the urgency's window, replacing and
    /// postponing whatever was pending.
    pub fn notify_activity(&self, state: StoreState, urgency: Urgency) {
        self.shared.arm(state, urgency);
    }

    pub fn state(&self) -> PersistState {
        match &self.shared.lock_schedule().pending {
            Some(pending) => PersistState::Pending {
                deadline: pending.deadline,
            },
            None => PersistState::Idle,
        }
    }

    /// Drops the pending write, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        self.shared.lock_schedule().pending.take().is_some()
    }

    /// Whether activity has happened since the last successful write,
    /// including a pending write and one whose timer attempt failed.
    pub fn is_dirty(&self) -> bool {
        let schedule = self.shared.lock_schedule();
        let saved = self.shared.lock_writes().saved_generation;
        saved < schedule.generation
    }

    /// Drops any pending write and runs `clear` while holding the write lock,
    /// so an in-flight timer write finishes first and cannot land afterwards.
    pub fn clear_with<F>(&self, clear: F) -> Result<(), StorageError>
    where
        F: FnOnce() -> Result<(), StorageError>,
    {
        let mut schedule = self.shared.lock_schedule();
        schedule.pending = None;
        let generation = schedule.generation;
        let mut write_log = self.shared.lock_writes();
        drop(schedule);
        clear()?;
        write_log.saved_generation = generation;
        Ok(())
    }

    /// Cancels any pending write and writes `state` before returning. Waits for
    /// a timer write already in progress.
    pub fn flush_now(&self, state: &StoreState) -> Result<(), StorageError> {
        let mut schedule = self.shared.lock_schedule();
        schedule.pending = None;
        let generation = schedule.generation;
        let mut write_log = self.shared.lock_writes();
        drop(schedule);
        self.shared.write(&mut write_log, state, generation)
    }

    pub fn write_count(&self) -> u64 {
        self.shared.lock_writes().writes
    }

    /// Most recent failure of a timer-driven write, for surfacing as a warning.
    pub fn take_last_error(&self) -> Option<StorageError> {
        self.shared.lock_writes().last_error.take()
    }
}

impl Drop for DebouncedPersister {
    fn drop(&mut self) {
        let mut schedule = self.shared.lock_schedule();
        schedule.shutdown = true;
        if schedule.pending.take().is_some() {
            log::debug!("dropping pending selection write on shutdown");
        }
        drop(schedule);
        self.shared.wake.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[derive(Clone)]
pub struct PersisterHandle {
    shared: Arc<Shared>,
}

impl ActivityListener for PersisterHandle {
    fn on_activity(&self, state: StoreState, urgency: Urgency) {
        self.shared.arm(state, urgency);
    }
}

fn run_timer(shared: &Shared) {
    let mut schedule = shared.lock_schedule();
    loop {
        if schedule.shutdown {
            return;
        }
        let Some(deadline) = schedule.pending.as_ref().map(|pending| pending.deadline) else {
            schedule = shared
                .wake
                .wait(schedule)
                .unwrap_or_else(PoisonError::into_inner);
            continue;
        };

        let now = Instant::now();
        if now < deadline {
            schedule = shared
                .wake
                .wait_timeout(schedule, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
            continue;
        }

        let Some(pending) = schedule.pending.take() else {
            continue;
        };
        let mut write_log = shared.lock_writes();
        drop(schedule);
        let failed = match shared.write(&mut write_log, &pending.state, pending.generation) {
            Ok(()) => false,
            Err(error) => {
                log::warn!("debounced selection write failed, keeping state in memory: {error}");
                write_log.last_error = Some(error);
                true
            }
        };
        drop(write_log);

        schedule = shared.lock_schedule();
        if failed
            && schedule.pending.is_none()
            && !schedule.shutdown
            && shared.lock_writes().saved_generation < pending.generation
        {
            log::debug!("retrying selection write in {:?}", shared.windows.quiet);
            schedule.pending = Some(Pending {
                deadline: deadline_after(shared.windows.quiet),
                ..pending
            });
        }
    }
}

fn deadline_after(window: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(window).unwrap_or_else(|| {
        log::warn!("debounce window {window:?} overflows the clock, using the default");
        now.checked_add(DEFAULT_QUIET_WINDOW).unwrap_or(now)
    })
}
