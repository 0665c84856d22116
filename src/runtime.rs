use std::{
    io,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;

use crate::config::TunablesSource;
use crate::gesture::{GestureEngine, GestureSnapshot, FAILSAFE_PERIOD_MS, INERTIA_TICK_US};
use crate::io::{CursorSink, EngineOutput};
use crate::touch::Contact;

pub const REPORT_QUEUE_DEPTH: usize = 64;
/// Inertia ticks run at most this many times per wakeup; a longer stall is
/// forgotten.
const MAX_CATCH_UP_TICKS: u32 = 40;

/// One raw batch from the surface, stamped on arrival.
#[derive(Clone, Debug)]
pub struct TouchReport {
    pub at_ms: u64,
    pub contacts: Vec<Contact>,
}

struct Shared {
    engine: Mutex<GestureEngine>,
    cursor: Mutex<Box<dyn CursorSink + Send>>,
    tunables: Arc<dyn TunablesSource>,
    running: AtomicBool,
    dropped_reports: AtomicU64,
    epoch: Instant,
}

impl Shared {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Runs `step` under the engine lock and forwards its output while the
    /// lock is still held, so commands from different loops never interleave.
    fn drive(&self, step: impl FnOnce(&mut GestureEngine) -> EngineOutput) {
        let mut engine = self.engine.lock();
        let output = step(&mut engine);
        if output.is_empty() {
            return;
        }
        let mut cursor = self.cursor.lock();
        output.apply(&mut **cursor);
    }
}

/// Producer handle. Never blocks; a full queue drops the report.
#[derive(Clone)]
pub struct TouchReportSender {
    tx: Sender<TouchReport>,
    shared: Arc<Shared>,
}

impl TouchReportSender {
    pub fn submit(&self, contacts: Vec<Contact>) -> bool {
        if !self.shared.is_running() {
            return false;
        }
        let report = TouchReport {
            at_ms: self.shared.now_ms(),
            contacts,
        };
        match self.tx.try_send(report) {
            Ok(()) => true,
            Err(TrySendError::Full(report)) => {
                let dropped = self.shared.dropped_reports.fetch_add(1, Ordering::Relaxed) + 1;
                log::warn!(
                    "runtime: queue_full drop at_ms={} contacts={} dropped={}",
                    report.at_ms,
                    report.contacts.len(),
                    dropped
                );
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Hosts a [`GestureEngine`] with its processing, failsafe and inertia
/// threads.
pub struct GestureRuntime {
    shared: Arc<Shared>,
    sender: TouchReportSender,
    workers: Vec<JoinHandle<()>>,
}

impl GestureRuntime {
    pub fn start(
        cursor: impl CursorSink + Send + 'static,
        tunables: Arc<dyn TunablesSource>,
    ) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            engine: Mutex::new(GestureEngine::new()),
            cursor: Mutex::new(Box::new(cursor)),
            tunables,
            running: AtomicBool::new(true),
            dropped_reports: AtomicU64::new(0),
            epoch: Instant::now(),
        });
        let (tx, rx) = bounded(REPORT_QUEUE_DEPTH);
        let sender = TouchReportSender {
            tx,
            shared: shared.clone(),
        };

        let mut runtime = Self {
            shared,
            sender,
            workers: Vec::with_capacity(3),
        };

        if let Err(err) = runtime.spawn_workers(rx) {
            runtime.shutdown();
            return Err(err);
        }

        log::info!("runtime: started queue_depth={}", REPORT_QUEUE_DEPTH);
        Ok(runtime)
    }

    fn spawn_workers(&mut self, rx: Receiver<TouchReport>) -> io::Result<()> {
        self.spawn("tfdrag-touch", move |shared| processing_loop(&shared, &rx))?;
        self.spawn("tfdrag-failsafe", |shared| failsafe_loop(&shared))?;
        self.spawn("tfdrag-inertia", |shared| inertia_loop(&shared))?;
        Ok(())
    }

    fn spawn(
        &mut self,
        name: &str,
        body: impl FnOnce(Arc<Shared>) + Send + 'static,
    ) -> io::Result<()> {
        let shared = self.shared.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(shared))?;
        self.workers.push(handle);
        Ok(())
    }

    pub fn sender(&self) -> TouchReportSender {
        self.sender.clone()
    }

    pub fn snapshot(&self) -> GestureSnapshot {
        self.shared.engine.lock().snapshot()
    }

    pub fn dropped_reports(&self) -> u64 {
        self.shared.dropped_reports.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Stops every loop and waits for the threads to exit.
    pub fn shutdown(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        if self.workers.is_empty() {
            return;
        }
        for worker in self.workers.drain(..) {
            let name = worker.thread().name().unwrap_or("worker").to_string();
            if worker.join().is_err() {
                log::error!("runtime: worker_panicked name={}", name);
            }
        }
        log::info!("runtime: stopped dropped={}", self.dropped_reports());
    }
}

impl Drop for GestureRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn processing_loop(shared: &Shared, rx: &Receiver<TouchReport>) {
    let poll = Duration::from_millis(FAILSAFE_PERIOD_MS);
    while shared.is_running() {
        match rx.recv_timeout(poll) {
            Ok(report) => {
                let tunables = shared.tunables.current();
                shared.drive(|engine| {
                    engine.process_report(report.at_ms, &report.contacts, &tunables)
                });
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn failsafe_loop(shared: &Shared) {
    let period = Duration::from_millis(FAILSAFE_PERIOD_MS);
    while shared.is_running() {
        thread::sleep(period);
        shared.tunables.refresh();
        let tunables = shared.tunables.current();
        shared.drive(|engine| engine.failsafe_tick(shared.now_ms(), &tunables));
    }
}

fn inertia_loop(shared: &Shared) {
    let period = Duration::from_micros(INERTIA_TICK_US);
    let mut clock = TickClock::new(period, Instant::now());
    while shared.is_running() {
        thread::sleep(period);
        let due = clock.due(Instant::now());
        let tunables = shared.tunables.current();
        for _ in 0..due {
            if !shared.engine.lock().is_coasting() {
                break;
            }
            shared.drive(|engine| {
                if engine.is_coasting() {
                    engine.inertia_tick(&tunables)
                } else {
                    EngineOutput::default()
                }
            });
        }
    }
}

/// Converts measured sleep time into whole inertia ticks so oversleeping
/// does not slow coasting down.
#[derive(Debug)]
struct TickClock {
    period: Duration,
    last: Instant,
    owed: Duration,
}

impl TickClock {
    fn new(period: Duration, now: Instant) -> Self {
        Self {
            period,
            last: now,
            owed: Duration::ZERO,
        }
    }

    fn due(&mut self, now: Instant) -> u32 {
        self.owed += now.saturating_duration_since(self.last);
        self.last = now;

        let period_us = self.period.as_micros().max(1);
        let ticks = (self.owed.as_micros() / period_us).min(u128::from(MAX_CATCH_UP_TICKS));
        let ticks = u32::try_from(ticks).unwrap_or(MAX_CATCH_UP_TICKS);
        if ticks == MAX_CATCH_UP_TICKS {
            self.owed = Duration::ZERO;
        } else {
            self.owed -= self.period * ticks;
        }
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_clock_pays_back_oversleep() {
        let start = Instant::now();
        let period = Duration::from_micros(INERTIA_TICK_US);
        let mut clock = TickClock::new(period, start);

        assert_eq!(clock.due(start + Duration::from_micros(300)), 0);
        assert_eq!(clock.due(start + Duration::from_micros(600)), 1);
        assert_eq!(clock.due(start + Duration::from_micros(2_100)), 3);
        assert_eq!(clock.owed, Duration::from_micros(100));
    }

    #[test]
    fn tick_clock_drops_long_stalls() {
        let start = Instant::now();
        let mut clock = TickClock::new(Duration::from_micros(INERTIA_TICK_US), start);

        assert_eq!(clock.due(start + Duration::from_secs(2)), MAX_CATCH_UP_TICKS);
        assert_eq!(clock.owed, Duration::ZERO);
        assert_eq!(clock.due(start + Duration::from_secs(2) + Duration::from_micros(500)), 1);
    }
}
