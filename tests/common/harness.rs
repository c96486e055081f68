//! tests/common/harness.rs
use std::sync::{Arc, Mutex, Once};
use strand_timer::timer::clock;
use strand_timer::timer::{ActorRef, ActorTimer, TimerActor, TimerHandle};

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "strand_timer=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// Shared log of `(label, fire_instant_us)` pairs.
pub type FireLog = Arc<Mutex<Vec<(&'static str, u64)>>>;

pub fn new_log() -> FireLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn snapshot(log: &FireLog) -> Vec<(&'static str, u64)> {
    log.lock().unwrap().clone()
}

pub fn labels(log: &FireLog) -> Vec<&'static str> {
    snapshot(log).iter().map(|(label, _)| *label).collect()
}

/// An actor that records its fire instant into the shared log.
pub struct Recorder {
    label: &'static str,
    log: FireLog,
}

impl Recorder {
    pub fn spawn(label: &'static str, log: &FireLog) -> ActorRef {
        Arc::new(Self {
            label,
            log: log.clone(),
        })
    }
}

impl TimerActor for Recorder {
    fn on_timeout(&self, _timer: &mut ActorTimer) {
        self.log.lock().unwrap().push((self.label, clock::now_us()));
    }
}

/// An actor that re-entrantly schedules a follow-up deadline when fired.
pub struct Chainer {
    pub label: &'static str,
    pub log: FireLog,
    pub next: Option<(u64, &'static str)>,
}

impl TimerActor for Chainer {
    fn on_timeout(&self, timer: &mut ActorTimer) {
        self.log.lock().unwrap().push((self.label, clock::now_us()));
        if let Some((delay, label)) = self.next {
            let _ = timer.schedule(delay, Recorder::spawn(label, &self.log));
        }
    }
}

/// An actor that re-entrantly cancels a sibling's handle when fired.
pub struct Canceller {
    pub label: &'static str,
    pub log: FireLog,
    pub target: Arc<Mutex<TimerHandle>>,
}

impl TimerActor for Canceller {
    fn on_timeout(&self, timer: &mut ActorTimer) {
        self.log.lock().unwrap().push((self.label, clock::now_us()));
        let mut target = self.target.lock().unwrap();
        timer.cancel(&mut target);
    }
}
