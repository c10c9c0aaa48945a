use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Default time window used for speed estimates.
const DEFAULT_WINDOW: Duration = Duration::from_secs(5);

/// Default cap on retained speed samples.
const DEFAULT_MAX_SAMPLES: usize = 100;

/// Snapshot of an object transfer, handed to the progress callback.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferProgress {
    pub oid: String,
    pub total_bytes: i64,
    pub transferred_bytes: i64,
    pub bytes_per_second: f64,
}

impl TransferProgress {
    /// Completion in `0.0..=1.0`. An empty object counts as complete.
    pub fn fraction(&self) -> f64 {
        if self.total_bytes <= 0 {
            return 1.0;
        }
        (self.transferred_bytes as f64 / self.total_bytes as f64).min(1.0)
    }
}

/// Callback invoked with transfer progress.
///
/// Best-effort: called from inside the request body stream, so it must be
/// cheap and must not block.
pub type ProgressCallback = Box<dyn Fn(TransferProgress) + Send + Sync>;

/// Counts bytes for one object and forwards snapshots to a callback.
pub struct ProgressReporter {
    oid: String,
    total_bytes: i64,
    transferred_bytes: i64,
    speed: SpeedCalculator,
    callback: Option<ProgressCallback>,
}

impl ProgressReporter {
    pub fn new(
        oid: impl Into<String>,
        total_bytes: i64,
        callback: Option<ProgressCallback>,
    ) -> Self {
        Self {
            oid: oid.into(),
            total_bytes,
            transferred_bytes: 0,
            speed: SpeedCalculator::new(None, None),
            callback,
        }
    }

    /// Records `bytes` more sent and notifies the callback, if any.
    pub fn record(&mut self, bytes: usize) {
        self.transferred_bytes += bytes as i64;
        self.speed.add_sample(bytes as i64);
        if let Some(cb) = &self.callback {
            cb(self.snapshot());
        }
    }

    pub fn transferred_bytes(&self) -> i64 {
        self.transferred_bytes
    }

    pub fn snapshot(&self) -> TransferProgress {
        TransferProgress {
            oid: self.oid.clone(),
            total_bytes: self.total_bytes,
            transferred_bytes: self.transferred_bytes,
            bytes_per_second: self.speed.bytes_per_second(),
        }
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("oid", &self.oid)
            .field("total_bytes", &self.total_bytes)
            .field("transferred_bytes", &self.transferred_bytes)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SpeedCalculator
// ---------------------------------------------------------------------------

/// Transfer speed over a sliding window of samples.
#[derive(Debug)]
pub struct SpeedCalculator {
    samples: VecDeque<(Instant, i64)>,
    max_samples: usize,
    window: Duration,
}

impl SpeedCalculator {
    /// `window` defaults to 5 s and `max_samples` to 100.
    pub fn new(window: Option<Duration>, max_samples: Option<usize>) -> Self {
        Self {
            samples: VecDeque::new(),
            max_samples: max_samples.unwrap_or(DEFAULT_MAX_SAMPLES).max(2),
            window: window.unwrap_or(DEFAULT_WINDOW),
        }
    }

    pub fn add_sample(&mut self, bytes: i64) {
        let now = Instant::now();
        self.samples.push_back((now, bytes));

        while let Some((at, _)) = self.samples.front() {
            if now.duration_since(*at) > self.window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
        while self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
    }

    /// Average bytes/second across the window; 0.0 with fewer than 2 samples.
    pub fn bytes_per_second(&self) -> f64 {
        let (Some((first, _)), Some((last, _))) = (self.samples.front(), self.samples.back())
        else {
            return 0.0;
        };
        if self.samples.len() < 2 {
            return 0.0;
        }
        let elapsed = last.duration_since(*first);
        if elapsed.is_zero() {
            return 0.0;
        }
        let total: i64 = self.samples.iter().map(|(_, b)| b).sum();
        total as f64 / elapsed.as_secs_f64()
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
