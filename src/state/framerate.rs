//! Frame-duration estimation from sampled presented-frame media times.
//!
//! Arbitrary user-supplied files rarely declare a frame rate, so the viewer
//! plays a short muted burst and measures the media-time deltas between
//! presented frames. The async sampling loop lives in `media`; this module
//! holds the accumulator and the median math.

/// Assumed frame duration until a confident estimate lands (30 fps).
pub const FALLBACK_FRAME_SECS: f64 = 1.0 / 30.0;
/// Stop once this many deltas were accepted.
pub const MAX_SAMPLES: usize = 8;
/// ...or once this much wall-clock time passed, whichever first.
pub const SAMPLE_TIMEOUT_MS: f64 = 600.0;
/// Deltas at or above this are stalls or seeks, not frame steps.
const MAX_DELTA_SECS: f64 = 0.2;

/// Seconds per frame plus whether it came from real samples or the fallback.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameRateEstimate {
    pub seconds_per_frame: f64,
    pub confident: bool,
}

impl Default for FrameRateEstimate {
    fn default() -> Self {
        Self { seconds_per_frame: FALLBACK_FRAME_SECS, confident: false }
    }
}

impl FrameRateEstimate {
    pub fn fps(&self) -> f64 {
        1.0 / self.seconds_per_frame
    }
}

/// Accumulates consecutive presented-frame media timestamps and the deltas
/// between them.
pub struct DeltaSampler {
    started_ms: f64,
    last_media_time: Option<f64>,
    deltas: Vec<f64>,
}

impl DeltaSampler {
    pub fn new(now_ms: f64) -> Self {
        Self { started_ms: now_ms, last_media_time: None, deltas: Vec::with_capacity(MAX_SAMPLES) }
    }

    /// Feed one presented-frame media time. The delta to the previous frame
    /// is accepted only when it is positive and below the stall threshold.
    pub fn record(&mut self, media_time: f64) {
        if let Some(last) = self.last_media_time {
            let dt = media_time - last;
            if dt > 0.0 && dt < MAX_DELTA_SECS {
                self.deltas.push(dt);
            }
        }
        self.last_media_time = Some(media_time);
    }

    /// Enough samples, or out of time.
    pub fn saturated(&self, now_ms: f64) -> bool {
        self.deltas.len() >= MAX_SAMPLES || now_ms - self.started_ms > SAMPLE_TIMEOUT_MS
    }

    pub fn started_ms(&self) -> f64 {
        self.started_ms
    }

    /// Median of the accepted deltas; falls back (not confident) when
    /// nothing usable was collected.
    pub fn estimate(&self, fallback: FrameRateEstimate) -> FrameRateEstimate {
        if self.deltas.is_empty() {
            return FrameRateEstimate { confident: false, ..fallback };
        }
        let mut sorted = self.deltas.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted[sorted.len() / 2];
        if mid.is_finite() && mid > 0.0 {
            FrameRateEstimate { seconds_per_frame: mid, confident: true }
        } else {
            FrameRateEstimate { confident: false, ..fallback }
        }
    }
}
