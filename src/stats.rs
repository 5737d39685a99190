use log::debug;

const WINDOW_MS: f64 = 1000.0;

/// Frame counter reporting frames per second over one-second windows.
///
/// Timestamps come from the host (`requestAnimationFrame` time on the web,
/// elapsed wall time natively) so the counter itself holds no clock.
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    total_frames: u64,
    window_start: Option<f64>,
    window_frames: u32,
    fps: Option<f32>,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a frame presented at `now_ms`. Returns the new rate whenever a
    /// window closes.
    pub fn record(&mut self, now_ms: f64) -> Option<f32> {
        self.total_frames += 1;
        let Some(start) = self.window_start else {
            self.window_start = Some(now_ms);
            return None;
        };
        if now_ms < start {
            // host clock went backwards; restart the window
            self.window_start = Some(now_ms);
            self.window_frames = 0;
            return None;
        }
        self.window_frames += 1;
        let elapsed = now_ms - start;
        if elapsed < WINDOW_MS {
            return None;
        }
        let fps = (self.window_frames as f64 * 1000.0 / elapsed) as f32;
        debug!("{fps:.1} fps over {} frames", self.window_frames);
        self.fps = Some(fps);
        self.window_start = Some(now_ms);
        self.window_frames = 0;
        Some(fps)
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Rate measured over the last completed window.
    pub fn fps(&self) -> Option<f32> {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_after_one_second() {
        let mut stats = FrameStats::new();
        let mut reported = None;
        for frame in 0..=60 {
            if let Some(fps) = stats.record(frame as f64 * 1000.0 / 60.0) {
                reported = Some(fps);
            }
        }
        let fps = reported.expect("a window should have closed");
        assert!((fps - 60.0).abs() < 0.5, "fps was {fps}");
        assert_eq!(stats.total_frames(), 61);
    }

    #[test]
    fn clock_going_backwards_restarts_window() {
        let mut stats = FrameStats::new();
        stats.record(5000.0);
        assert_eq!(stats.record(10.0), None);
        assert_eq!(stats.fps(), None);
    }
}
