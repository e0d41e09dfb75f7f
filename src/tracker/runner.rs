//! Tracking session: locates the game window, then reads the HUD region on a
//! background thread at the configured tick rate.
//!
//! Per tick: capture → split into top/bottom line → OCR variants per line →
//! combine → output gate → mailbox. A failed capture skips the tick without
//! touching the gate. Nothing that happens inside a tick ends the session.

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::diagnostics::{save_probe, save_stale_snapshot};
use super::gate::{GateTimings, OutputGate};
use super::mailbox::Mailbox;
use crate::calibration::FractionalRoi;
use crate::capture::{FrameSource, Rectangle, RegionProvider, ScreenFrameSource, WindowLocator};
use crate::config::{clamp_tick_rate, AppConfig};
use crate::ocr::{read_line, split_horizontal, Candidate, TesseractEngine, TextRecognizer};

/// Raw OCR text is clipped to this many characters in the log.
const RAW_LOG_MAX_CHARS: usize = 160;

/// Longest single sleep, so cancellation is noticed promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickStatus {
    Running { hz: u32 },
    RegionNotVisible,
}

/// One update for the UI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Published {
    pub text: String,
    pub stale: bool,
    pub status: TickStatus,
}

/// OCR result for one frame, plus the line images it was read from.
pub struct FrameReading {
    pub top: Candidate,
    pub bottom: Candidate,
    pub top_image: DynamicImage,
    pub bottom_image: DynamicImage,
}

/// Joins the two line readings: both → separated by a line break, one → that
/// one, none → empty.
pub fn combine_lines(top: &str, bottom: &str) -> String {
    match (top.is_empty(), bottom.is_empty()) {
        (false, false) => format!("{}\n{}", top, bottom),
        (false, true) => top.to_string(),
        (true, false) => bottom.to_string(),
        (true, true) => String::new(),
    }
}

/// Sleep between ticks: `max(1, 1000 / hz)` milliseconds, rate clamped to 1-60.
pub fn tick_delay(hz: u32) -> Duration {
    Duration::from_millis((1000 / clamp_tick_rate(hz) as u64).max(1))
}

/// Splits a frame into its two HUD lines and reads each.
pub fn read_frame<R: TextRecognizer + ?Sized>(
    recognizer: &R,
    frame: &DynamicImage,
    config: &AppConfig,
) -> FrameReading {
    let (top_image, bottom_image) = split_horizontal(frame);
    let top = read_line(recognizer, &top_image, config.ocr_target_height(top_image.height()));
    let bottom = read_line(
        recognizer,
        &bottom_image,
        config.ocr_target_height(bottom_image.height()),
    );
    FrameReading {
        top,
        bottom,
        top_image,
        bottom_image,
    }
}

fn clip_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// State shared between the session handle and its worker thread.
struct Shared {
    cancel: AtomicBool,
    tick_rate: AtomicU32,
    mailbox: Mailbox<Published>,
}

/// Handle to a running tracker thread. Dropping it stops the thread.
pub struct Session {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
    region: Rectangle,
}

impl Session {
    /// Spawns the worker for an already located region.
    pub fn spawn<F, R>(
        frames: F,
        recognizer: R,
        region: Rectangle,
        config: AppConfig,
        diagnostics_dir: PathBuf,
    ) -> Result<Self>
    where
        F: FrameSource + Send + 'static,
        R: TextRecognizer + Send + 'static,
    {
        let shared = Arc::new(Shared {
            cancel: AtomicBool::new(false),
            tick_rate: AtomicU32::new(clamp_tick_rate(config.tick_rate_hz)),
            mailbox: Mailbox::new(),
        });

        let worker = Worker {
            gate: OutputGate::new(Instant::now(), GateTimings::from_config(&config)),
            frames,
            recognizer,
            region,
            config,
            diagnostics_dir,
            shared: Arc::clone(&shared),
            last_raw_log: None,
            outage: false,
        };

        let handle = thread::Builder::new()
            .name("hud-tracker".to_string())
            .spawn(move || worker.run())
            .context("Failed to spawn tracker thread")?;

        Ok(Self {
            shared,
            handle: Some(handle),
            region,
        })
    }

    /// Cancels the worker and waits for it to exit. Nothing is published
    /// afterwards.
    pub fn stop(&mut self) {
        self.shared.cancel.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.join() {
                crate::log(&format!("Tracker thread panicked: {:?}", e));
            }
            crate::log("Tracking stopped");
        }
        self.shared.mailbox.take();
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Updates the tick rate; applied from the next tick. Returns the clamped rate.
    pub fn set_tick_rate(&self, hz: u32) -> u32 {
        let hz = clamp_tick_rate(hz);
        self.shared.tick_rate.store(hz, Ordering::Relaxed);
        hz
    }

    pub fn tick_rate(&self) -> u32 {
        self.shared.tick_rate.load(Ordering::Relaxed)
    }

    /// Newest unread update, if any.
    pub fn latest(&self) -> Option<Published> {
        self.shared.mailbox.take()
    }

    /// Absolute screen rectangle being read.
    pub fn region(&self) -> Rectangle {
        self.region
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker<F, R> {
    frames: F,
    recognizer: R,
    region: Rectangle,
    config: AppConfig,
    diagnostics_dir: PathBuf,
    shared: Arc<Shared>,
    gate: OutputGate,
    last_raw_log: Option<Instant>,
    /// Inside a run of failed captures
    outage: bool,
}

impl<F: FrameSource, R: TextRecognizer> Worker<F, R> {
    fn run(mut self) {
        crate::log(&format!(
            "Tracker started: region {:?} at {} Hz",
            self.region,
            self.shared.tick_rate.load(Ordering::Relaxed)
        ));

        while !self.cancelled() {
            let hz = clamp_tick_rate(self.shared.tick_rate.load(Ordering::Relaxed));
            let delay = if self.tick(hz, Instant::now()) {
                tick_delay(hz)
            } else {
                Duration::from_millis(self.config.capture_retry_ms)
            };
            self.sleep(delay);
        }
    }

    fn cancelled(&self) -> bool {
        self.shared.cancel.load(Ordering::SeqCst)
    }

    /// Runs one tick. Returns false when the region could not be captured.
    fn tick(&mut self, hz: u32, now: Instant) -> bool {
        let frame = self.frames.capture(&self.region);
        let Some(image) = frame.to_image() else {
            if !self.outage {
                crate::log("Region not visible, retrying");
                self.outage = true;
            }
            let view = self.gate.peek(now);
            self.publish(Published {
                text: view.text,
                stale: view.stale,
                status: TickStatus::RegionNotVisible,
            });
            return false;
        };
        if self.outage {
            crate::log("Region visible again");
            self.outage = false;
        }

        let reading = read_frame(&self.recognizer, &image, &self.config);
        self.log_raw(&reading, now);

        let combined = combine_lines(&reading.top.display, &reading.bottom.display);
        let outcome = self.gate.observe(&combined, now);

        if outcome.snapshot_due {
            match save_stale_snapshot(
                &self.diagnostics_dir,
                &reading.top_image,
                &reading.bottom_image,
                Local::now(),
            ) {
                Ok(paths) => {
                    for path in paths {
                        crate::log(&format!("Stale snapshot saved: {}", path.display()));
                    }
                }
                Err(e) => crate::log(&format!("Failed to save stale snapshot: {:#}", e)),
            }
        }

        self.publish(Published {
            text: outcome.view.text,
            stale: outcome.view.stale,
            status: TickStatus::Running { hz },
        });
        true
    }

    fn log_raw(&mut self, reading: &FrameReading, now: Instant) {
        let interval = Duration::from_millis(self.config.raw_log_interval_ms);
        if self
            .last_raw_log
            .is_some_and(|at| now.saturating_duration_since(at) < interval)
        {
            return;
        }
        self.last_raw_log = Some(now);
        crate::log(&format!(
            "OCR top=\"{}\" bottom=\"{}\"",
            clip_chars(&reading.top.raw, RAW_LOG_MAX_CHARS),
            clip_chars(&reading.bottom.raw, RAW_LOG_MAX_CHARS)
        ));
    }

    fn publish(&self, update: Published) {
        // A tick that was in flight when stop() was called must not publish
        if self.cancelled() {
            return;
        }
        self.shared.mailbox.post(update);
    }

    fn sleep(&self, total: Duration) {
        let deadline = Instant::now() + total;
        while !self.cancelled() {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                break;
            }
            thread::sleep(left.min(SLEEP_SLICE));
        }
    }
}

/// Captures the region once, saves it as `roi_raw.png` and logs what OCR
/// makes of it. Failures are logged only.
pub fn probe<F, R>(
    frames: &F,
    recognizer: &R,
    region: &Rectangle,
    config: &AppConfig,
    diagnostics_dir: &Path,
) where
    F: FrameSource + ?Sized,
    R: TextRecognizer + ?Sized,
{
    let frame = frames.capture(region);
    let Some(image) = frame.to_image() else {
        crate::log(&format!("Probe: region {:?} could not be captured", region));
        return;
    };
    crate::log(&format!(
        "Probe: captured {}x{} ({} channels)",
        frame.width(),
        frame.height(),
        frame.channels()
    ));

    match save_probe(diagnostics_dir, &image) {
        Ok(path) => crate::log(&format!("Probe image saved: {}", path.display())),
        Err(e) => crate::log(&format!("Failed to save probe image: {:#}", e)),
    }

    let reading = read_frame(recognizer, &image, config);
    crate::log(&format!(
        "Probe: top=\"{}\" -> \"{}\", bottom=\"{}\" -> \"{}\"",
        clip_chars(&reading.top.raw, RAW_LOG_MAX_CHARS),
        reading.top.display,
        clip_chars(&reading.bottom.raw, RAW_LOG_MAX_CHARS),
        reading.bottom.display
    ));
}

/// Starts a session with injected collaborators.
///
/// Locates the window (giving up after `locate_timeout_ms`), maps the ROI to
/// screen coordinates, creates the recognizer, probes once and spawns the
/// worker. Any error here means no session was started.
pub fn start_with<P, F, R>(
    provider: &P,
    frames: F,
    make_recognizer: impl FnOnce() -> Result<R>,
    config: &AppConfig,
    roi: &FractionalRoi,
    diagnostics_dir: PathBuf,
) -> Result<Session>
where
    P: RegionProvider + ?Sized,
    F: FrameSource + Send + 'static,
    R: TextRecognizer + Send + 'static,
{
    let poll = Duration::from_millis(config.locate_poll_ms);
    let timeout = Duration::from_millis(config.locate_timeout_ms);

    crate::log("Looking for the game window...");
    let window = provider.locate_within(poll, timeout).ok_or_else(|| {
        anyhow!(
            "Game window not found within {:.1} s",
            timeout.as_secs_f64()
        )
    })?;

    let region = roi.clamped().to_absolute(&window);
    crate::log(&format!("Game window {:?}, reading region {:?}", window, region));

    let recognizer = make_recognizer().context("Failed to initialize OCR engine")?;

    probe(&frames, &recognizer, &region, config, &diagnostics_dir);

    Session::spawn(frames, recognizer, region, config.clone(), diagnostics_dir)
}

/// Starts a session against the real game window, screen and Tesseract.
pub fn start_tracking(config: &AppConfig, roi: &FractionalRoi) -> Result<Session> {
    let locator = WindowLocator::new(&config.window_titles);
    start_with(
        &locator,
        ScreenFrameSource::new(),
        || TesseractEngine::create(config),
        config,
        roi,
        crate::paths::get_diagnostics_dir(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::RawFrame;
    use crate::ocr::Recognition;
    use image::{GrayImage, Luma};
    use std::sync::atomic::AtomicUsize;
    use tempfile::tempdir;

    const READING: &str = "Zone: A Pos: 1 m 2 m 3 m";

    struct FixedFrame(RawFrame);

    impl FrameSource for FixedFrame {
        fn capture(&self, _rect: &Rectangle) -> RawFrame {
            self.0.clone()
        }
    }

    /// Serves `good` real frames, then only empty ones.
    struct FramesThenOutage {
        good: usize,
        served: AtomicUsize,
    }

    impl FrameSource for FramesThenOutage {
        fn capture(&self, _rect: &Rectangle) -> RawFrame {
            if self.served.fetch_add(1, Ordering::SeqCst) < self.good {
                hud_frame()
            } else {
                RawFrame::empty()
            }
        }
    }

    struct FixedText(&'static str);

    impl TextRecognizer for FixedText {
        fn recognize(&self, _image: &GrayImage) -> Recognition {
            Recognition::from_output(self.0)
        }
    }

    struct Window(Option<Rectangle>);

    impl RegionProvider for Window {
        fn try_locate(&self) -> Option<Rectangle> {
            self.0
        }
    }

    fn hud_frame() -> RawFrame {
        let img = GrayImage::from_fn(40, 20, |x, _| Luma([if x % 5 == 0 { 230 } else { 30 }]));
        RawFrame::from_image(&DynamicImage::ImageLuma8(img))
    }

    fn fast_config() -> AppConfig {
        AppConfig {
            tick_rate_hz: 60,
            capture_retry_ms: 5,
            locate_poll_ms: 5,
            locate_timeout_ms: 30,
            ..AppConfig::default()
        }
    }

    fn region() -> Rectangle {
        Rectangle { x: 0, y: 0, width: 40, height: 20 }
    }

    /// Polls the session until `pred` matches an update or five seconds pass.
    fn wait_for(session: &Session, pred: impl Fn(&Published) -> bool) -> Option<Published> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Some(update) = session.latest() {
                if pred(&update) {
                    return Some(update);
                }
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn test_combine_lines() {
        assert_eq!(combine_lines("a", "b"), "a\nb");
        assert_eq!(combine_lines("a", ""), "a");
        assert_eq!(combine_lines("", "b"), "b");
        assert_eq!(combine_lines("", ""), "");
    }

    #[test]
    fn test_tick_delay() {
        assert_eq!(tick_delay(10), Duration::from_millis(100));
        assert_eq!(tick_delay(60), Duration::from_millis(16));
        assert_eq!(tick_delay(0), Duration::from_millis(1000));
        assert_eq!(tick_delay(1000), Duration::from_millis(16));
    }

    #[test]
    fn test_clip_chars() {
        assert_eq!(clip_chars("abcdef", 3), "abc");
        assert_eq!(clip_chars("äöü", 2), "äö");
        assert_eq!(clip_chars(&"x".repeat(500), RAW_LOG_MAX_CHARS).len(), 160);
    }

    #[test]
    fn test_read_frame_reads_both_lines() {
        let image = hud_frame().to_image().unwrap();
        let reading = read_frame(&FixedText(READING), &image, &AppConfig::default());
        assert_eq!(reading.top.display, "Zone: A  Pos: 1 m 2 m 3 m");
        assert_eq!(reading.bottom.display, "Zone: A  Pos: 1 m 2 m 3 m");
        assert_eq!(reading.top_image.height(), 10);
        assert_eq!(reading.bottom_image.height(), 10);
    }

    #[test]
    fn test_session_publishes_readings() {
        let dir = tempdir().unwrap();
        let mut session = Session::spawn(
            FixedFrame(hud_frame()),
            FixedText(READING),
            region(),
            fast_config(),
            dir.path().to_path_buf(),
        )
        .unwrap();

        let update = wait_for(&session, |p| matches!(p.status, TickStatus::Running { .. }))
            .expect("no reading published");
        assert_eq!(
            update.text,
            "Zone: A  Pos: 1 m 2 m 3 m\nZone: A  Pos: 1 m 2 m 3 m"
        );
        assert!(!update.stale);
        assert_eq!(update.status, TickStatus::Running { hz: 60 });

        session.stop();
        assert!(!session.is_running());
    }

    #[test]
    fn test_missing_frames_report_region_not_visible() {
        let dir = tempdir().unwrap();
        let session = Session::spawn(
            FixedFrame(RawFrame::empty()),
            FixedText(READING),
            region(),
            fast_config(),
            dir.path().to_path_buf(),
        )
        .unwrap();

        let update = wait_for(&session, |_| true).expect("no update published");
        assert_eq!(update.status, TickStatus::RegionNotVisible);
        assert_eq!(update.text, "");
    }

    #[test]
    fn test_outage_keeps_last_reading() {
        let dir = tempdir().unwrap();
        let config = AppConfig {
            stale_after_ms: 60_000,
            snapshot_after_ms: 120_000,
            ..fast_config()
        };
        let session = Session::spawn(
            FramesThenOutage { good: 1, served: AtomicUsize::new(0) },
            FixedText(READING),
            region(),
            config,
            dir.path().to_path_buf(),
        )
        .unwrap();

        let update = wait_for(&session, |p| p.status == TickStatus::RegionNotVisible)
            .expect("outage not reported");
        assert_eq!(
            update.text,
            "Zone: A  Pos: 1 m 2 m 3 m\nZone: A  Pos: 1 m 2 m 3 m"
        );
        assert!(!update.stale);
    }

    #[test]
    fn test_unreadable_frames_write_stale_snapshots() {
        let dir = tempdir().unwrap();
        let config = AppConfig {
            stale_after_ms: 20,
            snapshot_after_ms: 50,
            snapshot_rewind_ms: 10,
            ..fast_config()
        };
        let session = Session::spawn(
            FixedFrame(hud_frame()),
            FixedText("no position here"),
            region(),
            config,
            dir.path().to_path_buf(),
        )
        .unwrap();

        let update = wait_for(&session, |p| p.stale).expect("reading never went stale");
        assert_eq!(update.text, "");

        let has_snapshot = |prefix: &str| {
            std::fs::read_dir(dir.path())
                .unwrap()
                .filter_map(|e| e.ok())
                .any(|e| e.file_name().to_string_lossy().starts_with(prefix))
        };
        let deadline = Instant::now() + Duration::from_secs(5);
        while !(has_snapshot("stale_top_") && has_snapshot("stale_bot_")) {
            assert!(Instant::now() < deadline, "no stale snapshot written");
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_nothing_published_after_stop() {
        let dir = tempdir().unwrap();
        let mut session = Session::spawn(
            FixedFrame(hud_frame()),
            FixedText(READING),
            region(),
            fast_config(),
            dir.path().to_path_buf(),
        )
        .unwrap();

        assert!(wait_for(&session, |_| true).is_some());
        session.stop();

        thread::sleep(Duration::from_millis(100));
        assert!(session.latest().is_none());
        assert!(!session.is_running());
    }

    #[test]
    fn test_set_tick_rate_clamps() {
        let dir = tempdir().unwrap();
        let session = Session::spawn(
            FixedFrame(RawFrame::empty()),
            FixedText(""),
            region(),
            fast_config(),
            dir.path().to_path_buf(),
        )
        .unwrap();

        assert_eq!(session.tick_rate(), 60);
        assert_eq!(session.set_tick_rate(0), 1);
        assert_eq!(session.set_tick_rate(500), 60);
        assert_eq!(session.set_tick_rate(24), 24);
        assert_eq!(session.tick_rate(), 24);
    }

    #[test]
    fn test_start_fails_when_window_missing() {
        let dir = tempdir().unwrap();
        let created = AtomicUsize::new(0);
        let result = start_with(
            &Window(None),
            FixedFrame(hud_frame()),
            || {
                created.fetch_add(1, Ordering::SeqCst);
                Ok(FixedText(READING))
            },
            &fast_config(),
            &FractionalRoi::default(),
            dir.path().to_path_buf(),
        );
        assert!(result.is_err());
        assert_eq!(created.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_start_fails_when_engine_unavailable() {
        let dir = tempdir().unwrap();
        let result = start_with(
            &Window(Some(Rectangle { x: 0, y: 0, width: 800, height: 600 })),
            FixedFrame(hud_frame()),
            || -> Result<FixedText> { Err(anyhow!("tesseract missing")) },
            &fast_config(),
            &FractionalRoi::default(),
            dir.path().to_path_buf(),
        );
        let err = result.err().expect("start should fail");
        assert!(format!("{:#}", err).contains("tesseract missing"));
    }

    #[test]
    fn test_start_probes_and_runs() {
        let dir = tempdir().unwrap();
        let roi = FractionalRoi { left: 0.5, top: 0.0, width: 0.5, height: 0.1 };
        let session = start_with(
            &Window(Some(Rectangle { x: 10, y: 20, width: 800, height: 600 })),
            FixedFrame(hud_frame()),
            || Ok(FixedText(READING)),
            &fast_config(),
            &roi,
            dir.path().to_path_buf(),
        )
        .unwrap();

        assert_eq!(session.region(), Rectangle { x: 410, y: 20, width: 400, height: 60 });
        assert!(dir.path().join("roi_raw.png").exists());
        assert!(wait_for(&session, |p| !p.text.is_empty()).is_some());
    }
}
