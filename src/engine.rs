//! The fixed-rate render loop.
//!
//! `Engine` owns the [`Device`] and drives it at `config.target_fps`,
//! pulling the active scene from [`State`] each tick, advancing it, and
//! presenting the result. It never blocks on external I/O: the only
//! blocking calls in the tick are the device swap (vsync) and the
//! end-of-tick pacing sleep.

pub mod fps;
pub mod preview;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::EngineConfig;
use crate::device::Device;
use crate::engine::fps::FpsMonitor;
use crate::engine::preview::PreviewStore;
use crate::state::State;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine is already running")]
    AlreadyRunning,
}

/// Shared, queryable engine status: current FPS and the latest preview
/// frame. Cheap to clone and safe to read from any thread while the
/// render loop runs.
#[derive(Clone)]
pub struct EngineStatus {
    fps: Arc<std::sync::Mutex<f64>>,
    preview: Arc<PreviewStore>,
}

impl EngineStatus {
    fn new(preview: Arc<PreviewStore>) -> Self {
        Self { fps: Arc::new(std::sync::Mutex::new(0.0)), preview }
    }

    /// The most recently measured frame rate.
    pub fn get_current_fps(&self) -> f64 {
        *self.fps.lock().expect("fps mutex poisoned")
    }

    /// The most recently captured preview frame, PNG-encoded.
    pub fn get_preview_frame(&self) -> Option<Vec<u8>> {
        self.preview.latest()
    }

    fn set_fps(&self, value: f64) {
        *self.fps.lock().expect("fps mutex poisoned") = value;
    }

    /// Builds a standalone status handle backed by a fresh, empty preview
    /// store, for tests that need an `EngineStatus` without spinning up a
    /// whole [`Engine`].
    #[cfg(test)]
    pub fn for_test() -> (Self, Arc<PreviewStore>) {
        let preview = Arc::new(PreviewStore::new());
        (Self::new(Arc::clone(&preview)), preview)
    }
}

/// A running engine instance. Dropping this without calling [`stop`](Self::stop)
/// still stops the render thread — the stop flag is shared, not owned — but
/// the thread is then detached rather than joined.
pub struct EngineHandle {
    stop: Arc<AtomicBool>,
    status: EngineStatus,
    thread: Option<JoinHandle<()>>,
}

impl EngineHandle {
    pub fn get_current_fps(&self) -> f64 {
        self.status.get_current_fps()
    }

    pub fn get_preview_frame(&self) -> Option<Vec<u8>> {
        self.status.get_preview_frame()
    }

    /// A cloneable status handle, for handing to long-lived background
    /// work (e.g. the asset store's deferred thumbnail capture) that
    /// outlives the borrow on this handle.
    pub fn status(&self) -> EngineStatus {
        self.status.clone()
    }

    /// Signals the render thread to stop after its current tick and waits
    /// for it to exit.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Owns the device and drives the fixed-rate render loop.
pub struct Engine {
    config: EngineConfig,
    device: Box<dyn Device>,
    state: State,
}

impl Engine {
    pub fn new(config: EngineConfig, device: Box<dyn Device>, state: State) -> Self {
        Self { config, device, state }
    }

    /// Spawns the render loop on its own OS thread and returns a handle for
    /// querying status and stopping it. The loop runs until `stop` is
    /// called on the returned handle.
    pub fn run_threaded(mut self) -> EngineHandle {
        let stop = Arc::new(AtomicBool::new(false));
        let preview = Arc::new(PreviewStore::new());
        let status = EngineStatus::new(Arc::clone(&preview));

        let stop_for_thread = Arc::clone(&stop);
        let status_for_thread = status.clone();

        let thread = std::thread::spawn(move || {
            self.run_loop(&stop_for_thread, &status_for_thread, &preview);
        });

        EngineHandle { stop, status, thread: Some(thread) }
    }

    fn run_loop(&mut self, stop: &AtomicBool, status: &EngineStatus, preview: &PreviewStore) {
        let mut fps_monitor = FpsMonitor::new(self.config.fps_window);
        let mut consec_errors: u32 = 0;
        let mut last_tick = Instant::now();
        let mut last_fps_warn: Option<Instant> = None;

        self.device.set_brightness(self.config.initial_brightness);

        while !stop.load(Ordering::Relaxed) {
            let tick_start = Instant::now();
            let dt = tick_start.duration_since(last_tick).min(self.config.dt_cap);
            last_tick = tick_start;

            let settings = self.state.get_settings();
            self.device.set_brightness(settings.brightness);
            let scaled_dt = dt.mul_f64(settings.speed.clamp(0.1, 2.0));

            let scene_handle = self.state.scene_handle();
            let mut guard = scene_handle.lock().expect("scene mutex poisoned");

            // No active scene: clear, swap, and take the short recovery
            // sleep rather than racing the pacing loop against nothing to
            // draw (spec step 4). Falls through to the frame-pacing sleep
            // and FPS tracking below like every other branch, so an idle
            // engine still reports a live frame rate.
            if guard.is_none() {
                drop(guard);
                self.device.surface().clear();
                if let Err(e) = self.device.swap() {
                    log::error!("device swap failed while idle: {e}");
                }
                std::thread::sleep(RECOVERY_SLEEP);
            } else {
                let scene = guard.as_mut().expect("checked above");
                let surface = self.device.surface();
                let state = &self.state;
                let tick_result = panic::catch_unwind(AssertUnwindSafe(|| -> anyhow::Result<()> {
                    scene.update(state, scaled_dt)?;
                    scene.draw(state, surface)?;
                    Ok(())
                }));

                let mut faulted = false;
                match tick_result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        log::warn!("scene tick failed: {e}");
                        faulted = true;
                    }
                    Err(_) => {
                        log::error!("scene tick panicked");
                        faulted = true;
                    }
                }

                let frame = self.device.capture();
                preview.capture_if_due(&frame, tick_start, self.config.preview_interval);

                let mut swap_faulted = false;
                if let Err(e) = self.device.swap() {
                    log::error!("device swap failed: {e}");
                    swap_faulted = true;
                    faulted = true;
                }

                if faulted {
                    consec_errors += 1;
                    if consec_errors >= self.config.max_consec_errors {
                        if swap_faulted {
                            log::error!(
                                "device swap failed {consec_errors} consecutive ticks, pausing before retry"
                            );
                            drop(guard);
                            std::thread::sleep(DEVICE_FAULT_PAUSE);
                        } else {
                            log::error!(
                                "scene failed {consec_errors} consecutive ticks, clearing active scene"
                            );
                            *guard = None;
                            drop(guard);
                        }
                        consec_errors = 0;
                    } else {
                        drop(guard);
                    }
                    std::thread::sleep(RECOVERY_SLEEP);
                } else {
                    consec_errors = 0;
                    drop(guard);
                }
            }

            // Frame pacing and FPS tracking run once per tick regardless of
            // which branch above ran, matching the idle/faulted/successful
            // cases alike.
            let elapsed = tick_start.elapsed();
            if let Some(remaining) = self.config.frame_duration().checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }

            fps_monitor.record(tick_start);
            let fps = fps_monitor.fps();
            status.set_fps(fps);

            if fps > 0.0 && fps < self.config.fps_warn_threshold {
                let should_warn = last_fps_warn
                    .map(|t| t.elapsed() >= self.config.fps_log_throttle)
                    .unwrap_or(true);
                if should_warn {
                    log::warn!(
                        "render loop running at {fps:.1} fps, below {:.1} target",
                        self.config.fps_warn_threshold
                    );
                    last_fps_warn = Some(Instant::now());
                }
            }
        }
    }
}

/// Fixed recovery sleep used on every fault path (state-read fault, no
/// active scene, scene/device fault).
const RECOVERY_SLEEP: Duration = Duration::from_millis(100);

/// How long the loop pauses after a device swap keeps failing across
/// `max_consec_errors` consecutive ticks, before it tries again.
const DEVICE_FAULT_PAUSE: Duration = Duration::from_secs(1);
