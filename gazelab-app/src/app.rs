use crate::capture::{SyntheticCamera, SyntheticFaceMesh};
use crate::renderer::{DotRenderer, DotStimulus};
use anyhow::Result;
use gazelab_core::{
    ConditionSpace, FrameSource, LandmarkExtractor, SessionMetadata, StimulusTiming, SubjectInfo,
    TrialConfig,
};
use gazelab_data::{DataManager, TrialStore};
use gazelab_experiment::{SchedulerEvent, Session};
use gazelab_timing::{HighPrecisionTimer, Timer};
use log::{error, info, warn};
use pixels::{Pixels, SurfaceTexture};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tiny_skia::Pixmap;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Fullscreen, Window, WindowId},
};

/// Capture tick period; the original study sampled at ~30 fps.
const TICK_PERIOD_MS: u64 = 33;
/// Settling delay between opening a trial and showing the first dot.
const SETTLE_DELAY_MS: u64 = 1000;
const MS_TO_NS: u64 = 1_000_000;

/// Thin presentation adapter: owns the window, feeds capture ticks and
/// clock updates into the experiment core, and renders whatever position
/// the scheduler reports. All study logic lives in `gazelab-experiment`.
pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    canvas: Option<Pixmap>,
    renderer: DotRenderer,
    timer: HighPrecisionTimer,

    data: DataManager,
    subject_dir: PathBuf,
    session: Session,

    camera: Option<Box<dyn FrameSource>>,
    extractor: Box<dyn LandmarkExtractor>,

    trial_dir: Option<PathBuf>,
    settle_deadline_ns: Option<u64>,
    last_tick_ns: u64,
    current_size: Option<PhysicalSize<u32>>,
    should_exit: bool,
}

impl App {
    pub fn new(subject_id: &str, experimenter: &str) -> Result<Self> {
        let data = DataManager::new(None, env!("CARGO_PKG_VERSION"))?;
        let subject_dir = data.create_subject_dir(subject_id)?;
        write_session_metadata(&data, &subject_dir, subject_id, experimenter)?;
        let session = Session::new(subject_id, ConditionSpace::default(), StimulusTiming::default());

        Ok(Self {
            window: None,
            pixels: None,
            canvas: None,
            renderer: DotRenderer::new(),
            timer: HighPrecisionTimer::new(),
            data,
            subject_dir,
            session,
            camera: Some(Box::new(SyntheticCamera::new(640, 480))),
            extractor: Box::new(SyntheticFaceMesh::new()),
            trial_dir: None,
            settle_deadline_ns: None,
            last_tick_ns: 0,
            current_size: None,
            should_exit: false,
        })
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        info!(
            "gaze study session for subject {} ({} conditions), data under {}",
            self.session.subject_id(),
            self.session.tracker().total(),
            self.data.base_dir().display()
        );
        println!("Press SPACE to start the next trial, ESC to exit.");
        event_loop.run_app(&mut self).map_err(Into::into)
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let primary_monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow::anyhow!("No monitor available"))?;

        let window_attributes = Window::default_attributes()
            .with_title("Gazelab")
            .with_fullscreen(Some(Fullscreen::Borderless(Some(primary_monitor))))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let physical_size = window.inner_size();
        self.current_size = Some(physical_size);

        info!(
            "display surface: {}×{}",
            physical_size.width, physical_size.height
        );

        let surface_texture =
            SurfaceTexture::new(physical_size.width, physical_size.height, window.clone());
        self.pixels = Some(Pixels::new(
            physical_size.width,
            physical_size.height,
            surface_texture,
        )?);
        self.canvas = Pixmap::new(physical_size.width, physical_size.height);

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);

        Ok(())
    }

    /// Opens a trial on the first remaining condition. Precondition checks
    /// run before any directory is touched.
    fn start_next_trial(&mut self) -> Result<()> {
        let remaining = self.session.tracker().remaining();
        let Some(&condition) = remaining.first() else {
            info!("all condition combinations complete for this subject");
            return Ok(());
        };

        let size = self
            .current_size
            .ok_or_else(|| anyhow::anyhow!("window surface not ready"))?;
        self.session
            .begin_trial(condition, size.width, size.height)?;

        let trial_dir = match self.data.create_trial_dir(&self.subject_dir) {
            Ok(dir) => dir,
            Err(e) => {
                self.session.abort_trial();
                return Err(e.into());
            }
        };
        let trial_id = trial_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let config = TrialConfig::new(&trial_id, condition, self.session.timing());
        if let Err(e) = self.data.save_trial_config(&trial_dir, &config) {
            self.session.abort_trial();
            return Err(e.into());
        }

        self.trial_dir = Some(trial_dir);
        self.settle_deadline_ns = Some(self.timer.now() + SETTLE_DELAY_MS * MS_TO_NS);
        info!("trial {trial_id} started for {condition}");
        Ok(())
    }

    fn update(&mut self) {
        let now = self.timer.now();

        if self.session.current_trial().is_none() {
            return;
        }

        // Hold the blank screen until the settling delay has passed.
        if let Some(deadline) = self.settle_deadline_ns {
            if now < deadline {
                return;
            }
            self.settle_deadline_ns = None;
            if let Some(trial) = self.session.current_trial() {
                trial.scheduler.start(now);
            }
        }

        let mut finished = false;
        if let Some(trial) = self.session.current_trial() {
            if trial.update(now) == Some(SchedulerEvent::Finished) {
                finished = true;
            }
        }
        if finished {
            self.finish_current_trial();
            return;
        }

        // Capture tick: fixed period, skipped silently when the camera
        // cannot produce a frame.
        if now.saturating_sub(self.last_tick_ns) >= TICK_PERIOD_MS * MS_TO_NS {
            self.last_tick_ns = now;
            if let (Some(trial), Some(camera)) =
                (self.session.current_trial(), self.camera.as_mut())
            {
                if trial.scheduler.active_position().is_some() {
                    if let Some(frame) = camera.grab() {
                        trial.tick(&mut *self.extractor, &frame);
                    }
                }
            }
        }
    }

    fn finish_current_trial(&mut self) {
        let Some(trial_dir) = self.trial_dir.take() else {
            warn!("finished trial had no directory; discarding records");
            self.session.abort_trial();
            return;
        };
        let mut store = TrialStore::new(trial_dir);
        match self.session.finish_trial(&mut store) {
            Ok(summary) => {
                println!(
                    "Trial complete: {} ({} samples). {}/{} conditions done.",
                    summary.condition,
                    summary.samples,
                    self.session.tracker().completed_count(),
                    self.session.tracker().total()
                );
                if self.session.tracker().is_exhausted() {
                    println!("Session complete: all combinations recorded for this subject.");
                }
            }
            Err(e) => {
                error!("trial data not saved, condition stays available for retry: {e}");
            }
        }
    }

    fn render(&mut self) -> Result<()> {
        let (Some(pixels), Some(canvas)) = (self.pixels.as_mut(), self.canvas.as_mut()) else {
            return Ok(());
        };

        let size = self.current_size.unwrap_or(PhysicalSize::new(1, 1));
        let dot = self.session.current_trial().and_then(|trial| {
            let position = trial.scheduler.active_position()?;
            let (x, y) = position.to_pixels(size.width, size.height);
            Some(DotStimulus {
                x: x as f32,
                y: y as f32,
                radius: trial.scheduler.timing().dot_radius as f32,
                cue: trial.scheduler.is_cue_target(),
            })
        });

        self.renderer.render_frame(canvas, dot);
        if !blit(canvas, pixels.frame_mut()) {
            warn!("canvas and surface buffer sizes disagree; frame skipped");
            return Ok(());
        }
        pixels.render()?;
        Ok(())
    }

    fn handle_input(&mut self, key: winit::keyboard::PhysicalKey, event_loop: &ActiveEventLoop) {
        use winit::keyboard::{KeyCode, PhysicalKey};
        if let PhysicalKey::Code(k) = key {
            match k {
                KeyCode::Space => {
                    if self.session.current_trial().is_none() {
                        if let Err(e) = self.start_next_trial() {
                            error!("failed to start trial: {e}");
                        }
                    }
                }
                KeyCode::Escape => self.cleanup_and_exit(event_loop),
                _ => {}
            }
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        self.current_size = Some(new_size);
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                error!("failed to resize surface: {e}");
            }
            // The canvas must stay in lockstep with the surface buffer;
            // keep the old one if the buffer could not follow.
            if let Err(e) = pixels.resize_buffer(new_size.width, new_size.height) {
                error!("failed to resize buffer: {e}");
                return;
            }
        }
        self.canvas = Pixmap::new(new_size.width, new_size.height);
        if let Some(trial) = self.session.current_trial() {
            trial.recorder.set_surface_size(new_size.width, new_size.height);
        }
    }

    /// Deterministic teardown on every exit path: the open trial is
    /// discarded unsaved and the camera handle is released exactly once.
    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        self.session.abort_trial();
        self.trial_dir = None;
        if self.camera.take().is_some() {
            info!("camera released");
        }
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
        self.should_exit = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                error!("failed to create window and surface: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.cleanup_and_exit(event_loop),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render() {
                    error!("render error: {e}");
                }
                self.update();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                self.handle_input(event.physical_key, event_loop);
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if self.should_exit {
            return;
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Writes the subject's `Metadata.json` when the session is set up.
/// Demographics are not collected on the command line; the document carries
/// placeholders the experimenter fills in afterwards.
fn write_session_metadata(
    data: &DataManager,
    subject_dir: &Path,
    subject_id: &str,
    experimenter: &str,
) -> gazelab_data::Result<()> {
    let metadata = SessionMetadata::new(
        SubjectInfo {
            id: subject_id.to_string(),
            age: 0,
            gender: "unspecified".to_string(),
            vision_correction: "unspecified".to_string(),
            dominant_eye: "unspecified".to_string(),
        },
        experimenter,
        data.app_version(),
    );
    data.save_metadata(subject_dir, &metadata)
}

/// Copies the canvas into the surface buffer. Declined when the two disagree
/// in size, which can happen for a frame after a failed buffer resize.
fn blit(canvas: &Pixmap, frame: &mut [u8]) -> bool {
    if frame.len() != canvas.data().len() {
        return false;
    }
    frame.copy_from_slice(canvas.data());
    true
}
