/// Interactive model viewer application: window/event wiring, load
/// orchestration, and the render loop
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{error, info, warn};
use winit::{
    dpi::LogicalSize,
    event::{ElementState, Event, MouseButton, MouseScrollDelta, Touch, TouchPhase, WindowEvent},
    event_loop::{EventLoopBuilder, EventLoopProxy},
    window::WindowBuilder,
};

use mv3d_core::{builtin_cube, load_model, LoadError, MeshData, OrbitCamera, ParsePolicy};

pub mod renderer;

pub use renderer::Renderer;

/// Two presses inside this window count as a double click
const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(300);
/// Wheel line deltas are scaled to roughly match pixel-delta magnitudes
const LINE_SCROLL_FACTOR: f32 = 40.0;

/// Posted back to the event loop by background load threads
enum AppEvent {
    ModelLoaded {
        generation: u64,
        result: Result<MeshData, LoadError>,
    },
}

/// Numbers load requests so that results arriving out of order can be told
/// apart. Only a result from the most recently begun load is accepted; an
/// earlier load finishing late loses the race.
#[derive(Debug, Default)]
struct LoadTracker {
    latest: u64,
}

impl LoadTracker {
    /// Generation of the most recently begun load (0 before any load).
    fn current(&self) -> u64 {
        self.latest
    }

    /// Claim a generation for a new load.
    fn begin(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    /// Whether a finished load with this generation should be applied.
    fn accept(&self, finished: u64) -> bool {
        finished == self.latest
    }
}

/// Run the viewer until the window closes.
///
/// With no model path the built-in cube is shown; a model dropped onto the
/// window replaces whatever is currently displayed.
pub fn run(obj_path: Option<PathBuf>, mtl_path: Option<PathBuf>) -> Result<()> {
    let event_loop = EventLoopBuilder::<AppEvent>::with_user_event()
        .build()
        .context("failed to create event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("mv3d model viewer")
            .with_inner_size(LogicalSize::new(1024.0, 768.0))
            .build(&event_loop)
            .context("failed to create window")?,
    );

    let mut renderer = Renderer::new(window.clone())?;
    let mut camera = OrbitCamera::new();
    let proxy = event_loop.create_proxy();

    let mut loads = LoadTracker::default();
    renderer.upload_mesh(&builtin_cube(), loads.current());

    if let Some(path) = obj_path {
        spawn_load(proxy.clone(), loads.begin(), path, mtl_path);
    }

    let mut cursor = (0.0f32, 0.0f32);
    let mut last_press: Option<Instant> = None;
    let mut active_touch: Option<u64> = None;

    event_loop
        .run(move |event, target| match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => target.exit(),
                WindowEvent::Resized(size) => {
                    renderer.resize(size.width, size.height, window.scale_factor());
                }
                WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                    let size = window.inner_size();
                    renderer.resize(size.width, size.height, scale_factor);
                }
                WindowEvent::CursorMoved { position, .. } => {
                    cursor = (position.x as f32, position.y as f32);
                    camera.drag_move(cursor.0, cursor.1);
                }
                WindowEvent::MouseInput {
                    state,
                    button: MouseButton::Left,
                    ..
                } => match state {
                    ElementState::Pressed => {
                        let now = Instant::now();
                        if last_press.is_some_and(|at| now - at < DOUBLE_CLICK_WINDOW) {
                            camera.reset();
                            last_press = None;
                        } else {
                            last_press = Some(now);
                        }
                        camera.drag_start(cursor.0, cursor.1);
                    }
                    ElementState::Released => camera.drag_end(),
                },
                WindowEvent::CursorLeft { .. } => camera.drag_end(),
                WindowEvent::MouseWheel { delta, .. } => {
                    camera.zoom_by(scroll_amount(delta));
                }
                WindowEvent::Touch(Touch {
                    phase, location, id, ..
                }) => match phase {
                    TouchPhase::Started => {
                        // Single-finger orbit only; extra fingers are ignored
                        if active_touch.is_none() {
                            active_touch = Some(id);
                            camera.drag_start(location.x as f32, location.y as f32);
                        }
                    }
                    TouchPhase::Moved => {
                        if active_touch == Some(id) {
                            camera.drag_move(location.x as f32, location.y as f32);
                        }
                    }
                    TouchPhase::Ended | TouchPhase::Cancelled => {
                        if active_touch == Some(id) {
                            active_touch = None;
                            camera.drag_end();
                        }
                    }
                },
                WindowEvent::DroppedFile(path) => {
                    let generation = loads.begin();
                    info!("loading dropped file {} (generation {generation})", path.display());
                    spawn_load(proxy.clone(), generation, path, None);
                }
                WindowEvent::RedrawRequested => {
                    if let Err(err) = renderer.render(&camera) {
                        warn!("frame skipped: {err}");
                    }
                }
                _ => {}
            },
            Event::UserEvent(AppEvent::ModelLoaded {
                generation: finished,
                result,
            }) => {
                if !loads.accept(finished) {
                    info!(
                        "discarding stale model load (generation {finished}, showing {:?})",
                        renderer.mesh_generation()
                    );
                    return;
                }
                match result {
                    Ok(mesh) => renderer.upload_mesh(&mesh, finished),
                    // Keep the previous mesh on screen
                    Err(err) => error!("model load failed: {err}"),
                }
            }
            Event::AboutToWait => window.request_redraw(),
            _ => {}
        })
        .context("event loop terminated abnormally")?;

    Ok(())
}

/// Normalize wheel input; positive output zooms out, matching the sign the
/// camera expects.
fn scroll_amount(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => -y * LINE_SCROLL_FACTOR,
        MouseScrollDelta::PixelDelta(position) => -position.y as f32,
    }
}

/// Read and assemble the model off the event loop thread, then post the
/// result back tagged with its generation.
fn spawn_load(
    proxy: EventLoopProxy<AppEvent>,
    generation: u64,
    obj_path: PathBuf,
    mtl_path: Option<PathBuf>,
) {
    std::thread::spawn(move || {
        let mtl_path = mtl_path.or_else(|| sibling_mtl(&obj_path));
        let result = load_model(&obj_path, mtl_path.as_deref(), ParsePolicy::Lenient);
        // Send fails only if the loop is already gone
        let _ = proxy.send_event(AppEvent::ModelLoaded { generation, result });
    });
}

/// Look for a material library next to the OBJ file.
fn sibling_mtl(obj_path: &Path) -> Option<PathBuf> {
    let candidate = obj_path.with_extension("mtl");
    candidate.is_file().then_some(candidate)
}
