//! Slime Stomp: entry point and main loop.
//!
//! winit drives the event loop via `ApplicationHandler`. All simulation runs
//! inside `RedrawRequested` on a fixed timestep (see `TimeState`):
//!
//!   1. `begin_frame()` -- measure wall-clock delta, feed accumulator
//!   2. `while should_step()` -- one physics step, then one play pass
//!   3. Rebuild the quad batch from the world and the play state
//!   4. Upload camera uniform, draw, present
//!
//! Content (config, asset manifest, animations, sounds, levels) is loaded
//! and validated before the event loop starts; any failure there ends the
//! process. The window and GPU come up in `resumed`.

mod animation;
mod arcade;
mod assets;
mod audio;
mod config;
mod engine;
mod entity;
mod error;
mod level;
mod play;
#[cfg(test)]
mod replay;

use std::path::Path;
use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use animation::load_animations;
use arcade::ArcadeWorld;
use assets::load_assets_from_path;
use audio::{load_sound_bank, CpalAudio, SoundSink};
use config::{load_config_from_path, GameConfig, CONFIG_PATH};
use engine::{Aabb, BodyGroup, Engine};
use entity::{Crawler, CrawlerKind, Facing, HeroAnimation, HERO_SHEET};
use error::GameResult;
use level::LevelLibrary;
use play::{GameContent, InputSnapshot, PlayPhase, PlayState, Sprite, SOUND_JUMP, SOUND_STOMP};
use stomp_core::input::{InputState, Key};
use stomp_core::time::TimeState;
use stomp_platform::window::PlatformConfig;
use stomp_render::{Camera2D, GpuContext, QuadBatch, QuadRenderer};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.05,
    b: 0.08,
    a: 1.0,
};
const BACKGROUND_COLOR: [f32; 4] = [0.36, 0.62, 0.85, 1.0];
const PLATFORM_COLOR: [f32; 4] = [0.35, 0.65, 0.25, 1.0];
const HERO_COLOR: [f32; 4] = [0.95, 0.80, 0.35, 1.0];
const SLIME_COLOR: [f32; 4] = [0.85, 0.25, 0.30, 1.0];
const SPIDER_COLOR: [f32; 4] = [0.55, 0.35, 0.75, 1.0];
const PROJECTILE_COLOR: [f32; 4] = [0.95, 0.95, 0.75, 1.0];
const EYE_COLOR: [f32; 4] = [0.1, 0.1, 0.1, 1.0];
const EYE_SIZE: f32 = 4.0;

/// Simulation state: the physics world, the play state machine on top and
/// the sink that plays what the world queued.
struct Game<S: SoundSink> {
    world: ArcadeWorld,
    play: PlayState,
    sink: S,
}

impl Game<CpalAudio> {
    fn boot(config: &GameConfig) -> GameResult<Self> {
        let assets = load_assets_from_path(Path::new(&config.manifest))?;
        assets.verify_files(Path::new("."))?;
        let animations = load_animations(&assets)?;
        animations.require_clips(HERO_SHEET, &HeroAnimation::ALL.map(HeroAnimation::name))?;
        for kind in [CrawlerKind::Slime, CrawlerKind::Spider] {
            animations.require_clips(kind.sheet(), &[Crawler::CRAWL, Crawler::DIE])?;
        }
        assets.require_sound(SOUND_JUMP)?;
        assets.require_sound(SOUND_STOMP)?;
        let sink = CpalAudio::new(load_sound_bank(&assets, Path::new("."))?);

        let levels = LevelLibrary::load(&config.levels, &assets)?;
        log::info!("{} levels ready", levels.len());

        let mut world = ArcadeWorld::new(config.width as f32, config.height as f32);
        let content = GameContent {
            levels,
            assets,
            animations,
            gravity: config.gravity,
        };
        let play = PlayState::start(&mut world, content, 0)?;
        Ok(Self { world, play, sink })
    }
}

impl<S: SoundSink> Game<S> {

    /// One fixed step: integrate physics and run the play pass. A clear or a
    /// defeat restarts the level. Queued sounds go to the sink last.
    fn step(&mut self, input: &InputSnapshot, dt: f32, dt_us: u64) -> GameResult<()> {
        self.world.step(dt);
        match self.play.update(&mut self.world, input, dt_us)? {
            PlayPhase::Running => {}
            PlayPhase::Cleared { .. } | PlayPhase::Defeated { .. } => {
                self.play.restart(&mut self.world)?;
            }
        }
        for sound in self.world.drain_sounds() {
            self.sink.play(&sound);
        }
        Ok(())
    }

    /// Window title showing the level and kill progress.
    fn title(&self, base: &str) -> String {
        let session = self.play.session();
        format!(
            "{base} - level {}/{} - {}/{} crawlers",
            session.level_index + 1,
            self.play.level_count(),
            session.kill_count,
            session.enemy_count
        )
    }

    fn build_batch(&self, batch: &mut QuadBatch) {
        batch.clear();
        for body in self.world.bodies().filter(|b| b.visible) {
            let color = match body.group {
                BodyGroup::Background => BACKGROUND_COLOR,
                BodyGroup::Platforms => PLATFORM_COLOR,
                _ => continue,
            };
            push_aabb(batch, &body.aabb, color);
        }
        for sprite in self.play.sprites(&self.world) {
            push_sprite(batch, &sprite);
        }
    }
}

fn push_aabb(batch: &mut QuadBatch, aabb: &Aabb, color: [f32; 4]) {
    batch.push_rect(aabb.left(), aabb.top(), aabb.width(), aabb.height(), color);
}

/// Flat quad tinted by kind, darkened on odd animation frames, with a small
/// marker on the side the sprite faces.
fn push_sprite(batch: &mut QuadBatch, sprite: &Sprite) {
    let base = match sprite.group {
        BodyGroup::Hero => HERO_COLOR,
        BodyGroup::Crawlers if sprite.texture == CrawlerKind::Spider.sheet() => SPIDER_COLOR,
        BodyGroup::Crawlers => SLIME_COLOR,
        _ => PROJECTILE_COLOR,
    };
    let shade = if sprite.frame % 2 == 0 { 1.0 } else { 0.85 };
    let alpha = if sprite.dying { 0.4 } else { base[3] };
    let color = [base[0] * shade, base[1] * shade, base[2] * shade, alpha];
    push_aabb(batch, &sprite.aabb, color);

    if sprite.group == BodyGroup::Projectiles {
        return;
    }
    let eye_left = match sprite.facing {
        Facing::Right => sprite.aabb.right() - EYE_SIZE * 2.0,
        Facing::Left => sprite.aabb.left() + EYE_SIZE,
    };
    let eye_top = sprite.aabb.top() + EYE_SIZE * 2.0;
    batch.push_rect(eye_left, eye_top, EYE_SIZE, EYE_SIZE, EYE_COLOR);
}

struct EngineState {
    window: Arc<Window>,
    gpu: GpuContext,
    renderer: QuadRenderer,
    camera: Camera2D,
    batch: QuadBatch,
    time: TimeState,
    input: InputState,
    game: Game<CpalAudio>,
    title_base: String,
    title: String,
}

impl EngineState {
    fn new(
        window: Arc<Window>,
        config: &PlatformConfig,
        game: Game<CpalAudio>,
    ) -> Result<Self, String> {
        let gpu = GpuContext::new(window.clone())?;
        // The camera always spans the logical world, whatever the surface size.
        let camera = Camera2D::fit_world(config.width, config.height);
        let renderer = QuadRenderer::new(&gpu.device, gpu.surface_format, &camera);
        Ok(Self {
            window,
            gpu,
            renderer,
            camera,
            batch: QuadBatch::new(),
            time: TimeState::new(),
            input: InputState::new(),
            game,
            title_base: config.title.clone(),
            title: String::new(),
        })
    }

    fn refresh_title(&mut self) {
        let title = self.game.title(&self.title_base);
        if title != self.title {
            self.window.set_title(&title);
            self.title = title;
        }
    }
}

struct App {
    config: PlatformConfig,
    pending_game: Option<Game<CpalAudio>>,
    state: Option<EngineState>,
    failed: bool,
}

impl App {
    fn new(config: PlatformConfig, game: Game<CpalAudio>) -> Self {
        Self {
            config,
            pending_game: Some(game),
            state: None,
            failed: false,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, message: &str) {
        log::error!("{message}");
        self.failed = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let Some(game) = self.pending_game.take() else {
            return;
        };
        let window = match stomp_platform::window::create_window(event_loop, &self.config) {
            Ok(window) => window,
            Err(err) => return self.fail(event_loop, &err),
        };
        match EngineState::new(window, &self.config, game) {
            Ok(state) => self.state = Some(state),
            Err(err) => self.fail(event_loop, &err),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                let w = physical_size.width;
                let h = physical_size.height;
                if w > 0 && h > 0 {
                    state.gpu.resize(w, h);
                    log::info!("Resized to {}x{}", w, h);
                }
            }

            WindowEvent::Focused(false) => state.input.release_all(),

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if let Some(key) = map_key(key_code) {
                        match event.state {
                            ElementState::Pressed => state.input.key_down(key),
                            ElementState::Released => state.input.key_up(key),
                        }
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                if state.gpu.size.0 == 0 || state.gpu.size.1 == 0 {
                    return;
                }

                state.time.begin_frame();
                let dt = state.time.fixed_dt as f32;
                let dt_us = state.time.fixed_dt_us();

                while state.time.should_step() {
                    if state.input.is_just_pressed(Key::Escape) {
                        log::info!("Escape pressed, exiting.");
                        event_loop.exit();
                        return;
                    }
                    let snapshot = InputSnapshot::from_input(&state.input);
                    // Edges belong to the step that saw them; a press landing
                    // on a frame with no step waits for the next one.
                    state.input.end_frame();
                    if let Err(err) = state.game.step(&snapshot, dt, dt_us) {
                        let message = format!("Game stopped: {err}");
                        return self.fail(event_loop, &message);
                    }
                }

                if state.time.steps_this_frame > 0 || state.batch.is_empty() {
                    state.game.build_batch(&mut state.batch);
                    state.refresh_title();
                }

                let Some((output, view)) = state.gpu.begin_frame() else {
                    return;
                };
                state.renderer.render(
                    &state.gpu,
                    &view,
                    &state.camera,
                    &state.batch,
                    CLEAR_COLOR,
                );
                output.present();
            }

            _ => {}
        }
    }
}

fn map_key(key_code: KeyCode) -> Option<Key> {
    match key_code {
        KeyCode::KeyA => Some(Key::A),
        KeyCode::KeyD => Some(Key::D),
        KeyCode::KeyW => Some(Key::W),
        KeyCode::ArrowLeft => Some(Key::Left),
        KeyCode::ArrowRight => Some(Key::Right),
        KeyCode::Escape => Some(Key::Escape),
        _ => None,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Slime Stomp starting...");

    let config = match load_config_from_path(Path::new(CONFIG_PATH)) {
        Ok(config) => config,
        Err(err) => {
            log::error!("{err}");
            std::process::exit(1);
        }
    };
    let game = match Game::boot(&config) {
        Ok(game) => game,
        Err(err) => {
            log::error!("Boot failed: {err}");
            std::process::exit(1);
        }
    };

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            log::error!("Failed to create event loop: {err}");
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let platform = PlatformConfig {
        title: config.title.clone(),
        width: config.width,
        height: config.height,
    };
    let mut app = App::new(platform, game);
    if let Err(err) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {err}");
        std::process::exit(1);
    }
    if app.failed {
        std::process::exit(1);
    }
}
