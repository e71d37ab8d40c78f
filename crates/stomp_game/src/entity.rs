//! Per-kind behavior rules for the hero, crawlers and projectiles.
//!
//! Entities own a `BodyId` plus kind data (facing, animation, lifecycle).
//! Rules take the engine body by `&mut Body` and only touch velocities and
//! flags; position changes are left to the engine step.

use stomp_core::animation::AnimationState;

use crate::animation::AnimationRegistry;
use crate::engine::{Body, BodyDesc, BodyGroup, BodyId};

pub const HERO_SPEED: f32 = 200.0;
pub const HERO_JUMP_SPEED: f32 = 600.0;
pub const HERO_BOUNCE_SPEED: f32 = 200.0;
pub const CRAWLER_SPEED: f32 = 100.0;
pub const PROJECTILE_SPEED: f32 = 400.0;
/// Upward drift added to a projectile every frame.
pub const PROJECTILE_LIFT: f32 = 20.0;
/// Horizontal slowdown applied to a projectile every frame.
pub const PROJECTILE_DRAG: f32 = 4.0;

pub const HERO_SHEET: &str = "hero";
pub const PROJECTILE_SHEET: &str = "crescent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    /// Horizontal sprite scale: -1 mirrors the sheet.
    pub fn scale(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }

    /// Facing after moving at `velocity_x`; zero keeps `self`.
    pub fn follow(self, velocity_x: f32) -> Self {
        if velocity_x > 0.0 {
            Self::Right
        } else if velocity_x < 0.0 {
            Self::Left
        } else {
            self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeroAnimation {
    Stop,
    Jump,
    Fall,
    Run,
}

impl HeroAnimation {
    pub const ALL: [HeroAnimation; 4] = [Self::Stop, Self::Jump, Self::Fall, Self::Run];

    pub fn name(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Jump => "jump",
            Self::Fall => "fall",
            Self::Run => "run",
        }
    }
}

/// Hero animation for the given motion. First match wins: rising, falling,
/// running on the ground, standing.
pub fn resolve_hero_animation(velocity_x: f32, velocity_y: f32, grounded: bool) -> HeroAnimation {
    if velocity_y < 0.0 {
        HeroAnimation::Jump
    } else if !grounded {
        HeroAnimation::Fall
    } else if velocity_x != 0.0 {
        HeroAnimation::Run
    } else {
        HeroAnimation::Stop
    }
}

#[derive(Debug, Clone)]
pub struct Hero {
    pub body: BodyId,
    pub facing: Facing,
    animation: AnimationState,
    frame: u32,
}

impl Hero {
    pub fn new(body: BodyId) -> Self {
        Self {
            body,
            facing: Facing::Right,
            animation: AnimationState::new(HERO_SHEET, HeroAnimation::Stop.name()),
            frame: 0,
        }
    }

    /// `direction` is -1, 0 or 1.
    pub fn walk(&mut self, body: &mut Body, direction: i8) {
        body.velocity_x = f32::from(direction) * HERO_SPEED;
        self.facing = self.facing.follow(body.velocity_x);
    }

    /// Jump if standing on something. Returns whether the jump happened.
    pub fn jump(&self, body: &mut Body) -> bool {
        if !body.grounded() {
            return false;
        }
        body.velocity_y = -HERO_JUMP_SPEED;
        true
    }

    /// Jump without the ground check.
    #[allow(dead_code)]
    pub fn jump_unchecked(&self, body: &mut Body) {
        body.velocity_y = -HERO_JUMP_SPEED;
    }

    /// Small hop after stomping a crawler.
    pub fn bounce(&self, body: &mut Body) {
        body.velocity_y = -HERO_BOUNCE_SPEED;
    }

    /// Switch animation if the motion calls for a different one, then advance
    /// playback.
    pub fn update(&mut self, body: &Body, dt_us: u64, animations: &AnimationRegistry) {
        let wanted = resolve_hero_animation(body.velocity_x, body.velocity_y, body.grounded());
        if !self.animation.is_playing(wanted.name()) {
            self.animation = AnimationState::new(HERO_SHEET, wanted.name());
        }
        if let Some(clip) = animations.resolve_clip(HERO_SHEET, wanted.name()) {
            self.frame = self.animation.tick(dt_us, clip);
        }
    }

    #[allow(dead_code)]
    pub fn animation(&self) -> &AnimationState {
        &self.animation
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlerKind {
    Slime,
    Spider,
}

impl CrawlerKind {
    pub fn sheet(self) -> &'static str {
        match self {
            Self::Slime => "slime",
            Self::Spider => "spider",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlerState {
    Crawling,
    /// Death animation playing; the body no longer collides.
    Dying,
    /// Death animation done; the body should be destroyed.
    Removed,
}

#[derive(Debug, Clone)]
pub struct Crawler {
    pub body: BodyId,
    pub kind: CrawlerKind,
    pub facing: Facing,
    state: CrawlerState,
    animation: AnimationState,
    frame: u32,
}

impl Crawler {
    pub const CRAWL: &'static str = "crawl";
    pub const DIE: &'static str = "die";

    pub fn new(body: BodyId, kind: CrawlerKind) -> Self {
        Self {
            body,
            kind,
            facing: Facing::Right,
            state: CrawlerState::Crawling,
            animation: AnimationState::new(kind.sheet(), Self::CRAWL),
            frame: 0,
        }
    }

    pub fn state(&self) -> CrawlerState {
        self.state
    }

    #[allow(dead_code)]
    pub fn is_crawling(&self) -> bool {
        self.state == CrawlerState::Crawling
    }

    /// Turn around at walls and world edges.
    pub fn update(&mut self, body: &mut Body) {
        if self.state != CrawlerState::Crawling {
            return;
        }
        if body.touching.right || body.blocked.right {
            body.velocity_x = -CRAWLER_SPEED;
        } else if body.touching.left || body.blocked.left {
            body.velocity_x = CRAWLER_SPEED;
        }
        self.facing = self.facing.follow(body.velocity_x);
    }

    /// Stop colliding and start the death animation. Returns false if the
    /// crawler was already dying.
    pub fn die(&mut self, body: &mut Body) -> bool {
        if self.state != CrawlerState::Crawling {
            return false;
        }
        body.enabled = false;
        body.velocity_x = 0.0;
        body.velocity_y = 0.0;
        self.state = CrawlerState::Dying;
        self.animation = AnimationState::new(self.kind.sheet(), Self::DIE);
        true
    }

    /// Advance the current animation. A dying crawler whose death clip has
    /// finished (or has none) moves to `Removed`; returns true once removed.
    pub fn advance(&mut self, dt_us: u64, animations: &AnimationRegistry) -> bool {
        let clip = animations.resolve_clip(&self.animation.source_id, &self.animation.clip_name);
        match clip {
            Some(clip) => self.frame = self.animation.tick(dt_us, clip),
            None => self.animation.finished = true,
        }
        if self.state == CrawlerState::Dying && self.animation.finished {
            self.state = CrawlerState::Removed;
        }
        self.state == CrawlerState::Removed
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }
}

#[derive(Debug, Clone)]
pub struct Projectile {
    pub body: BodyId,
    pub direction: Facing,
    alive: bool,
}

impl Projectile {
    pub fn new(body: BodyId, direction: Facing) -> Self {
        Self {
            body,
            direction,
            alive: true,
        }
    }

    /// Spawn request for a projectile centered on `(x, y)`. Projectiles fall
    /// under gravity and ignore the world bounds.
    pub fn desc(x: f32, y: f32, size: (f32, f32)) -> BodyDesc {
        BodyDesc::new(BodyGroup::Projectiles, PROJECTILE_SHEET, x, y, size).with_anchor(0.5, 0.5)
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Launch in `self.direction`. A projectile already touching the hero is
    /// killed instead and keeps its velocity. Returns whether it launched.
    pub fn shoot(&mut self, body: &mut Body, touching_hero: bool) -> bool {
        if touching_hero {
            self.alive = false;
            return false;
        }
        body.velocity_x = self.direction.scale() * PROJECTILE_SPEED;
        true
    }

    /// Per-frame drift. Velocities accumulate without a cap. Leaving the
    /// camera kills the projectile.
    pub fn update(&mut self, body: &mut Body, in_camera: bool) {
        if !self.alive {
            return;
        }
        body.velocity_y -= PROJECTILE_LIFT;
        match self.direction {
            Facing::Right => body.velocity_x -= PROJECTILE_DRAG,
            Facing::Left => body.velocity_x += PROJECTILE_DRAG,
        }
        if !in_camera {
            self.alive = false;
        }
    }
}
