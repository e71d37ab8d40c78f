//! The play state machine: one pass per fixed step while a level runs.
//!
//! ```text
//! Running --(last crawler killed)--> Cleared { next_level } --restart--> Running
//! Running --(hero hit, not falling)--> Defeated { level }   --restart--> Running
//! ```
//!
//! A pass resolves platform/wall collisions, then hero and projectile
//! contacts with crawlers, then input, then per-entity updates. The first
//! transition ends the pass. `restart` rebuilds everything from the level
//! document; nothing survives a transition.

use stomp_core::input::{InputState, Key};

use crate::animation::AnimationRegistry;
use crate::assets::AssetRegistry;
use crate::engine::{Aabb, Body, BodyGroup, BodyId, Engine};
use crate::entity::{Crawler, CrawlerState, Facing, Hero, Projectile, PROJECTILE_SHEET};
use crate::error::{GameError, GameResult};
use crate::level::{level_key, spawn_level, LevelLibrary};

pub const SOUND_JUMP: &str = "sfx:jump";
pub const SOUND_STOMP: &str = "sfx:stomp";

/// Everything loaded at boot that a level restart reads from.
#[derive(Debug)]
pub struct GameContent {
    pub levels: LevelLibrary,
    pub assets: AssetRegistry,
    pub animations: AnimationRegistry,
    pub gravity: f32,
}

/// Player intent for one step. `jump` is edge-triggered, the rest are held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    pub move_left: bool,
    pub move_right: bool,
    pub jump: bool,
    pub fire_left: bool,
    pub fire_right: bool,
}

/// The single hero action taken per step besides jumping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeroAction {
    Walk(i8),
    Fire(Facing),
}

impl InputSnapshot {
    pub fn from_input(input: &InputState) -> Self {
        Self {
            move_left: input.is_held(Key::A),
            move_right: input.is_held(Key::D),
            jump: input.is_just_pressed(Key::W),
            fire_left: input.is_held(Key::Left),
            fire_right: input.is_held(Key::Right),
        }
    }

    /// Left, right, fire left, fire right, else stand still.
    pub fn action(&self) -> HeroAction {
        if self.move_left {
            HeroAction::Walk(-1)
        } else if self.move_right {
            HeroAction::Walk(1)
        } else if self.fire_left {
            HeroAction::Fire(Facing::Left)
        } else if self.fire_right {
            HeroAction::Fire(Facing::Right)
        } else {
            HeroAction::Walk(0)
        }
    }
}

/// One attempt at one level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelSession {
    pub level_index: usize,
    pub enemy_count: usize,
    pub kill_count: usize,
    pub cleared: bool,
}

impl LevelSession {
    pub fn new(level_index: usize, enemy_count: usize) -> Self {
        Self {
            level_index,
            enemy_count,
            kill_count: 0,
            cleared: false,
        }
    }

    /// Count one defeated crawler. Returns true when that was the last one.
    pub fn record_kill(&mut self) -> GameResult<bool> {
        if self.cleared || self.kill_count >= self.enemy_count {
            return Err(GameError::Invariant(format!(
                "kill recorded on {} with {}/{} crawlers already defeated",
                level_key(self.level_index),
                self.kill_count,
                self.enemy_count
            )));
        }
        self.kill_count += 1;
        self.cleared = self.kill_count == self.enemy_count;
        Ok(self.cleared)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayPhase {
    Running,
    Cleared { next_level: usize },
    Defeated { level: usize },
}

/// What the renderer needs to draw one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub group: BodyGroup,
    pub texture: String,
    pub aabb: Aabb,
    pub facing: Facing,
    pub frame: u32,
    pub dying: bool,
}

pub struct PlayState {
    content: GameContent,
    session: LevelSession,
    phase: PlayPhase,
    hero: Hero,
    crawlers: Vec<Crawler>,
    projectiles: Vec<Projectile>,
}

impl PlayState {
    /// Clear `engine` and start `level` (wrapped to the level count).
    pub fn start<E: Engine + ?Sized>(
        engine: &mut E,
        content: GameContent,
        level: usize,
    ) -> GameResult<Self> {
        let level_index = level % content.levels.len();
        let (session, hero, crawlers) = enter_level(engine, &content, level_index)?;
        Ok(Self {
            content,
            session,
            phase: PlayPhase::Running,
            hero,
            crawlers,
            projectiles: Vec::new(),
        })
    }

    #[allow(dead_code)]
    pub fn phase(&self) -> PlayPhase {
        self.phase
    }

    pub fn session(&self) -> &LevelSession {
        &self.session
    }

    pub fn level_count(&self) -> usize {
        self.content.levels.len()
    }

    #[allow(dead_code)]
    pub fn hero(&self) -> &Hero {
        &self.hero
    }

    #[allow(dead_code)]
    pub fn crawlers(&self) -> &[Crawler] {
        &self.crawlers
    }

    #[allow(dead_code)]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Re-enter `Running`: the next level after a clear, the same level
    /// otherwise.
    pub fn restart<E: Engine + ?Sized>(&mut self, engine: &mut E) -> GameResult<()> {
        let level_index = match self.phase {
            PlayPhase::Cleared { next_level } => next_level,
            PlayPhase::Defeated { level } => level,
            PlayPhase::Running => self.session.level_index,
        };
        let (session, hero, crawlers) = enter_level(engine, &self.content, level_index)?;
        self.session = session;
        self.hero = hero;
        self.crawlers = crawlers;
        self.projectiles.clear();
        self.phase = PlayPhase::Running;
        Ok(())
    }

    /// Run one pass. Physics integration (`Engine::step`) is the caller's job
    /// and happens before this.
    pub fn update<E: Engine + ?Sized>(
        &mut self,
        engine: &mut E,
        input: &InputSnapshot,
        dt_us: u64,
    ) -> GameResult<PlayPhase> {
        if self.phase != PlayPhase::Running {
            return Err(GameError::Invariant(format!(
                "play update while {:?}; restart first",
                self.phase
            )));
        }

        engine.collide(BodyGroup::Crawlers, BodyGroup::Platforms);
        engine.collide(BodyGroup::Crawlers, BodyGroup::EnemyWalls);
        engine.collide(BodyGroup::Hero, BodyGroup::Platforms);

        if self.resolve_hero_contacts(engine)? || self.resolve_projectile_hits(engine)? {
            return Ok(self.phase);
        }

        self.apply_input(engine, input)?;
        self.update_entities(engine, dt_us)?;
        Ok(self.phase)
    }

    /// Draw list for the hero, crawlers and projectiles, in that order.
    pub fn sprites<E: Engine + ?Sized>(&self, engine: &E) -> Vec<Sprite> {
        let mut sprites = Vec::with_capacity(1 + self.crawlers.len() + self.projectiles.len());
        if let Some(body) = engine.body(self.hero.body) {
            sprites.push(Sprite {
                group: body.group,
                texture: body.texture.clone(),
                aabb: body.aabb,
                facing: self.hero.facing,
                frame: self.hero.frame(),
                dying: false,
            });
        }
        for crawler in &self.crawlers {
            if let Some(body) = engine.body(crawler.body) {
                sprites.push(Sprite {
                    group: body.group,
                    texture: body.texture.clone(),
                    aabb: body.aabb,
                    facing: crawler.facing,
                    frame: crawler.frame(),
                    dying: crawler.state() == CrawlerState::Dying,
                });
            }
        }
        for projectile in &self.projectiles {
            if let Some(body) = engine.body(projectile.body) {
                sprites.push(Sprite {
                    group: body.group,
                    texture: body.texture.clone(),
                    aabb: body.aabb,
                    facing: projectile.direction,
                    frame: 0,
                    dying: false,
                });
            }
        }
        sprites
    }

    fn resolve_hero_contacts<E: Engine + ?Sized>(&mut self, engine: &mut E) -> GameResult<bool> {
        for (_, crawler_id) in engine.overlaps(BodyGroup::Hero, BodyGroup::Crawlers) {
            let hero_body = body_of(engine, self.hero.body)?;
            if hero_body.velocity_y > 0.0 {
                self.hero.bounce(hero_body);
                if self.kill_crawler(engine, crawler_id)? {
                    return Ok(true);
                }
            } else {
                engine.play_sound(SOUND_STOMP);
                self.phase = PlayPhase::Defeated {
                    level: self.session.level_index,
                };
                log::info!(
                    "Hero defeated on {} ({}/{} crawlers down)",
                    level_key(self.session.level_index),
                    self.session.kill_count,
                    self.session.enemy_count
                );
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn resolve_projectile_hits<E: Engine + ?Sized>(&mut self, engine: &mut E) -> GameResult<bool> {
        for (_, crawler_id) in engine.overlaps(BodyGroup::Projectiles, BodyGroup::Crawlers) {
            if self.kill_crawler(engine, crawler_id)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Returns true when the kill cleared the level.
    fn kill_crawler<E: Engine + ?Sized>(&mut self, engine: &mut E, id: BodyId) -> GameResult<bool> {
        let Some(crawler) = self.crawlers.iter_mut().find(|c| c.body == id) else {
            return Ok(false);
        };
        if !crawler.die(body_of(engine, id)?) {
            return Ok(false);
        }
        engine.play_sound(SOUND_STOMP);

        if !self.session.record_kill()? {
            return Ok(false);
        }
        let next_level = (self.session.level_index + 1) % self.content.levels.len();
        self.phase = PlayPhase::Cleared { next_level };
        log::info!(
            "Cleared {}, next is {}",
            level_key(self.session.level_index),
            level_key(next_level)
        );
        Ok(true)
    }

    fn apply_input<E: Engine + ?Sized>(
        &mut self,
        engine: &mut E,
        input: &InputSnapshot,
    ) -> GameResult<()> {
        if input.jump && self.hero.jump(body_of(engine, self.hero.body)?) {
            engine.play_sound(SOUND_JUMP);
        }
        match input.action() {
            HeroAction::Walk(direction) => {
                self.hero.walk(body_of(engine, self.hero.body)?, direction);
            }
            HeroAction::Fire(direction) => self.fire(engine, direction)?,
        }
        Ok(())
    }

    fn fire<E: Engine + ?Sized>(&mut self, engine: &mut E, direction: Facing) -> GameResult<()> {
        let (x, y) = body_of(engine, self.hero.body)?.center();
        let size = self.content.assets.require_size(PROJECTILE_SHEET)?;
        let id = engine.spawn(Projectile::desc(x, y, size));
        let touching_hero = engine.touching(id, self.hero.body);

        let mut projectile = Projectile::new(id, direction);
        if projectile.shoot(body_of(engine, id)?, touching_hero) {
            self.projectiles.push(projectile);
        } else {
            log::debug!("Projectile {:?} spawned touching the hero; discarded", id);
            engine.destroy(id);
        }
        Ok(())
    }

    fn update_entities<E: Engine + ?Sized>(&mut self, engine: &mut E, dt_us: u64) -> GameResult<()> {
        let animations = &self.content.animations;
        self.hero
            .update(body_of(engine, self.hero.body)?, dt_us, animations);

        self.crawlers.retain_mut(|crawler| {
            if let Some(body) = engine.body_mut(crawler.body) {
                crawler.update(body);
            }
            let removed = crawler.advance(dt_us, animations);
            if removed {
                engine.destroy(crawler.body);
            }
            !removed
        });

        self.projectiles.retain_mut(|projectile| {
            let in_camera = engine.in_camera(projectile.body);
            let Some(body) = engine.body_mut(projectile.body) else {
                return false;
            };
            projectile.update(body, in_camera);
            if !projectile.is_alive() {
                engine.destroy(projectile.body);
            }
            projectile.is_alive()
        });
        Ok(())
    }
}

fn enter_level<E: Engine + ?Sized>(
    engine: &mut E,
    content: &GameContent,
    level_index: usize,
) -> GameResult<(LevelSession, Hero, Vec<Crawler>)> {
    let level = content.levels.get(level_index)?;
    engine.clear();
    let spawned = spawn_level(engine, level, &content.assets, content.gravity)?;
    let crawlers: Vec<Crawler> = spawned
        .crawlers
        .iter()
        .map(|&(id, kind)| Crawler::new(id, kind))
        .collect();
    let session = LevelSession::new(level_index, crawlers.len());
    log::info!(
        "Started {} with {} crawlers",
        level_key(level_index),
        session.enemy_count
    );
    log::debug!(
        "Spawned {} platforms and {} enemy walls",
        spawned.platforms.len(),
        spawned.enemy_walls.len()
    );
    Ok((session, Hero::new(spawned.hero), crawlers))
}

fn body_of<E: Engine + ?Sized>(engine: &mut E, id: BodyId) -> GameResult<&mut Body> {
    engine
        .body_mut(id)
        .ok_or_else(|| GameError::Invariant(format!("body {id:?} is not in the engine")))
}
