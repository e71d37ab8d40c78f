//! The capability interface gameplay code is written against.
//!
//! Rules and the play orchestrator never integrate motion or detect contacts
//! themselves. They spawn bodies, read and write velocities, and ask the
//! engine for collide/overlap results. `arcade::ArcadeWorld` is the
//! implementation the game ships with.
//!
//! Coordinates are y-down: gravity is positive, a negative vertical velocity
//! moves a body up the screen.

/// Handle to a body owned by the engine. Handles are never reused within one
/// engine instance, so a stale handle simply resolves to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u32);

/// Collision groups queried by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyGroup {
    Background,
    Platforms,
    EnemyWalls,
    Hero,
    Crawlers,
    Projectiles,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub center_x: f32,
    pub center_y: f32,
    pub half_w: f32,
    pub half_h: f32,
}

impl Aabb {
    /// Box of `size` whose `anchor` point (0..1 on each axis, from the top-left)
    /// sits at `(x, y)`.
    pub fn anchored(x: f32, y: f32, size: (f32, f32), anchor: (f32, f32)) -> Self {
        let (width, height) = size;
        let left = x - anchor.0 * width;
        let top = y - anchor.1 * height;
        Self {
            center_x: left + width * 0.5,
            center_y: top + height * 0.5,
            half_w: width * 0.5,
            half_h: height * 0.5,
        }
    }

    pub fn left(&self) -> f32 {
        self.center_x - self.half_w
    }

    pub fn right(&self) -> f32 {
        self.center_x + self.half_w
    }

    pub fn top(&self) -> f32 {
        self.center_y - self.half_h
    }

    pub fn bottom(&self) -> f32 {
        self.center_y + self.half_h
    }

    pub fn width(&self) -> f32 {
        self.half_w * 2.0
    }

    pub fn height(&self) -> f32 {
        self.half_h * 2.0
    }

    /// Strict intersection: boxes that only share an edge do not overlap.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }
}

/// Which sides of a body were in contact during the last step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Contacts {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

/// Spawn request for the entity factory.
#[derive(Debug, Clone)]
pub struct BodyDesc {
    pub group: BodyGroup,
    pub texture: String,
    pub x: f32,
    pub y: f32,
    pub size: (f32, f32),
    pub anchor: (f32, f32),
    pub allow_gravity: bool,
    pub immovable: bool,
    pub collide_world_bounds: bool,
    pub visible: bool,
}

impl BodyDesc {
    pub fn new(group: BodyGroup, texture: &str, x: f32, y: f32, size: (f32, f32)) -> Self {
        Self {
            group,
            texture: texture.to_string(),
            x,
            y,
            size,
            anchor: (0.0, 0.0),
            allow_gravity: true,
            immovable: false,
            collide_world_bounds: false,
            visible: true,
        }
    }

    pub fn with_anchor(mut self, anchor_x: f32, anchor_y: f32) -> Self {
        self.anchor = (anchor_x, anchor_y);
        self
    }

    /// Gravity-free and immovable: platforms, walls, scenery.
    pub fn fixed(mut self) -> Self {
        self.allow_gravity = false;
        self.immovable = true;
        self
    }

    pub fn bounded(mut self) -> Self {
        self.collide_world_bounds = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Body {
    pub id: BodyId,
    pub group: BodyGroup,
    pub texture: String,
    pub aabb: Aabb,
    /// Box at the start of the current step, before integration.
    pub previous: Aabb,
    pub velocity_x: f32,
    pub velocity_y: f32,
    pub allow_gravity: bool,
    pub immovable: bool,
    pub collide_world_bounds: bool,
    pub visible: bool,
    /// Disabled bodies neither move nor take part in collide/overlap queries.
    pub enabled: bool,
    /// Contacts with other bodies reported by collide passes this step.
    pub touching: Contacts,
    /// Contacts with the world bounds this step.
    pub blocked: Contacts,
}

impl Body {
    pub fn from_desc(id: BodyId, desc: BodyDesc) -> Self {
        let aabb = Aabb::anchored(desc.x, desc.y, desc.size, desc.anchor);
        Self {
            id,
            group: desc.group,
            texture: desc.texture,
            aabb,
            previous: aabb,
            velocity_x: 0.0,
            velocity_y: 0.0,
            allow_gravity: desc.allow_gravity,
            immovable: desc.immovable,
            collide_world_bounds: desc.collide_world_bounds,
            visible: desc.visible,
            enabled: true,
            touching: Contacts::default(),
            blocked: Contacts::default(),
        }
    }

    /// Standing on something solid, per the last collide pass.
    pub fn grounded(&self) -> bool {
        self.touching.down
    }

    pub fn center(&self) -> (f32, f32) {
        (self.aabb.center_x, self.aabb.center_y)
    }
}

pub trait Engine {
    /// Create a body from `desc` and return its handle.
    fn spawn(&mut self, desc: BodyDesc) -> BodyId;

    /// Remove a body from simulation and rendering. Unknown ids are ignored.
    fn destroy(&mut self, id: BodyId);

    fn body(&self, id: BodyId) -> Option<&Body>;

    fn body_mut(&mut self, id: BodyId) -> Option<&mut Body>;

    fn set_gravity(&mut self, gravity: f32);

    /// Integrate one physics step: gravity, velocity, world bounds. Clears the
    /// contact flags of the previous step.
    fn step(&mut self, dt: f32);

    /// Separate overlapping bodies of the two groups and record contact sides.
    fn collide(&mut self, a: BodyGroup, b: BodyGroup);

    /// Overlapping `(a, b)` pairs without separating them.
    fn overlaps(&self, a: BodyGroup, b: BodyGroup) -> Vec<(BodyId, BodyId)>;

    /// Whether a collide pass this step reported contact between `a` and `b`.
    /// Overlap alone does not count: a body spawned since the last collide
    /// pass touches nothing.
    fn touching(&self, a: BodyId, b: BodyId) -> bool;

    /// Whether any part of the body is inside the camera view.
    fn in_camera(&self, id: BodyId) -> bool;

    /// Fire-and-forget sound playback by asset id.
    fn play_sound(&mut self, sound: &str);

    /// Remove every body and reset gravity, ready for a fresh level.
    fn clear(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchored_box_places_anchor_point_at_position() {
        let centered = Aabb::anchored(100.0, 50.0, (32.0, 48.0), (0.5, 0.5));
        assert_eq!(centered.center_x, 100.0);
        assert_eq!(centered.center_y, 50.0);

        let bottom_right = Aabb::anchored(100.0, 50.0, (4.0, 40.0), (1.0, 1.0));
        assert_eq!(bottom_right.right(), 100.0);
        assert_eq!(bottom_right.bottom(), 50.0);
        assert_eq!(bottom_right.left(), 96.0);
        assert_eq!(bottom_right.top(), 10.0);
    }

    #[test]
    fn touching_edges_do_not_intersect() {
        let a = Aabb::anchored(0.0, 0.0, (10.0, 10.0), (0.0, 0.0));
        let b = Aabb::anchored(10.0, 0.0, (10.0, 10.0), (0.0, 0.0));
        let c = Aabb::anchored(9.0, 9.0, (10.0, 10.0), (0.0, 0.0));
        assert!(!a.intersects(&b));
        assert!(a.intersects(&c));
    }
}
