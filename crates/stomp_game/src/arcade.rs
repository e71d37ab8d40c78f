//! Arcade physics: the `Engine` implementation the game runs on.
//!
//! Bodies are axis-aligned boxes. `step` integrates gravity and velocity and
//! clamps bounded bodies to the world; `collide` separates overlapping pairs
//! and records which sides touched; `overlaps` only reports intersections.
//!
//! Separation picks the contact side from where the two boxes were at the
//! start of the step: a body that was above the other lands on it, one that
//! was beside it is pushed back sideways. Vertical contact is tested first so
//! a hero running across two adjacent platforms never snags on the seam.

use std::collections::{BTreeMap, HashSet};

use crate::engine::{Aabb, Body, BodyDesc, BodyGroup, BodyId, Contacts, Engine};

/// Slack when comparing previous edges, absorbing float error from the last
/// separation.
const CONTACT_BIAS: f32 = 0.5;

pub struct ArcadeWorld {
    bodies: BTreeMap<BodyId, Body>,
    next_id: u32,
    gravity: f32,
    bounds: Aabb,
    camera: Aabb,
    contacts: HashSet<(BodyId, BodyId)>,
    sounds: Vec<String>,
}

impl ArcadeWorld {
    /// World and camera both cover `(0, 0)..(width, height)`.
    pub fn new(width: f32, height: f32) -> Self {
        let bounds = Aabb::anchored(0.0, 0.0, (width, height), (0.0, 0.0));
        Self {
            bodies: BTreeMap::new(),
            next_id: 0,
            gravity: 0.0,
            bounds,
            camera: bounds,
            contacts: HashSet::new(),
            sounds: Vec::new(),
        }
    }

    #[allow(dead_code)]
    pub fn gravity(&self) -> f32 {
        self.gravity
    }

    /// Bodies in spawn order.
    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.bodies.values()
    }

    #[allow(dead_code)]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Sounds requested since the last drain, oldest first.
    pub fn drain_sounds(&mut self) -> Vec<String> {
        std::mem::take(&mut self.sounds)
    }

    fn group_ids(&self, group: BodyGroup) -> Vec<BodyId> {
        self.bodies
            .values()
            .filter(|b| b.group == group && b.enabled)
            .map(|b| b.id)
            .collect()
    }

    fn separate(&mut self, a_id: BodyId, b_id: BodyId) {
        let (Some(a), Some(b)) = (self.bodies.get(&a_id), self.bodies.get(&b_id)) else {
            return;
        };
        if !a.enabled || !b.enabled || !a.aabb.intersects(&b.aabb) {
            return;
        }
        if a.immovable && b.immovable {
            return;
        }

        let mut ma = Motion::of(a);
        let mut mb = Motion::of(b);
        let side = contact_side(&ma, &mb);
        resolve(&mut ma, &mut mb, side);

        if let Some(a) = self.bodies.get_mut(&a_id) {
            ma.write_back(a);
            mark_contact(&mut a.touching, side);
        }
        if let Some(b) = self.bodies.get_mut(&b_id) {
            mb.write_back(b);
            mark_contact(&mut b.touching, side.opposite());
        }
        self.contacts.insert(contact_key(a_id, b_id));
    }
}

impl Engine for ArcadeWorld {
    fn spawn(&mut self, desc: BodyDesc) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        self.bodies.insert(id, Body::from_desc(id, desc));
        id
    }

    fn destroy(&mut self, id: BodyId) {
        self.bodies.remove(&id);
    }

    fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(&id)
    }

    fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.get_mut(&id)
    }

    fn set_gravity(&mut self, gravity: f32) {
        self.gravity = gravity;
    }

    fn step(&mut self, dt: f32) {
        self.contacts.clear();
        let gravity = self.gravity;
        let bounds = self.bounds;

        for body in self.bodies.values_mut() {
            body.touching = Contacts::default();
            body.blocked = Contacts::default();
            body.previous = body.aabb;
            if !body.enabled {
                continue;
            }

            if body.allow_gravity && !body.immovable {
                body.velocity_y += gravity * dt;
            }
            body.aabb.center_x += body.velocity_x * dt;
            body.aabb.center_y += body.velocity_y * dt;

            if body.collide_world_bounds {
                clamp_to_bounds(body, &bounds);
            }
        }
    }

    fn collide(&mut self, a: BodyGroup, b: BodyGroup) {
        let a_ids = self.group_ids(a);
        let b_ids = self.group_ids(b);
        for &a_id in &a_ids {
            for &b_id in &b_ids {
                if a_id != b_id {
                    self.separate(a_id, b_id);
                }
            }
        }
    }

    fn overlaps(&self, a: BodyGroup, b: BodyGroup) -> Vec<(BodyId, BodyId)> {
        let mut pairs = Vec::new();
        for body_a in self.bodies.values().filter(|x| x.group == a && x.enabled) {
            for body_b in self.bodies.values().filter(|x| x.group == b && x.enabled) {
                if body_a.id != body_b.id && body_a.aabb.intersects(&body_b.aabb) {
                    pairs.push((body_a.id, body_b.id));
                }
            }
        }
        pairs
    }

    fn touching(&self, a: BodyId, b: BodyId) -> bool {
        self.contacts.contains(&contact_key(a, b))
    }

    fn in_camera(&self, id: BodyId) -> bool {
        self.bodies
            .get(&id)
            .is_some_and(|b| b.aabb.intersects(&self.camera))
    }

    fn play_sound(&mut self, sound: &str) {
        self.sounds.push(sound.to_string());
    }

    fn clear(&mut self) {
        self.bodies.clear();
        self.contacts.clear();
        self.gravity = 0.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
    Up,
    Down,
}

impl Side {
    fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

/// The physics fields separation reads and writes, copied out of the map so
/// both bodies can be mutated at once.
#[derive(Debug, Clone, Copy)]
struct Motion {
    aabb: Aabb,
    previous: Aabb,
    velocity_x: f32,
    velocity_y: f32,
    immovable: bool,
}

impl Motion {
    fn of(body: &Body) -> Self {
        Self {
            aabb: body.aabb,
            previous: body.previous,
            velocity_x: body.velocity_x,
            velocity_y: body.velocity_y,
            immovable: body.immovable,
        }
    }

    fn write_back(&self, body: &mut Body) {
        body.aabb = self.aabb;
        body.velocity_x = self.velocity_x;
        body.velocity_y = self.velocity_y;
    }
}

/// Side of `a` that ran into `b`.
fn contact_side(a: &Motion, b: &Motion) -> Side {
    let (pa, pb) = (&a.previous, &b.previous);
    if pa.bottom() <= pb.top() + CONTACT_BIAS {
        return Side::Down;
    }
    if pa.top() >= pb.bottom() - CONTACT_BIAS {
        return Side::Up;
    }
    if pa.right() <= pb.left() + CONTACT_BIAS {
        return Side::Right;
    }
    if pa.left() >= pb.right() - CONTACT_BIAS {
        return Side::Left;
    }

    // Already interpenetrating at the start of the step: take the shallow axis.
    let (ca, cb) = (&a.aabb, &b.aabb);
    let pen_x = (ca.right() - cb.left()).min(cb.right() - ca.left());
    let pen_y = (ca.bottom() - cb.top()).min(cb.bottom() - ca.top());
    if pen_y <= pen_x {
        if ca.center_y < cb.center_y {
            Side::Down
        } else {
            Side::Up
        }
    } else if ca.center_x < cb.center_x {
        Side::Right
    } else {
        Side::Left
    }
}

fn resolve(a: &mut Motion, b: &mut Motion, side: Side) {
    // Distance `a` must travel along +axis (negative = toward -axis).
    let (push, vertical) = match side {
        Side::Down => (b.aabb.top() - a.aabb.bottom(), true),
        Side::Up => (b.aabb.bottom() - a.aabb.top(), true),
        Side::Right => (b.aabb.left() - a.aabb.right(), false),
        Side::Left => (b.aabb.right() - a.aabb.left(), false),
    };

    let (share_a, share_b) = match (a.immovable, b.immovable) {
        (false, true) => (1.0, 0.0),
        (true, false) => (0.0, 1.0),
        _ => (0.5, 0.5),
    };

    if vertical {
        a.aabb.center_y += push * share_a;
        b.aabb.center_y -= push * share_b;
        let settled = settle(a.velocity_y, b.velocity_y, a.immovable, b.immovable);
        a.velocity_y = settled.0;
        b.velocity_y = settled.1;
    } else {
        a.aabb.center_x += push * share_a;
        b.aabb.center_x -= push * share_b;
        let settled = settle(a.velocity_x, b.velocity_x, a.immovable, b.immovable);
        a.velocity_x = settled.0;
        b.velocity_x = settled.1;
    }
}

/// Post-contact velocities along the contact axis (no bounce): a movable body
/// takes an immovable body's velocity, two movable bodies share their average.
fn settle(va: f32, vb: f32, a_immovable: bool, b_immovable: bool) -> (f32, f32) {
    match (a_immovable, b_immovable) {
        (false, true) => (vb, vb),
        (true, false) => (va, va),
        _ => {
            let average = (va + vb) * 0.5;
            (average, average)
        }
    }
}

fn mark_contact(contacts: &mut Contacts, side: Side) {
    match side {
        Side::Left => contacts.left = true,
        Side::Right => contacts.right = true,
        Side::Up => contacts.up = true,
        Side::Down => contacts.down = true,
    }
}

fn contact_key(a: BodyId, b: BodyId) -> (BodyId, BodyId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn clamp_to_bounds(body: &mut Body, bounds: &Aabb) {
    let aabb = &mut body.aabb;
    if aabb.left() < bounds.left() {
        aabb.center_x = bounds.left() + aabb.half_w;
        body.blocked.left = true;
        body.velocity_x = body.velocity_x.max(0.0);
    } else if aabb.right() > bounds.right() {
        aabb.center_x = bounds.right() - aabb.half_w;
        body.blocked.right = true;
        body.velocity_x = body.velocity_x.min(0.0);
    }
    if aabb.top() < bounds.top() {
        aabb.center_y = bounds.top() + aabb.half_h;
        body.blocked.up = true;
        body.velocity_y = body.velocity_y.max(0.0);
    } else if aabb.bottom() > bounds.bottom() {
        aabb.center_y = bounds.bottom() - aabb.half_h;
        body.blocked.down = true;
        body.velocity_y = body.velocity_y.min(0.0);
    }
}
