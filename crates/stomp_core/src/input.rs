//! Keyboard state with level-triggered and edge-triggered queries.
//!
//! - **Held:** `is_held(key)` is true every step the key is physically down.
//!   Walking and firing read this.
//!
//! - **Just pressed / just released:** true only until `end_frame()`, which the
//!   main loop calls once at least one fixed step has consumed them. A press
//!   landing on a frame with zero simulation steps is therefore not lost.
//!   Jumping reads `is_just_pressed`, so holding the jump key jumps once.

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    A,
    D,
    W,
    Left,
    Right,
    Escape,
}

#[derive(Debug, Default)]
pub struct InputState {
    held: HashSet<Key>,
    just_pressed: HashSet<Key>,
    just_released: HashSet<Key>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&mut self, key: Key) {
        // OS key repeat sends extra presses; only the first one is an edge.
        if self.held.insert(key) {
            self.just_pressed.insert(key);
        }
    }

    pub fn key_up(&mut self, key: Key) {
        if self.held.remove(&key) {
            self.just_released.insert(key);
        }
    }

    /// Drop every held key, e.g. when the window loses focus and the matching
    /// key-up events will never arrive.
    pub fn release_all(&mut self) {
        for key in self.held.drain() {
            self.just_released.insert(key);
        }
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn is_just_pressed(&self, key: Key) -> bool {
        self.just_pressed.contains(&key)
    }

    pub fn is_just_released(&self, key: Key) -> bool {
        self.just_released.contains(&key)
    }

    pub fn end_frame(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }
}
