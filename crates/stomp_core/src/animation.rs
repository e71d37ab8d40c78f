//! Spritesheet animation clips and deterministic playback.
//!
//! A clip is a list of spritesheet frame indices played at a fixed frame rate,
//! either looping or once. Playback time is kept in integer microseconds so
//! stepping the same clip with the same fixed dt always lands on the same
//! frame.
//!
//! The JSON format stores `fps` per clip; on load it becomes a per-frame
//! `duration_us`.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Frame rate used when a clip does not declare one.
pub const DEFAULT_FPS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationFrame {
    pub frame: u32,
    pub duration_us: u64,
}

#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub frames: Vec<AnimationFrame>,
    pub looping: bool,
}

impl AnimationClip {
    /// Build a clip that shows each of `frames` for `1 / fps` seconds.
    pub fn from_frame_rate(frames: &[u32], fps: u32, looping: bool) -> Self {
        let duration_us = 1_000_000 / u64::from(fps.max(1));
        Self {
            frames: frames
                .iter()
                .map(|&frame| AnimationFrame { frame, duration_us })
                .collect(),
            looping,
        }
    }

    pub fn total_duration_us(&self) -> u64 {
        self.frames.iter().map(|f| f.duration_us).sum()
    }
}

#[derive(Debug, Clone)]
pub struct AnimationFile {
    pub version: String,
    pub animation_id: String,
    pub animations: HashMap<String, AnimationClip>,
}

/// Playback position inside one clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationState {
    pub source_id: String,
    pub clip_name: String,
    pub frame_index: usize,
    pub elapsed_us: u64,
    pub finished: bool,
}

impl AnimationState {
    pub fn new(source_id: &str, clip_name: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            clip_name: clip_name.to_string(),
            frame_index: 0,
            elapsed_us: 0,
            finished: false,
        }
    }

    pub fn is_playing(&self, clip_name: &str) -> bool {
        self.clip_name == clip_name
    }

    /// Advance by `dt_us` and return the spritesheet frame now showing.
    pub fn tick(&mut self, dt_us: u64, clip: &AnimationClip) -> u32 {
        if clip.frames.is_empty() {
            self.finished = true;
            return 0;
        }
        if self.finished {
            return self.current_frame(clip);
        }

        self.elapsed_us += dt_us;

        loop {
            let duration = clip.frames[self.frame_index].duration_us;
            if self.elapsed_us < duration {
                break;
            }

            self.elapsed_us -= duration;
            self.frame_index += 1;

            if self.frame_index >= clip.frames.len() {
                if clip.looping {
                    self.frame_index = 0;
                } else {
                    self.frame_index = clip.frames.len() - 1;
                    self.elapsed_us = 0;
                    self.finished = true;
                    break;
                }
            }
        }

        clip.frames[self.frame_index].frame
    }

    pub fn current_frame(&self, clip: &AnimationClip) -> u32 {
        clip.frames
            .get(self.frame_index)
            .or_else(|| clip.frames.last())
            .map_or(0, |f| f.frame)
    }
}

#[derive(Debug, Deserialize)]
struct AnimationFileJson {
    version: String,
    animation_id: String,
    animations: HashMap<String, AnimationClipJson>,
}

#[derive(Debug, Deserialize)]
struct AnimationClipJson {
    frames: Vec<u32>,
    #[serde(default = "default_fps")]
    fps: u32,
    #[serde(default)]
    looping: bool,
}

/// Load a spritesheet animation definition file from disk.
pub fn load_animation_file(path: &Path) -> Result<AnimationFile, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read animation file {}: {e}", path.display()))?;
    let json: AnimationFileJson = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse animation file {}: {e}", path.display()))?;
    validate_animation_json(&json)?;

    let animations = json
        .animations
        .into_iter()
        .map(|(name, clip)| {
            let clip = AnimationClip::from_frame_rate(&clip.frames, clip.fps, clip.looping);
            (name, clip)
        })
        .collect();

    Ok(AnimationFile {
        version: json.version,
        animation_id: json.animation_id,
        animations,
    })
}

fn validate_animation_json(json: &AnimationFileJson) -> Result<(), String> {
    if json.version != "0.1" {
        return Err(format!(
            "Animation validation failed: unsupported version '{}'",
            json.version
        ));
    }
    if json.animation_id.is_empty() {
        return Err("Animation validation failed: animation_id is empty".to_string());
    }
    for (name, clip) in &json.animations {
        if clip.frames.is_empty() {
            return Err(format!(
                "Animation validation failed: clip '{name}' has no frames"
            ));
        }
        if clip.fps == 0 {
            return Err(format!(
                "Animation validation failed: clip '{name}' has zero fps"
            ));
        }
    }
    Ok(())
}

const fn default_fps() -> u32 {
    DEFAULT_FPS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "stomp_anim_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn frame_rate_sets_per_frame_duration() {
        let clip = AnimationClip::from_frame_rate(&[5, 6, 7, 8], 8, true);
        assert_eq!(clip.frames.len(), 4);
        assert_eq!(clip.frames[0].duration_us, 125_000);
        assert_eq!(clip.total_duration_us(), 500_000);
    }

    #[test]
    fn tick_advances_through_frames() {
        let clip = AnimationClip::from_frame_rate(&[5, 6, 7, 8], 10, true);
        let mut state = AnimationState::new("hero", "run");

        assert_eq!(state.tick(0, &clip), 5);
        assert_eq!(state.tick(50_000, &clip), 5);
        assert_eq!(state.tick(60_000, &clip), 6);
    }

    #[test]
    fn looping_wraps_around() {
        let clip = AnimationClip::from_frame_rate(&[0, 1], 10, true);
        let mut state = AnimationState::new("slime", "crawl");

        assert_eq!(state.tick(250_000, &clip), 0);
        assert!(!state.finished);
    }

    #[test]
    fn one_shot_clip_finishes_on_last_frame() {
        let clip = AnimationClip::from_frame_rate(&[0], 12, false);
        let mut state = AnimationState::new("slime", "die");

        state.tick(16_667, &clip);
        assert!(!state.finished);
        for _ in 0..5 {
            state.tick(16_667, &clip);
        }
        assert!(state.finished);
        assert_eq!(state.tick(16_667, &clip), 0);
    }

    #[test]
    fn empty_clip_counts_as_finished() {
        let clip = AnimationClip {
            frames: Vec::new(),
            looping: false,
        };
        let mut state = AnimationState::new("x", "none");
        assert_eq!(state.tick(1, &clip), 0);
        assert!(state.finished);
    }

    #[test]
    fn identical_steps_give_identical_frames() {
        let clip = AnimationClip::from_frame_rate(&[0, 1, 2, 3, 3, 3], 8, true);
        let mut a = AnimationState::new("slime", "crawl");
        let mut b = AnimationState::new("slime", "crawl");
        for _ in 0..200 {
            assert_eq!(a.tick(16_667, &clip), b.tick(16_667, &clip));
        }
        assert_eq!(a, b);
    }

    #[test]
    fn load_animation_file_parses_valid_json() {
        let path = temp_file_path("valid");
        let json = r#"
        {
          "version": "0.1",
          "animation_id": "hero",
          "animations": {
            "stop": { "frames": [4] },
            "run": { "frames": [5, 6, 7, 8], "fps": 8, "looping": true }
          }
        }
        "#;
        fs::write(&path, json).expect("write temp file");

        let file = load_animation_file(&path).expect("should parse");
        assert_eq!(file.animation_id, "hero");
        assert_eq!(file.animations.len(), 2);

        let run = &file.animations["run"];
        assert!(run.looping);
        assert_eq!(run.frames[0].frame, 5);
        assert_eq!(run.frames[0].duration_us, 125_000);

        let stop = &file.animations["stop"];
        assert!(!stop.looping);
        assert_eq!(stop.frames[0].duration_us, 1_000_000 / u64::from(DEFAULT_FPS));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_animation_file_rejects_zero_fps() {
        let path = temp_file_path("zero_fps");
        let json = r#"
        {
          "version": "0.1",
          "animation_id": "slime",
          "animations": { "die": { "frames": [0], "fps": 0 } }
        }
        "#;
        fs::write(&path, json).expect("write temp file");
        let err = load_animation_file(&path).expect_err("zero fps should fail");
        assert!(err.contains("zero fps"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_animation_file_rejects_empty_clip() {
        let path = temp_file_path("empty_clip");
        let json = r#"
        {
          "version": "0.1",
          "animation_id": "slime",
          "animations": { "crawl": { "frames": [] } }
        }
        "#;
        fs::write(&path, json).expect("write temp file");
        let err = load_animation_file(&path).expect_err("empty clip should fail");
        assert!(err.contains("has no frames"));
        let _ = fs::remove_file(path);
    }
}
