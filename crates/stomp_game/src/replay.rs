//! Scripted input sequences for deterministic play tests.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::play::InputSnapshot;

#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySequence {
    #[serde(default = "default_dt")]
    pub fixed_dt: f32,
    pub frames: Vec<ReplayFrame>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayFrame {
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub jump: bool,
    #[serde(default)]
    pub fire_left: bool,
    #[serde(default)]
    pub fire_right: bool,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

impl ReplaySequence {
    /// One snapshot per fixed step. A repeated jump frame only jumps on its
    /// first step, like a held key.
    pub fn expanded_inputs(&self) -> Vec<InputSnapshot> {
        let mut out = Vec::new();
        for frame in &self.frames {
            for i in 0..frame.repeat.max(1) {
                out.push(InputSnapshot {
                    move_left: frame.left,
                    move_right: frame.right,
                    jump: frame.jump && i == 0,
                    fire_left: frame.fire_left,
                    fire_right: frame.fire_right,
                });
            }
        }
        out
    }

    pub fn dt_us(&self) -> u64 {
        (f64::from(self.fixed_dt) * 1_000_000.0).round() as u64
    }
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplaySequence, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let replay: ReplaySequence = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse replay JSON {}: {e}", path.display()))?;
    validate_replay(&replay)?;
    Ok(replay)
}

fn validate_replay(replay: &ReplaySequence) -> Result<(), String> {
    if replay.fixed_dt <= 0.0 {
        return Err("Replay validation failed: fixed_dt must be > 0".to_string());
    }
    if replay.frames.is_empty() {
        return Err("Replay validation failed: frames list is empty".to_string());
    }
    Ok(())
}

const fn default_dt() -> f32 {
    1.0 / 60.0
}

const fn default_repeat() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arcade::ArcadeWorld;
    use crate::engine::Engine;
    use crate::play::tests::content;
    use crate::play::{PlayPhase, PlayState};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "stomp_replay_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    const PATROL_LEVEL: &str = r#"
    {
      "platforms": [ { "x": 0, "y": 550, "image": "ground" } ],
      "hero": { "x": 100, "y": 526 },
      "slimes": [ { "x": 300, "y": 531 } ]
    }
    "#;

    struct RunResult {
        phases: Vec<PlayPhase>,
        hero_center: (f32, f32),
    }

    fn run(replay: &ReplaySequence) -> RunResult {
        let mut world = ArcadeWorld::new(800.0, 600.0);
        let mut play = PlayState::start(&mut world, content(&[PATROL_LEVEL]), 0).expect("start");
        let mut phases = Vec::new();
        for input in replay.expanded_inputs() {
            world.step(replay.fixed_dt);
            let phase = play
                .update(&mut world, &input, replay.dt_us())
                .expect("update");
            phases.push(phase);
            if phase != PlayPhase::Running {
                break;
            }
        }
        let hero_center = world
            .body(play.hero().body)
            .expect("hero body")
            .center();
        RunResult {
            phases,
            hero_center,
        }
    }

    #[test]
    fn replay_file_parses_and_expands() {
        let path = temp_file_path("parse");
        fs::write(
            &path,
            r#"{
              "fixed_dt": 0.016666667,
              "frames": [
                { "right": true, "repeat": 3 },
                { "jump": true, "repeat": 2 },
                { "fire_left": true }
              ]
            }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        assert_eq!(replay.dt_us(), 16_667);
        let expanded = replay.expanded_inputs();
        assert_eq!(expanded.len(), 6);
        assert!(expanded[0].move_right);
        assert!(expanded[3].jump);
        assert!(!expanded[4].jump);
        assert!(expanded[5].fire_left);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn empty_replay_is_rejected() {
        let path = temp_file_path("empty");
        fs::write(&path, r#"{ "frames": [] }"#).expect("write replay file");
        let err = load_replay_from_path(&path).expect_err("empty replay should fail");
        assert!(err.contains("frames list is empty"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn walking_into_a_slime_on_the_ground_defeats_the_hero() {
        let replay: ReplaySequence = serde_json::from_str(
            r#"{ "frames": [ { "repeat": 10 }, { "right": true, "repeat": 240 } ] }"#,
        )
        .expect("parse replay");

        let result = run(&replay);
        assert_eq!(result.phases.last(), Some(&PlayPhase::Defeated { level: 0 }));
        assert!(result.phases.len() < 250);
    }

    #[test]
    fn replay_run_is_deterministic() {
        let replay: ReplaySequence = serde_json::from_str(
            r#"{
              "frames": [
                { "repeat": 20 },
                { "right": true, "jump": true, "repeat": 30 },
                { "fire_right": true, "repeat": 5 },
                { "left": true, "repeat": 45 },
                { "jump": true, "repeat": 40 }
              ]
            }"#,
        )
        .expect("parse replay");

        let a = run(&replay);
        let b = run(&replay);
        assert_eq!(a.phases, b.phases);
        assert_eq!(a.hero_center, b.hero_center);
    }
}
