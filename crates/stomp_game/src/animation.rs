//! Registry of spritesheet animations, one animation file per sheet.
//!
//! Wraps `stomp_core::animation` loading and cross-checks every clip against
//! the asset manifest: the file's `animation_id` must name a registered
//! spritesheet and every frame index must exist in that sheet.

use std::collections::HashMap;
use std::path::Path;

use stomp_core::animation::{load_animation_file, AnimationClip, AnimationFile};

use crate::assets::AssetRegistry;
use crate::error::{GameError, GameResult};

/// animation_id (spritesheet id) -> clip name -> clip
#[derive(Debug, Default)]
pub struct AnimationRegistry {
    clips: HashMap<String, HashMap<String, AnimationClip>>,
}

impl AnimationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_file(&mut self, file: AnimationFile) {
        self.clips.insert(file.animation_id, file.animations);
    }

    pub fn resolve_clip(&self, source: &str, name: &str) -> Option<&AnimationClip> {
        self.clips.get(source).and_then(|clips| clips.get(name))
    }

    /// Fail unless `source` defines every clip in `names`.
    pub fn require_clips(&self, source: &str, names: &[&str]) -> GameResult<()> {
        for name in names {
            if self.resolve_clip(source, name).is_none() {
                return Err(GameError::AssetLoad {
                    id: source.to_string(),
                    reason: format!("missing animation clip '{name}'"),
                });
            }
        }
        Ok(())
    }

    pub fn validate_frames(&self, assets: &AssetRegistry) -> GameResult<()> {
        for (source, clips) in &self.clips {
            let sheet = assets.spritesheet(source).ok_or_else(|| GameError::AssetLoad {
                id: source.clone(),
                reason: "animations target an unregistered spritesheet".to_string(),
            })?;
            for (clip_name, clip) in clips {
                if let Some(bad) = clip.frames.iter().find(|f| f.frame >= sheet.frame_count) {
                    return Err(GameError::AssetLoad {
                        id: source.clone(),
                        reason: format!(
                            "clip '{clip_name}' references frame {} but the sheet has {} frames",
                            bad.frame, sheet.frame_count
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Load the animation file of every spritesheet that declares one.
pub fn load_animations(assets: &AssetRegistry) -> GameResult<AnimationRegistry> {
    let mut registry = AnimationRegistry::new();
    for (sheet_id, sheet) in assets.spritesheets() {
        let Some(path) = &sheet.animations else {
            continue;
        };
        let file = load_animation_file(Path::new(path)).map_err(|reason| GameError::AssetLoad {
            id: sheet_id.clone(),
            reason,
        })?;
        if file.animation_id != *sheet_id {
            return Err(GameError::AssetLoad {
                id: sheet_id.clone(),
                reason: format!(
                    "animation file {path} declares animation_id '{}'",
                    file.animation_id
                ),
            });
        }
        log::debug!(
            "Loaded {} animations for '{}' from {}",
            file.animations.len(),
            sheet_id,
            path
        );
        registry.insert_file(file);
    }
    registry.validate_frames(assets)?;
    Ok(registry)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::assets::tests::sample_assets;

    fn clip(name: &str, frames: &[u32], fps: u32, looping: bool) -> (String, AnimationClip) {
        (
            name.to_string(),
            AnimationClip::from_frame_rate(frames, fps, looping),
        )
    }

    fn file(animation_id: &str, clips: Vec<(String, AnimationClip)>) -> AnimationFile {
        AnimationFile {
            version: "0.1".to_string(),
            animation_id: animation_id.to_string(),
            animations: clips.into_iter().collect(),
        }
    }

    /// Hero and crawler clips as shipped in `assets/animations`.
    pub(crate) fn sample_animations() -> AnimationRegistry {
        let mut registry = AnimationRegistry::new();
        registry.insert_file(file(
            "hero",
            vec![
                clip("stop", &[4], 60, false),
                clip("run", &[5, 6, 7, 8], 8, true),
                clip("jump", &[8], 60, false),
                clip("fall", &[4], 60, false),
            ],
        ));
        for crawler in ["slime", "spider"] {
            registry.insert_file(file(
                crawler,
                vec![
                    clip("crawl", &[0, 1, 2, 3, 3, 3], 8, true),
                    clip("die", &[0], 12, false),
                ],
            ));
        }
        registry
    }

    #[test]
    fn resolve_clip_is_scoped_to_the_sheet() {
        let registry = sample_animations();
        assert!(registry.resolve_clip("hero", "run").is_some());
        assert!(registry.resolve_clip("slime", "run").is_none());
        assert!(registry.resolve_clip("ghost", "crawl").is_none());
    }

    #[test]
    fn require_clips_reports_the_missing_clip() {
        let registry = sample_animations();
        registry
            .require_clips("hero", &["stop", "run", "jump", "fall"])
            .expect("hero has every clip");
        let err = registry
            .require_clips("slime", &["crawl", "explode"])
            .expect_err("slime has no explode clip");
        assert!(err.to_string().contains("explode"));
    }

    #[test]
    fn validate_frames_accepts_sample_set() {
        sample_animations()
            .validate_frames(&sample_assets())
            .expect("sample frames fit their sheets");
    }

    #[test]
    fn validate_frames_rejects_out_of_range_frame() {
        let mut registry = AnimationRegistry::new();
        registry.insert_file(file("slime", vec![clip("crawl", &[0, 9], 8, true)]));
        let err = registry
            .validate_frames(&sample_assets())
            .expect_err("frame 9 is outside a 4-frame sheet");
        assert!(err.to_string().contains("frame 9"));
    }

    #[test]
    fn validate_frames_rejects_unknown_sheet() {
        let mut registry = AnimationRegistry::new();
        registry.insert_file(file("bat", vec![clip("fly", &[0], 8, true)]));
        assert!(registry.validate_frames(&sample_assets()).is_err());
    }
}
