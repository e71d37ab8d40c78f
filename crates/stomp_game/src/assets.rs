//! Asset manifest: every image, spritesheet and sound the game may reference,
//! keyed by string id.
//!
//! Sizes are declared in the manifest rather than read from the image files,
//! so level layout (platform widths, enemy wall placement) is known before
//! any texture is touched. Ids are unique across all three kinds; level
//! documents and gameplay code refer to assets only by id.

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use crate::error::{GameError, GameResult};

#[derive(Debug, Deserialize, Clone)]
pub struct AssetManifest {
    pub version: String,
    #[serde(default)]
    pub images: BTreeMap<String, ImageAsset>,
    #[serde(default)]
    pub spritesheets: BTreeMap<String, SpritesheetAsset>,
    #[serde(default)]
    pub audio: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImageAsset {
    pub path: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SpritesheetAsset {
    pub path: String,
    pub frame_width: u32,
    pub frame_height: u32,
    pub frame_count: u32,
    /// Animation definition file for this sheet, if it animates.
    #[serde(default)]
    pub animations: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AssetRegistry {
    images: BTreeMap<String, ImageAsset>,
    spritesheets: BTreeMap<String, SpritesheetAsset>,
    audio: BTreeMap<String, String>,
}

impl AssetRegistry {
    pub fn from_manifest(manifest: AssetManifest) -> GameResult<Self> {
        validate_manifest(&manifest)?;
        Ok(Self {
            images: manifest.images,
            spritesheets: manifest.spritesheets,
            audio: manifest.audio,
        })
    }

    pub fn image(&self, id: &str) -> Option<&ImageAsset> {
        self.images.get(id)
    }

    pub fn spritesheet(&self, id: &str) -> Option<&SpritesheetAsset> {
        self.spritesheets.get(id)
    }

    pub fn spritesheets(&self) -> impl Iterator<Item = (&String, &SpritesheetAsset)> {
        self.spritesheets.iter()
    }

    pub fn has_sound(&self, id: &str) -> bool {
        self.audio.contains_key(id)
    }

    pub fn sounds(&self) -> impl Iterator<Item = (&String, &String)> {
        self.audio.iter()
    }

    /// Fail on the first registered file (image, spritesheet, animation or
    /// sound) missing under `root`.
    pub fn verify_files(&self, root: &Path) -> GameResult<()> {
        let images = self.images.iter().map(|(id, image)| (id, &image.path));
        let sheets = self.spritesheets.iter().flat_map(|(id, sheet)| {
            std::iter::once((id, &sheet.path)).chain(sheet.animations.iter().map(move |a| (id, a)))
        });
        for (id, path) in images.chain(sheets).chain(self.audio.iter()) {
            if !root.join(path).is_file() {
                return Err(GameError::AssetLoad {
                    id: id.clone(),
                    reason: format!("file {path} does not exist"),
                });
            }
        }
        Ok(())
    }

    /// Display size of an image, or of one frame of a spritesheet.
    pub fn size_of(&self, id: &str) -> Option<(f32, f32)> {
        if let Some(image) = self.images.get(id) {
            return Some((image.width as f32, image.height as f32));
        }
        self.spritesheets
            .get(id)
            .map(|sheet| (sheet.frame_width as f32, sheet.frame_height as f32))
    }

    pub fn require_size(&self, id: &str) -> GameResult<(f32, f32)> {
        self.size_of(id).ok_or_else(|| GameError::AssetLoad {
            id: id.to_string(),
            reason: "no image or spritesheet registered under this id".to_string(),
        })
    }

    pub fn require_sound(&self, id: &str) -> GameResult<()> {
        if self.has_sound(id) {
            Ok(())
        } else {
            Err(GameError::AssetLoad {
                id: id.to_string(),
                reason: "no sound registered under this id".to_string(),
            })
        }
    }
}

pub fn load_assets_from_path(path: &Path) -> GameResult<AssetRegistry> {
    let manifest_error = |reason: String| GameError::AssetLoad {
        id: path.display().to_string(),
        reason,
    };
    let raw = fs::read_to_string(path)
        .map_err(|e| manifest_error(format!("failed to read manifest: {e}")))?;
    let manifest: AssetManifest = serde_json::from_str(&raw)
        .map_err(|e| manifest_error(format!("failed to parse manifest JSON: {e}")))?;
    let registry = AssetRegistry::from_manifest(manifest)?;
    log::info!(
        "Assets registered from {}: {} images, {} spritesheets, {} sounds",
        path.display(),
        registry.images.len(),
        registry.spritesheets.len(),
        registry.audio.len()
    );
    Ok(registry)
}

fn validate_manifest(manifest: &AssetManifest) -> GameResult<()> {
    let invalid = |id: &str, reason: &str| GameError::AssetLoad {
        id: id.to_string(),
        reason: reason.to_string(),
    };

    if manifest.version != "0.1" {
        return Err(invalid(
            "manifest",
            &format!("unsupported manifest version '{}'", manifest.version),
        ));
    }

    let mut seen = HashSet::new();
    let ids = manifest
        .images
        .keys()
        .chain(manifest.spritesheets.keys())
        .chain(manifest.audio.keys());
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(invalid(id, "id is registered under more than one asset kind"));
        }
    }

    for (id, image) in &manifest.images {
        if image.path.is_empty() {
            return Err(invalid(id, "image path is empty"));
        }
        if image.width == 0 || image.height == 0 {
            return Err(invalid(id, "image width and height must be > 0"));
        }
    }
    for (id, sheet) in &manifest.spritesheets {
        if sheet.path.is_empty() {
            return Err(invalid(id, "spritesheet path is empty"));
        }
        if sheet.frame_width == 0 || sheet.frame_height == 0 {
            return Err(invalid(id, "spritesheet frame size must be > 0"));
        }
        if sheet.frame_count == 0 {
            return Err(invalid(id, "spritesheet frame_count must be > 0"));
        }
    }
    for (id, path) in &manifest.audio {
        if path.is_empty() {
            return Err(invalid(id, "audio path is empty"));
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "stomp_assets_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    pub(crate) const SAMPLE_MANIFEST: &str = r#"
    {
      "version": "0.1",
      "images": {
        "background": { "path": "images/background.png", "width": 800, "height": 600 },
        "ground": { "path": "images/ground.png", "width": 800, "height": 50 },
        "grass:4x1": { "path": "images/grass_4x1.png", "width": 168, "height": 42 },
        "invisible-wall": { "path": "images/invisible_wall.png", "width": 4, "height": 40 }
      },
      "spritesheets": {
        "hero": { "path": "images/dude.png", "frame_width": 32, "frame_height": 48, "frame_count": 9 },
        "slime": { "path": "images/red_slime.png", "frame_width": 32, "frame_height": 38, "frame_count": 4 },
        "spider": { "path": "images/spider.png", "frame_width": 42, "frame_height": 32, "frame_count": 4 },
        "crescent": { "path": "images/crescent.png", "frame_width": 14, "frame_height": 15, "frame_count": 1 }
      },
      "audio": {
        "sfx:jump": "audio/jump.wav",
        "sfx:stomp": "audio/stomp.wav"
      }
    }
    "#;

    pub(crate) fn sample_assets() -> AssetRegistry {
        let manifest: AssetManifest =
            serde_json::from_str(SAMPLE_MANIFEST).expect("sample manifest parses");
        AssetRegistry::from_manifest(manifest).expect("sample manifest is valid")
    }

    #[test]
    fn load_assets_from_path_parses_valid_manifest() {
        let path = temp_file_path("valid");
        fs::write(&path, SAMPLE_MANIFEST).expect("write temp file");

        let assets = load_assets_from_path(&path).expect("valid manifest should load");
        assert_eq!(assets.size_of("grass:4x1"), Some((168.0, 42.0)));
        assert_eq!(assets.size_of("hero"), Some((32.0, 48.0)));
        assert!(assets.has_sound("sfx:stomp"));
        assert!(assets.size_of("sfx:stomp").is_none());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn duplicate_ids_across_kinds_are_rejected() {
        let manifest: AssetManifest = serde_json::from_str(
            r#"{
              "version": "0.1",
              "images": { "hero": { "path": "a.png", "width": 1, "height": 1 } },
              "spritesheets": {
                "hero": { "path": "b.png", "frame_width": 1, "frame_height": 1, "frame_count": 1 }
              }
            }"#,
        )
        .expect("parse");
        let err = AssetRegistry::from_manifest(manifest).expect_err("duplicate id should fail");
        assert!(err.to_string().contains("more than one asset kind"));
    }

    #[test]
    fn zero_sized_frames_are_rejected() {
        let manifest: AssetManifest = serde_json::from_str(
            r#"{
              "version": "0.1",
              "spritesheets": {
                "slime": { "path": "s.png", "frame_width": 0, "frame_height": 38, "frame_count": 4 }
              }
            }"#,
        )
        .expect("parse");
        let err = AssetRegistry::from_manifest(manifest).expect_err("zero frame should fail");
        assert!(matches!(err, GameError::AssetLoad { ref id, .. } if id == "slime"));
    }

    #[test]
    fn missing_manifest_is_an_asset_load_error() {
        let path = temp_file_path("missing");
        let err = load_assets_from_path(&path).expect_err("missing manifest should fail");
        assert!(matches!(err, GameError::AssetLoad { .. }));
        assert!(err.to_string().contains("failed to read manifest"));
    }

    #[test]
    fn require_helpers_name_the_missing_id() {
        let assets = sample_assets();
        assert!(assets.require_sound("sfx:jump").is_ok());
        let err = assets.require_size("grass:9x1").expect_err("unknown image");
        assert!(err.to_string().contains("grass:9x1"));
    }

    #[test]
    fn shipped_manifest_files_all_exist() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
        let assets = load_assets_from_path(&root.join("assets/manifest.json"))
            .expect("shipped manifest");
        assets.verify_files(&root).expect("every shipped asset file exists");
        assert_eq!(assets.sounds().count(), 2);
    }

    #[test]
    fn verify_files_names_the_first_missing_asset() {
        let empty_root = temp_file_path("no_root");
        let err = sample_assets()
            .verify_files(&empty_root)
            .expect_err("nothing exists under a fresh path");
        assert!(matches!(err, GameError::AssetLoad { ref id, .. } if id == "background"));
        assert!(err.to_string().contains("images/background.png"));
    }
}
