//! Level documents and the loader that turns one into engine bodies.
//!
//! A level document lists platforms by image id, one hero spawn point and any
//! number of slime/spider spawn points. Documents are read and validated at
//! boot; `spawn_level` re-runs on every level (re)start.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::assets::AssetRegistry;
use crate::engine::{BodyDesc, BodyGroup, BodyId, Engine};
use crate::entity::{CrawlerKind, CRAWLER_SPEED, HERO_SHEET};
use crate::error::{GameError, GameResult};

pub const ENEMY_WALL_IMAGE: &str = "invisible-wall";
pub const BACKGROUND_IMAGE: &str = "background";

#[derive(Debug, Deserialize, Clone)]
pub struct LevelFile {
    #[serde(default)]
    pub platforms: Vec<PlatformSpawn>,
    pub hero: SpawnPoint,
    #[serde(default)]
    pub slimes: Vec<SpawnPoint>,
    #[serde(default)]
    pub spiders: Vec<SpawnPoint>,
}

impl LevelFile {
    /// Crawler spawns in spawn order: slimes first, then spiders.
    pub fn crawler_spawns(&self) -> impl Iterator<Item = (CrawlerKind, &SpawnPoint)> {
        self.slimes
            .iter()
            .map(|p| (CrawlerKind::Slime, p))
            .chain(self.spiders.iter().map(|p| (CrawlerKind::Spider, p)))
    }

    pub fn crawler_count(&self) -> usize {
        self.slimes.len() + self.spiders.len()
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct SpawnPoint {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlatformSpawn {
    pub x: f32,
    pub y: f32,
    pub image: String,
}

/// Every level of the game, in play order.
#[derive(Debug, Clone)]
pub struct LevelLibrary {
    levels: Vec<LevelFile>,
}

impl LevelLibrary {
    pub fn new(levels: Vec<LevelFile>) -> GameResult<Self> {
        if levels.is_empty() {
            return Err(GameError::LevelLoad {
                level: 0,
                reason: "no levels configured".to_string(),
            });
        }
        Ok(Self { levels })
    }

    /// Load and validate the documents at `paths`; level N is `paths[N]`.
    pub fn load(paths: &[String], assets: &AssetRegistry) -> GameResult<Self> {
        let levels = paths
            .iter()
            .enumerate()
            .map(|(index, path)| load_level_from_path(Path::new(path), index, assets))
            .collect::<GameResult<Vec<_>>>()?;
        Self::new(levels)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn get(&self, index: usize) -> GameResult<&LevelFile> {
        self.levels.get(index).ok_or_else(|| GameError::LevelLoad {
            level: index,
            reason: format!("{} is not registered", level_key(index)),
        })
    }
}

/// Store key of a level document.
pub fn level_key(index: usize) -> String {
    format!("level:{index}")
}

pub fn load_level_from_path(
    path: &Path,
    index: usize,
    assets: &AssetRegistry,
) -> GameResult<LevelFile> {
    let level_error = |reason: String| GameError::LevelLoad {
        level: index,
        reason,
    };
    let raw = fs::read_to_string(path)
        .map_err(|e| level_error(format!("Failed to read level file {}: {e}", path.display())))?;
    let level: LevelFile = serde_json::from_str(&raw)
        .map_err(|e| level_error(format!("Failed to parse level JSON {}: {e}", path.display())))?;
    validate_level(&level, assets).map_err(level_error)?;
    log::info!(
        "Loaded {} from {}: {} platforms, {} crawlers",
        level_key(index),
        path.display(),
        level.platforms.len(),
        level.crawler_count()
    );
    Ok(level)
}

fn validate_level(level: &LevelFile, assets: &AssetRegistry) -> Result<(), String> {
    for platform in &level.platforms {
        if assets.image(&platform.image).is_none() {
            return Err(format!(
                "Level validation failed: platform image '{}' is not registered",
                platform.image
            ));
        }
        if !platform.x.is_finite() || !platform.y.is_finite() {
            return Err(format!(
                "Level validation failed: platform '{}' has a non-finite position",
                platform.image
            ));
        }
    }
    let points = std::iter::once(&level.hero)
        .chain(level.slimes.iter())
        .chain(level.spiders.iter());
    for point in points {
        if !point.x.is_finite() || !point.y.is_finite() {
            return Err("Level validation failed: spawn point has a non-finite position".to_string());
        }
    }
    if level.crawler_count() == 0 {
        log::warn!("Level has no crawlers. It can never be cleared.");
    }
    Ok(())
}

/// Handles of everything the loader spawned.
#[derive(Debug, Clone)]
pub struct SpawnedLevel {
    pub hero: BodyId,
    pub crawlers: Vec<(BodyId, CrawlerKind)>,
    pub platforms: Vec<BodyId>,
    pub enemy_walls: Vec<BodyId>,
}

/// Spawn `level` into `engine`, then set gravity.
pub fn spawn_level<E: Engine + ?Sized>(
    engine: &mut E,
    level: &LevelFile,
    assets: &AssetRegistry,
    gravity: f32,
) -> GameResult<SpawnedLevel> {
    if let Some(size) = assets.size_of(BACKGROUND_IMAGE) {
        engine.spawn(BodyDesc::new(BodyGroup::Background, BACKGROUND_IMAGE, 0.0, 0.0, size).fixed());
    }

    let mut platforms = Vec::with_capacity(level.platforms.len());
    let mut enemy_walls = Vec::with_capacity(level.platforms.len() * 2);

    let wall_size = assets.require_size(ENEMY_WALL_IMAGE)?;
    for platform in &level.platforms {
        let size = assets.require_size(&platform.image)?;
        let desc =
            BodyDesc::new(BodyGroup::Platforms, &platform.image, platform.x, platform.y, size)
                .fixed();
        platforms.push(engine.spawn(desc));

        let left = BodyDesc::new(
            BodyGroup::EnemyWalls,
            ENEMY_WALL_IMAGE,
            platform.x,
            platform.y,
            wall_size,
        )
        .with_anchor(1.0, 1.0)
        .hidden()
        .fixed();
        let right = BodyDesc::new(
            BodyGroup::EnemyWalls,
            ENEMY_WALL_IMAGE,
            platform.x + size.0,
            platform.y,
            wall_size,
        )
        .with_anchor(0.0, 1.0)
        .hidden()
        .fixed();
        enemy_walls.push(engine.spawn(left));
        enemy_walls.push(engine.spawn(right));
    }

    let hero_size = assets.require_size(HERO_SHEET)?;
    let hero = BodyDesc::new(BodyGroup::Hero, HERO_SHEET, level.hero.x, level.hero.y, hero_size)
        .with_anchor(0.5, 0.5)
        .bounded();
    let hero = engine.spawn(hero);

    let mut crawlers = Vec::with_capacity(level.crawler_count());
    for (kind, point) in level.crawler_spawns() {
        let size = assets.require_size(kind.sheet())?;
        let desc = BodyDesc::new(BodyGroup::Crawlers, kind.sheet(), point.x, point.y, size)
            .with_anchor(0.5, 0.5)
            .bounded();
        let id = engine.spawn(desc);
        if let Some(body) = engine.body_mut(id) {
            body.velocity_x = CRAWLER_SPEED;
        }
        crawlers.push((id, kind));
    }

    engine.set_gravity(gravity);
    Ok(SpawnedLevel {
        hero,
        crawlers,
        platforms,
        enemy_walls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arcade::ArcadeWorld;
    use crate::assets::tests::sample_assets;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "stomp_level_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn write_level_file(path: &Path, body: &str) {
        fs::write(path, body).expect("failed to write temp level file");
    }

    const LEVEL_JSON: &str = r#"
    {
      "platforms": [
        { "x": 0, "y": 550, "image": "ground" },
        { "x": 200, "y": 400, "image": "grass:4x1" }
      ],
      "hero": { "x": 21, "y": 525 },
      "slimes": [ { "x": 260, "y": 380 } ],
      "spiders": [ { "x": 600, "y": 530 } ]
    }
    "#;

    fn parse(json: &str) -> LevelFile {
        serde_json::from_str(json).expect("level json parses")
    }

    #[test]
    fn load_level_from_path_parses_valid_level() {
        let path = temp_file_path("valid");
        write_level_file(&path, LEVEL_JSON);

        let level = load_level_from_path(&path, 0, &sample_assets()).expect("valid level");
        assert_eq!(level.platforms.len(), 2);
        assert_eq!(level.hero, SpawnPoint { x: 21.0, y: 525.0 });
        assert_eq!(level.crawler_count(), 2);
        let kinds: Vec<_> = level.crawler_spawns().map(|(kind, _)| kind).collect();
        assert_eq!(kinds, vec![CrawlerKind::Slime, CrawlerKind::Spider]);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_level_from_path_reports_level_index() {
        let path = temp_file_path("bad_json");
        write_level_file(&path, "{ \"platforms\": [ }");
        let err = load_level_from_path(&path, 3, &sample_assets()).expect_err("bad json");
        assert!(matches!(err, GameError::LevelLoad { level: 3, .. }));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_hero_is_rejected() {
        let path = temp_file_path("no_hero");
        write_level_file(&path, r#"{ "platforms": [], "slimes": [] }"#);
        let err = load_level_from_path(&path, 1, &sample_assets()).expect_err("no hero");
        assert!(err.to_string().contains("hero"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn unknown_platform_image_is_rejected() {
        let path = temp_file_path("unknown_image");
        write_level_file(
            &path,
            r#"{ "platforms": [ { "x": 0, "y": 0, "image": "grass:9x1" } ], "hero": { "x": 0, "y": 0 } }"#,
        );
        let err = load_level_from_path(&path, 0, &sample_assets()).expect_err("unknown image");
        assert!(err.to_string().contains("grass:9x1"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn library_lookup_out_of_range_is_a_level_error() {
        let library = LevelLibrary::new(vec![parse(LEVEL_JSON)]).expect("one level");
        assert_eq!(library.len(), 1);
        assert!(library.get(0).is_ok());
        let err = library.get(5).expect_err("level 5 missing");
        assert!(matches!(err, GameError::LevelLoad { level: 5, .. }));
        assert!(err.to_string().contains("level:5"));
        assert!(LevelLibrary::new(Vec::new()).is_err());
    }

    #[test]
    fn spawn_level_places_platforms_walls_and_characters() {
        let mut world = ArcadeWorld::new(800.0, 600.0);
        let level = parse(LEVEL_JSON);
        let spawned = spawn_level(&mut world, &level, &sample_assets(), 1200.0).expect("spawn");

        assert_eq!(spawned.platforms.len(), 2);
        assert_eq!(spawned.enemy_walls.len(), 4);
        assert_eq!(spawned.crawlers.len(), 2);
        assert_eq!(world.bodies().next().map(|b| b.group), Some(BodyGroup::Background));
        assert_eq!(world.gravity(), 1200.0);

        let grass = world.body(spawned.platforms[1]).expect("grass");
        assert_eq!((grass.aabb.left(), grass.aabb.top()), (200.0, 400.0));
        assert_eq!(grass.aabb.width(), 168.0);
        assert!(grass.immovable && !grass.allow_gravity);

        let left_wall = world.body(spawned.enemy_walls[2]).expect("left wall");
        assert_eq!((left_wall.aabb.right(), left_wall.aabb.bottom()), (200.0, 400.0));
        assert!(!left_wall.visible);
        let right_wall = world.body(spawned.enemy_walls[3]).expect("right wall");
        assert_eq!((right_wall.aabb.left(), right_wall.aabb.bottom()), (368.0, 400.0));

        let hero = world.body(spawned.hero).expect("hero body");
        assert_eq!(hero.center(), (21.0, 525.0));
        assert!(hero.collide_world_bounds);

        let (spider_id, kind) = spawned.crawlers[1];
        assert_eq!(kind, CrawlerKind::Spider);
        let spider = world.body(spider_id).expect("spider");
        assert_eq!(spider.texture, "spider");
        assert_eq!(spider.velocity_x, CRAWLER_SPEED);
        assert_eq!(spider.center(), (600.0, 530.0));
    }

    #[test]
    fn shipped_levels_validate_against_shipped_manifest() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
        let assets = crate::assets::load_assets_from_path(&root.join("assets/manifest.json"))
            .expect("shipped manifest");
        for (index, name) in ["level00.json", "level01.json"].iter().enumerate() {
            let path = root.join("assets/levels").join(name);
            let level = load_level_from_path(&path, index, &assets).expect("shipped level");
            assert!(level.crawler_count() > 0);

            let mut world = ArcadeWorld::new(800.0, 600.0);
            spawn_level(&mut world, &level, &assets, 1200.0).expect("shipped level spawns");
        }
    }

    #[test]
    fn empty_level_spawns_only_the_hero() {
        let mut world = ArcadeWorld::new(800.0, 600.0);
        let level = parse(r#"{ "hero": { "x": 10, "y": 10 } }"#);
        let spawned = spawn_level(&mut world, &level, &sample_assets(), 900.0).expect("spawn");
        assert!(spawned.platforms.is_empty());
        assert!(spawned.crawlers.is_empty());
        assert!(world.body(spawned.hero).is_some());
        // background + hero
        assert_eq!(world.body_count(), 2);
        assert_eq!(world.gravity(), 900.0);
    }
}
