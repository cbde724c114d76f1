//! Dungeon template loader.

use std::collections::HashSet;
use std::path::Path;

use dungeon_core::DungeonTemplate;
use tracing::{debug, warn};

use crate::loaders::{LoadResult, read_file};

/// Loader for dungeon templates from RON files.
///
/// # Directory Structure
///
/// ```text
/// templates/
/// ├── crypt.ron
/// └── sunken_vault.ron
/// ```
pub struct TemplateLoader;

impl TemplateLoader {
    /// Load and validate one template file.
    pub fn load(path: &Path) -> LoadResult<DungeonTemplate> {
        let content = read_file(path)?;
        let template = Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse template {}: {}", path.display(), e))?;

        if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            && stem != template.name
        {
            warn!(
                target: "content::loaders",
                file = %path.display(),
                name = %template.name,
                "Template name differs from its file name"
            );
        }
        Ok(template)
    }

    /// Parse and validate a template from RON text.
    pub fn parse(content: &str) -> LoadResult<DungeonTemplate> {
        let template: DungeonTemplate = ron::from_str(content)?;
        template.validate()?;
        Ok(template)
    }

    /// Load every `*.ron` file of `dir`, sorted by template name.
    ///
    /// Fails on the first invalid file and on duplicate template names.
    pub fn load_dir(dir: &Path) -> LoadResult<Vec<DungeonTemplate>> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| anyhow::anyhow!("Failed to read directory {}: {}", dir.display(), e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| anyhow::anyhow!("Failed to list {}: {}", dir.display(), e))?
                .path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "ron") {
                paths.push(path);
            }
        }

        let mut names = HashSet::new();
        let mut templates = Vec::with_capacity(paths.len());
        for path in paths {
            let template = Self::load(&path)?;
            if !names.insert(template.name.clone()) {
                anyhow::bail!(
                    "Duplicate template name '{}' in {}",
                    template.name,
                    path.display()
                );
            }
            debug!(target: "content::loaders", name = %template.name, rooms = template.rooms.len(), "Template loaded");
            templates.push(template);
        }
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use dungeon_core::ShardKind;

    use super::*;

    const CRYPT: &str = r#"(
        name: "crypt",
        display_name: Some("The Crypt"),
        portal_location: Some((world: "overworld", x: 100.0, y: 64.0, z: 100.0)),
        entry_point: (world: "dungeons", x: 0.0, y: 64.0, z: 0.0),
        exit_point: (world: "overworld", x: 102.0, y: 64.0, z: 100.0),
        shard: (kind: Tiered, tier: 2),
        max_players: 2,
        completion_countdown: 5,
        rooms: [
            (
                id: "room_1",
                order: 1,
                bounds: (
                    min: (world: "dungeons", x: 0.0, y: 60.0, z: 0.0),
                    max: (world: "dungeons", x: 10.0, y: 70.0, z: 10.0),
                ),
                door: Some((location: (world: "dungeons", x: 10.0, y: 64.0, z: 5.0))),
                spawn_points: [
                    (id: "sp1", location: (world: "dungeons", x: 5.0, y: 64.0, z: 5.0), enemy_type: "skeleton", count: 3),
                ],
            ),
        ],
        boss: Some((
            id: "lair",
            bounds: (
                min: (world: "dungeons", x: 20.0, y: 60.0, z: 0.0),
                max: (world: "dungeons", x: 30.0, y: 70.0, z: 10.0),
            ),
            boss_type: "lich",
            spawn_point: (world: "dungeons", x: 25.0, y: 64.0, z: 5.0),
        )),
        rewards: [(item_id: "gold", amount: 50)],
    )"#;

    #[test]
    fn parses_template_with_defaults() {
        let template = TemplateLoader::parse(CRYPT).unwrap();
        assert_eq!(template.display_name(), "The Crypt");
        assert_eq!(template.min_players, DungeonTemplate::DEFAULT_MIN_PLAYERS);
        assert_eq!(template.max_players, 2);
        assert_eq!(template.shard.kind, ShardKind::Tiered);
        let door = template.rooms[0].door.as_ref().unwrap();
        assert_eq!(door.kind, "BLOCK_BARRIER");
        assert_eq!(door.height, 3);
        assert!(template.boss.as_ref().unwrap().spawn_on_entry);
    }

    #[test]
    fn invalid_template_is_rejected() {
        let broken = CRYPT.replace("max_players: 2", "min_players: 3, max_players: 2");
        let err = TemplateLoader::parse(&broken).unwrap_err();
        assert!(err.to_string().contains("exceeds max_players"));
    }

    #[test]
    fn load_dir_reads_only_ron_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("crypt.ron"), CRYPT).unwrap();
        fs::write(
            dir.path().join("vault.ron"),
            CRYPT.replace("\"crypt\"", "\"vault\""),
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "not a template").unwrap();

        let templates = TemplateLoader::load_dir(dir.path()).unwrap();
        let names: Vec<_> = templates.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["crypt", "vault"]);
    }

    #[test]
    fn duplicate_names_fail() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.ron"), CRYPT).unwrap();
        fs::write(dir.path().join("b.ron"), CRYPT).unwrap();
        let err = TemplateLoader::load_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Duplicate template name 'crypt'"));
    }
}
