use anyhow::Context;
use bevy::prelude::*;
use tracing::info;

use worldgen::engine::{WorldConfig, WorldLayoutPlugin, WorldSetup, WorldSnapshotBuffer};
use worldgen::grid::ObjectCategory;
use worldgen::logging::LoggingPlugin;
use worldgen::map::GameMap;

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => WorldConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => WorldConfig::load_or_default("config/world.ron")
            .context("loading config/world.ron")?,
    };

    let map = config.load_map().context("loading map definition")?;
    let registry = config
        .load_definitions()
        .context("loading object definitions")?;

    let mut app = App::new();
    app.add_plugins(LoggingPlugin {
        config: config.tracing.clone(),
    })
    .insert_resource(WorldSetup {
        seed: config.seed,
        map,
        registry,
    })
    .add_plugins(WorldLayoutPlugin);
    app.update();

    if let Some(AppExit::Error(code)) = app.should_exit() {
        anyhow::bail!("world generation failed (exit code {code})");
    }

    let world = app.world();
    let map = world.resource::<GameMap>();
    let digest = world.resource::<WorldSnapshotBuffer>().digest();
    info!(
        map = %map.definition().name,
        seed = map.seed(),
        islands = map.islands().len(),
        rivers = map.terrain().rivers().len(),
        buildings = map.grid().count(ObjectCategory::Building),
        obstacles = map.grid().count(ObjectCategory::Obstacle),
        loot = map.grid().count(ObjectCategory::Loot),
        snapshot_bytes = map.snapshot_bytes().len(),
        digest = %digest.iter().map(|b| format!("{b:02x}")).collect::<String>(),
        "World generated"
    );
    Ok(())
}
