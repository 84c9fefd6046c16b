use bevy::prelude::*;
use sha3::{Digest, Sha3_256};
use std::sync::Arc;
use tracing::{error, info};

use crate::definitions::DefinitionRegistry;
use crate::grid::ObjectCategory;
use crate::map::{GameMap, MapDefinition};

/// Generates the world at startup from the `WorldSetup` resource
pub struct WorldLayoutPlugin;

impl Plugin for WorldLayoutPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<WorldGeneratedEvent>()
            .add_systems(Startup, generate_world);
    }
}

/// Inputs for world generation
#[derive(Resource, Debug, Clone)]
pub struct WorldSetup {
    pub seed: u32,
    pub map: MapDefinition,
    pub registry: DefinitionRegistry,
}

/// Encoded snapshot shared with every connecting client
#[derive(Resource, Debug, Clone)]
pub struct WorldSnapshotBuffer(pub Arc<[u8]>);

impl WorldSnapshotBuffer {
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// SHA3-256 of the encoded snapshot, for comparing runs
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha3_256::new();
        hasher.update(&self.0);
        hasher.finalize().into()
    }
}

/// Sent once generation finishes
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct WorldGeneratedEvent {
    pub seed: u32,
    pub buildings: usize,
    pub obstacles: usize,
    pub loot: usize,
}

fn generate_world(
    mut commands: Commands,
    setup: Option<Res<WorldSetup>>,
    mut generated: EventWriter<WorldGeneratedEvent>,
    mut exit: EventWriter<AppExit>,
) {
    let Some(setup) = setup else {
        error!("WorldSetup resource missing, cannot generate world");
        exit.send(AppExit::error());
        return;
    };

    match GameMap::new(setup.map.clone(), setup.registry.clone(), setup.seed) {
        Ok(map) => {
            let event = WorldGeneratedEvent {
                seed: setup.seed,
                buildings: map.grid().count(ObjectCategory::Building),
                obstacles: map.grid().count(ObjectCategory::Obstacle),
                loot: map.grid().count(ObjectCategory::Loot),
            };
            info!(seed = setup.seed, map = %setup.map.name, "World ready");
            commands.insert_resource(WorldSnapshotBuffer(map.snapshot_bytes()));
            commands.insert_resource(map);
            generated.send(event);
        }
        Err(err) => {
            error!(error = %err, "World generation failed");
            exit.send(AppExit::error());
        }
    }
}
