//! Loot tables.
//!
//! A table rolls `min..=max` weighted picks. Entries are either concrete
//! items or references to other tables, which are rolled recursively.

use serde::{Deserialize, Serialize};

use super::{DefinitionError, DefinitionRegistry};
use crate::random::SeededRandom;

/// Nesting bound for table references on registries that skipped validation
const MAX_TABLE_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LootEntry {
    Item {
        id: String,
        #[serde(default = "default_count")]
        count: u32,
        #[serde(default = "default_weight")]
        weight: f32,
    },
    Table {
        table: String,
        #[serde(default = "default_weight")]
        weight: f32,
    },
}

fn default_count() -> u32 {
    1
}

fn default_weight() -> f32 {
    1.0
}

impl LootEntry {
    pub fn weight(&self) -> f32 {
        match self {
            LootEntry::Item { weight, .. } | LootEntry::Table { weight, .. } => *weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootTable {
    #[serde(default = "default_count")]
    pub min: u32,
    #[serde(default = "default_count")]
    pub max: u32,
    pub entries: Vec<LootEntry>,
}

impl LootTable {
    /// Tables referenced by this table's entries
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|entry| match entry {
            LootEntry::Table { table, .. } => Some(table.as_str()),
            LootEntry::Item { .. } => None,
        })
    }
}

/// One rolled stack of an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootItem {
    pub id_string: String,
    pub count: u32,
}

impl DefinitionRegistry {
    pub fn get_loot_from_table(
        &self,
        name: &str,
        rng: &mut SeededRandom,
    ) -> Result<Vec<LootItem>, DefinitionError> {
        let mut items = Vec::new();
        self.roll_table(name, rng, 0, &mut items)?;
        Ok(items)
    }

    fn roll_table(
        &self,
        name: &str,
        rng: &mut SeededRandom,
        depth: usize,
        out: &mut Vec<LootItem>,
    ) -> Result<(), DefinitionError> {
        if depth > MAX_TABLE_DEPTH {
            return Err(DefinitionError::CyclicLootTable(name.to_string()));
        }
        let table = self
            .loot_tables
            .get(name)
            .ok_or_else(|| DefinitionError::UnknownLootTable(name.to_string()))?;

        let weighted: Vec<(&LootEntry, f32)> =
            table.entries.iter().map(|e| (e, e.weight())).collect();
        let rolls = rng.next_int(table.min as i32, table.max as i32).max(0);

        for _ in 0..rolls {
            match rng.pick_weighted(&weighted) {
                Some(LootEntry::Item { id, count, .. }) => out.push(LootItem {
                    id_string: id.clone(),
                    count: *count,
                }),
                Some(LootEntry::Table { table, .. }) => {
                    self.roll_table(table, rng, depth + 1, out)?;
                }
                None => return Err(DefinitionError::EmptyLootTable(name.to_string())),
            }
        }
        Ok(())
    }
}
