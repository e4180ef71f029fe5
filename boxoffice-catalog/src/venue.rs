use boxoffice_core::app_config::default_levels;
use boxoffice_shared::{LevelId, VenueLevel};

/// Read-only table of the venue's pricing tiers, ordered by id
#[derive(Debug, Clone)]
pub struct VenueCatalog {
    levels: Vec<VenueLevel>,
}

impl VenueCatalog {
    pub fn new(mut levels: Vec<VenueLevel>) -> Self {
        levels.sort_by_key(|level| level.id);
        Self { levels }
    }

    pub fn levels(&self) -> &[VenueLevel] {
        &self.levels
    }

    pub fn get(&self, level_id: LevelId) -> Option<&VenueLevel> {
        self.levels.iter().find(|level| level.id == level_id)
    }

    pub fn contains(&self, level_id: LevelId) -> bool {
        self.get(level_id).is_some()
    }

    pub fn max_level_id(&self) -> LevelId {
        self.levels.last().map(|level| level.id).unwrap_or(0)
    }

    pub fn total_capacity(&self) -> usize {
        self.levels.iter().map(VenueLevel::capacity).sum()
    }

    /// Levels whose id lies in `[min, max]`, ascending. Missing bounds default
    /// to `1` and the highest configured id.
    pub fn levels_between(&self, min: Option<LevelId>, max: Option<LevelId>) -> Vec<&VenueLevel> {
        let min = min.unwrap_or(1);
        let max = max.unwrap_or_else(|| self.max_level_id());
        self.levels
            .iter()
            .filter(|level| level.id >= min && level.id <= max)
            .collect()
    }
}

impl Default for VenueCatalog {
    fn default() -> Self {
        Self::new(default_levels())
    }
}
