//! Game configuration, loaded once at setup and immutable afterwards.
//!
//! The JSON layout mirrors the field names below. `GameConfig::from_json_str`
//! parses and validates in one go; a config that passes `validate` can be
//! handed to `GameState::new` without any further lookups failing.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::entities::ShipUpgrades;
use crate::error::ConfigError;
use crate::events::EventTemplate;
use crate::missions::MissionTemplate;
use crate::travel::{RandomEffect, RandomEventTemplate};
use crate::types::{Credits, ShipComponent};

/// Key used for the fuel entry of a tech-level modifier row.
pub const FUEL_KEY: &str = "fuel";

const DEFAULT_SCENARIO: &str = include_str!("../data/cosmic_courier.json");

/// tech_level -> (good type | "fuel") -> price multiplier
pub type ModifierTable = HashMap<u32, HashMap<String, f64>>;

/// planet name -> planet name -> distance
pub type DistanceMatrix = HashMap<String, HashMap<String, f64>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoodConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub good_type: String,
    pub base_price: f64,
    pub base_stock: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanetConfig {
    pub name: String,
    pub tech_level: u32,
    pub faction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelOptions {
    pub base_fuel_cost_per_unit: f64,
    pub base_fuel_price: f64,
    /// Per-turn chance that a galactic event is drawn
    pub event_trigger_chance: f64,
    /// Base per-trip chance of an in-transit incident
    pub random_event_chance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanSystem {
    pub interest_rate: f64,
    pub loan_amount: Credits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameGoals {
    pub win_credits: Credits,
    pub max_debt: Credits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    pub starting_credits: Credits,
    pub starting_planet: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub goods: Vec<GoodConfig>,
    pub tech_level_modifiers: ModifierTable,
    pub planets: Vec<PlanetConfig>,
    pub travel_options: TravelOptions,
    pub distance_matrix: DistanceMatrix,
    #[serde(default)]
    pub events: Vec<EventTemplate>,
    #[serde(default)]
    pub random_events: Vec<RandomEventTemplate>,
    #[serde(default)]
    pub mission_templates: Vec<MissionTemplate>,
    pub ship_upgrades: ShipUpgrades,
    pub loan_system: LoanSystem,
    pub game_goals: GameGoals,
    pub defaults: Defaults,
    #[serde(default)]
    pub factions: Vec<String>,
}

impl GameConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// The bundled Cosmic Courier galaxy.
    pub fn default_scenario() -> Result<Self, ConfigError> {
        Self::from_json_str(DEFAULT_SCENARIO)
    }

    /// Price multiplier for a good type (or `FUEL_KEY`) at a tech level.
    pub fn modifier(&self, tech_level: u32, key: &str) -> Option<f64> {
        self.tech_level_modifiers
            .get(&tech_level)
            .and_then(|row| row.get(key))
            .copied()
    }

    /// Distance between two planets.
    pub fn distance(&self, from: &str, to: &str) -> Option<f64> {
        distance_between(&self.distance_matrix, from, to)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.goods.is_empty() {
            return Err(ConfigError::EmptyCatalog("goods"));
        }
        if self.planets.is_empty() {
            return Err(ConfigError::EmptyCatalog("planets"));
        }

        check_unique("good", self.goods.iter().map(|g| g.name.as_str()))?;
        check_unique("planet", self.planets.iter().map(|p| p.name.as_str()))?;

        if !self
            .planets
            .iter()
            .any(|p| p.name == self.defaults.starting_planet)
        {
            return Err(ConfigError::UnknownStartingPlanet(
                self.defaults.starting_planet.clone(),
            ));
        }

        // Every tech level in use must price every good type and fuel
        let good_types: HashSet<&str> = self.goods.iter().map(|g| g.good_type.as_str()).collect();
        for planet in &self.planets {
            for key in good_types.iter().copied().chain([FUEL_KEY]) {
                if self.modifier(planet.tech_level, key).is_none() {
                    return Err(ConfigError::MissingModifier {
                        tech_level: planet.tech_level,
                        key: key.to_string(),
                    });
                }
            }
        }

        for (name, row) in &self.distance_matrix {
            for other in std::iter::once(name).chain(row.keys()) {
                if !self.planets.iter().any(|p| &p.name == other) {
                    return Err(ConfigError::UnknownPlanet(other.clone()));
                }
            }
        }
        for from in &self.planets {
            for to in &self.planets {
                if from.name != to.name && self.distance(&from.name, &to.name).is_none() {
                    return Err(ConfigError::MissingDistance {
                        from: from.name.clone(),
                        to: to.name.clone(),
                    });
                }
            }
        }

        for component in ShipComponent::all() {
            if self.ship_upgrades.level_count(component) == 0 {
                return Err(ConfigError::EmptyUpgradeTable(component));
            }
        }

        for template in &self.mission_templates {
            if template.min_quantity == 0 || template.min_quantity > template.max_quantity {
                return Err(ConfigError::InvalidRange {
                    what: "mission quantity".to_string(),
                    min: template.min_quantity as i64,
                    max: template.max_quantity as i64,
                });
            }
        }

        for random_event in &self.random_events {
            if let RandomEffect::FuelLoss { amount: (min, max) } = random_event.effect {
                if min > max {
                    return Err(ConfigError::InvalidRange {
                        what: format!("fuel loss '{}'", random_event.description),
                        min,
                        max,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Symmetric distance lookup: either direction may be the one written down.
pub fn distance_between(matrix: &DistanceMatrix, from: &str, to: &str) -> Option<f64> {
    let lookup = |a: &str, b: &str| matrix.get(a).and_then(|row| row.get(b)).copied();
    lookup(from, to).or_else(|| lookup(to, from))
}

fn check_unique<'a>(
    kind: &'static str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ConfigError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scenario_is_valid() {
        let config = GameConfig::default_scenario().unwrap();
        assert!(config.goods.len() >= 3);
        assert!(config.planets.iter().any(|p| p.name == "Terra"));
        assert_eq!(config.defaults.starting_planet, "Terra");
    }

    #[test]
    fn test_distance_is_symmetric() {
        let config = GameConfig::default_scenario().unwrap();
        assert_eq!(
            config.distance("Terra", "Mars"),
            config.distance("Mars", "Terra")
        );
        assert!(config.distance("Terra", "Mars").is_some());
    }

    #[test]
    fn test_unknown_starting_planet_is_fatal() {
        let mut config = GameConfig::default_scenario().unwrap();
        config.defaults.starting_planet = "Atlantis".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownStartingPlanet(name)) if name == "Atlantis"
        ));
    }

    #[test]
    fn test_missing_fuel_modifier_is_fatal() {
        let mut config = GameConfig::default_scenario().unwrap();
        let level = config.planets[0].tech_level;
        config
            .tech_level_modifiers
            .get_mut(&level)
            .unwrap()
            .remove(FUEL_KEY);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingModifier { key, .. }) if key == FUEL_KEY
        ));
    }

    #[test]
    fn test_missing_distance_is_fatal() {
        let mut config = GameConfig::default_scenario().unwrap();
        config.distance_matrix.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingDistance { .. })
        ));
    }

    #[test]
    fn test_malformed_json_is_reported() {
        let err = GameConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_inverted_mission_range_is_fatal() {
        let mut config = GameConfig::default_scenario().unwrap();
        config.mission_templates[0].min_quantity = 50;
        config.mission_templates[0].max_quantity = 5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRange { .. })
        ));
    }
}
