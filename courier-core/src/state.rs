use rand::Rng;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use tsify_next::Tsify;

use crate::config::GameConfig;
use crate::entities::{Good, Mission, Planet, Player, Ship};
use crate::error::{ConfigError, GameError};
use crate::events::{ActiveEffects, ActiveEvent};
use crate::market::generate_market;
use crate::missions::ensure_board;
use crate::travel::plan_travel;
use crate::types::{Credits, DisplayMode, Fuel, GoodId, KeyToU64, PlanetId, Quantity, ShipComponent};

// ============================================================================
// Game State - The complete simulation state
// ============================================================================

#[derive(Debug, Clone)]
pub struct GameState {
    pub turn: u64,
    pub config: GameConfig,
    pub goods: SlotMap<GoodId, Good>,
    pub planets: SlotMap<PlanetId, Planet>,
    pub player: Player,
    pub active_events: Vec<ActiveEvent>,
}

impl GameState {
    /// Build a fresh game: catalogs from config, the player docked at the
    /// starting planet with a base ship, and that planet's market and
    /// mission board ready.
    pub fn new<R: Rng>(
        config: GameConfig,
        player_name: impl Into<String>,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut goods = SlotMap::with_key();
        for g in &config.goods {
            goods.insert(Good {
                name: g.name.clone(),
                good_type: g.good_type.clone(),
                base_price: g.base_price,
                base_stock: g.base_stock,
            });
        }

        let mut planets = SlotMap::with_key();
        for p in &config.planets {
            planets.insert(Planet::new(p.name.clone(), p.tech_level, p.faction.clone()));
        }

        let start = planets
            .iter()
            .find(|(_, p)| p.name == config.defaults.starting_planet)
            .map(|(id, _)| id)
            .ok_or_else(|| ConfigError::UnknownStartingPlanet(config.defaults.starting_planet.clone()))?;

        let player = Player {
            name: player_name.into(),
            ship: Ship::new(&config.ship_upgrades),
            location: start,
            credits: config.defaults.starting_credits,
            debt: 0,
            reputation: config.factions.iter().map(|f| (f.clone(), 0)).collect(),
            current_mission: None,
            display: DisplayMode::default(),
        };

        let mut state = Self {
            turn: 0,
            config,
            goods,
            planets,
            player,
            active_events: Vec::new(),
        };
        state.arrive(start, rng);
        Ok(state)
    }

    /// Regenerate a planet's market and top up its mission board.
    pub fn arrive<R: Rng>(&mut self, planet_id: PlanetId, rng: &mut R) {
        self.regenerate_market(planet_id, rng);
        ensure_board(
            planet_id,
            &mut self.planets,
            &self.goods,
            &self.config.mission_templates,
            rng,
        );
    }

    pub fn regenerate_market<R: Rng>(&mut self, planet_id: PlanetId, rng: &mut R) {
        let Some(planet) = self.planets.get(planet_id) else {
            return;
        };
        let effects = ActiveEffects::new(&self.config.events, &self.active_events);
        let market = generate_market(
            planet,
            &self.goods,
            &self.config.tech_level_modifiers,
            &self.config.travel_options,
            &effects,
            rng,
        );
        self.planets[planet_id].market = market;
    }

    pub fn effects(&self) -> ActiveEffects<'_> {
        ActiveEffects::new(&self.config.events, &self.active_events)
    }

    pub fn current_planet(&self) -> &Planet {
        &self.planets[self.player.location]
    }

    pub fn current_planet_mut(&mut self) -> &mut Planet {
        &mut self.planets[self.player.location]
    }

    /// Good by catalog position.
    pub fn good_at(&self, index: usize) -> Result<(GoodId, &Good), GameError> {
        self.goods
            .iter()
            .nth(index)
            .ok_or(GameError::InvalidSelection {
                what: "good",
                index,
                available: self.goods.len(),
            })
    }

    pub fn good_by_name(&self, name: &str) -> Option<GoodId> {
        self.goods
            .iter()
            .find(|(_, g)| g.name.eq_ignore_ascii_case(name))
            .map(|(id, _)| id)
    }

    pub fn planet_by_name(&self, name: &str) -> Option<PlanetId> {
        self.planets
            .iter()
            .find(|(_, p)| p.name.eq_ignore_ascii_case(name))
            .map(|(id, _)| id)
    }

    /// Every planet except the current one, in catalog order.
    pub fn destinations(&self) -> Vec<PlanetId> {
        self.planets
            .keys()
            .filter(|id| *id != self.player.location)
            .collect()
    }

    /// Out of fuel, out of money and an empty hold.
    ///
    /// Cargo the current planet will not buy still counts as cargo, so such
    /// a player is neither rescued nor failed here.
    pub fn is_stranded(&self) -> bool {
        self.player.ship.fuel <= 0 && self.player.credits <= 0 && self.player.ship.is_cargo_empty()
    }

    pub fn has_won(&self) -> bool {
        self.player.credits >= self.config.game_goals.win_credits && self.player.debt == 0
    }

    pub fn has_lost_to_debt(&self) -> bool {
        self.player.debt > self.config.game_goals.max_debt
    }

    // === Snapshot ===

    pub fn snapshot(&self) -> StateSnapshot {
        let planet = self.current_planet();
        let ship = &self.player.ship;

        let market = self
            .goods
            .iter()
            .filter_map(|(id, good)| {
                planet.market.listing(id).map(|listing| MarketRowSnapshot {
                    good: good.name.clone(),
                    good_type: good.good_type.clone(),
                    price: listing.price,
                    stock: listing.stock,
                    in_cargo: ship.cargo_of(id),
                })
            })
            .collect();

        let cargo = self
            .goods
            .iter()
            .filter(|(id, _)| ship.cargo_of(*id) > 0)
            .map(|(id, good)| (good.name.clone(), ship.cargo_of(id)))
            .collect();

        let effects = self.effects();
        let destinations = self
            .destinations()
            .into_iter()
            .map(|id| {
                let target = &self.planets[id];
                let fuel_cost = plan_travel(
                    planet,
                    target,
                    &self.config.distance_matrix,
                    ship,
                    &self.config.travel_options,
                    &effects,
                )
                .map(|plan| plan.fuel_cost)
                .unwrap_or(0);
                DestinationSnapshot {
                    id: id.to_u64(),
                    name: target.name.clone(),
                    fuel_cost,
                }
            })
            .collect();

        let mut reputation: Vec<(String, i64)> = self
            .player
            .reputation
            .iter()
            .map(|(f, r)| (f.clone(), *r))
            .collect();
        reputation.sort();

        let upgrades = ShipComponent::all()
            .map(|component| {
                let level = ship.level(component);
                UpgradeSnapshot {
                    component,
                    level,
                    next_cost: self.config.ship_upgrades.cost(component, level + 1),
                }
            })
            .collect();

        StateSnapshot {
            turn: self.turn,
            player: PlayerSnapshot {
                name: self.player.name.clone(),
                credits: self.player.credits,
                debt: self.player.debt,
                reputation,
                display: self.player.display,
            },
            ship: ShipSnapshot {
                fuel: ship.fuel,
                fuel_capacity: ship.fuel_capacity(),
                cargo_used: ship.cargo_used(),
                cargo_hold_size: ship.cargo_hold_size(),
                engine_efficiency: ship.engine_efficiency(),
                cargo,
                upgrades,
            },
            planet: PlanetSnapshot {
                id: self.player.location.to_u64(),
                name: planet.name.clone(),
                tech_level: planet.tech_level,
                faction: planet.faction.clone(),
                fuel_price: planet.market.fuel_price,
            },
            market,
            missions: planet
                .mission_board
                .iter()
                .map(|m| self.mission_snapshot(m))
                .collect(),
            current_mission: self
                .player
                .current_mission
                .as_ref()
                .map(|m| self.mission_snapshot(m)),
            destinations,
            events: self
                .active_events
                .iter()
                .filter_map(|a| {
                    a.template(&self.config.events).map(|t| EventSnapshot {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        turns_remaining: a.remaining,
                    })
                })
                .collect(),
        }
    }

    fn mission_snapshot(&self, mission: &Mission) -> MissionSnapshot {
        MissionSnapshot {
            origin: self.planets[mission.origin()].name.clone(),
            destination: self.planets[mission.destination()].name.clone(),
            good: self.goods[mission.good()].name.clone(),
            quantity: mission.quantity(),
            reward: mission.reward(),
            faction: mission.faction().to_string(),
        }
    }
}

// ============================================================================
// Serializable State Snapshot for JS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct StateSnapshot {
    pub turn: u64,
    pub player: PlayerSnapshot,
    pub ship: ShipSnapshot,
    pub planet: PlanetSnapshot,
    pub market: Vec<MarketRowSnapshot>,
    pub missions: Vec<MissionSnapshot>,
    pub current_mission: Option<MissionSnapshot>,
    pub destinations: Vec<DestinationSnapshot>,
    pub events: Vec<EventSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct PlayerSnapshot {
    pub name: String,
    pub credits: Credits,
    pub debt: Credits,
    pub reputation: Vec<(String, i64)>,
    pub display: DisplayMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct UpgradeSnapshot {
    pub component: ShipComponent,
    pub level: usize,
    /// `None` once fully upgraded
    pub next_cost: Option<Credits>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct ShipSnapshot {
    pub fuel: Fuel,
    pub fuel_capacity: Fuel,
    pub cargo_used: Quantity,
    pub cargo_hold_size: Quantity,
    pub engine_efficiency: f64,
    pub cargo: Vec<(String, Quantity)>,
    pub upgrades: Vec<UpgradeSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct PlanetSnapshot {
    pub id: u64,
    pub name: String,
    pub tech_level: u32,
    pub faction: String,
    pub fuel_price: Credits,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct MarketRowSnapshot {
    pub good: String,
    pub good_type: String,
    pub price: Credits,
    pub stock: Quantity,
    pub in_cargo: Quantity,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct MissionSnapshot {
    pub origin: String,
    pub destination: String,
    pub good: String,
    pub quantity: Quantity,
    pub reward: Credits,
    pub faction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct DestinationSnapshot {
    pub id: u64,
    pub name: String,
    pub fuel_cost: Fuel,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct EventSnapshot {
    pub name: String,
    pub description: String,
    pub turns_remaining: i64,
}
