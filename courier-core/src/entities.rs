use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::market::Market;
use crate::types::{Credits, DisplayMode, Fuel, GoodId, PlanetId, Quantity, ShipComponent};

// ============================================================================
// Good - A tradeable commodity (immutable after load)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Good {
    pub name: String,
    /// Category tag used for pricing modifiers
    pub good_type: String,
    pub base_price: f64,
    pub base_stock: Quantity,
}

// ============================================================================
// Planet - A node in the trade network
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Planet {
    pub name: String,
    pub tech_level: u32,
    pub faction: String,
    pub market: Market,
    /// Open offers, replenished only once drained
    pub mission_board: Vec<Mission>,
}

impl Planet {
    pub fn new(name: impl Into<String>, tech_level: u32, faction: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tech_level,
            faction: faction.into(),
            market: Market::default(),
            mission_board: Vec::new(),
        }
    }
}

// ============================================================================
// Mission - A delivery contract (immutable once created)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    origin: PlanetId,
    destination: PlanetId,
    good: GoodId,
    quantity: Quantity,
    reward: Credits,
    faction: String,
}

impl Mission {
    pub fn new(
        origin: PlanetId,
        destination: PlanetId,
        good: GoodId,
        quantity: Quantity,
        reward: Credits,
        faction: impl Into<String>,
    ) -> Self {
        debug_assert!(origin != destination, "mission must leave its origin");
        debug_assert!(quantity > 0, "mission must carry something");
        Self {
            origin,
            destination,
            good,
            quantity,
            reward,
            faction: faction.into(),
        }
    }

    pub fn origin(&self) -> PlanetId {
        self.origin
    }

    pub fn destination(&self) -> PlanetId {
        self.destination
    }

    pub fn good(&self) -> GoodId {
        self.good
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn reward(&self) -> Credits {
        self.reward
    }

    /// Faction whose reputation rises on completion
    pub fn faction(&self) -> &str {
        &self.faction
    }
}

// ============================================================================
// Ship upgrade tables
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CargoHoldLevel {
    pub size: Quantity,
    pub cost: Credits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuelTankLevel {
    pub capacity: Fuel,
    pub cost: Credits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineLevel {
    /// Fuel cost multiplier, lower is better
    pub efficiency: f64,
    pub cost: Credits,
}

/// Per-component level tables. Level 0 is what a new ship comes with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipUpgrades {
    pub cargo_hold: Vec<CargoHoldLevel>,
    pub fuel_tank: Vec<FuelTankLevel>,
    pub engine: Vec<EngineLevel>,
}

impl ShipUpgrades {
    pub fn level_count(&self, component: ShipComponent) -> usize {
        match component {
            ShipComponent::CargoHold => self.cargo_hold.len(),
            ShipComponent::FuelTank => self.fuel_tank.len(),
            ShipComponent::Engine => self.engine.len(),
        }
    }

    pub fn cost(&self, component: ShipComponent, level: usize) -> Option<Credits> {
        match component {
            ShipComponent::CargoHold => self.cargo_hold.get(level).map(|l| l.cost),
            ShipComponent::FuelTank => self.fuel_tank.get(level).map(|l| l.cost),
            ShipComponent::Engine => self.engine.get(level).map(|l| l.cost),
        }
    }
}

// ============================================================================
// Ship
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipLevels {
    pub cargo_hold: usize,
    pub fuel_tank: usize,
    pub engine: usize,
}

impl ShipLevels {
    pub fn get(&self, component: ShipComponent) -> usize {
        match component {
            ShipComponent::CargoHold => self.cargo_hold,
            ShipComponent::FuelTank => self.fuel_tank,
            ShipComponent::Engine => self.engine,
        }
    }

    fn set(&mut self, component: ShipComponent, level: usize) {
        match component {
            ShipComponent::CargoHold => self.cargo_hold = level,
            ShipComponent::FuelTank => self.fuel_tank = level,
            ShipComponent::Engine => self.engine = level,
        }
    }
}

/// The player's ship. Hold size, tank capacity and engine efficiency are
/// derived from the component levels and only change through `set_level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ship {
    levels: ShipLevels,
    cargo_hold_size: Quantity,
    fuel_capacity: Fuel,
    engine_efficiency: f64,
    pub fuel: Fuel,
    /// Never holds a zero entry
    pub cargo: HashMap<GoodId, Quantity>,
}

impl Ship {
    /// A base-level ship with a full tank.
    pub fn new(upgrades: &ShipUpgrades) -> Self {
        let mut ship = Self {
            levels: ShipLevels::default(),
            cargo_hold_size: 0,
            fuel_capacity: 0,
            engine_efficiency: 1.0,
            fuel: 0,
            cargo: HashMap::new(),
        };
        ship.recompute(upgrades);
        ship.fuel = ship.fuel_capacity;
        ship
    }

    pub fn levels(&self) -> ShipLevels {
        self.levels
    }

    pub fn level(&self, component: ShipComponent) -> usize {
        self.levels.get(component)
    }

    /// Change a component level and re-derive the ship's stats.
    pub fn set_level(&mut self, component: ShipComponent, level: usize, upgrades: &ShipUpgrades) {
        self.levels.set(component, level);
        self.recompute(upgrades);
    }

    fn recompute(&mut self, upgrades: &ShipUpgrades) {
        if let Some(level) = upgrades.cargo_hold.get(self.levels.cargo_hold) {
            self.cargo_hold_size = level.size;
        }
        if let Some(level) = upgrades.fuel_tank.get(self.levels.fuel_tank) {
            self.fuel_capacity = level.capacity;
        }
        if let Some(level) = upgrades.engine.get(self.levels.engine) {
            self.engine_efficiency = level.efficiency;
        }
    }

    pub fn cargo_hold_size(&self) -> Quantity {
        self.cargo_hold_size
    }

    pub fn fuel_capacity(&self) -> Fuel {
        self.fuel_capacity
    }

    pub fn engine_efficiency(&self) -> f64 {
        self.engine_efficiency
    }

    pub fn cargo_used(&self) -> Quantity {
        self.cargo.values().sum()
    }

    pub fn free_space(&self) -> Quantity {
        self.cargo_hold_size.saturating_sub(self.cargo_used())
    }

    pub fn cargo_of(&self, good: GoodId) -> Quantity {
        self.cargo.get(&good).copied().unwrap_or(0)
    }

    pub fn is_cargo_empty(&self) -> bool {
        self.cargo.is_empty()
    }

    /// Callers check free space first.
    pub fn add_cargo(&mut self, good: GoodId, quantity: Quantity) {
        if quantity > 0 {
            *self.cargo.entry(good).or_insert(0) += quantity;
        }
    }

    /// Remove up to `quantity`, returning how much was actually removed.
    pub fn remove_cargo(&mut self, good: GoodId, quantity: Quantity) -> Quantity {
        let Some(held) = self.cargo.get_mut(&good) else {
            return 0;
        };
        let removed = quantity.min(*held);
        *held -= removed;
        if *held == 0 {
            self.cargo.remove(&good);
        }
        removed
    }

    /// Units that still fit in the tank.
    pub fn tank_space(&self) -> Fuel {
        (self.fuel_capacity - self.fuel).max(0)
    }
}

// ============================================================================
// Player
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub ship: Ship,
    pub location: PlanetId,
    pub credits: Credits,
    pub debt: Credits,
    pub reputation: HashMap<String, i64>,
    pub current_mission: Option<Mission>,
    pub display: DisplayMode,
}

impl Player {
    pub fn reputation_with(&self, faction: &str) -> i64 {
        self.reputation.get(faction).copied().unwrap_or(0)
    }
}
