//! Travel planning: route fuel cost and in-transit incidents.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{DistanceMatrix, TravelOptions, distance_between};
use crate::entities::{Planet, Ship};
use crate::events::ActiveEffects;
use crate::types::Fuel;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RandomEffect {
    /// Lose a uniformly drawn amount of fuel in `[min, max]`
    FuelLoss { amount: (Fuel, Fuel) },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomEventTemplate {
    pub description: String,
    pub effect: RandomEffect,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TravelPlan {
    pub distance: f64,
    pub fuel_cost: Fuel,
    pub risk_chance: f64,
}

/// What happened on the way, if anything.
#[derive(Debug, Clone, PartialEq)]
pub struct Incident {
    pub description: String,
    pub fuel_lost: Fuel,
}

/// Fuel burned over a distance. Better engines have a lower efficiency factor.
pub fn fuel_cost(distance: f64, base_fuel_cost_per_unit: f64, engine_efficiency: f64) -> Fuel {
    (distance * base_fuel_cost_per_unit * engine_efficiency).round() as Fuel
}

/// Base incident chance compounded with every active travel risk modifier.
pub fn travel_risk_chance(travel: &TravelOptions, effects: &ActiveEffects<'_>) -> f64 {
    travel.random_event_chance * effects.travel_risk_multiplier()
}

/// Cost and risk of flying from `origin` to `destination`. `None` when the
/// distance matrix has no entry for the pair.
pub fn plan_travel(
    origin: &Planet,
    destination: &Planet,
    distances: &DistanceMatrix,
    ship: &Ship,
    travel: &TravelOptions,
    effects: &ActiveEffects<'_>,
) -> Option<TravelPlan> {
    let distance = distance_between(distances, &origin.name, &destination.name)?;
    Some(TravelPlan {
        distance,
        fuel_cost: fuel_cost(
            distance,
            travel.base_fuel_cost_per_unit,
            ship.engine_efficiency(),
        ),
        risk_chance: travel_risk_chance(travel, effects),
    })
}

/// Roll once against `risk_chance`; on a hit pick an incident and apply it.
///
/// Fuel loss is not floored here, the tank can go negative.
pub fn resolve_travel_risk<R: Rng>(
    ship: &mut Ship,
    risk_chance: f64,
    random_events: &[RandomEventTemplate],
    rng: &mut R,
) -> Option<Incident> {
    let roll: f64 = rng.random();
    if roll >= risk_chance || random_events.is_empty() {
        return None;
    }

    let template = &random_events[rng.random_range(0..random_events.len())];
    let fuel_lost = match template.effect {
        RandomEffect::FuelLoss { amount: (min, max) } => rng.random_range(min..=max),
        RandomEffect::Other => 0,
    };
    ship.fuel -= fuel_lost;

    #[cfg(feature = "instrument")]
    tracing::info!(
        target: "incident",
        incident = template.description.as_str(),
        fuel_lost = fuel_lost,
        fuel_after = ship.fuel,
    );

    Some(Incident {
        description: template.description.clone(),
        fuel_lost,
    })
}
