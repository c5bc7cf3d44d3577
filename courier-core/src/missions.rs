//! Delivery mission offers posted on planet mission boards.

use rand::Rng;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::entities::{Good, Mission, Planet};
use crate::types::{Credits, GoodId, PlanetId, Quantity};

/// Offers posted when a board is (re)filled
pub const MISSIONS_PER_BOARD: usize = 3;
/// Noise band applied to mission rewards
pub const REWARD_NOISE: (f64, f64) = (0.9, 1.1);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionTemplate {
    pub good_types: Vec<String>,
    pub min_quantity: Quantity,
    pub max_quantity: Quantity,
    pub reward_multiplier: f64,
}

/// Reward for hauling `quantity` of `good` under `template`, before noise.
pub fn base_reward(good: &Good, quantity: Quantity, template: &MissionTemplate) -> f64 {
    good.base_price * quantity as f64 * template.reward_multiplier
}

/// Draw up to `MISSIONS_PER_BOARD` offers out of `origin`.
///
/// A slot whose template matches no good, or that has no destination to go
/// to, is skipped rather than retried.
pub fn generate_offers<R: Rng>(
    origin: PlanetId,
    faction: &str,
    destinations: &[PlanetId],
    goods: &SlotMap<GoodId, Good>,
    templates: &[MissionTemplate],
    rng: &mut R,
) -> Vec<Mission> {
    let mut offers = Vec::with_capacity(MISSIONS_PER_BOARD);
    if templates.is_empty() {
        return offers;
    }

    for _ in 0..MISSIONS_PER_BOARD {
        let template = &templates[rng.random_range(0..templates.len())];

        let candidates: Vec<(GoodId, &Good)> = goods
            .iter()
            .filter(|(_, g)| template.good_types.iter().any(|t| *t == g.good_type))
            .collect();
        if candidates.is_empty() || destinations.is_empty() {
            continue;
        }

        let (good_id, good) = candidates[rng.random_range(0..candidates.len())];
        let destination = destinations[rng.random_range(0..destinations.len())];
        let quantity = rng.random_range(template.min_quantity..=template.max_quantity);
        let reward = (base_reward(good, quantity, template)
            * rng.random_range(REWARD_NOISE.0..=REWARD_NOISE.1))
        .round() as Credits;

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "mission_offer",
            good = good.name.as_str(),
            quantity = quantity as u64,
            reward = reward,
            faction = faction,
        );

        offers.push(Mission::new(
            origin,
            destination,
            good_id,
            quantity,
            reward,
            faction,
        ));
    }

    offers
}

/// Fill a planet's mission board if, and only if, it is empty.
///
/// Returns the number of offers posted.
pub fn ensure_board<R: Rng>(
    planet_id: PlanetId,
    planets: &mut SlotMap<PlanetId, Planet>,
    goods: &SlotMap<GoodId, Good>,
    templates: &[MissionTemplate],
    rng: &mut R,
) -> usize {
    let Some(planet) = planets.get(planet_id) else {
        return 0;
    };
    if !planet.mission_board.is_empty() {
        return 0;
    }

    let destinations: Vec<PlanetId> = planets.keys().filter(|id| *id != planet_id).collect();
    let offers = generate_offers(
        planet_id,
        &planet.faction,
        &destinations,
        goods,
        templates,
        rng,
    );
    let posted = offers.len();
    planets[planet_id].mission_board = offers;
    posted
}
