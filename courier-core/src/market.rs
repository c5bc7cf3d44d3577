//! Economy model: per-visit price and stock generation.
//!
//! A market is rebuilt from scratch every time the player arrives at a
//! planet. Nothing carries over between visits.

use rand::Rng;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::collections::HashMap;

use crate::config::{FUEL_KEY, ModifierTable, TravelOptions};
use crate::entities::{Good, Planet};
use crate::events::ActiveEffects;
use crate::types::{Credits, GoodId, Quantity};

/// Noise band applied to every generated good price
pub const PRICE_NOISE: (f64, f64) = (0.9, 1.1);
/// Noise band applied to generated stock
pub const STOCK_NOISE: (f64, f64) = (0.8, 1.2);
/// Noise band applied to the fuel price
pub const FUEL_NOISE: (f64, f64) = (0.95, 1.05);
/// Stock multiplier used when a price modifier is exactly zero
pub const ZERO_MODIFIER_STOCK_FALLBACK: f64 = 100.0;

// ============================================================================
// Market - Per-planet prices and stock
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketListing {
    pub price: Credits,
    pub stock: Quantity,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Market {
    pub listings: HashMap<GoodId, MarketListing>,
    pub fuel_price: Credits,
}

impl Market {
    pub fn listing(&self, good: GoodId) -> Option<&MarketListing> {
        self.listings.get(&good)
    }

    pub fn listing_mut(&mut self, good: GoodId) -> Option<&mut MarketListing> {
        self.listings.get_mut(&good)
    }

    pub fn price(&self, good: GoodId) -> Option<Credits> {
        self.listings.get(&good).map(|l| l.price)
    }

    pub fn stock(&self, good: GoodId) -> Option<Quantity> {
        self.listings.get(&good).map(|l| l.stock)
    }
}

// ============================================================================
// Pricing formulas
// ============================================================================

/// Tech-level modifier for a good, compounded with every active price event
/// that targets its type.
pub fn price_modifier(
    tech_level: u32,
    good: &Good,
    modifiers: &ModifierTable,
    effects: &ActiveEffects<'_>,
) -> f64 {
    // Validated at setup
    let base = lookup(modifiers, tech_level, &good.good_type).unwrap_or(1.0);
    base * effects.price_multiplier(&good.good_type)
}

/// Stock multiplier, inversely coupled to the price modifier.
pub fn stock_modifier(price_modifier: f64) -> f64 {
    if price_modifier == 0.0 {
        ZERO_MODIFIER_STOCK_FALLBACK
    } else {
        1.0 / price_modifier
    }
}

fn lookup(modifiers: &ModifierTable, tech_level: u32, key: &str) -> Option<f64> {
    modifiers
        .get(&tech_level)
        .and_then(|row| row.get(key))
        .copied()
}

fn noise<R: Rng>(rng: &mut R, band: (f64, f64)) -> f64 {
    rng.random_range(band.0..=band.1)
}

/// Generate a fresh market for a planet.
///
/// Goods are visited in catalog order and each draws its price noise then
/// its stock noise; the fuel price draw comes last. Holding the seed fixed
/// therefore holds every noise term fixed.
pub fn generate_market<R: Rng>(
    planet: &Planet,
    goods: &SlotMap<GoodId, Good>,
    modifiers: &ModifierTable,
    travel: &TravelOptions,
    effects: &ActiveEffects<'_>,
    rng: &mut R,
) -> Market {
    let mut listings = HashMap::with_capacity(goods.len());

    for (good_id, good) in goods {
        let modifier = price_modifier(planet.tech_level, good, modifiers, effects);

        let price = (good.base_price * modifier * noise(rng, PRICE_NOISE)).round() as Credits;
        let stock = (good.base_stock as f64 * stock_modifier(modifier) * noise(rng, STOCK_NOISE))
            .round()
            .max(0.0) as Quantity;

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "market",
            planet = planet.name.as_str(),
            tech_level = planet.tech_level as u64,
            good = good.name.as_str(),
            good_type = good.good_type.as_str(),
            modifier = modifier,
            price = price,
            stock = stock as u64,
        );

        listings.insert(good_id, MarketListing { price, stock });
    }

    let fuel_modifier = lookup(modifiers, planet.tech_level, FUEL_KEY).unwrap_or(1.0);
    let fuel_price =
        (travel.base_fuel_price * fuel_modifier * noise(rng, FUEL_NOISE)).round() as Credits;

    Market {
        listings,
        fuel_price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EffectKind, EventEffect, EventTemplate};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn catalog() -> SlotMap<GoodId, Good> {
        let mut goods = SlotMap::with_key();
        goods.insert(Good {
            name: "Water".to_string(),
            good_type: "Basic".to_string(),
            base_price: 100.0,
            base_stock: 200,
        });
        goods.insert(Good {
            name: "Chips".to_string(),
            good_type: "Tech".to_string(),
            base_price: 500.0,
            base_stock: 50,
        });
        goods
    }

    fn modifiers(basic: f64, tech: f64) -> ModifierTable {
        let mut row = HashMap::new();
        row.insert("Basic".to_string(), basic);
        row.insert("Tech".to_string(), tech);
        row.insert(FUEL_KEY.to_string(), 1.0);
        let mut table = HashMap::new();
        table.insert(1, row);
        table
    }

    fn travel() -> TravelOptions {
        TravelOptions {
            base_fuel_cost_per_unit: 1.0,
            base_fuel_price: 10.0,
            event_trigger_chance: 0.0,
            random_event_chance: 0.0,
        }
    }

    #[test]
    fn test_price_within_noise_band() {
        let goods = catalog();
        let planet = Planet::new("Terra", 1, "Federation");
        let table = modifiers(1.2, 0.8);

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let market = generate_market(
                &planet,
                &goods,
                &table,
                &travel(),
                &ActiveEffects::none(),
                &mut rng,
            );
            for (id, good) in &goods {
                let modifier = table[&1][&good.good_type];
                let lo = (good.base_price * modifier * PRICE_NOISE.0).round() as Credits;
                let hi = (good.base_price * modifier * PRICE_NOISE.1).round() as Credits;
                let price = market.price(id).unwrap();
                assert!(
                    (lo..=hi).contains(&price),
                    "{} price {} outside [{}, {}]",
                    good.name,
                    price,
                    lo,
                    hi
                );
            }
            assert!((10..=11).contains(&market.fuel_price));
        }
    }

    #[test]
    fn test_same_seed_same_market() {
        let goods = catalog();
        let planet = Planet::new("Terra", 1, "Federation");
        let table = modifiers(1.0, 1.0);

        let a = generate_market(
            &planet,
            &goods,
            &table,
            &travel(),
            &ActiveEffects::none(),
            &mut StdRng::seed_from_u64(7),
        );
        let b = generate_market(
            &planet,
            &goods,
            &table,
            &travel(),
            &ActiveEffects::none(),
            &mut StdRng::seed_from_u64(7),
        );
        for id in goods.keys() {
            assert_eq!(a.listing(id), b.listing(id));
        }
        assert_eq!(a.fuel_price, b.fuel_price);
    }

    #[test]
    fn test_zero_modifier_uses_stock_fallback() {
        assert_eq!(stock_modifier(0.0), ZERO_MODIFIER_STOCK_FALLBACK);
        assert_eq!(stock_modifier(2.0), 0.5);

        let goods = catalog();
        let planet = Planet::new("Terra", 1, "Federation");
        let market = generate_market(
            &planet,
            &goods,
            &modifiers(0.0, 1.0),
            &travel(),
            &ActiveEffects::none(),
            &mut StdRng::seed_from_u64(3),
        );
        let water = goods.keys().next().unwrap();
        assert_eq!(market.price(water), Some(0));
        // 200 * 100 * [0.8, 1.2]
        let stock = market.stock(water).unwrap();
        assert!((16_000..=24_000).contains(&stock), "stock = {}", stock);
    }

    #[test]
    fn test_price_events_compound_on_matching_type() {
        let goods = catalog();
        let templates = vec![
            EventTemplate {
                name: "Drought".to_string(),
                description: String::new(),
                duration: 3,
                effects: vec![EventEffect {
                    kind: EffectKind::PriceModifier,
                    good_type: "Basic".to_string(),
                    multiplier: 2.0,
                }],
            },
            EventTemplate {
                name: "Boom".to_string(),
                description: String::new(),
                duration: 3,
                effects: vec![EventEffect {
                    kind: EffectKind::PriceModifier,
                    good_type: "*".to_string(),
                    multiplier: 1.5,
                }],
            },
        ];
        let active = vec![
            crate::events::ActiveEvent::from_template(&templates, 0),
            crate::events::ActiveEvent::from_template(&templates, 1),
        ];
        let effects = ActiveEffects::new(&templates, &active);
        let table = modifiers(1.0, 1.0);

        let mut ids = goods.iter();
        let (_, water) = ids.next().unwrap();
        let (_, chips) = ids.next().unwrap();
        assert_eq!(price_modifier(1, water, &table, &effects), 3.0);
        assert_eq!(price_modifier(1, chips, &table, &effects), 1.5);
    }
}
