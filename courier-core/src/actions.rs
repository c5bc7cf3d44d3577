//! Player command handlers.
//!
//! Each handler checks everything it needs up front and only then mutates
//! the game. An `Err` always leaves the state exactly as it was.

use rand::Rng;

use crate::debt;
use crate::error::GameError;
use crate::state::GameState;
use crate::travel::{plan_travel, resolve_travel_risk};
use crate::types::{Credits, Fuel, Quantity, ShipComponent};

/// Parse a player-entered amount into a positive quantity.
fn positive_quantity(amount: i64) -> Result<Quantity, GameError> {
    if amount <= 0 {
        return Err(GameError::InvalidAmount { amount });
    }
    Quantity::try_from(amount).map_err(|_| GameError::InvalidAmount { amount })
}

// ============================================================================
// Travel
// ============================================================================

pub fn travel<R: Rng>(
    game: &mut GameState,
    destination_index: usize,
    rng: &mut R,
) -> Result<String, GameError> {
    let destinations = game.destinations();
    let destination = *destinations
        .get(destination_index)
        .ok_or(GameError::InvalidSelection {
            what: "destination",
            index: destination_index,
            available: destinations.len(),
        })?;

    let plan = plan_travel(
        game.current_planet(),
        &game.planets[destination],
        &game.config.distance_matrix,
        &game.player.ship,
        &game.config.travel_options,
        &game.effects(),
    )
    .ok_or(GameError::InvalidSelection {
        what: "destination",
        index: destination_index,
        available: destinations.len(),
    })?;

    if game.player.ship.fuel < plan.fuel_cost {
        return Err(GameError::InsufficientFuel {
            needed: plan.fuel_cost,
            available: game.player.ship.fuel,
        });
    }

    let from = game.current_planet().name.clone();
    game.player.ship.fuel -= plan.fuel_cost;
    game.player.location = destination;
    game.arrive(destination, rng);

    let to = game.current_planet().name.clone();
    let mut message = format!("Traveled from {} to {} using {} fuel.", from, to, plan.fuel_cost);

    if let Some(incident) = resolve_travel_risk(
        &mut game.player.ship,
        plan.risk_chance,
        &game.config.random_events,
        rng,
    ) {
        message.push('\n');
        message.push_str(&incident.description);
        if incident.fuel_lost > 0 {
            message.push_str(&format!("\nYou lost {} fuel.", incident.fuel_lost));
        }
    }

    #[cfg(feature = "instrument")]
    tracing::info!(
        target: "travel",
        from = from.as_str(),
        to = to.as_str(),
        distance = plan.distance,
        fuel_cost = plan.fuel_cost,
        fuel_after = game.player.ship.fuel,
    );

    Ok(message)
}

// ============================================================================
// Trading
// ============================================================================

pub fn buy(game: &mut GameState, good_index: usize, amount: i64) -> Result<String, GameError> {
    let quantity = positive_quantity(amount)?;
    let (good_id, good) = game.good_at(good_index)?;
    let name = good.name.clone();

    let listing = *game
        .current_planet()
        .market
        .listing(good_id)
        .ok_or_else(|| GameError::NotTraded { good: name.clone() })?;

    if listing.stock < quantity {
        return Err(GameError::InsufficientStock {
            good: name,
            requested: quantity,
            available: listing.stock,
        });
    }
    let free = game.player.ship.free_space();
    if free < quantity {
        return Err(GameError::InsufficientCargoSpace {
            needed: quantity,
            free,
        });
    }
    let cost = listing.price * quantity as Credits;
    if cost > game.player.credits {
        return Err(GameError::InsufficientCredits {
            needed: cost,
            available: game.player.credits,
        });
    }

    if let Some(listing) = game.current_planet_mut().market.listing_mut(good_id) {
        listing.stock -= quantity;
    }
    game.player.credits -= cost;
    game.player.ship.add_cargo(good_id, quantity);

    #[cfg(feature = "instrument")]
    tracing::info!(
        target: "trade",
        side = "buy",
        good = name.as_str(),
        quantity = quantity as u64,
        price = listing.price,
        credits = game.player.credits,
    );

    Ok(format!("Bought {} {} for {} credits.", quantity, name, cost))
}

pub fn sell(game: &mut GameState, good_index: usize, amount: i64) -> Result<String, GameError> {
    let quantity = positive_quantity(amount)?;
    let (good_id, good) = game.good_at(good_index)?;
    let name = good.name.clone();

    let held = game.player.ship.cargo_of(good_id);
    if held < quantity {
        return Err(GameError::NotInCargo {
            good: name,
            requested: quantity,
            held,
        });
    }
    let price = game
        .current_planet()
        .market
        .price(good_id)
        .ok_or_else(|| GameError::NotTraded { good: name.clone() })?;

    let revenue = price * quantity as Credits;
    game.player.ship.remove_cargo(good_id, quantity);
    if let Some(listing) = game.current_planet_mut().market.listing_mut(good_id) {
        listing.stock += quantity;
    }
    game.player.credits += revenue;

    #[cfg(feature = "instrument")]
    tracing::info!(
        target: "trade",
        side = "sell",
        good = name.as_str(),
        quantity = quantity as u64,
        price = price,
        credits = game.player.credits,
    );

    Ok(format!("Sold {} {} for {} credits.", quantity, name, revenue))
}

pub fn refuel(game: &mut GameState, amount: i64) -> Result<String, GameError> {
    if amount <= 0 {
        return Err(GameError::InvalidAmount { amount });
    }
    let quantity: Fuel = amount;
    let space = game.player.ship.tank_space();
    if quantity > space {
        return Err(GameError::TankFull {
            requested: quantity,
            space,
        });
    }
    let price = game.current_planet().market.fuel_price;
    let cost = price * quantity;
    if cost > game.player.credits {
        return Err(GameError::InsufficientCredits {
            needed: cost,
            available: game.player.credits,
        });
    }

    game.player.ship.fuel += quantity;
    game.player.credits -= cost;

    #[cfg(feature = "instrument")]
    tracing::info!(
        target: "trade",
        side = "refuel",
        good = "fuel",
        quantity = quantity as u64,
        price = price,
        credits = game.player.credits,
    );

    Ok(format!("Bought {} fuel for {} credits.", quantity, cost))
}

// ============================================================================
// Ship upgrades
// ============================================================================

pub fn upgrade(game: &mut GameState, component: ShipComponent) -> Result<String, GameError> {
    let upgrades = &game.config.ship_upgrades;
    let ship = &game.player.ship;
    let next = ship.level(component) + 1;
    let cost = upgrades
        .cost(component, next)
        .ok_or(GameError::MaxUpgradeLevel { component })?;

    // A smaller hold or tank than what is already aboard is refused
    let (new_capacity, in_use) = match component {
        ShipComponent::CargoHold => (
            upgrades.cargo_hold[next].size as i64,
            ship.cargo_used() as i64,
        ),
        ShipComponent::FuelTank => (upgrades.fuel_tank[next].capacity, ship.fuel),
        ShipComponent::Engine => (0, 0),
    };
    if new_capacity < in_use {
        return Err(GameError::UpgradeWouldStrand {
            component,
            new_capacity,
            in_use,
        });
    }
    if cost > game.player.credits {
        return Err(GameError::InsufficientCredits {
            needed: cost,
            available: game.player.credits,
        });
    }

    game.player.credits -= cost;
    game.player
        .ship
        .set_level(component, next, &game.config.ship_upgrades);

    #[cfg(feature = "instrument")]
    tracing::info!(
        target: "trade",
        side = "upgrade",
        good = component.display_name(),
        quantity = next as u64,
        price = cost,
        credits = game.player.credits,
    );

    Ok(format!(
        "Upgraded your {} to level {} for {} credits.",
        component.display_name(),
        next + 1,
        cost
    ))
}

// ============================================================================
// Missions
// ============================================================================

pub fn accept_mission(game: &mut GameState, index: usize) -> Result<String, GameError> {
    if game.player.current_mission.is_some() {
        return Err(GameError::MissionAlreadyActive);
    }
    let available = game.current_planet().mission_board.len();
    if index >= available {
        return Err(GameError::InvalidSelection {
            what: "mission",
            index,
            available,
        });
    }

    let mission = game.current_planet_mut().mission_board.remove(index);
    let message = format!(
        "Mission accepted: deliver {} {} to {} for {} credits.",
        mission.quantity(),
        game.goods[mission.good()].name,
        game.planets[mission.destination()].name,
        mission.reward()
    );
    game.player.current_mission = Some(mission);
    Ok(message)
}

/// Hand in the active mission if the player is at its destination with
/// enough cargo aboard. Returns the narrative line on completion.
pub fn complete_mission(game: &mut GameState) -> Option<String> {
    let mission = game.player.current_mission.as_ref()?;
    if mission.destination() != game.player.location
        || game.player.ship.cargo_of(mission.good()) < mission.quantity()
    {
        return None;
    }
    let mission = game.player.current_mission.take()?;

    game.player.ship.remove_cargo(mission.good(), mission.quantity());
    game.player.credits += mission.reward();
    *game
        .player
        .reputation
        .entry(mission.faction().to_string())
        .or_insert(0) += 1;

    #[cfg(feature = "instrument")]
    tracing::info!(
        target: "mission",
        faction = mission.faction(),
        reward = mission.reward(),
        quantity = mission.quantity() as u64,
    );

    Some(format!(
        "Mission complete! Delivered {} {} and earned {} credits.",
        mission.quantity(),
        game.goods[mission.good()].name,
        mission.reward()
    ))
}

// ============================================================================
// Debt
// ============================================================================

pub fn repay_debt(game: &mut GameState, amount: Credits) -> Result<String, GameError> {
    if game.player.debt <= 0 && amount > 0 {
        return Ok("You have no debt to repay.".to_string());
    }
    let repaid = debt::repay(&mut game.player, amount)?;
    Ok(format!(
        "Repaid {} credits. Remaining debt: {}.",
        repaid, game.player.debt
    ))
}

pub fn toggle_display(game: &mut GameState) -> String {
    game.player.display = game.player.display.toggled();
    format!("Display mode set to {:?}.", game.player.display)
}
