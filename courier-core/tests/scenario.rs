//! End-to-end runs of a simple trading bot, checked through the telemetry
//! tables the game emits.
#![cfg(feature = "instrument")]

use std::collections::HashMap;

use courier_core::instrument::{Capture, Telemetry};
use courier_core::{Command, GameConfig, GameState, Session, TurnReport};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// === BOT ===

/// Sells everything, buys the best bargain, tops up the tank, pays down
/// debt, accepts a mission when idle and flies somewhere at random.
struct Trader {
    rng: StdRng,
    buys: usize,
    sells: usize,
}

impl Trader {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            buys: 0,
            sells: 0,
        }
    }

    /// Commands to issue while docked, one per turn.
    fn plan(&mut self, game: &GameState) -> Vec<Command> {
        let mut commands = Vec::new();
        let planet = game.current_planet();
        let ship = &game.player.ship;

        for (index, (id, _)) in game.goods.iter().enumerate() {
            let held = ship.cargo_of(id);
            if held > 0 && planet.market.listing(id).is_some() {
                commands.push(Command::Sell {
                    good: index,
                    quantity: held as i64,
                });
            }
        }

        let bargain = game
            .goods
            .iter()
            .enumerate()
            .filter_map(|(index, (id, good))| {
                planet
                    .market
                    .listing(id)
                    .filter(|l| l.stock > 0 && l.price > 0)
                    .map(|l| (index, l.price as f64 / good.base_price, l.price))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((index, _, price)) = bargain {
            let budget = (game.player.credits / 2).max(0);
            let quantity = (budget / price).min(ship.cargo_hold_size() as i64 / 2);
            if quantity > 0 {
                commands.push(Command::Buy {
                    good: index,
                    quantity,
                });
            }
        }

        let missing = ship.fuel_capacity() - ship.fuel.max(0);
        if missing > 0 {
            commands.push(Command::Refuel { quantity: missing });
        }

        // Overpay once comfortably ahead, chip away otherwise
        let (credits, debt) = (game.player.credits, game.player.debt);
        if debt > 0 {
            let amount = if credits > debt * 2 { debt * 2 } else { credits / 4 };
            if amount > 0 {
                commands.push(Command::RepayDebt { amount });
            }
        }

        if game.player.current_mission.is_none() && !planet.mission_board.is_empty() {
            commands.push(Command::AcceptMission { index: 0 });
        }

        let destinations = game.destinations().len();
        commands.push(Command::Travel {
            destination: self.rng.random_range(0..destinations),
        });
        commands
    }

    fn record(&mut self, command: &Command, report: &TurnReport) {
        if !report.success {
            return;
        }
        match command {
            Command::Buy { .. } => self.buys += 1,
            Command::Sell { .. } => self.sells += 1,
            _ => {}
        }
    }
}

struct Run {
    telemetry: Telemetry,
    turns: usize,
    trader: Trader,
    final_credits: i64,
    final_debt: i64,
}

fn run_trader(config: GameConfig, seed: u64, max_turns: usize) -> Run {
    run_trader_from(config, seed, max_turns, |_| {})
}

fn run_trader_from(
    config: GameConfig,
    seed: u64,
    max_turns: usize,
    prepare: impl FnOnce(&mut GameState),
) -> Run {
    let capture = Capture::start();
    let mut session = Session::from_config(config, "Bot", seed).unwrap();
    prepare(session.game_mut());
    let mut trader = Trader::new(seed);
    let mut turns = 0;

    'game: while turns < max_turns {
        for command in trader.plan(session.game()) {
            let report = session.step_with(command.clone(), |_| true);
            trader.record(&command, &report);
            if report.state.is_terminal() {
                break 'game;
            }
            turns += 1;
            if turns >= max_turns {
                break 'game;
            }
        }
    }

    Run {
        final_credits: session.game().player.credits,
        final_debt: session.game().player.debt,
        telemetry: capture.finish(),
        turns,
        trader,
    }
}

// === TESTS ===

#[test]
fn scenario_turn_log_matches_play() {
    let run = run_trader(GameConfig::default_scenario().unwrap(), 11, 120);
    let turns = run.telemetry.table("turn").unwrap();

    assert_eq!(turns.len(), run.turns);
    assert_eq!(
        turns.i64s("turn"),
        (1..=run.turns as i64).collect::<Vec<_>>()
    );
    assert_eq!(turns.i64s("credits").last().copied(), Some(run.final_credits));

    let trades = run.telemetry.table("trade").unwrap();
    assert_eq!(trades.filter_eq("side", "buy").count(), run.trader.buys);
    assert_eq!(trades.filter_eq("side", "sell").count(), run.trader.sells);
}

#[test]
fn scenario_prices_center_on_base_price() {
    let config = GameConfig::default_scenario().unwrap();
    let base: HashMap<&str, f64> = config
        .goods
        .iter()
        .map(|g| (g.name.as_str(), g.base_price))
        .collect();

    let run = run_trader(config.clone(), 23, 200);
    let market = run.telemetry.table("market").unwrap().to_dataframe().unwrap();

    // price / modifier strips out tech level and events, leaving base * noise
    let by_good = market
        .clone()
        .lazy()
        .with_column((col("price").cast(DataType::Float64) / col("modifier")).alias("unmodified"))
        .group_by([col("good")])
        .agg([
            col("unmodified").min().alias("low"),
            col("unmodified").max().alias("high"),
            col("unmodified").mean().alias("mean"),
        ])
        .sort(["good"], Default::default())
        .collect()
        .unwrap();

    let goods: Vec<&str> = by_good
        .column("good")
        .unwrap()
        .str()
        .unwrap()
        .into_no_null_iter()
        .collect();
    let get = |name: &str| -> Vec<f64> {
        by_good
            .column(name)
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect()
    };
    let (low, high, mean) = (get("low"), get("high"), get("mean"));

    assert_eq!(goods.len(), config.goods.len());
    for (i, good) in goods.iter().enumerate() {
        let base = base[good];
        // Rounding to whole credits can push a sample a credit or two past the band
        assert!(
            low[i] >= base * 0.9 - 2.0 && high[i] <= base * 1.1 + 2.0,
            "{}: observed [{:.1}, {:.1}] for base {}",
            good,
            low[i],
            high[i],
            base
        );
        assert!(
            (mean[i] / base - 1.0).abs() < 0.05,
            "{}: mean {:.1} drifts from base {}",
            good,
            mean[i],
            base
        );
    }
}

#[test]
fn scenario_stock_falls_as_price_modifier_rises() {
    let mut config = GameConfig::default_scenario().unwrap();
    config.travel_options.event_trigger_chance = 0.0;
    let run = run_trader(config, 5, 200);
    let market = run.telemetry.table("market").unwrap().to_dataframe().unwrap();

    let water = market
        .clone()
        .lazy()
        .filter(col("good").eq(lit("Water")))
        .group_by([col("tech_level")])
        .agg([
            col("modifier").mean().alias("modifier"),
            col("stock").cast(DataType::Float64).mean().alias("stock"),
        ])
        .sort(["modifier"], Default::default())
        .collect()
        .unwrap();

    let stock: Vec<f64> = water
        .column("stock")
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect();
    assert!(stock.len() >= 2, "bot visited too few tech levels");
    for pair in stock.windows(2) {
        assert!(
            pair[0] > pair[1],
            "stock should drop as the modifier rises: {:?}",
            stock
        );
    }
}

#[test]
fn scenario_debt_rows_reconcile() {
    let config = GameConfig::default_scenario().unwrap();
    let loan = config.loan_system.loan_amount;
    // Start stranded so the first turn takes the emergency loan
    let run = run_trader_from(config, 31, 150, |game| {
        game.player.ship.fuel = 0;
        game.player.credits = 0;
    });
    let debt = run.telemetry.table("debt").unwrap();

    let count = |action: &str| debt.filter_eq("action", action).count();
    assert!(count("loan") >= 1, "no emergency loan was taken");
    assert!(count("interest") >= 1, "no interest accrued");
    assert!(count("repay") >= 1, "debt was never repaid");

    let actions = debt.strs("action");
    let amounts = debt.i64s("amount");
    let balances = debt.i64s("debt");
    assert_eq!(actions[0], "loan");

    let mut running = 0i64;
    for ((action, amount), balance) in actions.iter().zip(&amounts).zip(&balances) {
        assert!(*amount >= 0, "{} row with negative amount {}", action, amount);
        match *action {
            "loan" => {
                assert_eq!(*amount, loan);
                running += amount;
            }
            "interest" => running += amount,
            "repay" => {
                assert!(*amount <= running, "repaid {} of {}", amount, running);
                running -= amount;
            }
            other => panic!("unexpected debt action {}", other),
        }
        assert_eq!(*balance, running, "after {} of {}", action, amount);
    }
    assert_eq!(running, run.final_debt);
}
