use rand::SeedableRng;
use rand::rngs::StdRng;
use wasm_bindgen::prelude::*;

pub mod actions;
pub mod config;
pub mod debt;
pub mod entities;
pub mod error;
pub mod events;
pub mod market;
pub mod missions;
pub mod state;
pub mod travel;
pub mod turn;
pub mod types;

pub use config::*;
pub use entities::*;
pub use error::*;
pub use events::{ActiveEffects, ActiveEvent, EffectKind, EventEffect, EventTemplate};
pub use market::{Market, MarketListing, generate_market};
pub use missions::MissionTemplate;
pub use state::*;
pub use travel::{Incident, RandomEffect, RandomEventTemplate, TravelPlan, plan_travel};
pub use turn::*;
pub use types::*;

#[cfg(feature = "instrument")]
pub use instrument;

// ============================================================================
// WASM API - Session
// ============================================================================

/// One game of Cosmic Courier, driven a turn at a time from JS.
#[wasm_bindgen]
pub struct Session {
    game: GameState,
    engine: TurnEngine,
    rng: StdRng,
    last_lines: Vec<String>,
}

#[wasm_bindgen]
impl Session {
    /// Start a game from a JSON configuration with a fixed seed.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str, player_name: &str, seed: u64) -> Result<Session, JsError> {
        // Better panic messages in browser console
        console_error_panic_hook::set_once();

        let config = GameConfig::from_json_str(config_json)?;
        Ok(Self::from_config(config, player_name, seed)?)
    }

    /// Start a game seeded from the wall clock.
    #[wasm_bindgen]
    pub fn with_clock_seed(config_json: &str, player_name: &str) -> Result<Session, JsError> {
        Self::new(config_json, player_name, js_sys::Date::now() as u64)
    }

    /// Start a game in the bundled galaxy.
    #[wasm_bindgen]
    pub fn with_default_scenario(player_name: &str, seed: u64) -> Result<Session, JsError> {
        console_error_panic_hook::set_once();
        Ok(Self::from_config(GameConfig::default_scenario()?, player_name, seed)?)
    }

    /// Play one turn. `accept_loan` answers the emergency loan offer if the
    /// player turns out to be stranded this turn.
    #[wasm_bindgen]
    pub fn step(&mut self, command: Command, accept_loan: bool) -> TurnReport {
        let report = self
            .engine
            .step(&mut self.game, command, &mut self.rng, |_| accept_loan);
        self.last_lines = report.lines.clone();
        report
    }

    #[wasm_bindgen]
    pub fn get_turn(&self) -> u64 {
        self.game.turn
    }

    #[wasm_bindgen]
    pub fn is_finished(&self) -> bool {
        self.engine.is_finished()
    }

    #[wasm_bindgen]
    pub fn get_turn_state(&self) -> TurnState {
        self.engine.state()
    }

    /// Get a snapshot of the current state for rendering
    #[wasm_bindgen]
    pub fn get_state_snapshot(&self) -> StateSnapshot {
        self.game.snapshot()
    }

    /// Narrative lines from the most recent turn
    #[wasm_bindgen]
    pub fn get_narrative(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.last_lines).map_err(Into::into)
    }
}

// Native-side API (not exported to JS)
impl Session {
    pub fn from_config(
        config: GameConfig,
        player_name: &str,
        seed: u64,
    ) -> Result<Session, ConfigError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let game = GameState::new(config, player_name, &mut rng)?;
        Ok(Self {
            game,
            engine: TurnEngine::new(),
            rng,
            last_lines: Vec::new(),
        })
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut GameState {
        &mut self.game
    }

    /// Like `step`, but lets the caller decide on a loan after seeing it.
    pub fn step_with<L: FnOnce(&LoanOffer) -> bool>(
        &mut self,
        command: Command,
        accept_loan: L,
    ) -> TurnReport {
        let report = self
            .engine
            .step(&mut self.game, command, &mut self.rng, accept_loan);
        self.last_lines = report.lines.clone();
        report
    }

    pub fn last_lines(&self) -> &[String] {
        &self.last_lines
    }
}
