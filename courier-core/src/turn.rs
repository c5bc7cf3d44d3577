//! The per-turn state machine.
//!
//! Every step runs the same fixed sequence: galactic events age and roll,
//! interest accrues, an active mission may be handed in, the end conditions
//! are checked, and only then is the player's command carried out.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::actions;
use crate::debt;
use crate::error::GameError;
use crate::events;
use crate::state::GameState;
use crate::types::{Credits, ShipComponent};

// ============================================================================
// Commands
// ============================================================================

/// One player action per turn. Indices are 0-based positions in the lists
/// shown to the player (goods in catalog order, destinations excluding the
/// current planet, the current mission board).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    Travel { destination: usize },
    Buy { good: usize, quantity: i64 },
    Sell { good: usize, quantity: i64 },
    Refuel { quantity: i64 },
    Upgrade { component: ShipComponent },
    AcceptMission { index: usize },
    RepayDebt { amount: Credits },
    ToggleDisplay,
    Quit,
    /// Input the front end could not make sense of
    Unrecognized { input: String },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Travel { .. } => "travel",
            Command::Buy { .. } => "buy",
            Command::Sell { .. } => "sell",
            Command::Refuel { .. } => "refuel",
            Command::Upgrade { .. } => "upgrade",
            Command::AcceptMission { .. } => "accept_mission",
            Command::RepayDebt { .. } => "repay_debt",
            Command::ToggleDisplay => "toggle_display",
            Command::Quit => "quit",
            Command::Unrecognized { .. } => "unrecognized",
        }
    }
}

// ============================================================================
// Turn state
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    #[default]
    Playing,
    Won,
    LostToDebt,
    LostToStranding,
    Quit,
}

impl TurnState {
    pub fn is_terminal(self) -> bool {
        self != TurnState::Playing
    }
}

/// Emergency loan put to the player when they are stranded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanOffer {
    pub amount: Credits,
    pub interest_rate: f64,
}

#[derive(Debug, Clone, Serialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct TurnReport {
    pub turn: u64,
    pub state: TurnState,
    /// Narrative produced by the turn, in order
    pub lines: Vec<String>,
    /// Whether the player's command went through. `false` if it was
    /// rejected or never ran because the game ended first.
    pub success: bool,
    #[serde(skip)]
    pub error: Option<GameError>,
}

// ============================================================================
// Turn engine
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct TurnEngine {
    state: TurnState,
}

impl TurnEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Terminal states are absorbing.
    fn transition(&mut self, next: TurnState) {
        if !self.state.is_terminal() {
            self.state = next;
        }
    }

    /// Run one full turn. `accept_loan` is asked only when the player is
    /// stranded; declining ends the game.
    pub fn step<R, L>(
        &mut self,
        game: &mut GameState,
        command: Command,
        rng: &mut R,
        accept_loan: L,
    ) -> TurnReport
    where
        R: Rng,
        L: FnOnce(&LoanOffer) -> bool,
    {
        if self.is_finished() {
            return TurnReport {
                turn: game.turn,
                state: self.state,
                lines: vec![GameError::GameOver.to_string()],
                success: false,
                error: Some(GameError::GameOver),
            };
        }

        game.turn += 1;
        let mut lines = events::advance(
            &mut game.active_events,
            &game.config.events,
            game.config.travel_options.event_trigger_chance,
            rng,
        );

        let interest = debt::accrue_interest(&mut game.player, game.config.loan_system.interest_rate);
        if interest > 0 {
            lines.push(format!(
                "Interest of {} credits added. Debt is now {}.",
                interest, game.player.debt
            ));
        }

        if let Some(line) = actions::complete_mission(game) {
            lines.push(line);
        }

        if self.check_end(game, &mut lines, accept_loan) {
            return self.report(game, lines, false, None);
        }

        #[cfg(feature = "instrument")]
        let command_name = command.name();
        let result = self.dispatch(game, command, rng);
        let (success, error) = match result {
            Ok(message) => {
                lines.extend(message.lines().map(str::to_string));
                (true, None)
            }
            Err(err) => {
                lines.push(err.to_string());
                (false, Some(err))
            }
        };

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "turn",
            turn = game.turn,
            command = command_name,
            success = success,
            credits = game.player.credits,
            debt = game.player.debt,
            fuel = game.player.ship.fuel,
        );

        self.report(game, lines, success, error)
    }

    /// Win, debt and stranding checks, in that order. Returns `true` when the
    /// game ended before the command could run.
    fn check_end<L>(
        &mut self,
        game: &mut GameState,
        lines: &mut Vec<String>,
        accept_loan: L,
    ) -> bool
    where
        L: FnOnce(&LoanOffer) -> bool,
    {
        if game.has_won() {
            self.transition(TurnState::Won);
            lines.push(format!(
                "Congratulations! You reached {} credits debt-free and won the game!",
                game.player.credits
            ));
            return true;
        }

        if game.has_lost_to_debt() {
            self.transition(TurnState::LostToDebt);
            lines.push(format!(
                "Your debt of {} exceeds the limit of {}. Game over.",
                game.player.debt, game.config.game_goals.max_debt
            ));
            return true;
        }

        if game.is_stranded() {
            let offer = LoanOffer {
                amount: game.config.loan_system.loan_amount,
                interest_rate: game.config.loan_system.interest_rate,
            };
            if accept_loan(&offer) {
                debt::issue_loan(&mut game.player, offer.amount);
                lines.push(format!(
                    "You took an emergency loan of {} credits at {:.1}% interest per turn.",
                    offer.amount,
                    offer.interest_rate * 100.0
                ));
            } else {
                self.transition(TurnState::LostToStranding);
                lines.push("Stranded with no fuel, credits or cargo. Game over.".to_string());
                return true;
            }
        }

        false
    }

    fn dispatch<R: Rng>(
        &mut self,
        game: &mut GameState,
        command: Command,
        rng: &mut R,
    ) -> Result<String, GameError> {
        match command {
            Command::Travel { destination } => actions::travel(game, destination, rng),
            Command::Buy { good, quantity } => actions::buy(game, good, quantity),
            Command::Sell { good, quantity } => actions::sell(game, good, quantity),
            Command::Refuel { quantity } => actions::refuel(game, quantity),
            Command::Upgrade { component } => actions::upgrade(game, component),
            Command::AcceptMission { index } => actions::accept_mission(game, index),
            Command::RepayDebt { amount } => actions::repay_debt(game, amount),
            Command::ToggleDisplay => Ok(actions::toggle_display(game)),
            Command::Quit => {
                self.transition(TurnState::Quit);
                Ok("Thanks for playing Cosmic Courier!".to_string())
            }
            Command::Unrecognized { input } => Err(GameError::UnrecognizedCommand { input }),
        }
    }

    fn report(
        &self,
        game: &GameState,
        lines: Vec<String>,
        success: bool,
        error: Option<GameError>,
    ) -> TurnReport {
        TurnReport {
            turn: game.turn,
            state: self.state,
            lines,
            success,
            error,
        }
    }
}
