use std::fmt;

use crate::types::{Credits, Fuel, Quantity, ShipComponent};

/// Broad class of a recoverable command failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-range input
    Validation,
    /// Not enough fuel, credits, cargo space or stock
    InsufficientResource,
}

/// A command that could not be carried out. State is never touched when
/// one of these is returned.
#[derive(Debug, Clone, PartialEq)]
pub enum GameError {
    InvalidAmount {
        amount: i64,
    },
    InvalidSelection {
        what: &'static str,
        index: usize,
        available: usize,
    },
    MissionAlreadyActive,
    MaxUpgradeLevel {
        component: ShipComponent,
    },
    UpgradeWouldStrand {
        component: ShipComponent,
        new_capacity: i64,
        in_use: i64,
    },
    InsufficientFuel {
        needed: Fuel,
        available: Fuel,
    },
    InsufficientCredits {
        needed: Credits,
        available: Credits,
    },
    InsufficientCargoSpace {
        needed: Quantity,
        free: Quantity,
    },
    InsufficientStock {
        good: String,
        requested: Quantity,
        available: Quantity,
    },
    NotInCargo {
        good: String,
        requested: Quantity,
        held: Quantity,
    },
    TankFull {
        requested: Fuel,
        space: Fuel,
    },
    NotTraded {
        good: String,
    },
    UnrecognizedCommand {
        input: String,
    },
    GameOver,
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::InvalidAmount { .. }
            | GameError::InvalidSelection { .. }
            | GameError::MissionAlreadyActive
            | GameError::MaxUpgradeLevel { .. }
            | GameError::UpgradeWouldStrand { .. }
            | GameError::NotTraded { .. }
            | GameError::UnrecognizedCommand { .. }
            | GameError::GameOver => ErrorKind::Validation,
            GameError::InsufficientFuel { .. }
            | GameError::InsufficientCredits { .. }
            | GameError::InsufficientCargoSpace { .. }
            | GameError::InsufficientStock { .. }
            | GameError::NotInCargo { .. }
            | GameError::TankFull { .. } => ErrorKind::InsufficientResource,
        }
    }
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::InvalidAmount { amount } => {
                write!(f, "Invalid amount: {}. Please enter a positive number.", amount)
            }
            GameError::InvalidSelection {
                what,
                index,
                available,
            } => {
                if *available == 0 {
                    write!(f, "There is no {} to choose from.", what)
                } else {
                    write!(
                        f,
                        "Invalid {} choice {}. Choose between 1 and {}.",
                        what,
                        index + 1,
                        available
                    )
                }
            }
            GameError::MissionAlreadyActive => {
                write!(f, "You already have an active mission.")
            }
            GameError::MaxUpgradeLevel { component } => {
                write!(f, "Your {} is already fully upgraded.", component.display_name())
            }
            GameError::UpgradeWouldStrand {
                component,
                new_capacity,
                in_use,
            } => write!(
                f,
                "The new {} holds {} but {} is in use.",
                component.display_name(),
                new_capacity,
                in_use
            ),
            GameError::InsufficientFuel { needed, available } => write!(
                f,
                "Not enough fuel. Need {}, have {}.",
                needed, available
            ),
            GameError::InsufficientCredits { needed, available } => write!(
                f,
                "Not enough credits. Need {}, have {}.",
                needed, available
            ),
            GameError::InsufficientCargoSpace { needed, free } => write!(
                f,
                "Not enough cargo space. Need {}, have {} free.",
                needed, free
            ),
            GameError::InsufficientStock {
                good,
                requested,
                available,
            } => write!(
                f,
                "Not enough {} in stock. Requested {}, available {}.",
                good, requested, available
            ),
            GameError::NotInCargo {
                good,
                requested,
                held,
            } => write!(
                f,
                "You don't have {} {} in your cargo hold (holding {}).",
                requested, good, held
            ),
            GameError::TankFull { requested, space } => write!(
                f,
                "Cannot add {} fuel, only {} units of tank space left.",
                requested, space
            ),
            GameError::NotTraded { good } => {
                write!(f, "This planet doesn't buy {}.", good)
            }
            GameError::UnrecognizedCommand { input } => {
                write!(f, "Invalid action '{}'. Nothing happens.", input)
            }
            GameError::GameOver => write!(f, "The game is over."),
        }
    }
}

impl std::error::Error for GameError {}

/// Fatal problems detected while building a game from configuration.
#[derive(Debug)]
pub enum ConfigError {
    Json(serde_json::Error),
    UnknownStartingPlanet(String),
    UnknownPlanet(String),
    DuplicateName { kind: &'static str, name: String },
    MissingModifier { tech_level: u32, key: String },
    MissingDistance { from: String, to: String },
    EmptyUpgradeTable(ShipComponent),
    InvalidRange { what: String, min: i64, max: i64 },
    EmptyCatalog(&'static str),
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Json(e) => write!(f, "Invalid configuration JSON: {}", e),
            ConfigError::UnknownStartingPlanet(name) => {
                write!(f, "Starting planet '{}' is not a known planet", name)
            }
            ConfigError::UnknownPlanet(name) => write!(f, "Unknown planet '{}'", name),
            ConfigError::DuplicateName { kind, name } => {
                write!(f, "Duplicate {} name '{}'", kind, name)
            }
            ConfigError::MissingModifier { tech_level, key } => write!(
                f,
                "Tech level {} has no modifier for '{}'",
                tech_level, key
            ),
            ConfigError::MissingDistance { from, to } => {
                write!(f, "No distance between '{}' and '{}'", from, to)
            }
            ConfigError::EmptyUpgradeTable(component) => write!(
                f,
                "Upgrade table for {} has no levels",
                component.display_name()
            ),
            ConfigError::InvalidRange { what, min, max } => {
                write!(f, "Invalid range for {}: [{}, {}]", what, min, max)
            }
            ConfigError::EmptyCatalog(what) => write!(f, "No {} configured", what),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Json(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            GameError::InvalidAmount { amount: -3 }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            GameError::InsufficientCredits {
                needed: 10,
                available: 5
            }
            .kind(),
            ErrorKind::InsufficientResource
        );
        assert_eq!(
            GameError::UnrecognizedCommand {
                input: "dance".to_string()
            }
            .kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_selection_message_is_one_based() {
        let err = GameError::InvalidSelection {
            what: "destination",
            index: 4,
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "Invalid destination choice 5. Choose between 1 and 2."
        );
    }
}
