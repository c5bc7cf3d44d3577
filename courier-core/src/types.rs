use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use tsify_next::Tsify;

// ============================================================================
// IDs - Using slotmap for generational indices
// ============================================================================

new_key_type! {
    pub struct GoodId;
    pub struct PlanetId;
}

/// Trait for converting SlotMap keys to u64 for WASM boundary
pub trait KeyToU64 {
    fn to_u64(self) -> u64;
}

impl KeyToU64 for GoodId {
    fn to_u64(self) -> u64 {
        self.0.as_ffi()
    }
}

impl KeyToU64 for PlanetId {
    fn to_u64(self) -> u64 {
        self.0.as_ffi()
    }
}

// ============================================================================
// Numeric aliases
// ============================================================================

/// Money. Signed: loans and rewards can push it anywhere, spending checks
/// treat anything at or below zero as broke.
pub type Credits = i64;

/// Units of stock or cargo.
pub type Quantity = u32;

/// Fuel units. Signed because in-transit fuel loss is not floored.
pub type Fuel = i64;

// ============================================================================
// Ship components
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "snake_case")]
pub enum ShipComponent {
    CargoHold,
    FuelTank,
    Engine,
}

impl ShipComponent {
    pub fn all() -> impl Iterator<Item = ShipComponent> {
        [
            ShipComponent::CargoHold,
            ShipComponent::FuelTank,
            ShipComponent::Engine,
        ]
        .into_iter()
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ShipComponent::CargoHold => "cargo hold",
            ShipComponent::FuelTank => "fuel tank",
            ShipComponent::Engine => "engine",
        }
    }
}

// ============================================================================
// Display preference (cosmetic)
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum DisplayMode {
    #[default]
    Table,
    List,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::Table => DisplayMode::List,
            DisplayMode::List => DisplayMode::Table,
        }
    }
}
