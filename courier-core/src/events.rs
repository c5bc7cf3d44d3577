//! Galactic events: time-boxed global effects on prices and travel risk.
//!
//! Templates are static configuration. An active event only records which
//! template it came from and how many turns it has left, so nothing about a
//! template can be changed by running the game.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Good type that matches every good.
pub const ANY_GOOD_TYPE: &str = "*";

fn any_good_type() -> String {
    ANY_GOOD_TYPE.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    PriceModifier,
    TravelRiskModifier,
    /// Effect types this engine does not know about are carried but inert
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEffect {
    #[serde(rename = "type")]
    pub kind: EffectKind,
    /// Good type targeted by a price modifier, `*` for all
    #[serde(default = "any_good_type", alias = "target")]
    pub good_type: String,
    pub multiplier: f64,
}

impl EventEffect {
    fn targets(&self, good_type: &str) -> bool {
        self.good_type == ANY_GOOD_TYPE || self.good_type == good_type
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventTemplate {
    pub name: String,
    pub description: String,
    /// Nominal length in turns
    pub duration: u32,
    #[serde(default)]
    pub effects: Vec<EventEffect>,
}

/// A running instance of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveEvent {
    /// Index into the configured template pool
    pub template: usize,
    pub remaining: i64,
}

impl ActiveEvent {
    pub fn from_template(templates: &[EventTemplate], template: usize) -> Self {
        Self {
            template,
            remaining: templates
                .get(template)
                .map(|t| t.duration as i64)
                .unwrap_or(0),
        }
    }

    pub fn template<'a>(&self, templates: &'a [EventTemplate]) -> Option<&'a EventTemplate> {
        templates.get(self.template)
    }

    pub fn name<'a>(&self, templates: &'a [EventTemplate]) -> &'a str {
        self.template(templates)
            .map(|t| t.name.as_str())
            .unwrap_or("")
    }
}

// ============================================================================
// Effect queries
// ============================================================================

/// Read-only view over the active events and the templates they point at.
#[derive(Debug, Clone, Copy)]
pub struct ActiveEffects<'a> {
    templates: &'a [EventTemplate],
    active: &'a [ActiveEvent],
}

impl<'a> ActiveEffects<'a> {
    pub fn new(templates: &'a [EventTemplate], active: &'a [ActiveEvent]) -> Self {
        Self { templates, active }
    }

    pub fn none() -> ActiveEffects<'static> {
        ActiveEffects {
            templates: &[],
            active: &[],
        }
    }

    fn effects(&self) -> impl Iterator<Item = &'a EventEffect> + '_ {
        self.active
            .iter()
            .filter_map(|a| a.template(self.templates))
            .flat_map(|t| t.effects.iter())
    }

    /// Product of every price modifier aimed at this good type.
    pub fn price_multiplier(&self, good_type: &str) -> f64 {
        self.effects()
            .filter(|e| e.kind == EffectKind::PriceModifier && e.targets(good_type))
            .map(|e| e.multiplier)
            .product()
    }

    /// Product of every travel risk modifier.
    pub fn travel_risk_multiplier(&self) -> f64 {
        self.effects()
            .filter(|e| e.kind == EffectKind::TravelRiskModifier)
            .map(|e| e.multiplier)
            .product()
    }
}

// ============================================================================
// Event lifecycle
// ============================================================================

/// Advance the event clock by one turn.
///
/// Ages every active event and drops the ones that ran out, then rolls for a
/// new event. A draw whose name is already active is discarded. Returns the
/// narrative lines for the turn.
pub fn advance<R: Rng>(
    active: &mut Vec<ActiveEvent>,
    templates: &[EventTemplate],
    trigger_chance: f64,
    rng: &mut R,
) -> Vec<String> {
    let mut lines = Vec::new();

    for event in active.iter_mut() {
        event.remaining -= 1;
    }
    active.retain(|event| {
        if event.remaining > 0 {
            return true;
        }
        let name = event.name(templates);
        lines.push(format!("The {} event has ended.", name));

        #[cfg(feature = "instrument")]
        tracing::info!(target: "event", name = name, change = "ended");

        false
    });

    let roll: f64 = rng.random();
    if roll < trigger_chance && !templates.is_empty() {
        let index = rng.random_range(0..templates.len());
        let template = &templates[index];
        let already_active = active
            .iter()
            .any(|event| event.name(templates) == template.name);

        if !already_active {
            active.push(ActiveEvent::from_template(templates, index));
            lines.push(format!("EVENT: {} has begun!", template.name));
            lines.push(template.description.clone());

            #[cfg(feature = "instrument")]
            tracing::info!(
                target: "event",
                name = template.name.as_str(),
                change = "began",
                duration = template.duration as u64,
            );
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn template(name: &str, duration: u32, effects: Vec<EventEffect>) -> EventTemplate {
        EventTemplate {
            name: name.to_string(),
            description: format!("{} description", name),
            duration,
            effects,
        }
    }

    fn risk(multiplier: f64) -> EventEffect {
        EventEffect {
            kind: EffectKind::TravelRiskModifier,
            good_type: ANY_GOOD_TYPE.to_string(),
            multiplier,
        }
    }

    #[test]
    fn test_events_expire_after_duration() {
        let templates = vec![template("Solar Flare", 2, vec![])];
        let mut active = vec![ActiveEvent::from_template(&templates, 0)];
        let mut rng = StdRng::seed_from_u64(1);

        let lines = advance(&mut active, &templates, 0.0, &mut rng);
        assert!(lines.is_empty());
        assert_eq!(active[0].remaining, 1);

        let lines = advance(&mut active, &templates, 0.0, &mut rng);
        assert!(active.is_empty());
        assert_eq!(lines, vec!["The Solar Flare event has ended.".to_string()]);
    }

    #[test]
    fn test_certain_trigger_starts_event_with_full_duration() {
        let templates = vec![template("Pirate Surge", 4, vec![risk(2.0)])];
        let mut active = Vec::new();
        let mut rng = StdRng::seed_from_u64(9);

        let lines = advance(&mut active, &templates, 1.0, &mut rng);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].remaining, 4);
        assert_eq!(lines[0], "EVENT: Pirate Surge has begun!");
        assert_eq!(lines[1], "Pirate Surge description");
    }

    #[test]
    fn test_duplicate_draw_is_discarded() {
        let templates = vec![template("Pirate Surge", 4, vec![risk(2.0)])];
        let mut active = vec![ActiveEvent::from_template(&templates, 0)];
        let mut rng = StdRng::seed_from_u64(5);

        let lines = advance(&mut active, &templates, 1.0, &mut rng);
        assert_eq!(active.len(), 1, "no second instance of the same event");
        // The surviving instance just aged, no reset
        assert_eq!(active[0].remaining, 3);
        assert!(lines.is_empty());
    }

    #[test]
    fn test_expired_event_can_retrigger_same_turn() {
        let templates = vec![template("Trade Fair", 1, vec![])];
        let mut active = vec![ActiveEvent::from_template(&templates, 0)];
        let mut rng = StdRng::seed_from_u64(2);

        let lines = advance(&mut active, &templates, 1.0, &mut rng);
        assert_eq!(lines[0], "The Trade Fair event has ended.");
        assert_eq!(lines[1], "EVENT: Trade Fair has begun!");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].remaining, 1);
    }

    #[test]
    fn test_risk_multipliers_compound() {
        let templates = vec![
            template("Pirates", 3, vec![risk(2.0)]),
            template("Ion Storm", 3, vec![risk(1.5)]),
        ];
        let active = vec![
            ActiveEvent::from_template(&templates, 0),
            ActiveEvent::from_template(&templates, 1),
        ];
        let effects = ActiveEffects::new(&templates, &active);
        assert_eq!(effects.travel_risk_multiplier(), 3.0);
        // Risk effects never touch prices
        assert_eq!(effects.price_multiplier("Food"), 1.0);
        assert_eq!(ActiveEffects::none().travel_risk_multiplier(), 1.0);
    }

    #[test]
    fn test_effect_json_defaults_to_all_goods() {
        let effect: EventEffect =
            serde_json::from_str(r#"{"type": "price_modifier", "multiplier": 1.25}"#).unwrap();
        assert_eq!(effect.kind, EffectKind::PriceModifier);
        assert!(effect.targets("Luxury"));

        let odd: EventEffect =
            serde_json::from_str(r#"{"type": "morale_boost", "multiplier": 9.0}"#).unwrap();
        assert_eq!(odd.kind, EffectKind::Unknown);
    }
}
