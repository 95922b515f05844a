//! Encounter entity templates.
//!
//! The room resets its boss to a deep copy of one fixed template. The
//! built-in template is the Ancient Shadow Drake; deployments may supply
//! their own as YAML (or JSON, which YAML accepts).

use raidroom_core::error::DomainError;

use super::entities::{Boss, CharacterTemplate};

/// Profile of the built-in encounter entity.
pub const SHADOW_DRAKE: &str = r#"
name: Ancient Shadow Drake
description: A primordial beast of shadow and fury, awakened from a slumber of eons.
background_info:
  backstory: >-
    This ancient drake was sealed away in an era long past. Its reawakening
    threatens to plunge the world into eternal twilight.
  personality: Territorial & Destructive
  voice: Deafening Roar
  alignment: Chaotic Evil
game_stats:
  base_stats:
    general:
      max_health: 3500
      speed: 120
      attack: 100
      defense: 80
    advanced:
      luck: 10
      intelligence: 80
      agility: 50
      endurance: 100
    total_stat_points: 500
  abilities:
    - name: Umbral Shroud
      type: Passive
      description: Cloaked in shadows, the drake has a 20% chance to evade incoming attacks.
    - name: Shadow Breath
      type: Attack
      description: Breathes a cone of pure shadow, dealing heavy damage to a single target.
      cooldown: 2
    - name: Tail Swipe
      type: Attack
      description: A massive sweep of its tail, dealing moderate damage to all opponents.
      cooldown: 3
    - name: Oblivion Curse
      type: Debuff
      description: Curses a target, reducing their defense by 30% for 3 turns.
      cooldown: 4
  statusEffects:
    - Primordial Armor
    - Immune to Fear
    - Shadow Aura
"#;

/// The built-in encounter entity at full health.
///
/// # Errors
///
/// Only fails if [`SHADOW_DRAKE`] itself is broken; the built-in profile goes
/// through the same parsing and validation as a deployment's template.
pub fn shadow_drake() -> Result<Boss, DomainError> {
    boss_from_yaml(SHADOW_DRAKE)
}

/// Parses an encounter entity template from YAML or JSON text.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the text does not describe a
/// character template or the template is invalid.
pub fn boss_from_yaml(source: &str) -> Result<Boss, DomainError> {
    let profile: CharacterTemplate = serde_yaml::from_str(source)
        .map_err(|e| DomainError::Validation(format!("invalid boss template: {e}")))?;
    Boss::from_template(profile)
}
