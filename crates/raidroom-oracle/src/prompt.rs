//! Prompt construction for the chat-completions oracle.

use raidroom_encounter::domain::entities::Participant;
use serde_json::json;

use crate::contract::{BossTurnRequest, PlayerTurnRequest};
use crate::error::OracleError;
use crate::models::ChatMessage;

const SYSTEM_PROMPT: &str = "You are an expert Game Master AI. You must follow all output format \
                             rules precisely and respond ONLY with perfectly valid JSON.";

const JSON_RULES: &str = "**OUTPUT FORMAT RULES (VERY IMPORTANT):**
- You MUST respond with a single, valid JSON object and nothing else.
- DO NOT add any text, notes, or markdown before or after the JSON object.
- The JSON must be syntactically perfect. There must be NO TRAILING COMMAS.";

fn target_summary(participant: &Participant) -> serde_json::Value {
    json!({
        "id": participant.id,
        "name": participant.name(),
        "class": participant.class,
        "health": participant.health(),
        "maxHealth": participant.max_health(),
        "stats": participant.character.game_stats.base_stats.general,
        "statusEffects": participant.character.game_stats.status_effects,
    })
}

/// Messages asking the model to resolve the players' actions.
///
/// # Errors
///
/// Returns `OracleError::Encode` if the boss state cannot be serialized.
pub fn player_turn_messages(request: &PlayerTurnRequest) -> Result<Vec<ChatMessage>, OracleError> {
    let boss = serde_json::to_string_pretty(&request.boss)?;
    let mut actions = String::new();
    for (participant, text) in request.acting() {
        let stats = serde_json::to_string(&participant.character.game_stats.base_stats.general)?;
        actions.push_str(&format!(
            "\n### Player: {}\n- Action Description: \"{}\"\n- Player Stats: {}\n",
            participant.name(),
            text,
            stats
        ));
    }
    if actions.is_empty() {
        actions.push_str("\n(no player acted this turn)\n");
    }

    let prompt = format!(
        "You are the Game Master. Based on the players' actions, determine the outcome.

**Current Encounter State:**
- Boss State: {boss}
- Player Actions This Turn: {actions}
**YOUR TASK:**
1. Narrate the outcome of the players' actions in a dramatic and engaging way.
2. Determine the new state of the boss (health, phase, isEnraged, statusEffects).
3. Summarise the damage each player dealt. Include this in the narrative.

{JSON_RULES}

The JSON object MUST have the following structure:
{{
  \"narrative\": \"Your full, dramatic narrative and player summary goes here.\",
  \"updatedBossState\": {{ \"health\": 3250, \"isEnraged\": false, \"phase\": 1, \"statusEffects\": [] }}
}}"
    );

    Ok(vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)])
}

/// Messages asking the model to play the boss's turn.
///
/// # Errors
///
/// Returns `OracleError::Encode` if the boss state cannot be serialized.
pub fn boss_turn_messages(request: &BossTurnRequest) -> Result<Vec<ChatMessage>, OracleError> {
    let boss = serde_json::to_string_pretty(&request.boss)?;
    let abilities = serde_json::to_string_pretty(request.boss.profile.game_stats.abilities())?;
    let targets: Vec<serde_json::Value> = request.targets.iter().map(target_summary).collect();
    let targets = serde_json::to_string_pretty(&targets)?;
    let example_id = request
        .targets
        .first()
        .map_or_else(|| "player_id_1".to_owned(), |p| p.id.to_string());

    let prompt = format!(
        "You are the boss, {name}. It's your turn to act.

**Your Current State:**
{boss}

**Your Available Abilities:**
{abilities}

**Your Targets:**
{targets}

**YOUR TASK:**
1. Choose one action and one or more targets.
2. Narrate your devastating attack.
3. Determine the new health for each player you hit. Include a summary in the narrative.
4. Use the exact `id` values of the targets above.

{JSON_RULES}

**EXAMPLE OF PERFECT OUTPUT:**
{{
  \"narrative\": \"My tail sweeps across the battlefield, striking fear and solid earth.\",
  \"updatedPlayers\": [
    {{ \"id\": \"{example_id}\", \"health\": 150 }}
  ]
}}",
        name = request.boss.name(),
    );

    Ok(vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)])
}
