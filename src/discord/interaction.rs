//! Inbound interaction payloads and command normalization.
//!
//! Two command shapes are accepted for forward/backward compatibility:
//!
//! - flat: `data.name` encodes the action directly (`"valheim_start"`)
//! - grouped: `data.name` is a root command, `data.options[0]` is a
//!   sub-command group named after the game, and its nested option names
//!   the action (`/server valheim start`)
//!
//! Shape detection happens on the payload itself, and both shapes normalize
//! into the same [`NormalizedCommand`].

use serde::Deserialize;

/// Interaction type sent for Discord's liveness ping.
pub const INTERACTION_TYPE_PING: u8 = 1;
/// Interaction type sent for a slash-command invocation.
pub const INTERACTION_TYPE_COMMAND: u8 = 2;

/// A single inbound interaction event, as delivered by Discord.
#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub data: Option<InteractionData>,
    #[serde(default)]
    pub member: Option<GuildMember>,
    #[serde(default)]
    pub user: Option<User>,
}

/// Command payload of an interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

/// A (possibly nested) command option. Sub-command groups and sub-commands
/// arrive through the same shape.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuildMember {
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
}

/// The lifecycle action a command resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Status,
    Start,
    Stop,
    Help,
    Unknown,
}

impl Action {
    fn from_token(token: &str) -> Self {
        match token {
            "status" => Action::Status,
            "start" => Action::Start,
            "stop" => Action::Stop,
            "help" => Action::Help,
            _ => Action::Unknown,
        }
    }

    /// Whether this action mutates the remote instance and is therefore
    /// subject to the allow-list.
    pub fn is_mutating(self) -> bool {
        matches!(self, Action::Start | Action::Stop)
    }
}

/// A command normalized out of either payload shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCommand {
    /// Full command path, for display in "unknown command" replies.
    pub command_name: String,
    pub action: Action,
    pub caller_id: Option<String>,
}

/// Result of interpreting an interaction payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedInteraction {
    /// Liveness ping; requires no further processing.
    Ping,
    Command(NormalizedCommand),
}

/// Ways an interaction payload can violate the schema.
#[derive(Debug, thiserror::Error)]
pub enum InterpretError {
    #[error("unsupported interaction type {0}")]
    UnsupportedType(u8),
    #[error("command interaction is missing its data payload")]
    MissingCommandData,
}

/// Interpret a parsed interaction into a normalized command.
///
/// Pings short-circuit without touching `data`. Unrecognized action tokens
/// normalize to [`Action::Unknown`] rather than an error; only a type we do
/// not handle at all, or a command with no payload, is malformed.
pub fn interpret(interaction: &Interaction) -> Result<ParsedInteraction, InterpretError> {
    match interaction.kind {
        INTERACTION_TYPE_PING => Ok(ParsedInteraction::Ping),
        INTERACTION_TYPE_COMMAND => {
            let data = interaction
                .data
                .as_ref()
                .ok_or(InterpretError::MissingCommandData)?;
            let (command_name, action) = normalize(data);
            Ok(ParsedInteraction::Command(NormalizedCommand {
                command_name,
                action,
                caller_id: caller_id(interaction),
            }))
        }
        other => Err(InterpretError::UnsupportedType(other)),
    }
}

/// Resolve the invoking caller: guild invocations carry `member.user`,
/// direct-message invocations carry `user`.
fn caller_id(interaction: &Interaction) -> Option<String> {
    interaction
        .member
        .as_ref()
        .and_then(|m| m.user.as_ref())
        .or(interaction.user.as_ref())
        .map(|u| u.id.clone())
}

fn normalize(data: &InteractionData) -> (String, Action) {
    // Grouped shape: root command -> game group -> action leaf.
    if let Some(group) = data.options.first() {
        if let Some(leaf) = group.options.first() {
            let path = format!("{} {} {}", data.name, group.name, leaf.name);
            return (path, Action::from_token(&leaf.name));
        }
    }

    // Flat shape: the action is the suffix after the last underscore
    // ("valheim_start" -> start). A bare name is tried as an action itself.
    let token = data
        .name
        .rsplit_once('_')
        .map(|(_, suffix)| suffix)
        .unwrap_or(&data.name);
    (data.name.clone(), Action::from_token(token))
}
