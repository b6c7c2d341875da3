//! Messages exchanged with the transport
//!
//! The transport hands every intercepted message to the core as an
//! [`Inbound`], whichever direction it was travelling. The handler answers
//! with a [`Verdict`] telling the transport what to do with the original, and
//! may queue synthetic [`Outbound`] messages in an [`Outbox`].

use serde::{Deserialize, Serialize};

pub use foresight_types::AbnormalityId;

/// Game object id of an entity (the local player, a monster, ...).
pub type GameId = u64;

/// Identifier of a skill, used to key cooldowns.
pub type SkillId = u32;

/// Abnormality begin/refresh payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbnormalityUpdate {
    pub target: GameId,
    #[serde(default)]
    pub source: GameId,
    pub id: AbnormalityId,
    /// Remaining duration in ms; `0x7FFF_FFFF` means permanent
    pub duration: i64,
    #[serde(default)]
    pub stacks: u32,
}

/// Abnormality end payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbnormalityEnd {
    pub target: GameId,
    pub id: AbnormalityId,
}

/// Skill cooldown payload. A non-positive cooldown means the cooldown is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooltimeSkill {
    pub skill: SkillId,
    pub cooldown: i64,
}

/// A message intercepted by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    // Session lifecycle
    Login { game_id: GameId, template_id: u32 },
    SpawnMe,
    LoadTopo,
    ReturnToLobby,
    CreatureLife { game_id: GameId, alive: bool },

    // Timed state
    AbnormalityBegin(AbnormalityUpdate),
    AbnormalityRefresh(AbnormalityUpdate),
    AbnormalityEnd(AbnormalityEnd),
    StartCooltimeSkill(CooltimeSkill),

    /// Client position report, only ever traced
    NotifyLocation { x: f32, y: f32, z: f32 },

    // Latency probing
    ResponseGamestatPong,
    /// The game client's own probe, on its way to the server
    RequestGamestatPing,
}

impl Inbound {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Login { .. } => "Login",
            Self::SpawnMe => "SpawnMe",
            Self::LoadTopo => "LoadTopo",
            Self::ReturnToLobby => "ReturnToLobby",
            Self::CreatureLife { .. } => "CreatureLife",
            Self::AbnormalityBegin(_) => "AbnormalityBegin",
            Self::AbnormalityRefresh(_) => "AbnormalityRefresh",
            Self::AbnormalityEnd(_) => "AbnormalityEnd",
            Self::StartCooltimeSkill(_) => "StartCooltimeSkill",
            Self::NotifyLocation { .. } => "NotifyLocation",
            Self::ResponseGamestatPong => "ResponseGamestatPong",
            Self::RequestGamestatPing => "RequestGamestatPing",
        }
    }
}

/// A message delivered to the game client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    AbnormalityBegin(AbnormalityUpdate),
    AbnormalityRefresh(AbnormalityUpdate),
    AbnormalityEnd(AbnormalityEnd),
    StartCooltimeSkill(CooltimeSkill),
    ResponseGamestatPong,
}

/// A message sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    RequestGamestatPing,
}

/// A synthetic message produced by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "to", content = "message", rename_all = "snake_case")]
pub enum Outbound {
    Client(ClientMessage),
    Server(ServerMessage),
}

/// What the transport should do with the original inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Forward the original unchanged
    Pass,
    /// Forward this replacement instead of the original
    Rewrite(ClientMessage),
    /// Drop the original
    Block,
}

/// Queue of synthetic messages, drained by the session owner.
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    messages: Vec<Outbound>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_client(&mut self, message: ClientMessage) {
        self.messages.push(Outbound::Client(message));
    }

    pub fn to_server(&mut self, message: ServerMessage) {
        self.messages.push(Outbound::Server(message));
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Take every queued message (drains the queue)
    pub fn take(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.messages)
    }
}
