use crate::protocol::GameId;

/// Identity of the local player for the current login.
///
/// Trackers only follow timed state whose target is this player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerSession {
    game_id: Option<GameId>,
    template_id: u32,
    race: i32,
    job: i32,
}

impl PlayerSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset and take on the identity sent at login.
    pub fn on_login(&mut self, game_id: GameId, template_id: u32) {
        self.reset();
        let template = template_id as i32;
        self.game_id = Some(game_id);
        self.template_id = template_id;
        self.race = (template / 100) % 100 - 1;
        self.job = template % 100 - 1;
        tracing::info!(game_id, template_id, race = self.race, job = self.job, "Player logged in");
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_logged_in(&self) -> bool {
        self.game_id.is_some()
    }

    pub fn game_id(&self) -> Option<GameId> {
        self.game_id
    }

    /// Whether `game_id` is the local player. Always false before login.
    pub fn is_local(&self, game_id: GameId) -> bool {
        self.game_id == Some(game_id)
    }

    pub fn template_id(&self) -> u32 {
        self.template_id
    }

    pub fn race(&self) -> i32 {
        self.race
    }

    pub fn job(&self) -> i32 {
        self.job
    }
}
