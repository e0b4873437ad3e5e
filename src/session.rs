//! Session/score bookkeeping (§3 `UserData`, §3 Lifecycle): the thin
//! out-of-scope contract that ties a persisted `Board` to a token's
//! counters. A `Session` loads, mutates, and persists both atomically from
//! the caller's perspective — if persistence fails, the in-memory mutation
//! is discarded and the response fails (§5).

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::board::{Avenger, AvengerResult, Board, PersistedBoard};
use crate::error::GameError;
use crate::geometry::Cell;
use crate::storage::Storage;

pub const MAX_ATTEMPTS: u32 = 9999;
pub const INITIAL_MAP_COUNT: u32 = 200;

/// Persistent per-token counters, independent of any single board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub attempts: u32,
    pub last_map_id: Option<u64>,
    pub remaining_map_count_in_game: u32,
    pub best_score: Option<u32>,
    pub current_game_score: u32,
}

impl UserData {
    pub fn new() -> UserData {
        UserData {
            attempts: 1,
            last_map_id: None,
            remaining_map_count_in_game: INITIAL_MAP_COUNT,
            best_score: None,
            current_game_score: 0,
        }
    }
}

impl Default for UserData {
    fn default() -> Self {
        UserData::new()
    }
}

/// One token's view onto storage: the board it's currently playing (if
/// any) plus its counters.
pub struct Session<'s> {
    storage: &'s dyn Storage,
    token: String,
}

impl<'s> Session<'s> {
    pub fn new(storage: &'s dyn Storage, token: impl Into<String>) -> Self {
        Session {
            storage,
            token: token.into(),
        }
    }

    fn user_key(&self) -> String {
        format!("user:{}", self.token)
    }

    fn map_key(&self) -> String {
        format!("map:{}", self.token)
    }

    pub fn load_user(&self) -> Result<UserData, GameError> {
        match self.storage.get(&self.user_key())? {
            Some(json) => serde_json::from_str(&json).map_err(|e| GameError::Data(e.to_string())),
            None => Ok(UserData::new()),
        }
    }

    fn save_user(&self, user: &UserData) -> Result<(), GameError> {
        let json = serde_json::to_string(user).map_err(|e| GameError::Data(e.to_string()))?;
        self.storage.set(&self.user_key(), &json)?;
        self.storage.flush()
    }

    pub fn load_board(&self) -> Result<Option<Board>, GameError> {
        match self.storage.get(&self.map_key())? {
            Some(json) => {
                let persisted: PersistedBoard =
                    serde_json::from_str(&json).map_err(|e| GameError::Data(e.to_string()))?;
                Board::from_persisted(persisted).map(Some)
            }
            None => Ok(None),
        }
    }

    fn save_board(&self, board: &Board) -> Result<(), GameError> {
        let json =
            serde_json::to_string(&board.to_persisted()).map_err(|e| GameError::Data(e.to_string()))?;
        self.storage.set(&self.map_key(), &json)?;
        self.storage.flush()
    }

    fn delete_board(&self) -> Result<(), GameError> {
        self.storage.delete(&self.map_key())?;
        Ok(())
    }

    /// The active board, creating a freshly placed one if none is active.
    /// If the previous game's 200 maps were just used up (`finish_turn`
    /// left `remaining_map_count_in_game == 0` on its completing
    /// response, so that response could report `mapCount == 0`), settle
    /// `best_score` and start a fresh 200-map game here, one request
    /// later, before placing the new board.
    fn ensure_board(&self, user: &mut UserData, rng: &mut impl Rng) -> Result<Board, GameError> {
        if let Some(board) = self.load_board()? {
            return Ok(board);
        }
        if user.remaining_map_count_in_game == 0 {
            if user.best_score.map_or(true, |best| user.current_game_score < best) {
                user.best_score = Some(user.current_game_score);
            }
            user.current_game_score = 0;
            user.remaining_map_count_in_game = INITIAL_MAP_COUNT;
        }
        let id: u64 = rng.gen();
        let board = Board::place_random(id, rng);
        user.last_map_id = Some(id);
        Ok(board)
    }

    fn bump_attempts(user: &mut UserData) {
        user.attempts = user.attempts.saturating_add(1).min(MAX_ATTEMPTS);
    }

    /// `GET /fire`: status of the current board, creating one if none is
    /// active yet.
    pub fn status(&self, rng: &mut impl Rng) -> Result<(Board, UserData), GameError> {
        let mut user = self.load_user()?;
        Self::bump_attempts(&mut user);
        let mut board = self.ensure_board(&mut user, rng)?;
        self.finish_turn(&mut board, &mut user)?;
        Ok((board, user))
    }

    /// `GET /fire/{row}/{column}`. The trailing `bool` is whether this shot
    /// was a fresh discovery (`result` in `FireResponse`) as opposed to a
    /// repeat of an already-discovered cell (§8 S2).
    pub fn fire(
        &self,
        x: i32,
        y: i32,
        rng: &mut impl Rng,
    ) -> Result<(Board, UserData, Cell, bool), GameError> {
        let mut user = self.load_user()?;
        Self::bump_attempts(&mut user);
        let mut board = self.ensure_board(&mut user, rng)?;
        let in_bounds = x >= 0 && x < board.width && y >= 0 && y < board.height;
        let was_fresh = in_bounds && !board.is_discovered(x, y);
        let cell = board.fire(x, y)?;
        self.finish_turn(&mut board, &mut user)?;
        Ok((board, user, cell, was_fresh))
    }

    /// `GET /fire/{row}/{column}/avenger/{avenger}`. The trailing `bool` is
    /// the base shot's freshness, same meaning as in `fire`.
    pub fn fire_avenger(
        &self,
        x: i32,
        y: i32,
        avenger: Avenger,
        rng: &mut impl Rng,
    ) -> Result<(Board, UserData, Cell, Vec<AvengerResult>, bool), GameError> {
        let mut user = self.load_user()?;
        Self::bump_attempts(&mut user);
        let mut board = self.ensure_board(&mut user, rng)?;
        let in_bounds = x >= 0 && x < board.width && y >= 0 && y < board.height;
        let was_fresh = in_bounds && !board.is_discovered(x, y);
        let (cell, results) = board.fire_avenger(x, y, avenger, rng)?;
        self.finish_turn(&mut board, &mut user)?;
        Ok((board, user, cell, results, was_fresh))
    }

    /// `GET /reset`; `wipe=true` additionally clears the user's counters
    /// (`GET /reset?wipe`), not just the in-progress board.
    pub fn reset(&self, wipe: bool) -> Result<(), GameError> {
        self.delete_board()?;
        if wipe {
            self.storage.delete(&self.user_key())?;
        }
        self.storage.flush()
    }

    /// Persists the board if still in progress; if just completed, folds
    /// its move count into the running score, decrements the remaining
    /// map count, and deletes the board key. Deliberately leaves
    /// `remaining_map_count_in_game == 0` in place (rather than
    /// immediately rolling over to a fresh game) when the 200th map just
    /// completed, so the response built from this `UserData` reports
    /// `mapCount == 0` — the game-complete signal the bot's loop watches
    /// for. The actual rollover (settling `best_score`, resetting the
    /// counters) happens in `ensure_board`, on the next request that needs
    /// a board (the spec is silent on what happens after map 200; see
    /// DESIGN.md).
    fn finish_turn(&self, board: &mut Board, user: &mut UserData) -> Result<(), GameError> {
        if board.all_discovered() {
            user.current_game_score += board.move_count;
            user.remaining_map_count_in_game = user.remaining_map_count_in_game.saturating_sub(1);
            self.delete_board()?;
        } else {
            self.save_board(board)?;
        }
        self.save_user(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn fresh_token_starts_with_attempts_one() {
        let store = MemoryStore::new();
        let session = Session::new(&store, "tok");
        let user = session.load_user().unwrap();
        assert_eq!(user.attempts, 1);
        assert_eq!(user.remaining_map_count_in_game, INITIAL_MAP_COUNT);
    }

    #[test]
    fn status_creates_and_persists_a_board() {
        let store = MemoryStore::new();
        let session = Session::new(&store, "tok");
        let mut rng = StdRng::seed_from_u64(1);
        let (board, _user) = session.status(&mut rng).unwrap();
        assert_eq!(board.battleships().len(), 6);
        assert!(session.load_board().unwrap().is_some());
    }

    #[test]
    fn reset_without_wipe_keeps_counters_but_drops_board() {
        let store = MemoryStore::new();
        let session = Session::new(&store, "tok");
        let mut rng = StdRng::seed_from_u64(2);
        session.status(&mut rng).unwrap();
        session.reset(false).unwrap();
        assert!(session.load_board().unwrap().is_none());
        assert_eq!(session.load_user().unwrap().attempts, 2);
    }

    #[test]
    fn reset_with_wipe_clears_counters_too() {
        let store = MemoryStore::new();
        let session = Session::new(&store, "tok");
        let mut rng = StdRng::seed_from_u64(3);
        session.status(&mut rng).unwrap();
        session.reset(true).unwrap();
        assert!(session.load_board().unwrap().is_none());
        assert_eq!(session.load_user().unwrap().attempts, 1);
    }

    #[test]
    fn repeat_fire_reports_stale_result() {
        let store = MemoryStore::new();
        let session = Session::new(&store, "tok");
        let mut rng = StdRng::seed_from_u64(6);
        let (_b, _u, _c, first_fresh) = session.fire(0, 0, &mut rng).unwrap();
        let (_b, _u, _c, second_fresh) = session.fire(0, 0, &mut rng).unwrap();
        assert!(first_fresh);
        assert!(!second_fresh);
    }

    #[test]
    fn completing_a_board_folds_move_count_into_game_score() {
        let store = MemoryStore::new();
        let session = Session::new(&store, "tok");
        let mut rng = StdRng::seed_from_u64(4);
        let (board, _user) = session.status(&mut rng).unwrap();
        let cells: Vec<(i32, i32)> = board
            .battleships()
            .iter()
            .flat_map(|b| b.cells().iter().copied())
            .collect();
        let mut user = None;
        for (x, y) in cells {
            let (_b, u, _c, _fresh) = session.fire(x, y, &mut rng).unwrap();
            user = Some(u);
        }
        let user = user.unwrap();
        assert_eq!(user.current_game_score, 28);
        assert_eq!(user.remaining_map_count_in_game, INITIAL_MAP_COUNT - 1);
        assert!(session.load_board().unwrap().is_none());
    }

    #[test]
    fn completing_the_200th_map_reports_zero_before_rolling_the_game_over() {
        let store = MemoryStore::new();
        let session = Session::new(&store, "tok");
        let mut rng = StdRng::seed_from_u64(8);

        // Fast-forward straight to "one map left in this game" rather than
        // playing out 199 boards.
        let mut user = UserData::new();
        user.remaining_map_count_in_game = 1;
        user.current_game_score = 50;
        store
            .set("user:tok", &serde_json::to_string(&user).unwrap())
            .unwrap();

        let (board, _user) = session.status(&mut rng).unwrap();
        let cells: Vec<(i32, i32)> = board
            .battleships()
            .iter()
            .flat_map(|b| b.cells().iter().copied())
            .collect();

        let mut last_user = None;
        for (x, y) in cells {
            let (_b, u, _c, _fresh) = session.fire(x, y, &mut rng).unwrap();
            last_user = Some(u);
        }

        // The response completing the last map of the game must carry
        // `remaining_map_count_in_game == 0` — this is what a `FireResponse`
        // reports as `mapCount`, and it's the only signal an external
        // caller (the bot binary) has that the 200-map game just ended.
        let completing_user = last_user.unwrap();
        assert_eq!(completing_user.remaining_map_count_in_game, 0);
        assert_eq!(completing_user.current_game_score, 78);
        assert_eq!(completing_user.best_score, None);

        // Only the *next* request rolls the game over: settles best_score
        // and starts a fresh 200-map game with a freshly placed board.
        let (_board, rolled_over_user) = session.status(&mut rng).unwrap();
        assert_eq!(rolled_over_user.remaining_map_count_in_game, INITIAL_MAP_COUNT);
        assert_eq!(rolled_over_user.current_game_score, 0);
        assert_eq!(rolled_over_user.best_score, Some(78));
        assert!(session.load_board().unwrap().is_some());
    }
}
