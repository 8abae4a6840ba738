use rand::Rng;
use rand::distr::Alphanumeric;

/// Length of a generated duel room code.
pub const ROOM_CODE_LEN: usize = 5;

/// Fixed name of the shared free-for-all room.
pub const FREE_FOR_ALL_ROOM: &str = "free-for-all";

/// Generate a random alphanumeric room code like `aZ3k9`.
pub fn generate_room_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ROOM_CODE_LEN)
        .map(char::from)
        .collect()
}

/// Check that a string looks like a room this server could have created.
pub fn is_valid_room_code(code: &str) -> bool {
    code == FREE_FOR_ALL_ROOM
        || (code.len() == ROOM_CODE_LEN && code.chars().all(|c| c.is_ascii_alphanumeric()))
}
