pub mod game;
pub mod loadout;
pub mod net;
pub mod room;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::game::GameMode;
    use crate::loadout::Loadout;
    use crate::net::messages::{ClientMessage, FindGameMsg};

    /// Build a loadout from archetype and weapon selectors.
    pub fn loadout(archetype: &str, weapon: &str) -> Loadout {
        Loadout::new(archetype, weapon)
    }

    /// Build a loadout that also names an ability.
    pub fn loadout_with_ability(archetype: &str, weapon: &str, ability: &str) -> Loadout {
        Loadout {
            ability: Some(ability.to_string()),
            ..Loadout::new(archetype, weapon)
        }
    }

    /// A `FindGame` request with the given mode, name and default loadout.
    pub fn find_game(mode: GameMode, name: &str) -> ClientMessage {
        ClientMessage::FindGame(FindGameMsg {
            mode,
            name: Some(name.to_string()),
            loadout: Loadout::default(),
        })
    }

    /// Assert two floats are within `eps` of each other.
    pub fn assert_close(actual: f32, expected: f32, eps: f32, what: &str) {
        assert!(
            (actual - expected).abs() <= eps,
            "{what}: expected {expected}, got {actual} (eps {eps})"
        );
    }
}
