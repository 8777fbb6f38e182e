#![deny(warnings)]

//! Turn-resolution engine for Compute Cartel.
//!
//! [`Engine::submit_action`] takes a game state and one [`Action`], validates
//! it, and returns an [`ActionResponse`] holding the successor state plus a
//! description of everything that happened. The caller's state is never
//! mutated. Turn-advancing actions (travel, wait, and a choice that completes
//! a travel) additionally run interest, random events, the price simulation,
//! intel tips, the oracle and the game-over check.
//!
//! Randomness is always supplied by the caller as `&mut impl Rng`.

pub mod action;
pub mod choices;
pub mod dispatch;
pub mod events;
pub mod oracle;
pub mod progress;
pub mod queries;
pub mod response;
pub mod seizure;

pub use action::{Action, ActionError};
pub use choices::roll_choice;
pub use events::{apply_event, event_probability, materialize, roll_events, Effect, GameEvent};
pub use oracle::{oracle_accuracy, premium_fee, resolve_intel_tips, roll_oracle};
pub use progress::{check_game_over, evaluate_milestones, game_over_reason};
pub use queries::{at_risk_goods, available_actions, AvailableAction};
pub use response::ActionResponse;
pub use seizure::{resolve_seizures, seizure_chance};

use rand::Rng;
use sim_core::{validate_tunables, GameState, Tunables, ValidationError};

/// The rules engine: validated tunables plus the operations that use them.
#[derive(Clone, Debug, Default)]
pub struct Engine {
    tunables: Tunables,
}

impl Engine {
    pub fn new(tunables: Tunables) -> Result<Self, ValidationError> {
        validate_tunables(&tunables)?;
        Ok(Self { tunables })
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    pub fn create_initial_state(&self) -> GameState {
        GameState::new(&self.tunables)
    }
}

/// Fresh game with default tunables.
pub fn create_initial_state() -> GameState {
    Engine::default().create_initial_state()
}

/// Resolve `action` with default tunables and the thread-local RNG.
pub fn submit_action(state: &GameState, action: &Action) -> ActionResponse {
    Engine::default().submit_action(state, action, &mut rand::thread_rng())
}

/// Bernoulli roll; a non-positive probability never fires.
pub(crate) fn chance<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    p > 0.0 && rng.gen::<f64>() < p
}

/// Probability shift granted by reputation away from the neutral 50.
pub(crate) fn reputation_shift(state: &GameState, t: &Tunables) -> f64 {
    f64::from(state.player.reputation - 50) * t.reputation_event_modifier
}

/// `base + shift` clamped to [0, 1]; a disabled base stays disabled.
pub(crate) fn adjusted_probability(base: f64, shift: f64) -> f64 {
    if base <= 0.0 {
        return 0.0;
    }
    (base + shift).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn rejects_invalid_tunables() {
        let bad = Tunables {
            oracle_chance: 2.0,
            ..Tunables::default()
        };
        assert!(Engine::new(bad).is_err());
        assert!(Engine::new(Tunables::quiet()).is_ok());
    }

    #[test]
    fn probability_helpers() {
        assert_eq!(adjusted_probability(0.0, 0.3), 0.0);
        assert_eq!(adjusted_probability(0.9, 0.3), 1.0);
        assert_eq!(adjusted_probability(0.1, -0.3), 0.0);
        let mut rng = StepRng::new(0, 0);
        assert!(chance(&mut rng, 0.01));
        assert!(!chance(&mut rng, 0.0));
    }

    #[test]
    fn free_functions_use_defaults() {
        let state = create_initial_state();
        assert_eq!(state.player.balance, 10_000);
        let res = submit_action(
            &state,
            &Action::Travel {
                destination: state.player.location.clone(),
                confirmed: false,
            },
        );
        assert!(!res.success);
        assert_eq!(res.error.as_deref(), Some("Already at Silicon Valley"));
    }
}
