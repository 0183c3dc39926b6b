//! Batch events fired by the graphics/game-loop host.
//!
//! The host loop itself is an external collaborator; the engine only defines
//! the event payloads and the dispatch rules behaviours rely on (start runs
//! once, updates skip inactive or destroyed instances).

use std::path::PathBuf;

use crate::engine::behaviour::UpdateBehaviour;
use crate::foundation::sync::lock;

/// Fired once while the host loads content.
#[derive(Debug, Clone)]
pub struct LoadBatchEvent {
    /// Root directory content is loaded from
    pub content_root: PathBuf,
}

/// Fired at the top of every frame before updates.
#[derive(Debug, Clone, Copy)]
pub struct StartBatchEvent {
    /// Seconds since the host loop started
    pub total_time: f32,
}

/// Fired once per simulation update.
#[derive(Debug, Clone, Copy)]
pub struct UpdateBatchEvent {
    /// Seconds since the previous update
    pub delta_time: f32,
    /// Seconds since the host loop started
    pub total_time: f32,
}

/// Fired once per rendered frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderBatchEvent {
    /// Seconds since the previous render
    pub delta_time: f32,
}

fn is_runnable<B: UpdateBehaviour + ?Sized>(behaviour: &B) -> bool {
    if behaviour.state().is_destroyed() || !behaviour.state().is_active() {
        return false;
    }
    match behaviour.game_object() {
        Some(game_object) => {
            let go = lock(game_object);
            !go.is_destroyed() && go.is_active()
        }
        None => true,
    }
}

/// Run the start hook exactly once for a live behaviour.
pub fn dispatch_start<B: UpdateBehaviour + ?Sized>(behaviour: &mut B, event: &StartBatchEvent) {
    if behaviour.state().has_started() || !is_runnable(behaviour) {
        return;
    }
    behaviour.start(event);
    behaviour.state_mut().mark_started();
}

/// Run the update hook for a live behaviour.
pub fn dispatch_update<B: UpdateBehaviour + ?Sized>(behaviour: &mut B, event: &UpdateBatchEvent) {
    if !is_runnable(behaviour) {
        return;
    }
    behaviour.update(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::SpawnError;
    use crate::engine::behaviour::{Behaviour, BehaviourState, Spawnable};

    struct Counting {
        state: BehaviourState,
        starts: u32,
        updates: u32,
    }

    impl Behaviour for Counting {
        fn state(&self) -> &BehaviourState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut BehaviourState {
            &mut self.state
        }
    }

    impl Spawnable for Counting {
        fn spawn() -> Result<Self, SpawnError> {
            Ok(Self {
                state: BehaviourState::new("Counting"),
                starts: 0,
                updates: 0,
            })
        }
    }

    impl UpdateBehaviour for Counting {
        fn start(&mut self, _event: &StartBatchEvent) {
            self.starts += 1;
        }

        fn update(&mut self, _event: &UpdateBatchEvent) {
            self.updates += 1;
        }
    }

    #[test]
    fn start_runs_once() {
        let mut behaviour = Counting::spawn().unwrap();
        let event = StartBatchEvent { total_time: 0.0 };
        dispatch_start(&mut behaviour, &event);
        dispatch_start(&mut behaviour, &event);
        assert_eq!(behaviour.starts, 1);
    }

    #[test]
    fn updates_skip_inactive_and_destroyed() {
        let mut behaviour = Counting::spawn().unwrap();
        let event = UpdateBatchEvent {
            delta_time: 0.016,
            total_time: 0.016,
        };

        dispatch_update(&mut behaviour, &event);
        assert_eq!(behaviour.updates, 1);

        behaviour.state_mut().set_active(false);
        dispatch_update(&mut behaviour, &event);
        assert_eq!(behaviour.updates, 1);

        behaviour.state_mut().set_active(true);
        behaviour.destroy();
        dispatch_update(&mut behaviour, &event);
        assert_eq!(behaviour.updates, 1);
    }
}
