/// What the local player is doing, driven entirely by [`ControllerEvent`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerMode {
    Connecting,
    /// Seated, waiting for an opponent or for a dropped player to return.
    Waiting,
    Aim,
    /// Opponent is lining up a shot.
    WatchAim,
    PlaceBall,
    /// Our shot is in flight.
    PlayShot,
    /// Opponent's shot is in flight.
    WatchShot,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEvent {
    Disconnected,
    /// Room status changed while no shot is running.
    Turn {
        playing: bool,
        my_turn: bool,
        ball_in_hand: bool,
    },
    BallPlaced,
    ShotSubmitted,
    ShotRejected,
    ShotAccepted {
        mine: bool,
    },
    Stationary {
        my_turn: bool,
        ball_in_hand: bool,
    },
    GameOver,
}

impl ControllerMode {
    fn at_rest(my_turn: bool, ball_in_hand: bool) -> Self {
        match (my_turn, ball_in_hand) {
            (true, true) => ControllerMode::PlaceBall,
            (true, false) => ControllerMode::Aim,
            (false, _) => ControllerMode::WatchAim,
        }
    }

    pub fn is_shot_running(self) -> bool {
        matches!(self, ControllerMode::PlayShot | ControllerMode::WatchShot)
    }

    /// Next mode after `event`. Events that make no sense in the current mode
    /// leave it unchanged.
    pub fn transition(self, event: ControllerEvent) -> Self {
        use ControllerEvent as E;
        use ControllerMode as M;

        match (self, event) {
            (_, E::Disconnected) => M::Connecting,
            (_, E::GameOver) => M::GameOver,
            (M::GameOver, _) => M::GameOver,

            (M::PlayShot | M::WatchShot, E::Turn { playing: true, .. }) => self,
            (_, E::Turn { playing: false, .. }) => M::Waiting,
            (
                _,
                E::Turn {
                    my_turn,
                    ball_in_hand,
                    ..
                },
            ) => M::at_rest(my_turn, ball_in_hand),

            (M::PlaceBall, E::BallPlaced) => M::Aim,
            (M::Aim, E::ShotSubmitted) => M::PlayShot,
            (M::PlayShot, E::ShotRejected) => M::Aim,
            (M::PlayShot, E::ShotAccepted { mine: true }) => M::PlayShot,
            (M::WatchAim | M::Waiting, E::ShotAccepted { mine: false }) => M::WatchShot,
            (
                M::PlayShot | M::WatchShot,
                E::Stationary {
                    my_turn,
                    ball_in_hand,
                },
            ) => M::at_rest(my_turn, ball_in_hand),

            (mode, _) => mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(my_turn: bool, ball_in_hand: bool) -> ControllerEvent {
        ControllerEvent::Turn {
            playing: true,
            my_turn,
            ball_in_hand,
        }
    }

    #[test]
    fn shooter_cycle() {
        let mode = ControllerMode::Connecting
            .transition(turn(true, false))
            .transition(ControllerEvent::ShotSubmitted);
        assert_eq!(mode, ControllerMode::PlayShot);
        let mode = mode
            .transition(ControllerEvent::ShotAccepted { mine: true })
            .transition(turn(true, false));
        assert_eq!(mode, ControllerMode::PlayShot);
        let mode = mode.transition(ControllerEvent::Stationary {
            my_turn: false,
            ball_in_hand: false,
        });
        assert_eq!(mode, ControllerMode::WatchAim);
    }

    #[test]
    fn rejection_returns_to_aim() {
        let mode = ControllerMode::Aim
            .transition(ControllerEvent::ShotSubmitted)
            .transition(ControllerEvent::ShotRejected);
        assert_eq!(mode, ControllerMode::Aim);
    }

    #[test]
    fn foul_gives_ball_in_hand_to_the_watcher() {
        let mode = ControllerMode::WatchAim
            .transition(ControllerEvent::ShotAccepted { mine: false })
            .transition(ControllerEvent::Stationary {
                my_turn: true,
                ball_in_hand: true,
            });
        assert_eq!(mode, ControllerMode::PlaceBall);
        assert_eq!(mode.transition(ControllerEvent::BallPlaced), ControllerMode::Aim);
    }

    #[test]
    fn aim_ignores_foreign_events() {
        assert_eq!(
            ControllerMode::Aim.transition(ControllerEvent::BallPlaced),
            ControllerMode::Aim
        );
        assert_eq!(
            ControllerMode::WatchAim.transition(ControllerEvent::ShotSubmitted),
            ControllerMode::WatchAim
        );
    }

    #[test]
    fn pause_and_game_over() {
        let paused = ControllerMode::Aim.transition(ControllerEvent::Turn {
            playing: false,
            my_turn: true,
            ball_in_hand: false,
        });
        assert_eq!(paused, ControllerMode::Waiting);
        let over = paused.transition(ControllerEvent::GameOver);
        assert_eq!(over, ControllerMode::GameOver);
        assert_eq!(over.transition(turn(true, false)), ControllerMode::GameOver);
        assert_eq!(over.transition(ControllerEvent::Disconnected), ControllerMode::Connecting);
    }
}
