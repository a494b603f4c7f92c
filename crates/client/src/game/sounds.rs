use std::collections::{HashMap, HashSet};

use glam::DVec3;

use baize::{Outcome, Table};

/// Minimum gap between two cues for the same pair of objects.
pub const SOUND_COOLDOWN_MS: f64 = 120.0;

const RAIL: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SoundCue {
    Strike { speed: f64 },
    Collision { a: u32, b: u32, speed: f64 },
    Cushion { ball: u32, speed: f64 },
    Pot { ball: u32, speed: f64 },
}

/// Derives sound cues from what is drawn. Contacts are detected as
/// crossings from apart to touching so a resting pair stays silent.
#[derive(Debug, Default)]
pub struct SoundDetector {
    touching: HashSet<(u32, u32)>,
    last_played: HashMap<(u32, u32), f64>,
}

impl SoundDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.touching.clear();
        self.last_played.clear();
    }

    /// Compares the mirror against the contacts seen last frame.
    pub fn detect(&mut self, table: &Table, now_ms: f64) -> Vec<SoundCue> {
        let r = table.params().ball_radius;
        let contact = 2.0 * r * 1.01;
        let geometry = table.geometry();
        let balls: Vec<_> = table.balls().iter().filter(|ball| ball.on_table()).collect();

        let mut touching = HashSet::new();
        let mut cues = Vec::new();

        for (i, a) in balls.iter().enumerate() {
            for b in &balls[i + 1..] {
                if a.pos.truncate().distance(b.pos.truncate()) <= contact {
                    let key = (a.id.min(b.id), a.id.max(b.id));
                    touching.insert(key);
                    if !self.touching.contains(&key) && self.ready(key, now_ms) {
                        cues.push(SoundCue::Collision {
                            a: key.0,
                            b: key.1,
                            speed: (a.vel - b.vel).length(),
                        });
                    }
                }
            }

            let probe = a.pos + outward(a.pos) * (r / 4.0);
            if geometry.rail_hit(probe).is_some() {
                let key = (a.id, RAIL);
                touching.insert(key);
                if !self.touching.contains(&key) && self.ready(key, now_ms) {
                    cues.push(SoundCue::Cushion {
                        ball: a.id,
                        speed: a.vel.length(),
                    });
                }
            }
        }

        self.touching = touching;
        cues
    }

    fn ready(&mut self, key: (u32, u32), now_ms: f64) -> bool {
        match self.last_played.get(&key) {
            Some(&last) if now_ms - last < SOUND_COOLDOWN_MS => false,
            _ => {
                self.last_played.insert(key, now_ms);
                true
            }
        }
    }
}

/// Cues that only the server can know about. Pots are never guessed from
/// drawn positions.
pub fn server_cues(outcomes: &[Outcome]) -> Vec<SoundCue> {
    outcomes
        .iter()
        .filter_map(|outcome| match *outcome {
            Outcome::Hit { speed, .. } => Some(SoundCue::Strike {
                speed: f64::from(speed),
            }),
            Outcome::Pot { ball, speed, .. } => Some(SoundCue::Pot {
                ball,
                speed: f64::from(speed),
            }),
            Outcome::Collision { .. } | Outcome::Cushion { .. } => None,
        })
        .collect()
}

fn outward(pos: DVec3) -> DVec3 {
    DVec3::new(sign(pos.x), sign(pos.y), 0.0)
}

fn sign(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v.signum() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baize::{PhysicsParams, Rack, TableGeometry};

    fn table() -> Table {
        let params = PhysicsParams::default();
        let geometry = TableGeometry::pool(params.ball_radius);
        Table::new(Rack::practice_pair(&geometry), geometry, params)
    }

    fn move_ball(table: &mut Table, id: u32, pos: DVec3) {
        table.ball_mut(id).unwrap().pos = pos;
    }

    fn collisions(cues: &[SoundCue]) -> usize {
        cues.iter()
            .filter(|cue| matches!(cue, SoundCue::Collision { .. }))
            .count()
    }

    #[test]
    fn contact_sounds_once_per_touch() {
        let mut table = table();
        let r = table.params().ball_radius;
        let mut sounds = SoundDetector::new();
        let object = table.ball(1).unwrap().pos;

        move_ball(&mut table, 0, object - DVec3::new(4.0 * r, 0.0, 0.0));
        assert!(sounds.detect(&table, 0.0).is_empty());

        move_ball(&mut table, 0, object - DVec3::new(2.0 * r, 0.0, 0.0));
        let cues = sounds.detect(&table, 16.0);
        assert_eq!(
            cues,
            vec![SoundCue::Collision { a: 0, b: 1, speed: 0.0 }]
        );
        assert!(sounds.detect(&table, 32.0).is_empty());
    }

    #[test]
    fn repeated_contacts_respect_the_cooldown() {
        let mut table = table();
        let r = table.params().ball_radius;
        let object = table.ball(1).unwrap().pos;
        let apart = object - DVec3::new(4.0 * r, 0.0, 0.0);
        let touching = object - DVec3::new(2.0 * r, 0.0, 0.0);
        let mut sounds = SoundDetector::new();

        let mut heard = 0;
        for (frame, pos) in [apart, touching, apart, touching, apart, touching]
            .into_iter()
            .enumerate()
        {
            move_ball(&mut table, 0, pos);
            heard += collisions(&sounds.detect(&table, frame as f64 * 40.0));
        }
        // contacts at 40, 120 and 200ms; only 40 and 200 are far enough apart
        assert_eq!(heard, 2);
    }

    #[test]
    fn reaching_a_rail_is_a_cushion_cue() {
        let mut table = table();
        let limit = table.geometry().table_x;
        let mut sounds = SoundDetector::new();
        move_ball(&mut table, 0, DVec3::new(limit - 0.1, 0.0, 0.0));
        assert!(sounds.detect(&table, 0.0).is_empty());
        move_ball(&mut table, 0, DVec3::new(limit, 0.0, 0.0));
        let cues = sounds.detect(&table, 16.0);
        assert!(matches!(cues[..], [SoundCue::Cushion { ball: 0, .. }]));
    }

    #[test]
    fn pots_come_only_from_the_server() {
        let outcomes = [
            Outcome::Hit { ball: 0, speed: 2.0 },
            Outcome::Collision { a: 0, b: 1, speed: 1.5 },
            Outcome::Pot { ball: 1, pocket: 2, speed: 1.0 },
        ];
        let cues = server_cues(&outcomes);
        assert_eq!(
            cues,
            vec![
                SoundCue::Strike { speed: 2.0 },
                SoundCue::Pot { ball: 1, speed: 1.0 },
            ]
        );
    }
}
