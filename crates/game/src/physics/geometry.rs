use glam::DVec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pocket {
    pub pos: DVec3,
    pub radius: f64,
}

/// Rounded end of a cushion where it turns into a pocket jaw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Knuckle {
    pub pos: DVec3,
    pub radius: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rail {
    /// `+x` end
    East,
    West,
    /// `+y` side
    North,
    South,
}

impl Rail {
    /// Maps a world vector into the frame where the ball travels along `+x`
    /// into the rail.
    pub fn to_local(self, v: DVec3) -> DVec3 {
        match self {
            Rail::East => v,
            Rail::West => DVec3::new(-v.x, -v.y, v.z),
            Rail::North => DVec3::new(v.y, -v.x, v.z),
            Rail::South => DVec3::new(-v.y, v.x, v.z),
        }
    }

    pub fn to_world(self, v: DVec3) -> DVec3 {
        match self {
            Rail::East => v,
            Rail::West => DVec3::new(-v.x, -v.y, v.z),
            Rail::North => DVec3::new(-v.y, v.x, v.z),
            Rail::South => DVec3::new(v.y, -v.x, v.z),
        }
    }
}

/// Playing surface dimensions, all derived from the ball radius.
///
/// `table_x`/`table_y` bound the region a ball centre can occupy without
/// touching a cushion; `x`/`y` are the cushion noses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableGeometry {
    pub ball_radius: f64,
    pub table_x: f64,
    pub table_y: f64,
    pub x: f64,
    pub y: f64,
    pub has_pockets: bool,
    pub pockets: Vec<Pocket>,
    pub knuckles: Vec<Knuckle>,
    /// Rails are open for `|x| < middle_gap` along the sides.
    pub middle_gap: f64,
    /// Rails end `corner_gap` short of each corner.
    pub corner_gap: f64,
}

impl TableGeometry {
    pub fn pool(r: f64) -> Self {
        let table_x = 43.0 * r;
        let table_y = 21.0 * r;
        let x = table_x + r;
        let y = table_y + r;
        let px = table_x + 1.6 * r;
        let py = table_y + 1.6 * r;
        let corner_radius = 2.2 * r;
        let middle_radius = 1.8 * r;
        let knuckle_inset = 3.2 * r;
        let knuckle_radius = r;
        let middle_inset = 2.77 * r;
        let middle_knuckle_radius = 0.1 * r;

        let mut pockets = Vec::with_capacity(6);
        let mut knuckles = Vec::with_capacity(12);
        for sy in [1.0, -1.0] {
            for sx in [1.0, -1.0] {
                pockets.push(Pocket {
                    pos: DVec3::new(sx * px, sy * py, 0.0),
                    radius: corner_radius,
                });
                knuckles.push(Knuckle {
                    pos: DVec3::new(sx * (x - knuckle_inset), sy * (y + knuckle_radius), 0.0),
                    radius: knuckle_radius,
                });
                knuckles.push(Knuckle {
                    pos: DVec3::new(sx * (x + knuckle_radius), sy * (y - knuckle_inset), 0.0),
                    radius: knuckle_radius,
                });
                knuckles.push(Knuckle {
                    pos: DVec3::new(sx * middle_inset, sy * (y + middle_knuckle_radius), 0.0),
                    radius: middle_knuckle_radius,
                });
            }
            pockets.push(Pocket {
                pos: DVec3::new(0.0, sy * (py + 1.4 * r), 0.0),
                radius: middle_radius,
            });
        }

        Self {
            ball_radius: r,
            table_x,
            table_y,
            x,
            y,
            has_pockets: true,
            pockets,
            knuckles,
            middle_gap: middle_inset,
            corner_gap: knuckle_inset,
        }
    }

    /// Pocketless table with continuous cushions.
    pub fn carom(r: f64) -> Self {
        let table_x = 43.0 * r;
        let table_y = 21.0 * r;
        Self {
            ball_radius: r,
            table_x,
            table_y,
            x: table_x + r,
            y: table_y + r,
            has_pockets: false,
            pockets: Vec::new(),
            knuckles: Vec::new(),
            middle_gap: 0.0,
            corner_gap: 0.0,
        }
    }

    pub fn within_cushions(&self, pos: DVec3) -> bool {
        pos.x.abs() < self.table_x && pos.y.abs() < self.table_y
    }

    /// Returns the rail a ball at `future` would strike, if any.
    pub fn rail_hit(&self, future: DVec3) -> Option<Rail> {
        if future.x.abs() > self.table_x && self.on_end_rail(future.y) {
            return Some(if future.x > 0.0 { Rail::East } else { Rail::West });
        }
        if future.y.abs() > self.table_y && self.on_long_rail(future.x) {
            return Some(if future.y > 0.0 { Rail::North } else { Rail::South });
        }
        None
    }

    fn on_end_rail(&self, y: f64) -> bool {
        !self.has_pockets || y.abs() < self.y - self.corner_gap
    }

    fn on_long_rail(&self, x: f64) -> bool {
        if !self.has_pockets {
            return true;
        }
        let x = x.abs();
        x > self.middle_gap && x < self.x - self.corner_gap
    }

    /// Point the cue ball is spotted on; the head string runs through it.
    pub fn head_spot(&self) -> DVec3 {
        DVec3::new(-self.x / 2.0, 0.0, 0.0)
    }

    pub fn foot_spot(&self) -> DVec3 {
        DVec3::new(self.x / 2.0, 0.0, 0.0)
    }
}
