use loam_runtime::Observer;

/// Stand-in for the movement system: walks a straight line from the origin
/// at a fixed speed per tick.
pub struct Walker {
    origin: [f64; 3],
    dir: (f64, f64),
    speed: f64,
    tick: u32,
}

impl Walker {
    pub fn new(origin: [f64; 3], heading_deg: f64, speed: f64) -> Self {
        let rad = heading_deg.to_radians();
        Self {
            origin,
            dir: (rad.cos(), rad.sin()),
            speed,
            tick: 0,
        }
    }

    #[inline]
    pub fn advance(&mut self) {
        self.tick += 1;
    }
}

impl Observer for Walker {
    fn observer_world_position(&self) -> [f64; 3] {
        let d = self.speed * self.tick as f64;
        [
            self.origin[0] + self.dir.0 * d,
            self.origin[1],
            self.origin[2] + self.dir.1 * d,
        ]
    }
}
