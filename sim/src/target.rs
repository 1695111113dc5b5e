//! Point targets moving on straight lines in the image plane.

use serde::{Deserialize, Serialize};

/// One simulated target. Positions are in pixels, velocities in pixels
/// per scan.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CornerTarget {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    /// First scan the target exists on (inclusive).
    pub appear_at: i64,
    /// Scan the target disappears on (exclusive); `None` means it never
    /// leaves.
    pub disappear_at: Option<i64>,
}

impl CornerTarget {
    pub fn new(id: u64, pos: (f64, f64), vel: (f64, f64)) -> Self {
        Self {
            id,
            x: pos.0,
            y: pos.1,
            vx: vel.0,
            vy: vel.1,
            appear_at: 0,
            disappear_at: None,
        }
    }

    pub fn is_active(&self, scan: i64) -> bool {
        scan >= self.appear_at && self.disappear_at.map_or(true, |d| scan < d)
    }

    /// True position at the given scan index.
    pub fn position_at(&self, scan: i64) -> (f64, f64) {
        let dt = (scan - self.appear_at) as f64;
        (self.x + self.vx * dt, self.y + self.vy * dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_line_motion() {
        let t = CornerTarget::new(0, (10.0, 20.0), (1.0, -2.0));
        assert_eq!(t.position_at(0), (10.0, 20.0));
        assert_eq!(t.position_at(3), (13.0, 14.0));
    }

    #[test]
    fn lifetime_window() {
        let mut t = CornerTarget::new(0, (0.0, 0.0), (0.0, 0.0));
        t.appear_at = 2;
        t.disappear_at = Some(5);
        assert!(!t.is_active(1));
        assert!(t.is_active(2));
        assert!(t.is_active(4));
        assert!(!t.is_active(5));
    }
}
