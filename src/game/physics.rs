use super::constants::{DISTANCE_EPSILON, SEPARATION_EPSILON, WORLD_HEIGHT, WORLD_WIDTH};

/// Mutable circle view used by the pairwise resolvers. Callers copy entity
/// fields in, resolve, and write the results back.
#[derive(Debug, Clone, Copy)]
pub struct Body {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub r: f64,
}

/// Separates two overlapping circles along the line of centers (half the
/// overlap plus a small epsilon each) and applies a normal impulse when the
/// pair is closing. `bump_a`/`bump_b` scale the impulse each side receives,
/// which makes the dash asymmetry a caller concern.
pub fn resolve_circle_collision(a: &mut Body, b: &mut Body, bump_a: f64, bump_b: f64) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let mut dist = (dx * dx + dy * dy).sqrt();
    if dist < DISTANCE_EPSILON {
        dist = DISTANCE_EPSILON;
    }
    let overlap = a.r + b.r - dist;
    if overlap <= 0.0 {
        return;
    }
    let nx = dx / dist;
    let ny = dy / dist;
    let correction = overlap / 2.0 + SEPARATION_EPSILON;
    a.x -= nx * correction;
    a.y -= ny * correction;
    b.x += nx * correction;
    b.y += ny * correction;

    let dvx = b.vx - a.vx;
    let dvy = b.vy - a.vy;
    let vn = dvx * nx + dvy * ny;
    if vn < 0.0 {
        let impulse = -vn;
        a.vx -= impulse * bump_a * nx;
        a.vy -= impulse * bump_a * ny;
        b.vx += impulse * bump_b * nx;
        b.vy += impulse * bump_b * ny;
    }
}

/// Clamps a body to the world and flips the offending velocity component.
/// The bounce is perfectly elastic, not a stop.
pub fn bounce_off_walls(body: &mut Body) {
    if body.x - body.r < 0.0 {
        body.x = body.r;
        body.vx = body.vx.abs();
    }
    if body.x + body.r > WORLD_WIDTH {
        body.x = WORLD_WIDTH - body.r;
        body.vx = -body.vx.abs();
    }
    if body.y - body.r < 0.0 {
        body.y = body.r;
        body.vy = body.vy.abs();
    }
    if body.y + body.r > WORLD_HEIGHT {
        body.y = WORLD_HEIGHT - body.r;
        body.vy = -body.vy.abs();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(x: f64, y: f64, vx: f64, vy: f64, r: f64) -> Body {
        Body { x, y, vx, vy, r }
    }

    #[test]
    fn overlapping_pair_is_separated() {
        let mut a = body(100.0, 100.0, 0.0, 0.0, 20.0);
        let mut b = body(110.0, 100.0, 0.0, 0.0, 20.0);
        resolve_circle_collision(&mut a, &mut b, 1.0, 1.0);
        let dist = ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
        assert!(dist >= a.r + b.r);
    }

    #[test]
    fn no_impulse_when_separating() {
        let mut a = body(100.0, 100.0, -50.0, 0.0, 20.0);
        let mut b = body(110.0, 100.0, 50.0, 0.0, 20.0);
        resolve_circle_collision(&mut a, &mut b, 1.0, 1.0);
        assert_eq!(a.vx, -50.0);
        assert_eq!(b.vx, 50.0);
    }

    #[test]
    fn closing_pair_gets_opposed_impulses() {
        let mut a = body(100.0, 100.0, 50.0, 0.0, 20.0);
        let mut b = body(110.0, 100.0, -50.0, 0.0, 20.0);
        resolve_circle_collision(&mut a, &mut b, 1.0, 1.0);
        assert!(a.vx < 50.0);
        assert!(b.vx > -50.0);
    }

    #[test]
    fn asymmetric_bump_scales_receiving_side() {
        let mut a = body(100.0, 100.0, 100.0, 0.0, 20.0);
        let mut b = body(110.0, 100.0, 0.0, 0.0, 20.0);
        let mut a2 = a;
        let mut b2 = b;
        resolve_circle_collision(&mut a, &mut b, 1.0, 1.0);
        resolve_circle_collision(&mut a2, &mut b2, 1.0, 2.0);
        assert!((b2.vx - b.vx).abs() > 1e-9);
        assert!(b2.vx > b.vx);
    }

    #[test]
    fn coincident_centers_do_not_blow_up() {
        let mut a = body(100.0, 100.0, 0.0, 0.0, 20.0);
        let mut b = body(100.0, 100.0, 0.0, 0.0, 20.0);
        resolve_circle_collision(&mut a, &mut b, 1.0, 1.0);
        assert!(a.x.is_finite() && a.y.is_finite());
        assert!(b.x.is_finite() && b.y.is_finite());
        assert!(a.x != b.x || a.y != b.y);
    }

    #[test]
    fn wall_bounce_clamps_and_reflects() {
        let mut b = body(-5.0, 100.0, -40.0, 0.0, 20.0);
        bounce_off_walls(&mut b);
        assert_eq!(b.x, 20.0);
        assert_eq!(b.vx, 40.0);

        let mut b = body(100.0, WORLD_HEIGHT + 5.0, 0.0, 30.0, 20.0);
        bounce_off_walls(&mut b);
        assert_eq!(b.y, WORLD_HEIGHT - 20.0);
        assert_eq!(b.vy, -30.0);
    }
}
