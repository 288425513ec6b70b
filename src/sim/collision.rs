//! Collision detection and response
//!
//! Every test runs against the ball's tentative next position. Resolution
//! happens before the position is committed, so a ball is never observed
//! inside a wall or past a goal line.

use glam::Vec2;
use rand::Rng;

use super::state::{
    EffectKind, GamePhase, GravityWell, Obstacle, Paddle, Side, SimEvent, SimulationContext,
    TeleportPortal,
};
use crate::consts::*;
use crate::{ball_limit_y, heading, spread};

/// Bounce angles are clamped so the ball always leaves the paddle forwards
const BOUNCE_ANGLE_LIMIT: f32 = 80.0 * std::f32::consts::PI / 180.0;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Surface normal at collision (pointing toward ball center, for reflection)
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Check a ball against the top and bottom walls
pub fn ball_wall_collision(pos: Vec2) -> CollisionResult {
    let limit = ball_limit_y();
    if pos.y > limit {
        CollisionResult {
            hit: true,
            normal: Vec2::NEG_Y,
            penetration: pos.y - limit,
        }
    } else if pos.y < -limit {
        CollisionResult {
            hit: true,
            normal: Vec2::Y,
            penetration: -limit - pos.y,
        }
    } else {
        CollisionResult::miss()
    }
}

/// Bounce off the top/bottom walls.
///
/// The ball is put back `WALL_EPSILON` inside the wall and the reflected
/// vertical speed gets a jitter scaled by the randomness level. The jitter
/// never flips the reflected direction.
pub fn resolve_walls(
    pos: &mut Vec2,
    vel: &mut Vec2,
    randomness: f32,
    rng: &mut impl Rng,
) -> Option<SimEvent> {
    let wall = ball_wall_collision(*pos);
    if !wall.hit {
        return None;
    }
    let limit = ball_limit_y();
    pos.y = -wall.normal.y * (limit - WALL_EPSILON);

    if vel.dot(wall.normal) >= 0.0 {
        // Already heading away (pushed here by something else)
        return None;
    }
    *vel = reflect_velocity(*vel, wall.normal);
    let jitter = spread(rng.random::<f32>(), randomness / 50.0);
    vel.y = wall.normal.y * (vel.y.abs() + jitter).max(MIN_WALL_REBOUND);

    Some(SimEvent::WallImpact {
        x: pos.x,
        y: -wall.normal.y * ball_limit_y(),
        z: 0.0,
    })
}

/// Pull velocity toward every live gravity well in range
pub fn apply_gravity_wells(pos: Vec2, vel: &mut Vec2, wells: &[GravityWell], now: f32, step: f32) {
    for well in wells.iter().filter(|w| w.expires_at > now) {
        let offset = well.pos - pos;
        let distance = offset.length();
        if distance < well.radius && distance > 1e-4 {
            let accel = well.strength * (1.0 - distance / well.radius) * GRAVITY_WELL_GAIN;
            *vel += offset / distance * accel * step;
        }
    }
}

/// Where along this step the ball meets the paddle face, if it does.
///
/// Returns the ball's y at contact. Only balls moving toward the paddle and
/// not already behind it can hit.
pub fn paddle_contact(prev: Vec2, next: Vec2, vel: Vec2, radius: f32, paddle: &Paddle) -> Option<f32> {
    let sign = paddle.side.sign();
    if vel.x * sign <= 0.0 {
        return None;
    }
    // Center already past the paddle's back edge
    if (prev.x - paddle.x()) * sign >= PADDLE_WIDTH / 2.0 {
        return None;
    }

    let face = paddle.face_x();
    let lead_prev = (prev.x + sign * radius - face) * sign;
    let lead_next = (next.x + sign * radius - face) * sign;
    if lead_next < 0.0 {
        return None;
    }

    let t = if lead_prev < 0.0 {
        -lead_prev / (lead_next - lead_prev)
    } else {
        0.0
    };
    let contact_y = prev.y + (next.y - prev.y) * t;
    ((contact_y - paddle.y).abs() <= paddle.half_height()).then_some(contact_y)
}

/// Outgoing angle for a hit at `relative` ∈ [-1, 1] along the paddle
pub fn bounce_angle(relative: f32, randomness: f32, rng: &mut impl Rng) -> f32 {
    let random = spread(rng.random::<f32>(), randomness / 100.0 * std::f32::consts::PI);
    (relative.clamp(-1.0, 1.0) * MAX_BOUNCE_ANGLE + random).clamp(-BOUNCE_ANGLE_LIMIT, BOUNCE_ANGLE_LIMIT)
}

/// Rally speed-up: linear in hits, with a quadratic multiplier capped at 5x
pub fn rally_bonus(hits: u32, extra_speed_factor: f32) -> f32 {
    let hits = hits as f32;
    let factor = (1.0 + (hits / 10.0).powi(2)).min(RALLY_FACTOR_CAP);
    hits * extra_speed_factor * factor
}

/// Velocity leaving `paddle` at `angle` with the given speed
fn launch_from(paddle: &Paddle, angle: f32, speed: f32) -> Vec2 {
    Vec2::new(-paddle.side.sign() * speed * angle.cos(), speed * angle.sin())
}

/// Ball center resting against the paddle face
fn rest_against(paddle: &Paddle, radius: f32, y: f32) -> Vec2 {
    Vec2::new(paddle.face_x() - paddle.side.sign() * radius, y)
}

/// Check a ball against an axis-aligned obstacle
pub fn ball_box_collision(pos: Vec2, radius: f32, obstacle: &Obstacle) -> CollisionResult {
    let half = Vec2::new(obstacle.width / 2.0, obstacle.height / 2.0);
    let d = pos - obstacle.pos;
    if d.x.abs() >= half.x + radius || d.y.abs() >= half.y + radius {
        return CollisionResult::miss();
    }

    if d.x.abs() / half.x > d.y.abs() / half.y {
        CollisionResult {
            hit: true,
            normal: Vec2::new(if d.x > 0.0 { 1.0 } else { -1.0 }, 0.0),
            penetration: half.x + radius - d.x.abs(),
        }
    } else {
        CollisionResult {
            hit: true,
            normal: Vec2::new(0.0, if d.y > 0.0 { 1.0 } else { -1.0 }),
            penetration: half.y + radius - d.y.abs(),
        }
    }
}

/// Bounce off every live obstacle overlapping the ball; true if any was hit
pub fn resolve_obstacles(
    pos: &mut Vec2,
    vel: &mut Vec2,
    obstacles: &[Obstacle],
    now: f32,
    rng: &mut impl Rng,
) -> bool {
    let mut hit_any = false;
    for obstacle in obstacles.iter().filter(|o| o.expires_at > now) {
        let result = ball_box_collision(*pos, BALL_RADIUS, obstacle);
        if !result.hit {
            continue;
        }
        *pos += result.normal * result.penetration;
        if vel.dot(result.normal) < 0.0 {
            *vel = reflect_velocity(*vel, result.normal);
        }
        vel.x += spread(rng.random::<f32>(), OBSTACLE_JITTER);
        vel.y += spread(rng.random::<f32>(), OBSTACLE_JITTER);
        hit_any = true;
    }
    hit_any
}

/// Warp through the first ready portal whose entrance the ball touches
pub fn resolve_portals(
    pos: &mut Vec2,
    vel: &mut Vec2,
    portals: &mut [TeleportPortal],
    now: f32,
    rng: &mut impl Rng,
) -> Option<SimEvent> {
    let portal = portals
        .iter_mut()
        .find(|p| p.expires_at > now && p.ready(now) && pos.distance(p.entrance) < p.radius)?;

    *pos = portal.exit;
    let speed = vel.length();
    let angle = vel.y.atan2(vel.x) + spread(rng.random::<f32>(), std::f32::consts::FRAC_PI_2);
    *vel = heading(angle) * speed;
    portal.last_teleport = Some(now);

    log::debug!("Teleported {:?} -> {:?}", portal.entrance, portal.exit);
    Some(SimEvent::Teleported {
        entrance: portal.entrance,
        exit: portal.exit,
    })
}

/// Side whose goal line `x` has crossed
pub fn crossed_goal(x: f32) -> Option<Side> {
    let line = FIELD_WIDTH / 2.0;
    if x < -line {
        Some(Side::Left)
    } else if x > line {
        Some(Side::Right)
    } else {
        None
    }
}

/// Credit a point and end the match if the limit is reached
pub fn award_point<R: Rng>(ctx: &mut SimulationContext<R>, scorer: Side, events: &mut Vec<SimEvent>) {
    ctx.paddle_mut(scorer).score += 1;
    ctx.rally = 0;
    let (left_score, right_score) = ctx.scores();
    log::info!("{scorer:?} scores: {left_score} - {right_score}");
    events.push(SimEvent::Scored {
        side: scorer,
        left_score,
        right_score,
    });

    let max_points = ctx.settings.game.max_points;
    if max_points > 0 && ctx.paddle(scorer).score >= max_points {
        ctx.phase = GamePhase::Finished;
        log::info!("Match finished, {scorer:?} wins {left_score} - {right_score}");
        events.push(SimEvent::MatchFinished {
            winner: scorer,
            left_score,
            right_score,
        });
    }
}

/// Move the main ball one step and resolve everything it touches
pub fn step_ball<R: Rng>(ctx: &mut SimulationContext<R>, step: f32, events: &mut Vec<SimEvent>) {
    let now = ctx.clock.sim_time;
    let randomness = ctx.settings.game.randomness_level;

    apply_gravity_wells(ctx.ball.pos, &mut ctx.ball.vel, &ctx.gravity_wells, now, step);
    apply_magnets(ctx, step);

    let prev = ctx.ball.pos;
    let mut next = prev + ctx.ball.vel * step;

    if let Some(event) = resolve_walls(&mut next, &mut ctx.ball.vel, randomness, &mut ctx.rng) {
        events.push(event);
    }

    for side in [Side::Left, Side::Right] {
        let contact = paddle_contact(prev, next, ctx.ball.vel, ctx.ball.radius, ctx.paddle(side));
        if let Some(contact_y) = contact {
            next = hit_paddle(ctx, side, contact_y, events);
            break;
        }
    }

    if resolve_obstacles(&mut next, &mut ctx.ball.vel, &ctx.obstacles, now, &mut ctx.rng) {
        events.push(SimEvent::ObstacleHit);
    }
    if let Some(event) = resolve_portals(&mut next, &mut ctx.ball.vel, &mut ctx.portals, now, &mut ctx.rng) {
        events.push(event);
    }

    if let Some(defender) = crossed_goal(next.x) {
        if let Some(charges_left) = ctx.paddle_mut(defender).consume_charge(EffectKind::Shield, now) {
            next = shield_rebound(ctx, defender, next);
            log::debug!("{defender:?} shield absorbed a goal ({charges_left} left)");
            events.push(SimEvent::ShieldAbsorbed {
                side: defender,
                charges_left,
            });
        } else {
            if ctx.ball.is_ghost {
                events.push(SimEvent::GhostChanged {
                    active: false,
                    opacity: SOLID_OPACITY,
                });
            }
            ctx.ball.reset(now);
            award_point(ctx, defender.opposite(), events);
            return;
        }
    }

    let limit = ball_limit_y();
    next.y = next.y.clamp(-limit, limit);
    ctx.ball.pos = next;
}

/// Send the ball back out of a shielded goal with a slight random angle
fn shield_rebound<R: Rng>(ctx: &mut SimulationContext<R>, defender: Side, next: Vec2) -> Vec2 {
    let ball = &mut ctx.ball;
    let away = -defender.sign();
    let vx = ball.vel.x.abs().max(ball.base_speed * 0.5);
    let angle = spread(ctx.rng.random::<f32>(), std::f32::consts::FRAC_PI_4);
    ball.vel = Vec2::new(away * vx, angle.sin() * vx * 0.75);
    Vec2::new(defender.sign() * (FIELD_WIDTH / 2.0 - ball.radius), next.y)
}

/// Main-ball paddle return: angle from hit point, rally bonus, SuperShot.
///
/// Returns the ball's resolved position against the paddle face.
fn hit_paddle<R: Rng>(
    ctx: &mut SimulationContext<R>,
    side: Side,
    contact_y: f32,
    events: &mut Vec<SimEvent>,
) -> Vec2 {
    let now = ctx.clock.sim_time;
    let game = &ctx.settings.game;
    let (randomness, extra_speed_factor) = (game.randomness_level, game.extra_speed_factor);

    let paddle = ctx.paddle(side);
    let relative = (contact_y - paddle.y) / paddle.half_height();
    let angle = bounce_angle(relative, randomness, &mut ctx.rng);

    ctx.rally += 1;
    let paddle = ctx.paddle(side);
    let motion = if paddle.is_frozen { 0.0 } else { f32::from(paddle.direction.abs()) };
    let mut speed = ctx.ball.speed + motion * PADDLE_MOTION_INFLUENCE + rally_bonus(ctx.rally, extra_speed_factor);

    let debuff = paddle.strength_of(EffectKind::BallSpeedDebuff, now);
    if debuff > 0.0 {
        speed = (speed * (1.0 - debuff)).max(ctx.ball.base_speed * 0.5);
    }

    let super_strength = paddle
        .effect(EffectKind::SuperShot)
        .filter(|e| e.is_active(now))
        .map(|e| e.strength);
    let super_shot = match super_strength {
        Some(strength) => {
            ctx.paddle_mut(side).consume_charge(EffectKind::SuperShot, now);
            speed *= strength;
            true
        }
        None => false,
    };

    let paddle = ctx.paddle(side);
    let vel = launch_from(paddle, angle, speed);
    let resolved = rest_against(paddle, ctx.ball.radius, contact_y);
    ctx.ball.vel = vel;
    ctx.ball.stuck_ticks = 0;
    events.push(SimEvent::PaddleImpact { side, super_shot });
    resolved
}

/// Magnets bend the ball toward their paddle while it is in that half
fn apply_magnets<R: Rng>(ctx: &mut SimulationContext<R>, step: f32) {
    let now = ctx.clock.sim_time;
    for side in [Side::Left, Side::Right] {
        let paddle = ctx.paddle(side);
        let strength = paddle.strength_of(EffectKind::Magnet, now);
        if strength > 0.0 && Side::of_x(ctx.ball.pos.x) == side {
            let pull = (paddle.y - ctx.ball.pos.y) * strength * MAGNET_GAIN * step;
            ctx.ball.vel.y += pull;
        }
    }
}

/// Move every multi-ball through the same wall/paddle/obstacle/portal rules.
///
/// Multi-balls ignore shields, and leave play after crediting a goal.
pub fn step_multi_balls<R: Rng>(ctx: &mut SimulationContext<R>, step: f32, events: &mut Vec<SimEvent>) {
    let now = ctx.clock.sim_time;
    let randomness = ctx.settings.game.randomness_level;
    let mut balls = std::mem::take(&mut ctx.multi_balls);
    let mut scorers = Vec::new();

    balls.retain_mut(|mb| {
        apply_gravity_wells(mb.pos, &mut mb.vel, &ctx.gravity_wells, now, step);
        let prev = mb.pos;
        let mut next = prev + mb.vel * step;

        if let Some(event) = resolve_walls(&mut next, &mut mb.vel, randomness, &mut ctx.rng) {
            events.push(event);
        }
        for paddle in [&ctx.left, &ctx.right] {
            if let Some(contact_y) = paddle_contact(prev, next, mb.vel, BALL_RADIUS, paddle) {
                let angle = bounce_angle((contact_y - paddle.y) / paddle.half_height(), randomness, &mut ctx.rng);
                mb.vel = launch_from(paddle, angle, mb.speed);
                next = rest_against(paddle, BALL_RADIUS, contact_y);
                events.push(SimEvent::PaddleImpact {
                    side: paddle.side,
                    super_shot: false,
                });
                break;
            }
        }
        if resolve_obstacles(&mut next, &mut mb.vel, &ctx.obstacles, now, &mut ctx.rng) {
            events.push(SimEvent::ObstacleHit);
        }
        if let Some(event) = resolve_portals(&mut next, &mut mb.vel, &mut ctx.portals, now, &mut ctx.rng) {
            events.push(event);
        }

        if let Some(defender) = crossed_goal(next.x) {
            scorers.push(defender.opposite());
            return false;
        }

        let limit = ball_limit_y();
        next.y = next.y.clamp(-limit, limit);
        mb.pos = next;
        if ctx.rng.random::<f32>() < MULTI_BALL_WANDER_CHANCE {
            mb.wander(&mut ctx.rng);
        }
        true
    });

    ctx.multi_balls = balls;
    for scorer in scorers {
        if ctx.phase == GamePhase::Finished {
            break;
        }
        award_point(ctx, scorer, events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::sim::state::ActiveEffect;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn ctx() -> SimulationContext {
        let mut settings = Settings::default();
        settings.game.randomness_level = 0.0;
        let mut ctx = SimulationContext::new(settings, 42);
        ctx.ball.serve_at = None;
        ctx
    }

    fn shield(charges: u32) -> ActiveEffect {
        ActiveEffect {
            kind: EffectKind::Shield,
            start_time: 0.0,
            end_time: 100.0,
            strength: 1.0,
            charges,
        }
    }

    #[test]
    fn test_reflect_velocity() {
        let reflected = reflect_velocity(Vec2::new(100.0, 0.0), Vec2::new(-1.0, 0.0));
        assert!((reflected.x + 100.0).abs() < 0.001);
        assert!(reflected.y.abs() < 0.001);
    }

    #[test]
    fn test_top_wall_reflects_and_repositions() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut pos = Vec2::new(3.0, ball_limit_y() + 0.4);
        let mut vel = Vec2::new(4.0, 2.0);
        let event = resolve_walls(&mut pos, &mut vel, 15.0, &mut rng);
        assert!(matches!(event, Some(SimEvent::WallImpact { .. })));
        assert!(vel.y < 0.0);
        assert!((pos.y - (ball_limit_y() - WALL_EPSILON)).abs() < 1e-5);
        assert_eq!(vel.x, 4.0);
    }

    #[test]
    fn test_wall_jitter_never_flips_reflection() {
        let mut rng = Pcg32::seed_from_u64(2);
        for _ in 0..500 {
            let mut pos = Vec2::new(0.0, -ball_limit_y() - 0.1);
            let mut vel = Vec2::new(1.0, -0.01);
            resolve_walls(&mut pos, &mut vel, 100.0, &mut rng);
            assert!(vel.y > 0.0);
        }
    }

    #[test]
    fn test_wall_ignores_ball_moving_away() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut pos = Vec2::new(0.0, ball_limit_y() + 0.2);
        let mut vel = Vec2::new(1.0, -3.0);
        assert!(resolve_walls(&mut pos, &mut vel, 15.0, &mut rng).is_none());
        assert_eq!(vel.y, -3.0);
        assert!(pos.y <= ball_limit_y());
    }

    #[test]
    fn test_edge_hit_bounces_at_seventy_degrees() {
        let mut rng = Pcg32::seed_from_u64(5);
        let angle = bounce_angle(1.0, 0.0, &mut rng);
        assert!((angle - MAX_BOUNCE_ANGLE).abs() < 1e-6);
        let centered = bounce_angle(0.0, 0.0, &mut rng);
        assert_eq!(centered, 0.0);
    }

    #[test]
    fn test_rally_bonus_caps_multiplier() {
        assert_eq!(rally_bonus(0, 0.05), 0.0);
        assert!((rally_bonus(10, 0.05) - 10.0 * 0.05 * 2.0).abs() < 1e-6);
        // Past 20 hits the multiplier saturates at 5
        assert!((rally_bonus(40, 0.05) - 40.0 * 0.05 * 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_paddle_contact_at_top_edge() {
        let ctx = ctx();
        let prev = Vec2::new(33.0, 5.0);
        let next = Vec2::new(35.8, 5.0);
        let contact = paddle_contact(prev, next, Vec2::new(4.0, 0.0), 1.0, &ctx.right);
        assert_eq!(contact, Some(5.0));

        // Moving away never hits
        assert!(paddle_contact(prev, next, Vec2::new(-4.0, 0.0), 1.0, &ctx.right).is_none());
        // Outside the paddle span
        let high = paddle_contact(
            Vec2::new(33.0, 6.0),
            Vec2::new(35.8, 6.0),
            Vec2::new(4.0, 0.0),
            1.0,
            &ctx.right,
        );
        assert!(high.is_none());
    }

    #[test]
    fn test_fast_ball_cannot_tunnel_through_paddle() {
        let ctx = ctx();
        let contact = paddle_contact(
            Vec2::new(-30.0, 0.0),
            Vec2::new(-39.0, 0.0),
            Vec2::new(-100.0, 0.0),
            1.0,
            &ctx.left,
        );
        assert_eq!(contact, Some(0.0));
    }

    #[test]
    fn test_main_ball_paddle_hit_sends_ball_back() {
        let mut ctx = ctx();
        ctx.ball.pos = Vec2::new(35.0, 5.0);
        ctx.ball.vel = Vec2::new(10.0, 0.0);
        let mut events = Vec::new();
        step_ball(&mut ctx, 0.1, &mut events);

        assert!(events.contains(&SimEvent::PaddleImpact {
            side: Side::Right,
            super_shot: false
        }));
        assert!(ctx.ball.vel.x < 0.0);
        assert!(ctx.ball.vel.y > 0.0);
        let angle = ctx.ball.vel.y.atan2(-ctx.ball.vel.x);
        assert!((angle - MAX_BOUNCE_ANGLE).abs() < 1e-4);
        assert_eq!(ctx.rally, 1);
        assert_eq!(ctx.ball.pos.x, 35.5);
    }

    #[test]
    fn test_super_shot_multiplies_and_is_consumed() {
        let mut ctx = ctx();
        ctx.left.effects.push(ActiveEffect {
            kind: EffectKind::SuperShot,
            start_time: 0.0,
            end_time: 10.0,
            strength: 2.0,
            charges: 1,
        });
        ctx.ball.pos = Vec2::new(-35.0, 0.0);
        ctx.ball.vel = Vec2::new(-10.0, 0.0);
        let mut events = Vec::new();
        step_ball(&mut ctx, 0.1, &mut events);

        assert!(events.contains(&SimEvent::PaddleImpact {
            side: Side::Left,
            super_shot: true
        }));
        let expected = (ctx.ball.speed + rally_bonus(1, ctx.settings.game.extra_speed_factor)) * 2.0;
        assert!((ctx.ball.vel.length() - expected).abs() < 1e-4);
        assert!(ctx.left.effect(EffectKind::SuperShot).is_none());
    }

    #[test]
    fn test_ball_speed_debuff_slows_returns() {
        let mut ctx = ctx();
        ctx.right.effects.push(ActiveEffect {
            kind: EffectKind::BallSpeedDebuff,
            start_time: 0.0,
            end_time: 10.0,
            strength: 0.4,
            charges: 0,
        });
        ctx.ball.pos = Vec2::new(35.0, 0.0);
        ctx.ball.vel = Vec2::new(10.0, 0.0);
        step_ball(&mut ctx, 0.1, &mut Vec::new());
        let undebuffed = ctx.ball.speed + rally_bonus(1, ctx.settings.game.extra_speed_factor);
        assert!((ctx.ball.vel.length() - undebuffed * 0.6).abs() < 1e-4);
    }

    #[test]
    fn test_goal_scores_for_attacker_and_resets() {
        let mut ctx = ctx();
        ctx.right.y = 14.0;
        ctx.ball.pos = Vec2::new(39.5, 0.0);
        ctx.ball.vel = Vec2::new(10.0, 0.0);
        ctx.rally = 4;
        let mut events = Vec::new();
        step_ball(&mut ctx, 0.1, &mut events);

        assert_eq!(ctx.scores(), (1, 0));
        assert_eq!(ctx.rally, 0);
        assert_eq!(ctx.ball.pos, Vec2::ZERO);
        assert_eq!(ctx.ball.vel, Vec2::ZERO);
        assert!(events.contains(&SimEvent::Scored {
            side: Side::Left,
            left_score: 1,
            right_score: 0
        }));
    }

    #[test]
    fn test_shield_absorbs_goal() {
        let mut ctx = ctx();
        ctx.left.y = 14.0;
        ctx.left.effects.push(shield(2));
        ctx.ball.pos = Vec2::new(-39.5, 0.0);
        ctx.ball.vel = Vec2::new(-10.0, 0.0);
        let mut events = Vec::new();
        step_ball(&mut ctx, 0.1, &mut events);

        assert_eq!(ctx.scores(), (0, 0));
        assert!(ctx.ball.vel.x > 0.0);
        assert_eq!(ctx.ball.pos.x, -FIELD_WIDTH / 2.0 + BALL_RADIUS);
        assert_eq!(ctx.left.effect(EffectKind::Shield).map(|e| e.charges), Some(1));
        assert!(events.contains(&SimEvent::ShieldAbsorbed {
            side: Side::Left,
            charges_left: 1
        }));
    }

    #[test]
    fn test_match_finishes_at_point_limit() {
        let mut ctx = ctx();
        ctx.settings.game.max_points = 1;
        let mut events = Vec::new();
        award_point(&mut ctx, Side::Right, &mut events);
        assert_eq!(ctx.phase, GamePhase::Finished);
        assert!(matches!(
            events.last(),
            Some(SimEvent::MatchFinished {
                winner: Side::Right,
                ..
            })
        ));
    }

    #[test]
    fn test_obstacle_reflects_on_more_penetrated_axis() {
        let mut rng = Pcg32::seed_from_u64(9);
        let obstacle = Obstacle {
            pos: Vec2::ZERO,
            width: OBSTACLE_WIDTH,
            height: OBSTACLE_HEIGHT,
            expires_at: 10.0,
        };
        let mut pos = Vec2::new(-1.5, 0.5);
        let mut vel = Vec2::new(5.0, 0.0);
        assert!(resolve_obstacles(&mut pos, &mut vel, &[obstacle], 0.0, &mut rng));
        assert!(vel.x < 0.0);
        assert!((pos.x - -2.0).abs() < 1e-5);
    }

    #[test]
    fn test_expired_obstacle_is_ignored() {
        let mut rng = Pcg32::seed_from_u64(9);
        let obstacle = Obstacle {
            pos: Vec2::ZERO,
            width: OBSTACLE_WIDTH,
            height: OBSTACLE_HEIGHT,
            expires_at: 1.0,
        };
        let mut pos = Vec2::ZERO;
        let mut vel = Vec2::new(5.0, 0.0);
        assert!(!resolve_obstacles(&mut pos, &mut vel, &[obstacle], 2.0, &mut rng));
    }

    #[test]
    fn test_gravity_well_pulls_toward_center() {
        let well = GravityWell {
            pos: Vec2::new(20.0, 0.0),
            radius: GRAVITY_WELL_RADIUS,
            strength: 1.0,
            expires_at: 10.0,
        };
        let mut vel = Vec2::ZERO;
        apply_gravity_wells(Vec2::new(10.0, 0.0), &mut vel, &[well.clone()], 0.0, 0.1);
        assert!((vel.x - 0.5 * GRAVITY_WELL_GAIN * 0.1).abs() < 1e-5);
        assert_eq!(vel.y, 0.0);

        let mut outside = Vec2::ZERO;
        apply_gravity_wells(Vec2::new(-10.0, 0.0), &mut outside, &[well], 0.0, 0.1);
        assert_eq!(outside, Vec2::ZERO);
    }

    #[test]
    fn test_portal_respects_cooldown() {
        let mut rng = Pcg32::seed_from_u64(4);
        let mut portals = vec![TeleportPortal {
            entrance: Vec2::new(10.0, 0.0),
            exit: Vec2::new(-10.0, 5.0),
            radius: PORTAL_RADIUS,
            expires_at: 10.0,
            last_teleport: None,
        }];
        let mut pos = Vec2::new(11.0, 0.0);
        let mut vel = Vec2::new(3.0, 4.0);
        assert!(resolve_portals(&mut pos, &mut vel, &mut portals, 1.0, &mut rng).is_some());
        assert_eq!(pos, Vec2::new(-10.0, 5.0));
        assert!((vel.length() - 5.0).abs() < 1e-4);

        let mut again = Vec2::new(10.0, 0.0);
        assert!(resolve_portals(&mut again, &mut vel, &mut portals, 1.5, &mut rng).is_none());
        assert!(resolve_portals(&mut again, &mut vel, &mut portals, 2.1, &mut rng).is_some());
    }

    #[test]
    fn test_multi_ball_goal_credits_and_removes() {
        use crate::sim::state::MultiBall;
        let mut ctx = ctx();
        ctx.left.y = 14.0;
        ctx.left.effects.push(shield(1));
        ctx.multi_balls.push(MultiBall {
            id: 99,
            pos: Vec2::new(-39.8, 0.0),
            vel: Vec2::new(-8.0, 0.0),
            speed: 8.0,
            expires_at: 10.0,
        });
        let mut events = Vec::new();
        step_multi_balls(&mut ctx, 0.1, &mut events);
        assert!(ctx.multi_balls.is_empty());
        assert_eq!(ctx.scores(), (0, 1));
        // Shields only protect against the main ball
        assert_eq!(ctx.left.effect(EffectKind::Shield).map(|e| e.charges), Some(1));
    }

    #[test]
    fn test_multi_ball_goal_resets_rally() {
        use crate::sim::state::MultiBall;
        let mut ctx = ctx();
        ctx.left.y = 14.0;
        ctx.rally = 5;
        ctx.multi_balls.push(MultiBall {
            id: 7,
            pos: Vec2::new(-39.8, 0.0),
            vel: Vec2::new(-8.0, 0.0),
            speed: 8.0,
            expires_at: 10.0,
        });
        let mut events = Vec::new();
        step_multi_balls(&mut ctx, 0.1, &mut events);
        assert!(events.iter().any(|e| matches!(e, SimEvent::Scored { .. })));
        assert_eq!(ctx.rally, 0);
    }

    #[test]
    fn test_magnet_pulls_ball_in_own_half() {
        let mut ctx = ctx();
        ctx.right.y = 10.0;
        ctx.right.effects.push(ActiveEffect {
            kind: EffectKind::Magnet,
            start_time: 0.0,
            end_time: 10.0,
            strength: 1.0,
            charges: 0,
        });
        ctx.ball.pos = Vec2::new(20.0, 0.0);
        ctx.ball.vel = Vec2::new(5.0, 0.0);
        apply_magnets(&mut ctx, 0.1);
        assert!((ctx.ball.vel.y - 10.0 * MAGNET_GAIN * 0.1).abs() < 1e-6);
        assert_eq!(ctx.ball.vel.x, 5.0);

        // No pull from the far half
        ctx.ball.pos = Vec2::new(-20.0, 0.0);
        ctx.ball.vel = Vec2::new(5.0, 0.0);
        apply_magnets(&mut ctx, 0.1);
        assert_eq!(ctx.ball.vel.y, 0.0);
    }

    #[test]
    fn test_ball_stays_inside_walls() {
        let mut ctx = ctx();
        ctx.ball.pos = Vec2::new(0.0, 23.9);
        ctx.ball.vel = Vec2::new(0.0, 50.0);
        step_ball(&mut ctx, 0.1, &mut Vec::new());
        assert!(ctx.ball.pos.y.abs() <= FIELD_HEIGHT / 2.0);
        assert!(ctx.ball.vel.y < 0.0);
    }
}
