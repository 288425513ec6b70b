//! Per-frame simulation tick
//!
//! Core game loop that advances the simulation deterministically. Phases run
//! in a fixed order every tick: intents, paddle motion, ball and collisions,
//! power-ups. Effects applied during a tick are seen by collision on the next.

use rand::Rng;

use super::state::{GamePhase, Paddle, Side, SimEvent, SimulationContext};
use super::{ai, collision, powerups};
use crate::consts::*;
use crate::{ball_limit_y, spread};

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct InputIntents {
    /// Left paddle direction in {-1, 0, 1}; `None` hands the paddle to the AI
    pub left: Option<i8>,
    /// Right paddle direction in {-1, 0, 1}; `None` hands the paddle to the AI
    pub right: Option<i8>,
    /// Pause toggle
    pub pause: bool,
}

impl InputIntents {
    /// Both paddles AI-controlled
    pub fn ai() -> Self {
        Self::default()
    }

    pub fn for_side(&self, side: Side) -> Option<i8> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// Advance the simulation by one frame of wall-clock time.
///
/// Returns the events produced during the tick, in the order they happened.
/// Nothing advances while paused, after the match has finished, or when the
/// frame delta is unusable.
pub fn advance<R: Rng>(ctx: &mut SimulationContext<R>, frame_dt: f32, intents: &InputIntents) -> Vec<SimEvent> {
    let mut events = Vec::new();

    if intents.pause {
        match ctx.phase {
            GamePhase::Playing => ctx.pause(),
            GamePhase::Paused => ctx.resume(),
            GamePhase::Finished => {}
        }
    }
    if ctx.phase != GamePhase::Playing {
        return events;
    }

    let Some(step) = ctx.clock.advance(frame_dt) else {
        return events;
    };
    let now = ctx.clock.sim_time;

    // Paddles: derive height/speed/flags, resolve intents, integrate
    ctx.left.refresh_derived(now);
    ctx.right.refresh_derived(now);
    resolve_intents(ctx, intents);
    ctx.left.integrate(step);
    ctx.right.integrate(step);

    update_ball(ctx, step, &mut events);
    collision::step_multi_balls(ctx, step, &mut events);

    if ctx.phase == GamePhase::Playing {
        powerups::update(ctx, step, &mut events);
    }
    events
}

/// Set every paddle's direction from input or the AI
fn resolve_intents<R: Rng>(ctx: &mut SimulationContext<R>, intents: &InputIntents) {
    let now = ctx.clock.sim_time;
    for side in [Side::Left, Side::Right] {
        let paddle: &mut Paddle = match side {
            Side::Left => &mut ctx.left,
            Side::Right => &mut ctx.right,
        };
        let direction = match intents.for_side(side) {
            Some(direction) => direction.signum(),
            None => {
                let difficulty = match side {
                    Side::Left => ctx.settings.ai.left_difficulty,
                    Side::Right => ctx.settings.ai.right_difficulty,
                };
                let target = ai::target_y(&ctx.ball, paddle, &ctx.pickups, difficulty, now, &mut ctx.rng);
                ai::direction_toward(paddle.y, target)
            }
        };
        paddle.direction = if paddle.controls_reversed { -direction } else { direction };
    }
}

/// Serve, move and sanity-check the main ball
fn update_ball<R: Rng>(ctx: &mut SimulationContext<R>, step: f32, events: &mut Vec<SimEvent>) {
    let now = ctx.clock.sim_time;

    if !ctx.ball.is_sane() {
        log::warn!("Ball left valid state at {:?} / {:?}, resetting", ctx.ball.pos, ctx.ball.vel);
        ctx.ball.reset(now);
        ctx.rally = 0;
        events.push(SimEvent::BallRecovered);
        return;
    }

    if let Some(serve_at) = ctx.ball.serve_at {
        if now < serve_at {
            return;
        }
        ctx.ball.serve(&mut ctx.rng);
        log::info!("Served at t={now:.2} with {:?}", ctx.ball.vel);
        events.push(SimEvent::BallServed { vel: ctx.ball.vel });
    }

    collision::step_ball(ctx, step, events);
    if ctx.ball.in_play() {
        unstick_ball(ctx);
    }
}

/// Re-angle a ball that has run flat or hugged a wall for too long
fn unstick_ball<R: Rng>(ctx: &mut SimulationContext<R>) {
    let ball = &mut ctx.ball;
    let stuck = ball.vel.y.abs() < STUCK_VY_THRESHOLD
        || ball.pos.y.abs() > ball_limit_y() - WALL_LINGER_BAND;
    if !stuck {
        ball.stuck_ticks = 0;
        return;
    }

    ball.stuck_ticks += 1;
    if ball.stuck_ticks <= ctx.settings.game.stuck_tick_limit {
        return;
    }

    let speed = ball.vel.length().max(ball.base_speed);
    let angle = spread(ctx.rng.random::<f32>(), std::f32::consts::FRAC_PI_2);
    let direction = if ball.vel.x < 0.0 { -1.0 } else { 1.0 };
    ball.vel.x = speed * angle.cos() * direction;
    ball.vel.y = speed * angle.sin();
    ball.stuck_ticks = 0;
    log::warn!("Ball stuck, re-angled to {:?}", ball.vel);
}
