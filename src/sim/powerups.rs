//! Power-up lifecycle: spawn, pickup, effect application and expiry
//!
//! Expiry is a per-tick sweep against simulated time. Nothing here
//! schedules callbacks, so pausing or scaling time cannot strand an effect.

use glam::Vec2;
use rand::Rng;

use super::state::{
    ActiveEffect, EffectKind, GravityWell, MultiBall, Obstacle, PowerUpKind, PowerUpPickup, Side,
    SimEvent, SimulationContext, TeleportPortal, TimeSlow,
};
use crate::consts::*;
use crate::settings::PowerUpSettings;
use crate::{heading, spread};

/// Shrink can never remove the whole paddle
const MAX_SHRINK: f32 = 0.9;
/// Distance of spawned field entities from the center line
const FIELD_ENTITY_OFFSET: f32 = 20.0;

/// Weighted draw over enabled kinds from a unit sample.
///
/// Chances are percentages accumulated in spawn-table order. A sample past
/// the cumulative total (disabled kinds contribute nothing) spawns nothing.
pub fn roll_kind(settings: &PowerUpSettings, unit: f32) -> Option<PowerUpKind> {
    let mut cumulative = 0.0;
    for kind in PowerUpKind::ALL {
        if !settings.is_enabled(kind) {
            continue;
        }
        cumulative += settings.chance(kind) / 100.0;
        if unit <= cumulative {
            return Some(kind);
        }
    }
    None
}

/// Roll a pickup of `kind` at a random position
pub fn make_pickup<R: Rng>(ctx: &mut SimulationContext<R>, kind: PowerUpKind) -> PowerUpPickup {
    let factors = &ctx.settings.power_ups;
    let (duration_factor, strength_factor) = (factors.duration_factor, factors.strength_factor);
    let id = ctx.next_entity_id();
    let rng = &mut ctx.rng;

    let x = spread(rng.random::<f32>(), FIELD_WIDTH - 20.0);
    let y = spread(rng.random::<f32>(), FIELD_HEIGHT - 10.0);

    let (lo, hi) = kind.duration_range();
    let duration = (lo + (hi - lo) * rng.random::<f32>()) * duration_factor;
    let (lo, hi) = kind.strength_range();
    let mut strength = (lo + (hi - lo) * rng.random::<f32>()) * strength_factor;
    if kind == PowerUpKind::Shrink {
        strength = strength.min(MAX_SHRINK);
    }

    PowerUpPickup {
        id,
        kind,
        pos: Vec2::new(x, y),
        side: Side::of_x(x),
        duration,
        strength,
    }
}

/// Advance the spawn timer and place a pickup when it fires
pub fn spawn_tick<R: Rng>(ctx: &mut SimulationContext<R>, step: f32, events: &mut Vec<SimEvent>) {
    ctx.power_up_timer += step;
    if ctx.power_up_timer < ctx.settings.game.power_up_frequency {
        return;
    }
    ctx.power_up_timer = 0.0;

    let unit = ctx.rng.random::<f32>();
    let Some(kind) = roll_kind(&ctx.settings.power_ups, unit) else {
        log::debug!("Spawn roll {unit:.3} past enabled chances, nothing spawned");
        return;
    };

    let pickup = make_pickup(ctx, kind);
    log::debug!("Spawned {:?} at ({:.1}, {:.1})", kind, pickup.pos.x, pickup.pos.y);
    events.push(SimEvent::PowerUpSpawned {
        kind,
        x: pickup.pos.x,
        y: pickup.pos.y,
    });
    ctx.pickups.push(pickup);
}

/// Collect every pickup the main ball touches
pub fn collect_pickups<R: Rng>(ctx: &mut SimulationContext<R>, events: &mut Vec<SimEvent>) {
    if !ctx.ball.in_play() {
        return;
    }
    let ball = ctx.ball.pos;
    let (collected, remaining): (Vec<_>, Vec<_>) = std::mem::take(&mut ctx.pickups)
        .into_iter()
        .partition(|p| p.pos.distance(ball) < PICKUP_RADIUS);
    ctx.pickups = remaining;

    for pickup in collected {
        let game_speed = ctx.clock.game_speed;
        apply(ctx, &pickup);
        events.push(SimEvent::PowerUpActivated {
            kind: pickup.kind,
            x: pickup.pos.x,
            y: pickup.pos.y,
            side: pickup.side,
        });
        if pickup.kind == PowerUpKind::Ghost {
            events.push(SimEvent::GhostChanged {
                active: true,
                opacity: ctx.ball.ghost_opacity,
            });
        }
        if ctx.clock.game_speed != game_speed {
            events.push(SimEvent::TimeScaleChanged {
                game_speed: ctx.clock.game_speed,
            });
        }
    }
}

/// Apply a collected pickup on behalf of `pickup.side`
pub fn apply<R: Rng>(ctx: &mut SimulationContext<R>, pickup: &PowerUpPickup) {
    let now = ctx.clock.sim_time;
    let collector = pickup.side;
    let target = if pickup.kind.targets_opponent() {
        collector.opposite()
    } else {
        collector
    };
    let until = now + pickup.duration;
    log::debug!("{collector:?} collected {:?} (target {target:?})", pickup.kind);

    if let Some(kind) = pickup.kind.effect_kind() {
        let paddle = ctx.paddle_mut(target);
        stack_effect(&mut paddle.effects, kind, now, until, pickup.strength);
        paddle.refresh_derived(now);
        return;
    }

    match pickup.kind {
        PowerUpKind::Ghost => {
            let ball = &mut ctx.ball;
            ball.is_ghost = true;
            ball.ghost_opacity = GHOST_OPACITY;
            ball.ghost_until = Some(ball.ghost_until.map_or(until, |t| t.max(until)));
        }
        PowerUpKind::MultiBall => {
            let ball = &ctx.ball;
            let current = ball.vel.length();
            let speed = MULTI_BALL_SPEED_FACTOR * if current > 0.0 { current } else { ball.speed };
            let pos = ball.pos;
            let angle = ctx.rng.random::<f32>() * std::f32::consts::TAU;
            let id = ctx.next_entity_id();
            ctx.multi_balls.push(MultiBall {
                id,
                pos,
                vel: heading(angle) * speed,
                speed,
                expires_at: until,
            });
        }
        PowerUpKind::Gravity => {
            ctx.gravity_wells.push(GravityWell {
                pos: Vec2::new(collector.opposite().sign() * FIELD_ENTITY_OFFSET, 0.0),
                radius: GRAVITY_WELL_RADIUS,
                strength: pickup.strength,
                expires_at: until,
            });
        }
        PowerUpKind::Teleport => {
            let entrance_x = collector.opposite().sign() * FIELD_ENTITY_OFFSET;
            let span = FIELD_HEIGHT - 10.0;
            let entrance = Vec2::new(entrance_x, spread(ctx.rng.random::<f32>(), span));
            let exit = Vec2::new(-entrance_x, spread(ctx.rng.random::<f32>(), span));
            ctx.portals.push(TeleportPortal {
                entrance,
                exit,
                radius: PORTAL_RADIUS,
                expires_at: until,
                last_teleport: None,
            });
        }
        PowerUpKind::Obstacle => {
            let y = spread(ctx.rng.random::<f32>(), 2.0 * (FIELD_HEIGHT / 2.0 - OBSTACLE_HEIGHT));
            ctx.obstacles.push(Obstacle {
                pos: Vec2::new(target.sign() * FIELD_ENTITY_OFFSET, y),
                width: OBSTACLE_WIDTH,
                height: OBSTACLE_HEIGHT,
                expires_at: until,
            });
        }
        PowerUpKind::TimeSlow => {
            // Never halve twice or lose the speed to restore
            if let Some(slow) = ctx.time_slow.as_mut() {
                slow.until = slow.until.max(until);
            } else {
                let restore_speed = ctx.clock.game_speed;
                ctx.clock.game_speed = restore_speed * 0.5;
                ctx.time_slow = Some(TimeSlow { restore_speed, until });
                log::info!("Time slowed {restore_speed} -> {}", ctx.clock.game_speed);
            }
        }
        kind => log::warn!("{kind:?} has no field effect"),
    }
}

/// Extend or create an effect following its stacking rule
fn stack_effect(effects: &mut Vec<ActiveEffect>, kind: EffectKind, now: f32, until: f32, strength: f32) {
    match effects.iter_mut().find(|e| e.kind == kind) {
        Some(existing) => {
            existing.end_time = existing.end_time.max(until);
            if kind.is_charged() {
                existing.charges += 1;
                existing.strength = existing.strength.max(strength);
            } else {
                existing.strength = strength;
            }
        }
        None => effects.push(ActiveEffect {
            kind,
            start_time: now,
            end_time: until,
            strength,
            charges: u32::from(kind.is_charged()),
        }),
    }
}

/// Drop everything whose simulated-time expiry has passed
pub fn sweep_expired<R: Rng>(ctx: &mut SimulationContext<R>, events: &mut Vec<SimEvent>) {
    let now = ctx.clock.sim_time;

    for side in [Side::Left, Side::Right] {
        let paddle = ctx.paddle_mut(side);
        let expired = paddle.sweep_expired(now);
        paddle.refresh_derived(now);
        for kind in expired {
            log::debug!("{side:?} {kind:?} expired");
            events.push(SimEvent::EffectExpired { side, kind });
        }
    }

    ctx.gravity_wells.retain(|w| w.expires_at > now);
    ctx.obstacles.retain(|o| o.expires_at > now);
    ctx.portals.retain(|p| p.expires_at > now);
    ctx.multi_balls.retain(|b| b.expires_at > now);

    if ctx.ball.ghost_until.is_some_and(|t| t <= now) {
        ctx.ball.is_ghost = false;
        ctx.ball.ghost_opacity = SOLID_OPACITY;
        ctx.ball.ghost_until = None;
        events.push(SimEvent::GhostChanged {
            active: false,
            opacity: SOLID_OPACITY,
        });
    }

    if ctx.time_slow.as_ref().is_some_and(|s| s.until <= now) {
        if let Some(slow) = ctx.time_slow.take() {
            ctx.clock.game_speed = slow.restore_speed;
            log::info!("Time restored to {}", slow.restore_speed);
            events.push(SimEvent::TimeScaleChanged {
                game_speed: slow.restore_speed,
            });
        }
    }
}

/// Whole power-up phase of a tick: spawn, collect/apply, expire
pub fn update<R: Rng>(ctx: &mut SimulationContext<R>, step: f32, events: &mut Vec<SimEvent>) {
    spawn_tick(ctx, step, events);
    collect_pickups(ctx, events);
    sweep_expired(ctx, events);
}
