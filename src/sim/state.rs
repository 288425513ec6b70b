//! Game state and core simulation types
//!
//! Every timestamp in here is simulated time (seconds of `Clock::sim_time`),
//! never wall-clock time, so pausing and time scaling cannot desync expiry.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::settings::Settings;
use crate::{heading, paddle_limit_y, spread};

/// Which half of the field a paddle defends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// -1 for left, +1 for right
    pub fn sign(self) -> f32 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }

    /// Side owning the half that contains `x`
    pub fn of_x(x: f32) -> Side {
        if x < 0.0 { Side::Left } else { Side::Right }
    }

    /// Paddle centerline x
    pub fn paddle_x(self) -> f32 {
        self.sign() * (FIELD_WIDTH / 2.0 - PADDLE_INSET)
    }
}

/// Current phase of the match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Playing,
    /// Simulated time is frozen
    Paused,
    /// A side reached the point limit
    Finished,
}

/// Simulated time source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clock {
    /// Seconds of simulated time since match start
    pub sim_time: f32,
    /// Current speed multiplier (TimeSlow halves it temporarily)
    pub game_speed: f32,
}

impl Clock {
    pub fn new(game_speed: f32) -> Self {
        Self {
            sim_time: 0.0,
            game_speed,
        }
    }

    /// Advance by a wall-clock frame delta.
    ///
    /// Returns the scaled step (`frame_dt * game_speed`), or `None` when the
    /// frame delta is not usable and the whole tick must be skipped.
    pub fn advance(&mut self, frame_dt: f32) -> Option<f32> {
        if !frame_dt.is_finite() || frame_dt <= 0.0 {
            return None;
        }
        if frame_dt > MAX_FRAME_DT {
            log::warn!("Skipping tick with oversized delta {frame_dt:.3}s");
            return None;
        }
        let step = frame_dt * self.game_speed;
        self.sim_time += step;
        Some(step)
    }
}

/// The main ball
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub pos: Vec2,
    /// Depth lane for the renderer; the simulation keeps it at rest
    pub z: f32,
    pub vel: Vec2,
    pub radius: f32,
    pub base_speed: f32,
    /// Speed used as the base for the next paddle return
    pub speed: f32,
    /// Cosmetic transparency (passed through to the renderer)
    pub is_ghost: bool,
    pub ghost_opacity: f32,
    pub ghost_until: Option<f32>,
    /// Pending serve time after a reset
    pub serve_at: Option<f32>,
    /// Consecutive ticks spent looking stuck
    #[serde(default)]
    pub stuck_ticks: u32,
}

impl Ball {
    pub fn new(base_speed: f32) -> Self {
        Self {
            pos: Vec2::ZERO,
            z: 0.0,
            vel: Vec2::ZERO,
            radius: BALL_RADIUS,
            base_speed,
            speed: base_speed,
            is_ghost: false,
            ghost_opacity: SOLID_OPACITY,
            ghost_until: None,
            serve_at: None,
            stuck_ticks: 0,
        }
    }

    /// Center the ball at rest and schedule a serve
    pub fn reset(&mut self, now: f32) {
        self.pos = Vec2::ZERO;
        self.z = 0.0;
        self.vel = Vec2::ZERO;
        self.speed = self.base_speed;
        self.is_ghost = false;
        self.ghost_opacity = SOLID_OPACITY;
        self.ghost_until = None;
        self.serve_at = Some(now + SERVE_DELAY);
        self.stuck_ticks = 0;
    }

    /// Launch at a random angle within the serve cone, random direction
    pub fn serve(&mut self, rng: &mut impl Rng) {
        let angle = spread(rng.random::<f32>(), 2.0 * SERVE_MAX_ANGLE);
        let direction = if rng.random::<f32>() < 0.5 { 1.0 } else { -1.0 };
        self.vel = Vec2::new(
            angle.cos() * self.base_speed * direction,
            angle.sin() * self.base_speed / 2.0,
        );
        self.serve_at = None;
    }

    /// Ball is moving (not waiting for a serve)
    pub fn in_play(&self) -> bool {
        self.serve_at.is_none()
    }

    /// Finite and within a generous envelope around the field
    pub fn is_sane(&self) -> bool {
        self.pos.is_finite()
            && self.vel.is_finite()
            && self.pos.x.abs() <= FIELD_WIDTH
            && self.pos.y.abs() <= FIELD_HEIGHT
    }
}

/// Kinds of effect that live on a paddle's active-effect list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    Speed,
    Shrink,
    BallSpeedDebuff,
    Shield,
    Magnet,
    Giant,
    Freeze,
    SuperShot,
    Mirror,
}

impl EffectKind {
    /// Effects tracked by a charge counter instead of a strength
    pub fn is_charged(self) -> bool {
        matches!(self, EffectKind::Shield | EffectKind::SuperShot)
    }
}

/// A timed effect on a paddle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffect {
    pub kind: EffectKind,
    pub start_time: f32,
    pub end_time: f32,
    /// Continuous magnitude (SuperShot stores its speed multiplier here)
    pub strength: f32,
    /// Remaining uses for Shield/SuperShot, 0 for continuous effects
    pub charges: u32,
}

impl ActiveEffect {
    pub fn is_active(&self, now: f32) -> bool {
        self.end_time > now && (!self.kind.is_charged() || self.charges > 0)
    }
}

/// A player paddle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paddle {
    pub side: Side,
    /// Center y
    pub y: f32,
    pub base_height: f32,
    pub base_speed: f32,
    /// Derived from `effects` every tick
    pub height: f32,
    /// Derived from `effects` every tick
    pub speed: f32,
    /// Movement intent in {-1, 0, 1}
    pub direction: i8,
    pub is_frozen: bool,
    pub frozen_until: f32,
    pub score: u32,
    pub effects: Vec<ActiveEffect>,
    pub controls_reversed: bool,
}

impl Paddle {
    pub fn new(side: Side, base_speed: f32) -> Self {
        Self {
            side,
            y: 0.0,
            base_height: PADDLE_HEIGHT,
            base_speed,
            height: PADDLE_HEIGHT,
            speed: base_speed,
            direction: 0,
            is_frozen: false,
            frozen_until: 0.0,
            score: 0,
            effects: Vec::new(),
            controls_reversed: false,
        }
    }

    /// Recenter and drop every effect (score is kept)
    pub fn reset(&mut self) {
        self.y = 0.0;
        self.direction = 0;
        self.effects.clear();
        self.is_frozen = false;
        self.frozen_until = 0.0;
        self.controls_reversed = false;
        self.height = self.base_height;
        self.speed = self.base_speed;
    }

    pub fn x(&self) -> f32 {
        self.side.paddle_x()
    }

    pub fn half_height(&self) -> f32 {
        self.height / 2.0
    }

    /// x of the face the ball bounces off
    pub fn face_x(&self) -> f32 {
        self.x() - self.side.sign() * PADDLE_WIDTH / 2.0
    }

    pub fn effect(&self, kind: EffectKind) -> Option<&ActiveEffect> {
        self.effects.iter().find(|e| e.kind == kind)
    }

    pub fn effect_mut(&mut self, kind: EffectKind) -> Option<&mut ActiveEffect> {
        self.effects.iter_mut().find(|e| e.kind == kind)
    }

    pub fn has_effect(&self, kind: EffectKind, now: f32) -> bool {
        self.effect(kind).is_some_and(|e| e.is_active(now))
    }

    /// Strength of an active continuous effect, 0 when absent or expired
    pub fn strength_of(&self, kind: EffectKind, now: f32) -> f32 {
        self.effect(kind)
            .filter(|e| e.is_active(now))
            .map_or(0.0, |e| e.strength)
    }

    /// Spend one charge of a Shield/SuperShot.
    ///
    /// Returns the charges left, removing the effect when it hits zero.
    pub fn consume_charge(&mut self, kind: EffectKind, now: f32) -> Option<u32> {
        let index = self
            .effects
            .iter()
            .position(|e| e.kind == kind && e.is_active(now))?;
        let effect = &mut self.effects[index];
        effect.charges = effect.charges.saturating_sub(1);
        let left = effect.charges;
        if left == 0 {
            self.effects.remove(index);
        }
        Some(left)
    }

    /// Recompute height, speed and status flags from the effect list
    pub fn refresh_derived(&mut self, now: f32) {
        let shrink = self.strength_of(EffectKind::Shrink, now);
        let giant = self.strength_of(EffectKind::Giant, now);
        let speed_bonus = self.strength_of(EffectKind::Speed, now);
        self.height = self.base_height * (1.0 - shrink) * (1.0 + giant);
        self.speed = self.base_speed * (1.0 + speed_bonus);

        let freeze_end = self
            .effect(EffectKind::Freeze)
            .filter(|e| e.is_active(now))
            .map(|e| e.end_time);
        match freeze_end {
            Some(end_time) => {
                self.is_frozen = true;
                self.frozen_until = end_time;
            }
            None => self.is_frozen = false,
        }
        self.controls_reversed = self.has_effect(EffectKind::Mirror, now);
    }

    /// Drop expired effects, returning the kinds that were removed
    pub fn sweep_expired(&mut self, now: f32) -> Vec<EffectKind> {
        let mut expired = Vec::new();
        self.effects.retain(|e| {
            let keep = e.is_active(now);
            if !keep {
                expired.push(e.kind);
            }
            keep
        });
        expired
    }

    /// Integrate position from the direction intent, then clamp to the field
    pub fn integrate(&mut self, step: f32) {
        if !self.is_frozen {
            self.y += f32::from(self.direction) * self.speed * step;
        }
        let limit = paddle_limit_y() - self.half_height();
        self.y = if limit > 0.0 { self.y.clamp(-limit, limit) } else { 0.0 };
    }
}

/// Power-up kinds that can spawn on the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerUpKind {
    Speed,
    BallSpeed,
    Shrink,
    Shield,
    Magnet,
    Giant,
    Ghost,
    MultiBall,
    Freeze,
    Gravity,
    TimeSlow,
    Teleport,
    SuperShot,
    Mirror,
    Obstacle,
}

impl PowerUpKind {
    /// Spawn-table order
    pub const ALL: [PowerUpKind; 15] = [
        PowerUpKind::Speed,
        PowerUpKind::BallSpeed,
        PowerUpKind::Shrink,
        PowerUpKind::Shield,
        PowerUpKind::Magnet,
        PowerUpKind::Giant,
        PowerUpKind::Ghost,
        PowerUpKind::MultiBall,
        PowerUpKind::Freeze,
        PowerUpKind::Gravity,
        PowerUpKind::TimeSlow,
        PowerUpKind::Teleport,
        PowerUpKind::SuperShot,
        PowerUpKind::Mirror,
        PowerUpKind::Obstacle,
    ];

    /// Base duration range in simulated seconds
    pub fn duration_range(self) -> (f32, f32) {
        match self {
            PowerUpKind::Speed => (3.0, 6.5),
            PowerUpKind::BallSpeed => (3.0, 5.0),
            PowerUpKind::Shrink => (3.0, 5.0),
            PowerUpKind::Shield => (8.0, 10.0),
            PowerUpKind::Magnet => (7.0, 9.0),
            PowerUpKind::Giant => (5.0, 8.0),
            PowerUpKind::Ghost => (4.0, 7.0),
            PowerUpKind::MultiBall => (3.0, 6.0),
            PowerUpKind::Freeze => (2.0, 4.0),
            PowerUpKind::Gravity => (5.0, 8.0),
            PowerUpKind::TimeSlow => (3.0, 5.0),
            PowerUpKind::Teleport => (2.0, 4.0),
            PowerUpKind::SuperShot => (3.0, 6.0),
            PowerUpKind::Mirror => (5.0, 8.0),
            PowerUpKind::Obstacle => (4.0, 7.0),
        }
    }

    /// Base strength range
    pub fn strength_range(self) -> (f32, f32) {
        match self {
            PowerUpKind::Speed => (0.5, 0.9),
            PowerUpKind::BallSpeed => (0.35, 0.7),
            PowerUpKind::Shrink => (0.3, 0.5),
            PowerUpKind::Magnet => (0.8, 1.5),
            PowerUpKind::Giant => (0.7, 1.2),
            PowerUpKind::Ghost => (0.6, 0.9),
            PowerUpKind::Gravity => (0.5, 1.0),
            PowerUpKind::TimeSlow => (0.3, 0.7),
            PowerUpKind::SuperShot => (1.2, 2.0),
            PowerUpKind::Shield
            | PowerUpKind::MultiBall
            | PowerUpKind::Freeze
            | PowerUpKind::Teleport
            | PowerUpKind::Mirror
            | PowerUpKind::Obstacle => (1.0, 1.0),
        }
    }

    /// Harmful kinds land on the collector's opponent
    pub fn targets_opponent(self) -> bool {
        matches!(
            self,
            PowerUpKind::Shrink
                | PowerUpKind::BallSpeed
                | PowerUpKind::Freeze
                | PowerUpKind::Obstacle
                | PowerUpKind::Mirror
        )
    }

    /// Paddle effect this kind installs, if any
    pub fn effect_kind(self) -> Option<EffectKind> {
        match self {
            PowerUpKind::Speed => Some(EffectKind::Speed),
            PowerUpKind::BallSpeed => Some(EffectKind::BallSpeedDebuff),
            PowerUpKind::Shrink => Some(EffectKind::Shrink),
            PowerUpKind::Shield => Some(EffectKind::Shield),
            PowerUpKind::Magnet => Some(EffectKind::Magnet),
            PowerUpKind::Giant => Some(EffectKind::Giant),
            PowerUpKind::Freeze => Some(EffectKind::Freeze),
            PowerUpKind::SuperShot => Some(EffectKind::SuperShot),
            PowerUpKind::Mirror => Some(EffectKind::Mirror),
            PowerUpKind::Ghost
            | PowerUpKind::MultiBall
            | PowerUpKind::Gravity
            | PowerUpKind::TimeSlow
            | PowerUpKind::Teleport
            | PowerUpKind::Obstacle => None,
        }
    }
}

/// A collectible sitting on the field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerUpPickup {
    pub id: u32,
    pub kind: PowerUpKind,
    pub pos: Vec2,
    /// Half it spawned in; that side collects it
    pub side: Side,
    pub duration: f32,
    pub strength: f32,
}

/// Attracts balls within its radius
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GravityWell {
    pub pos: Vec2,
    pub radius: f32,
    pub strength: f32,
    pub expires_at: f32,
}

/// Axis-aligned block the ball bounces off
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub pos: Vec2,
    pub width: f32,
    pub height: f32,
    pub expires_at: f32,
}

/// Entrance/exit portal pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeleportPortal {
    pub entrance: Vec2,
    pub exit: Vec2,
    pub radius: f32,
    pub expires_at: f32,
    pub last_teleport: Option<f32>,
}

impl TeleportPortal {
    pub fn ready(&self, now: f32) -> bool {
        self.last_teleport.is_none_or(|t| now - t > PORTAL_COOLDOWN)
    }
}

/// Extra ball spawned by the MultiBall power-up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiBall {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub speed: f32,
    pub expires_at: f32,
}

impl MultiBall {
    /// Perturb the heading by up to ±22.5 degrees, keeping speed
    pub fn wander(&mut self, rng: &mut impl Rng) {
        let speed = self.vel.length();
        let angle = self.vel.y.atan2(self.vel.x)
            + spread(rng.random::<f32>(), std::f32::consts::FRAC_PI_4);
        self.vel = heading(angle) * speed;
    }
}

/// Active TimeSlow bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlow {
    /// Game speed to restore when the slow-down ends
    pub restore_speed: f32,
    pub until: f32,
}

/// Events emitted by a tick for renderer/audio/UI/network consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SimEvent {
    WallImpact { x: f32, y: f32, z: f32 },
    PaddleImpact { side: Side, super_shot: bool },
    Scored { side: Side, left_score: u32, right_score: u32 },
    ShieldAbsorbed { side: Side, charges_left: u32 },
    PowerUpSpawned { kind: PowerUpKind, x: f32, y: f32 },
    PowerUpActivated { kind: PowerUpKind, x: f32, y: f32, side: Side },
    EffectExpired { side: Side, kind: EffectKind },
    Teleported { entrance: Vec2, exit: Vec2 },
    ObstacleHit,
    GhostChanged { active: bool, opacity: f32 },
    TimeScaleChanged { game_speed: f32 },
    BallServed { vel: Vec2 },
    BallRecovered,
    MatchFinished { winner: Side, left_score: u32, right_score: u32 },
}

/// Everything the simulation owns: entities, clock, tunables and randomness
#[derive(Debug, Clone)]
pub struct SimulationContext<R = Pcg32> {
    pub settings: Settings,
    pub clock: Clock,
    pub phase: GamePhase,
    pub ball: Ball,
    pub left: Paddle,
    pub right: Paddle,
    pub pickups: Vec<PowerUpPickup>,
    pub multi_balls: Vec<MultiBall>,
    pub gravity_wells: Vec<GravityWell>,
    pub obstacles: Vec<Obstacle>,
    pub portals: Vec<TeleportPortal>,
    pub time_slow: Option<TimeSlow>,
    /// Consecutive paddle hits without a score
    pub rally: u32,
    /// Simulated seconds since the last spawn
    pub power_up_timer: f32,
    pub rng: R,
    next_id: u32,
}

impl SimulationContext<Pcg32> {
    /// Create a context with a seeded PCG generator
    pub fn new(settings: Settings, seed: u64) -> Self {
        Self::with_rng(settings, Pcg32::seed_from_u64(seed))
    }
}

impl<R: Rng> SimulationContext<R> {
    /// Create a context around any generator
    pub fn with_rng(mut settings: Settings, rng: R) -> Self {
        settings.sanitize();
        let game = &settings.game;
        let mut ctx = Self {
            clock: Clock::new(game.game_speed),
            phase: GamePhase::Playing,
            ball: Ball::new(game.base_ball_speed),
            left: Paddle::new(Side::Left, game.paddle_speed),
            right: Paddle::new(Side::Right, game.paddle_speed),
            pickups: Vec::new(),
            multi_balls: Vec::new(),
            gravity_wells: Vec::new(),
            obstacles: Vec::new(),
            portals: Vec::new(),
            time_slow: None,
            rally: 0,
            power_up_timer: 0.0,
            rng,
            next_id: 1,
            settings,
        };
        ctx.ball.reset(0.0);
        ctx
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn paddle(&self, side: Side) -> &Paddle {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn paddle_mut(&mut self, side: Side) -> &mut Paddle {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    pub fn sim_time(&self) -> f32 {
        self.clock.sim_time
    }

    pub fn scores(&self) -> (u32, u32) {
        (self.left.score, self.right.score)
    }

    /// Remove every pickup and field entity and cancel global effects
    pub fn clear_field(&mut self) {
        self.pickups.clear();
        self.multi_balls.clear();
        self.gravity_wells.clear();
        self.obstacles.clear();
        self.portals.clear();
        if let Some(slow) = self.time_slow.take() {
            self.clock.game_speed = slow.restore_speed;
        }
    }

    /// Start a fresh match with the same settings and generator
    pub fn reset_match(&mut self) {
        self.clear_field();
        self.clock = Clock::new(self.settings.game.game_speed);
        self.left.reset();
        self.left.score = 0;
        self.right.reset();
        self.right.score = 0;
        self.ball.reset(self.clock.sim_time);
        self.rally = 0;
        self.power_up_timer = 0.0;
        self.phase = GamePhase::Playing;
        log::info!("Match reset");
    }

    pub fn pause(&mut self) {
        if self.phase == GamePhase::Playing {
            self.phase = GamePhase::Paused;
            log::info!("Paused at t={:.2}", self.clock.sim_time);
        }
    }

    pub fn resume(&mut self) {
        if self.phase == GamePhase::Paused {
            self.phase = GamePhase::Playing;
            log::info!("Resumed at t={:.2}", self.clock.sim_time);
        }
    }
}
