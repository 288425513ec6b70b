//! Cosmic Pong - a two-paddle arena game with power-ups
//!
//! Core modules:
//! - `sim`: Deterministic simulation (ball physics, collisions, power-ups, AI)
//! - `settings`: Data-driven game tunables
//!
//! Rendering, audio, UI panels and networking live outside this crate and
//! talk to the simulation through [`sim::advance`] and [`sim::SimEvent`].

pub mod settings;
pub mod sim;

pub use settings::{Difficulty, Settings};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Frames with a larger wall-clock delta than this are skipped entirely
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Field dimensions (centered on the origin)
    pub const FIELD_WIDTH: f32 = 80.0;
    pub const FIELD_HEIGHT: f32 = 50.0;

    /// Paddle defaults
    pub const PADDLE_WIDTH: f32 = 1.0;
    pub const PADDLE_HEIGHT: f32 = 10.0;
    /// Distance of the paddle centerline from the scoring line
    pub const PADDLE_INSET: f32 = 3.0;
    /// Paddle travel stops this far from the walls
    pub const PADDLE_WALL_MARGIN: f32 = 1.0;
    /// Speed contribution of a moving paddle on hit
    pub const PADDLE_MOTION_INFLUENCE: f32 = 0.3;

    /// Ball defaults
    pub const BALL_RADIUS: f32 = 1.0;
    /// Simulated seconds between a reset and the next serve
    pub const SERVE_DELAY: f32 = 0.5;
    /// Serve angle limit either side of horizontal (radians)
    pub const SERVE_MAX_ANGLE: f32 = std::f32::consts::FRAC_PI_4;

    /// Ball is pushed this far back inside a top/bottom wall after a bounce
    pub const WALL_EPSILON: f32 = 0.3;
    /// Smallest |vy| after a wall bounce (keeps the reflected sign stable)
    pub const MIN_WALL_REBOUND: f32 = 0.05;

    /// Maximum bounce angle off a paddle edge (70 degrees)
    pub const MAX_BOUNCE_ANGLE: f32 = 70.0 * std::f32::consts::PI / 180.0;
    /// Cap on the quadratic rally multiplier
    pub const RALLY_FACTOR_CAP: f32 = 5.0;

    /// Stuck-ball detection
    pub const STUCK_VY_THRESHOLD: f32 = 0.5;
    pub const WALL_LINGER_BAND: f32 = 1.0;

    /// Pickups are collected when the ball center is this close
    pub const PICKUP_RADIUS: f32 = BALL_RADIUS + 2.0;

    /// Field entities
    pub const GRAVITY_WELL_RADIUS: f32 = 20.0;
    /// Gravity well acceleration gain (per simulated second)
    pub const GRAVITY_WELL_GAIN: f32 = 12.0;
    /// Magnet pull gain (per simulated second, per unit of distance)
    pub const MAGNET_GAIN: f32 = 0.03;
    pub const PORTAL_RADIUS: f32 = 3.0;
    pub const PORTAL_COOLDOWN: f32 = 1.0;
    pub const OBSTACLE_WIDTH: f32 = 2.0;
    pub const OBSTACLE_HEIGHT: f32 = 8.0;
    pub const OBSTACLE_JITTER: f32 = 0.5;
    pub const MULTI_BALL_SPEED_FACTOR: f32 = 0.9;
    /// Per-tick chance a multi-ball wanders off its heading
    pub const MULTI_BALL_WANDER_CHANCE: f32 = 0.02;

    /// Ghost ball opacity while active / after
    pub const GHOST_OPACITY: f32 = 0.4;
    pub const SOLID_OPACITY: f32 = 0.9;

    /// AI tuning
    pub const AI_DEADZONE: f32 = 0.5;
    pub const AI_MAX_ERROR: f32 = 15.0;
}

/// Largest |y| the ball center may occupy
#[inline]
pub fn ball_limit_y() -> f32 {
    consts::FIELD_HEIGHT / 2.0 - consts::BALL_RADIUS
}

/// Largest |y| a paddle edge may reach
#[inline]
pub fn paddle_limit_y() -> f32 {
    consts::FIELD_HEIGHT / 2.0 - consts::PADDLE_WALL_MARGIN
}

/// Unit vector for a heading angle (radians)
#[inline]
pub fn heading(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Uniform value in `[-range/2, range/2]` from a unit sample
#[inline]
pub fn spread(unit: f32, range: f32) -> f32 {
    (unit - 0.5) * range
}
