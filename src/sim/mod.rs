//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Simulated time only (no wall-clock timers)
//! - Seeded RNG only, owned by the context
//! - Stable iteration order (spawn order)
//! - No rendering or platform dependencies

pub mod ai;
pub mod collision;
pub mod powerups;
pub mod state;
pub mod tick;

pub use collision::{CollisionResult, reflect_velocity};
pub use state::{
    ActiveEffect, Ball, Clock, EffectKind, GamePhase, GravityWell, MultiBall, Obstacle, Paddle,
    PowerUpKind, PowerUpPickup, Side, SimEvent, SimulationContext, TeleportPortal, TimeSlow,
};
pub use tick::{InputIntents, advance};
