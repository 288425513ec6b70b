//! AI paddle targeting
//!
//! Predicts where the ball will meet the paddle face, folding the straight
//! line trajectory across the top/bottom walls, then degrades the guess by
//! a difficulty-scaled error.

use rand::Rng;

use super::state::{Ball, Paddle, PowerUpPickup};
use crate::consts::*;
use crate::settings::Difficulty;
use crate::{ball_limit_y, spread};

/// Difficulty above which the AI may chase pickups
const PICKUP_CHASE_THRESHOLD: f32 = 0.7;

/// Reflect `y` across ±`half` until it lies inside the field.
///
/// Equivalent to stepping through every wall bounce; non-finite input
/// folds to the centerline.
pub fn fold_into_field(y: f32, half: f32) -> f32 {
    if !y.is_finite() || half <= 0.0 {
        return 0.0;
    }
    let period = 4.0 * half;
    let phase = (y + half).rem_euclid(period);
    let folded = if phase <= 2.0 * half { phase - half } else { 3.0 * half - phase };
    folded.clamp(-half, half)
}

/// Where the ball will cross the paddle face, assuming only wall bounces.
///
/// Returns the paddle's own position when the ball is not approaching.
pub fn predict_intercept(ball: &Ball, paddle: &Paddle) -> f32 {
    let toward = ball.vel.x * paddle.side.sign();
    if ball.vel.x == 0.0 || toward <= 0.0 {
        return paddle.y;
    }
    let time_to_reach = (paddle.face_x() - ball.pos.x).abs() / ball.vel.x.abs();
    fold_into_field(ball.pos.y + ball.vel.y * time_to_reach, ball_limit_y())
}

/// Target y for an AI paddle, including error and pickup bias
pub fn target_y(
    ball: &Ball,
    paddle: &Paddle,
    pickups: &[PowerUpPickup],
    difficulty: Difficulty,
    sim_time: f32,
    rng: &mut impl Rng,
) -> f32 {
    let factor = difficulty.factor(sim_time);
    let mut predicted = predict_intercept(ball, paddle);

    if factor > PICKUP_CHASE_THRESHOLD && rng.random::<f32>() < factor * 0.3 {
        let chased = pickups
            .iter()
            .filter(|p| p.side == paddle.side)
            .find(|_| rng.random::<f32>() < 0.8);
        if let Some(pickup) = chased {
            predicted += (pickup.pos.y - predicted) * 0.5;
        }
    }

    let max_error = (1.0 - factor) * AI_MAX_ERROR;
    predicted + spread(rng.random::<f32>(), max_error)
}

/// Direction intent toward `target`, with a deadzone
pub fn direction_toward(paddle_y: f32, target: f32) -> i8 {
    let diff = target - paddle_y;
    if diff.abs() < AI_DEADZONE {
        0
    } else if diff > 0.0 {
        1
    } else {
        -1
    }
}
