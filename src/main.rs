//! Cosmic Pong headless runner
//!
//! Plays an AI-vs-AI match at a fixed 60 Hz frame rate and logs the events.
//! Usage: `cosmic-pong [seed] [settings.json]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use cosmic_pong::Settings;
    use cosmic_pong::sim::{InputIntents, SimEvent, SimulationContext, advance};

    const FRAME_DT: f32 = 1.0 / 60.0;
    /// One hour of frames
    const MAX_FRAMES: u64 = 60 * 60 * 60;

    env_logger::init();

    let mut args = std::env::args().skip(1);
    let seed = match args.next() {
        Some(arg) => arg.parse().unwrap_or_else(|err| {
            log::warn!("Invalid seed {arg:?} ({err}), using 0");
            0
        }),
        None => 0,
    };
    let settings = args.next().map(Settings::load).unwrap_or_default();

    log::info!("Cosmic Pong (headless) starting with seed: {seed}");
    let mut ctx = SimulationContext::new(settings, seed);
    let intents = InputIntents::ai();

    for frame in 0..MAX_FRAMES {
        for event in advance(&mut ctx, FRAME_DT, &intents) {
            match event {
                SimEvent::MatchFinished {
                    winner,
                    left_score,
                    right_score,
                } => {
                    println!(
                        "{winner:?} wins {left_score} - {right_score} after {:.1}s simulated ({frame} frames)",
                        ctx.sim_time()
                    );
                    return;
                }
                SimEvent::Scored { .. } | SimEvent::PowerUpActivated { .. } => log::info!("{event:?}"),
                _ => log::debug!("{event:?}"),
            }
        }
    }

    let (left, right) = ctx.scores();
    println!("No winner after {MAX_FRAMES} frames: {left} - {right}");
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Wasm hosts drive the simulation through the library API
}
