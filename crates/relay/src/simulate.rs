use std::time::Duration;

use dronewatch_core::TelemetrySample;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::state::AppState;

// Orbit centre and radii in telemetry units; keeps the marker inside an
// 800x300 px surface at 30 px per unit.
const CENTER: (f64, f64) = (13.0, 5.0);
const RADIUS: (f64, f64) = (8.0, 3.5);
const ANGULAR_SPEED: f64 = 0.4;
const CRUISE_ALTITUDE: f64 = 50.0;
const ALTITUDE_SWING: f64 = 12.0;

/// Position of the simulated drone `t` seconds after start.
pub fn orbit_sample(t: f64) -> TelemetrySample {
    let phase = ANGULAR_SPEED * t;
    TelemetrySample::new(
        CENTER.0 + RADIUS.0 * phase.cos(),
        CENTER.1 + RADIUS.1 * phase.sin(),
        CRUISE_ALTITUDE + ALTITUDE_SWING * (0.25 * t).sin(),
    )
}

pub async fn run_simulator(state: AppState, hz: f64) {
    let period = Duration::from_secs_f64(1.0 / hz);
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(hz, "simulated drone publishing");

    let mut tick = 0u64;
    loop {
        ticker.tick().await;
        let sample = orbit_sample(tick as f64 * period.as_secs_f64());
        let receivers = state.publish(&sample);
        if tick % 100 == 0 {
            debug!(tick, receivers, z = sample.z, "simulated sample");
        }
        tick += 1;
    }
}
