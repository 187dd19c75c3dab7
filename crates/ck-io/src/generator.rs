//! Periodic ramp-hold test signal with seeded Gaussian noise.

use std::path::Path;

use ck_core::Real;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::{IoError, IoResult};
use crate::export::export_signal_csv;

/// One period: ramp up, hold high, ramp down, hold low.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RampHoldProfile {
    pub x_lo: Real,
    pub x_hi: Real,
    pub t_up_ms: u64,
    pub t_hold_hi_ms: u64,
    pub t_down_ms: u64,
    pub t_hold_lo_ms: u64,
}

impl Default for RampHoldProfile {
    fn default() -> Self {
        Self {
            x_lo: 0.0,
            x_hi: 100.0,
            t_up_ms: 2000,
            t_hold_hi_ms: 4000,
            t_down_ms: 2000,
            t_hold_lo_ms: 4000,
        }
    }
}

impl RampHoldProfile {
    pub fn period_ms(&self) -> u64 {
        self.t_up_ms + self.t_hold_hi_ms + self.t_down_ms + self.t_hold_lo_ms
    }
}

/// Noise-free profile value at `t_ms`.
pub fn ramp_hold_value(profile: &RampHoldProfile, t_ms: u64) -> Real {
    let period = profile.period_ms();
    if period == 0 {
        return profile.x_lo;
    }
    let span = profile.x_hi - profile.x_lo;
    let mut u = t_ms % period;

    if u < profile.t_up_ms {
        return profile.x_lo + (u as Real / profile.t_up_ms.max(1) as Real) * span;
    }
    u -= profile.t_up_ms;
    if u < profile.t_hold_hi_ms {
        return profile.x_hi;
    }
    u -= profile.t_hold_hi_ms;
    if u < profile.t_down_ms {
        return profile.x_hi - (u as Real / profile.t_down_ms.max(1) as Real) * span;
    }
    profile.x_lo
}

/// Generator settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalSpec {
    pub dt_ms: u64,
    pub seconds: u64,
    pub profile: RampHoldProfile,
    /// Peak noise amplitude; the noise standard deviation is a third of it.
    pub noise_amp: Real,
    pub seed: u64,
}

impl Default for SignalSpec {
    fn default() -> Self {
        Self {
            dt_ms: 50,
            seconds: 20,
            profile: RampHoldProfile::default(),
            noise_amp: 10.0,
            seed: 12345,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedSignal {
    pub t_ms: Vec<u64>,
    pub x: Vec<Real>,
}

impl GeneratedSignal {
    pub fn t_s(&self) -> Vec<Real> {
        self.t_ms.iter().map(|&t| t as Real / 1000.0).collect()
    }
}

/// Sample the profile every `dt_ms` for `seconds`, adding noise.
///
/// The same seed always yields the same signal.
pub fn generate_signal(spec: &SignalSpec) -> IoResult<GeneratedSignal> {
    if spec.dt_ms == 0 {
        return Err(IoError::InvalidArg {
            what: "dt_ms must be positive".to_string(),
        });
    }
    let sigma = spec.noise_amp / 3.0;
    let noise = Normal::new(0.0, sigma).map_err(|e| IoError::InvalidArg {
        what: format!("noise_amp {}: {e}", spec.noise_amp),
    })?;
    let mut rng = StdRng::seed_from_u64(spec.seed);

    let total = spec
        .seconds
        .checked_mul(1000)
        .and_then(|ms| usize::try_from(ms / spec.dt_ms).ok())
        .ok_or_else(|| IoError::InvalidArg {
            what: format!("signal length {} s is too long", spec.seconds),
        })?;
    let mut t_ms = Vec::with_capacity(total);
    let mut x = Vec::with_capacity(total);
    for i in 0..total as u64 {
        let t = i * spec.dt_ms;
        t_ms.push(t);
        x.push(ramp_hold_value(&spec.profile, t) + noise.sample(&mut rng));
    }

    tracing::debug!(samples = total, sigma, seed = spec.seed, "generated ramp-hold signal");
    Ok(GeneratedSignal { t_ms, x })
}

/// Generate a signal and write it as `time,x`.
pub fn generate_signal_csv(
    path: impl AsRef<Path>,
    spec: &SignalSpec,
    time_in_ms: bool,
) -> IoResult<GeneratedSignal> {
    let signal = generate_signal(spec)?;
    export_signal_csv(path, &signal.t_s(), &signal.x, time_in_ms)?;
    Ok(signal)
}
