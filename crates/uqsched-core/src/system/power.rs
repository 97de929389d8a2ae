//! Power profiles of a timed schedule.

use crate::error::{Error, Result};

use super::platform::Platform;
use super::schedule::Schedule;

/// Sample the power dissipation of `schedule` at `time_step` intervals.
///
/// `profile` is cleared and filled row-major with `steps × cores` values,
/// each the average power of a core over one interval (leakage included).
/// Returns the number of steps.
pub fn profile_into(
    schedule: &Schedule,
    platform: &Platform,
    time_step: f64,
    profile: &mut Vec<f64>,
) -> Result<usize> {
    let span = schedule.span();
    if !(span.is_finite() && span > 0.0) {
        return Err(Error::simulation(format!(
            "cannot sample power of a schedule with span {span}"
        )));
    }
    let cores = platform.cores();
    let steps = ((span / time_step).ceil() as usize).max(1);

    profile.clear();
    profile.resize(steps * cores, 0.0);
    for row in profile.chunks_exact_mut(cores) {
        for (core, p) in row.iter_mut().enumerate() {
            *p = platform.leakage(core);
        }
    }

    for (task, &core) in schedule.mapping.iter().enumerate() {
        let (begin, end) = (schedule.start[task], schedule.finish[task]);
        if end <= begin {
            continue;
        }
        let power = platform.power(task, core);
        let first = (begin / time_step).floor() as usize;
        let last = ((end / time_step).ceil() as usize).min(steps);
        for step in first..last {
            let from = begin.max(step as f64 * time_step);
            let to = end.min((step + 1) as f64 * time_step);
            if to > from {
                profile[step * cores + core] += power * (to - from) / time_step;
            }
        }
    }

    Ok(steps)
}

/// Energy consumed by `schedule`: dynamic energy of every task plus leakage of
/// every core over the whole span.
pub fn energy(schedule: &Schedule, platform: &Platform, durations: &[f64]) -> f64 {
    let dynamic: f64 = schedule
        .mapping
        .iter()
        .enumerate()
        .map(|(task, &core)| platform.power(task, core) * durations[task])
        .sum();
    let leakage: f64 = (0..platform.cores()).map(|c| platform.leakage(c)).sum();
    dynamic + leakage * schedule.span()
}
