//! Load profiles and the per-VU schedule derived from them
//!
//! A [`LoadProfile`] declares how many virtual users should be active over
//! time. [`SchedulePlan`] turns that declaration into concrete activity
//! windows for every VU index so the scheduler only has to sleep until a
//! window opens and stop iterating once it closes.
//!
//! Ramps are linear. When a ramp adds `K` VUs over `D`, the `i`-th new VU
//! (1-based) starts at `i * D / K`; when a ramp removes `K` VUs the highest
//! index is retired first, the `j`-th (0-based) at `j * D / K`. Start times
//! round up and retire times round down, which keeps the scheduled count at
//! or below the declared target at every instant.

use crate::error::ProfileError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Declared concurrency over time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadProfile {
    /// `vus` active for `duration`, optionally capped at `iterations` per VU
    Fixed {
        vus: u32,
        #[serde(with = "humantime_serde")]
        duration: Duration,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        iterations: Option<u64>,
    },
    /// Linear ramps between successive targets
    Staged {
        #[serde(default)]
        start_vus: u32,
        stages: Vec<Stage>,
    },
}

/// One ramp segment of a staged profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub target: u32,
}

impl Stage {
    pub fn new(duration: Duration, target: u32) -> Self {
        Self { duration, target }
    }
}

impl LoadProfile {
    pub fn fixed(vus: u32, duration: Duration) -> Self {
        LoadProfile::Fixed {
            vus,
            duration,
            iterations: None,
        }
    }

    pub fn per_vu_iterations(vus: u32, iterations: u64, max_duration: Duration) -> Self {
        LoadProfile::Fixed {
            vus,
            duration: max_duration,
            iterations: Some(iterations),
        }
    }

    pub fn staged(start_vus: u32, stages: Vec<Stage>) -> Self {
        LoadProfile::Staged { start_vus, stages }
    }

    /// Check the profile invariants
    pub fn validate(&self) -> Result<(), ProfileError> {
        match self {
            LoadProfile::Fixed {
                vus,
                duration,
                iterations,
            } => {
                if *vus == 0 {
                    return Err(ProfileError::NoVirtualUsers);
                }
                if duration.is_zero() {
                    return Err(ProfileError::ZeroDuration);
                }
                if *iterations == Some(0) {
                    return Err(ProfileError::ZeroIterations);
                }
            }
            LoadProfile::Staged { stages, .. } => {
                if stages.is_empty() {
                    return Err(ProfileError::NoStages);
                }
                if self.total_duration()?.is_zero() {
                    return Err(ProfileError::ZeroDuration);
                }
                if self.max_vus() == 0 {
                    return Err(ProfileError::NeverActive);
                }
            }
        }
        Ok(())
    }

    /// Wall-clock length of the whole profile
    pub fn total_duration(&self) -> Result<Duration, ProfileError> {
        match self {
            LoadProfile::Fixed { duration, .. } => Ok(*duration),
            LoadProfile::Staged { stages, .. } => stages
                .iter()
                .try_fold(Duration::ZERO, |acc, stage| acc.checked_add(stage.duration))
                .ok_or(ProfileError::DurationOverflow),
        }
    }

    /// Highest concurrency the profile ever declares
    pub fn max_vus(&self) -> u32 {
        match self {
            LoadProfile::Fixed { vus, .. } => *vus,
            LoadProfile::Staged { start_vus, stages } => stages
                .iter()
                .map(|s| s.target)
                .fold(*start_vus, u32::max),
        }
    }

    /// Per-VU iteration limit, if any
    pub fn iteration_limit(&self) -> Option<u64> {
        match self {
            LoadProfile::Fixed { iterations, .. } => *iterations,
            LoadProfile::Staged { .. } => None,
        }
    }

    /// Derive the activity windows of every VU
    pub fn plan(&self) -> Result<SchedulePlan, ProfileError> {
        self.validate()?;

        let (initial, segments) = match self {
            LoadProfile::Fixed { vus, duration, .. } => (
                *vus,
                vec![Segment {
                    start: Duration::ZERO,
                    duration: *duration,
                    from: *vus,
                    to: *vus,
                }],
            ),
            LoadProfile::Staged { start_vus, stages } => {
                let mut segments = Vec::with_capacity(stages.len());
                let mut start = Duration::ZERO;
                let mut current = *start_vus;
                for stage in stages {
                    segments.push(Segment {
                        start,
                        duration: stage.duration,
                        from: current,
                        to: stage.target,
                    });
                    start = start
                        .checked_add(stage.duration)
                        .ok_or(ProfileError::DurationOverflow)?;
                    current = stage.target;
                }
                (*start_vus, segments)
            }
        };

        let total = self.total_duration()?;
        let max_vus = self.max_vus() as usize;
        let mut windows: Vec<Vec<ActivityWindow>> = vec![Vec::new(); max_vus];
        let mut open: Vec<Option<Duration>> = vec![None; max_vus];

        for slot in open.iter_mut().take(initial as usize) {
            *slot = Some(Duration::ZERO);
        }

        for segment in &segments {
            if segment.to > segment.from {
                let added = (segment.to - segment.from) as u128;
                for i in 1..=added {
                    let vu = segment.from as usize + i as usize;
                    open[vu - 1] = Some(segment.start + fraction(segment.duration, i, added, true));
                }
            } else if segment.to < segment.from {
                let removed = (segment.from - segment.to) as u128;
                for j in 0..removed {
                    let vu = segment.from as usize - j as usize;
                    if let Some(start) = open[vu - 1].take() {
                        let stop = segment.start + fraction(segment.duration, j, removed, false);
                        push_window(&mut windows[vu - 1], start, stop);
                    }
                }
            }
        }

        for (index, slot) in open.into_iter().enumerate() {
            if let Some(start) = slot {
                push_window(&mut windows[index], start, total);
            }
        }

        Ok(SchedulePlan {
            initial,
            segments,
            windows,
            total,
            iteration_limit: self.iteration_limit(),
        })
    }
}

fn fraction(duration: Duration, numerator: u128, denominator: u128, round_up: bool) -> Duration {
    let scaled = duration.as_nanos() * numerator;
    let nanos = if round_up {
        scaled.div_ceil(denominator)
    } else {
        scaled / denominator
    };
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

fn push_window(windows: &mut Vec<ActivityWindow>, start: Duration, stop: Duration) {
    if stop > start {
        windows.push(ActivityWindow { start, stop });
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Segment {
    start: Duration,
    duration: Duration,
    from: u32,
    to: u32,
}

/// Half-open interval `[start, stop)` relative to run start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityWindow {
    pub start: Duration,
    pub stop: Duration,
}

impl ActivityWindow {
    pub fn contains(&self, t: Duration) -> bool {
        self.start <= t && t < self.stop
    }
}

/// Concrete schedule for every VU index of a profile
#[derive(Debug, Clone)]
pub struct SchedulePlan {
    initial: u32,
    segments: Vec<Segment>,
    windows: Vec<Vec<ActivityWindow>>,
    total: Duration,
    iteration_limit: Option<u64>,
}

impl SchedulePlan {
    pub fn max_vus(&self) -> u32 {
        self.windows.len() as u32
    }

    pub fn total_duration(&self) -> Duration {
        self.total
    }

    pub fn iteration_limit(&self) -> Option<u64> {
        self.iteration_limit
    }

    /// Activity windows of VU `vu` (1-based)
    pub fn windows(&self, vu: u32) -> &[ActivityWindow] {
        (vu as usize)
            .checked_sub(1)
            .and_then(|index| self.windows.get(index))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Declared (possibly fractional) concurrency at instant `t`
    pub fn target_at(&self, t: Duration) -> f64 {
        let mut current = self.initial as f64;
        for segment in &self.segments {
            if t < segment.start {
                break;
            }
            let end = segment.start + segment.duration;
            if t >= end {
                current = segment.to as f64;
                continue;
            }
            let progress = (t - segment.start).as_secs_f64() / segment.duration.as_secs_f64();
            return segment.from as f64 + (segment.to as f64 - segment.from as f64) * progress;
        }
        current
    }

    /// Number of VUs whose window contains instant `t`
    pub fn scheduled_at(&self, t: Duration) -> u32 {
        self.windows
            .iter()
            .filter(|vu_windows| vu_windows.iter().any(|w| w.contains(t)))
            .count() as u32
    }
}
