//! Phased timers armed when a request is accepted.

use std::time::Duration;

/// What a request timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Apply cloak effects a few seconds into the job.
    Cloak,
    /// Periodic progress ping.
    Progress { remaining_minutes: u32 },
    /// "Nearly done" ping.
    NearCompletion,
    /// Time is up: deliver.
    Completion,
    /// Pick the next wander destination.
    Wander,
    /// Check whether the delivery teleport landed.
    DeliveryPoll,
}

fn minutes(m: u32) -> Duration {
    Duration::from_secs(u64::from(m) * 60)
}

/// Timers for a job of `duration_minutes`, relative to acceptance.
///
/// The returned order is the scheduling order, which is also the firing
/// order for timers that share a deadline: progress pings come before the
/// near-completion ping, and completion is always last.
pub fn phased_timers(
    duration_minutes: u32,
    progress_interval_minutes: u32,
    near_completion_lead_minutes: u32,
    cloak_delay: Option<Duration>,
) -> Vec<(Duration, Step)> {
    let mut plan = Vec::new();
    let total = minutes(duration_minutes);

    if let Some(delay) = cloak_delay.filter(|delay| *delay < total) {
        plan.push((delay, Step::Cloak));
    }

    if progress_interval_minutes > 0 {
        let pings = duration_minutes / progress_interval_minutes;
        for i in 1..=pings {
            let elapsed = i * progress_interval_minutes;
            plan.push((
                minutes(elapsed),
                Step::Progress {
                    remaining_minutes: duration_minutes - elapsed,
                },
            ));
        }
    }

    if duration_minutes > near_completion_lead_minutes {
        plan.push((
            minutes(duration_minutes - near_completion_lead_minutes),
            Step::NearCompletion,
        ));
    }

    plan.push((total, Step::Completion));
    plan
}
