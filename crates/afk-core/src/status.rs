//! Serializable snapshots for `!request status` and the console.

use crate::request::{InterruptionFlags, Phase, Request, RequestId};
use afk_proto::Position;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

/// Point-in-time view of the active request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestStatus {
    pub id: RequestId,
    pub resource: String,
    pub stacks: u32,
    pub units: u32,
    pub recipient: String,
    pub requester: String,
    pub phase: Phase,
    pub created_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub elapsed_secs: u64,
    /// Rounded up, so a job with 30 seconds left reports one minute.
    pub remaining_minutes: u64,
    pub pending_timers: usize,
    pub died_mid_request: bool,
    pub awaiting_arrival: bool,
}

impl RequestStatus {
    pub fn capture(request: &Request, flags: InterruptionFlags, now: Instant) -> Self {
        Self {
            id: request.id,
            resource: request.resource.to_string(),
            stacks: request.stacks,
            units: request.units,
            recipient: request.recipient.clone(),
            requester: request.requester.clone(),
            phase: request.phase(),
            created_at: request.created_at,
            duration_minutes: request.duration_minutes,
            elapsed_secs: now.saturating_duration_since(request.accepted_at).as_secs(),
            remaining_minutes: request.remaining(now).as_secs().div_ceil(60),
            pending_timers: request.scheduled_timers().len(),
            died_mid_request: flags.died_mid_request,
            awaiting_arrival: flags.awaiting_goal_phase_transition,
        }
    }

    /// One chat line.
    pub fn summary(&self) -> String {
        format!(
            "Request {}: {} x{} for {}, {}, {} min left",
            self.id, self.resource, self.units, self.recipient, self.phase, self.remaining_minutes
        )
    }
}

/// Agent-wide snapshot returned to status queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStatus {
    pub name: String,
    pub position: Option<Position>,
    pub underground: bool,
    pub circling: bool,
    pub last_surface: Option<Position>,
    pub request: Option<RequestStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RequestStatus {
        RequestStatus {
            id: RequestId::new(3),
            resource: "stone".to_string(),
            stacks: 3,
            units: 192,
            recipient: "bob".to_string(),
            requester: "alice".to_string(),
            phase: Phase::Wandering,
            created_at: Utc::now(),
            duration_minutes: 15,
            elapsed_secs: 120,
            remaining_minutes: 13,
            pending_timers: 4,
            died_mid_request: false,
            awaiting_arrival: false,
        }
    }

    #[test]
    fn test_summary_line() {
        assert_eq!(
            sample().summary(),
            "Request #3: stone x192 for bob, wandering, 13 min left"
        );
    }

    #[test]
    fn test_serializes_phase_and_id_plainly() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["phase"], "wandering");
        assert_eq!(json["awaiting_arrival"], false);
    }
}
