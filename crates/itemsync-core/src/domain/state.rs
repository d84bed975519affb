//! State enums used by the progress aggregator and status views.

use serde::{Deserialize, Serialize};

/// Resolution state of the job's root item.
///
/// - Unknown: the root fetch has not resolved yet
/// - Missing: the fetch resolved without an item (network failure, no body)
/// - Found: the root item was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfState {
    #[default]
    Unknown,
    Missing,
    Found,
}

impl SelfState {
    /// Known either way: failure and success both count as resolved.
    pub fn is_resolved(self) -> bool {
        !matches!(self, SelfState::Unknown)
    }
}

/// Readability extraction tracking for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadabilityState {
    /// Not tracked; contributes nothing to progress or max.
    #[default]
    Disabled,
    Pending,
    Done,
}

impl ReadabilityState {
    pub fn is_tracked(self) -> bool {
        !matches!(self, ReadabilityState::Disabled)
    }

    pub fn is_done(self) -> bool {
        matches!(self, ReadabilityState::Done)
    }
}

/// Lifecycle of one job run.
///
/// - Running: fetches and aggregation in progress
/// - Completed: `progress >= max` was observed, completion callback fired
/// - Stopped: stopped explicitly before completion
/// - TimedOut: the one-shot timer fired before completion
/// - Superseded: replaced by a newer `perform_sync` for the same id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Completed,
    Stopped,
    TimedOut,
    Superseded,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunState::Running)
    }

    /// Whether leaving this state clears the user-visible progress indicator.
    ///
    /// A superseded run hands its indicator over to the run replacing it.
    pub fn clears_indicator(self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Stopped | RunState::TimedOut
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(RunState::Running, false, false)]
    #[case(RunState::Completed, true, true)]
    #[case(RunState::Stopped, true, true)]
    #[case(RunState::TimedOut, true, true)]
    #[case(RunState::Superseded, true, false)]
    fn run_state_flags(#[case] state: RunState, #[case] terminal: bool, #[case] clears: bool) {
        assert_eq!(state.is_terminal(), terminal);
        assert_eq!(state.clears_indicator(), clears);
    }

    #[test]
    fn failure_and_success_both_resolve_self() {
        assert!(!SelfState::Unknown.is_resolved());
        assert!(SelfState::Missing.is_resolved());
        assert!(SelfState::Found.is_resolved());
    }
}
