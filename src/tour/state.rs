//! Tour state machine: `Closed` or `Open` at a step index.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TourState {
    #[default]
    Closed,
    Open { step_index: usize },
}

/// User navigation requests while the tour is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Next,
    Previous,
    Jump(usize),
}

/// What a navigation request resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Move to another step.
    MoveTo(usize),
    /// "Next" on the last step: close the tour.
    Finish,
    /// Not allowed from here; nothing happens.
    Ignore,
}

impl TourState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    pub fn step_index(&self) -> Option<usize> {
        match self {
            Self::Open { step_index } => Some(*step_index),
            Self::Closed => None,
        }
    }

    /// Resolve a navigation request against a run of `total` steps.
    ///
    /// Jumping to the current step is a no-op.
    pub fn resolve(&self, nav: Navigation, total: usize) -> Resolution {
        let Self::Open { step_index: i } = *self else {
            return Resolution::Ignore;
        };
        if total == 0 {
            return Resolution::Ignore;
        }
        let last = total - 1;

        match nav {
            Navigation::Next if i < last => Resolution::MoveTo(i + 1),
            Navigation::Next => Resolution::Finish,
            Navigation::Previous if i > 0 => Resolution::MoveTo(i - 1),
            Navigation::Previous => Resolution::Ignore,
            Navigation::Jump(j) if j < total && j != i => Resolution::MoveTo(j),
            Navigation::Jump(_) => Resolution::Ignore,
        }
    }
}

impl std::fmt::Display for TourState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open { step_index } => write!(f, "open({step_index})"),
        }
    }
}

/// Percentage of the run reached at `index`, rounded.
pub fn progress_percent(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = ((index + 1) as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(i: usize) -> TourState {
        TourState::Open { step_index: i }
    }

    #[test]
    fn next_advances_until_last_then_finishes() {
        assert_eq!(open(0).resolve(Navigation::Next, 3), Resolution::MoveTo(1));
        assert_eq!(open(1).resolve(Navigation::Next, 3), Resolution::MoveTo(2));
        assert_eq!(open(2).resolve(Navigation::Next, 3), Resolution::Finish);
    }

    #[test]
    fn previous_stops_at_first() {
        assert_eq!(open(2).resolve(Navigation::Previous, 3), Resolution::MoveTo(1));
        assert_eq!(open(0).resolve(Navigation::Previous, 3), Resolution::Ignore);
    }

    #[test]
    fn jump_to_any_valid_index() {
        assert_eq!(open(0).resolve(Navigation::Jump(4), 5), Resolution::MoveTo(4));
        assert_eq!(open(4).resolve(Navigation::Jump(0), 5), Resolution::MoveTo(0));
        assert_eq!(open(1).resolve(Navigation::Jump(5), 5), Resolution::Ignore);
        assert_eq!(open(1).resolve(Navigation::Jump(1), 5), Resolution::Ignore);
    }

    #[test]
    fn closed_ignores_navigation() {
        for nav in [Navigation::Next, Navigation::Previous, Navigation::Jump(0)] {
            assert_eq!(TourState::Closed.resolve(nav, 3), Resolution::Ignore);
        }
    }

    #[test]
    fn progress_rounds() {
        assert_eq!(progress_percent(0, 8), 13);
        assert_eq!(progress_percent(2, 8), 38);
        assert_eq!(progress_percent(7, 8), 100);
        assert_eq!(progress_percent(0, 0), 0);
    }

    #[test]
    fn state_serde() {
        let json = serde_json::to_value(open(3)).unwrap();
        assert_eq!(json["state"], "open");
        assert_eq!(json["step_index"], 3);
        assert_eq!(format!("{}", TourState::Closed), "closed");
    }
}
