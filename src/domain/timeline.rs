//! Fulfillment timeline
//!
//! Orders move forward through four fixed stages. The timeline only records where
//! an order is and refuses to move it backwards; advancing is driven externally.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Stage {
    Confirmed = 1,
    Preparing = 2,
    InTransit = 3,
    Delivered = 4,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Confirmed, Stage::Preparing, Stage::InTransit, Stage::Delivered];
    pub const COUNT: u8 = 4;

    pub fn step(self) -> u8 { self as u8 }

    pub fn from_step(step: u8) -> Result<Self, TimelineError> {
        match step {
            1 => Ok(Self::Confirmed),
            2 => Ok(Self::Preparing),
            3 => Ok(Self::InTransit),
            4 => Ok(Self::Delivered),
            other => Err(TimelineError::InvalidStep(other)),
        }
    }

    /// Customer-facing label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Confirmed => "Confirmado",
            Self::Preparing => "Importando",
            Self::InTransit => "Em Trânsito",
            Self::Delivered => "Entregue",
        }
    }

    pub fn is_terminal(self) -> bool { self == Self::Delivered }
}

impl TryFrom<u8> for Stage {
    type Error = TimelineError;
    fn try_from(step: u8) -> Result<Self, Self::Error> { Self::from_step(step) }
}

impl From<Stage> for u8 { fn from(stage: Stage) -> u8 { stage.step() } }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState { Completed, Current, Pending }

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TimelineEntry { pub stage: Stage, pub label: &'static str, pub state: StepState }

/// Tracks the current fulfillment stage of a single order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline { current: Stage }

impl Default for Timeline { fn default() -> Self { Self::new(Stage::Confirmed) } }

impl Timeline {
    pub fn new(current: Stage) -> Self { Self { current } }
    pub fn current(&self) -> Stage { self.current }

    pub fn state_of(&self, stage: Stage) -> StepState {
        match stage.cmp(&self.current) {
            std::cmp::Ordering::Less => StepState::Completed,
            std::cmp::Ordering::Equal => StepState::Current,
            std::cmp::Ordering::Greater => StepState::Pending,
        }
    }

    pub fn entries(&self) -> Vec<TimelineEntry> {
        Stage::ALL.iter().map(|&stage| TimelineEntry { stage, label: stage.label(), state: self.state_of(stage) }).collect()
    }

    /// `(current - 1) / (N - 1)`, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        f64::from(self.current.step() - 1) / f64::from(Stage::COUNT - 1)
    }

    /// Applies an external stage update. Returns `Ok(false)` when `step` is already current.
    pub fn advance(&mut self, step: u8) -> Result<bool, TimelineError> {
        let next = Stage::from_step(step)?;
        if next < self.current {
            return Err(TimelineError::Regression { current: self.current.step(), requested: step });
        }
        let moved = next != self.current;
        self.current = next;
        Ok(moved)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    #[error("fulfillment step must be between 1 and 4, got {0}")]
    InvalidStep(u8),
    #[error("fulfillment step cannot go back from {current} to {requested}")]
    Regression { current: u8, requested: u8 },
}
