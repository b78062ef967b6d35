//! Callback-driven stage reporting (spec §6.2, §9): a typed stream of
//! stage values rather than a mutable global. A `None` sink is the default.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::store::models::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Idle,
    CheckingPool,
    GeneratingYellow,
    GeneratingGreen,
    GeneratingBlue,
    GeneratingPurple,
    CreatingPuzzles,
    Complete,
    Error,
}

impl Stage {
    pub fn generating(color: Color) -> Self {
        match color {
            Color::Yellow => Stage::GeneratingYellow,
            Color::Green => Stage::GeneratingGreen,
            Color::Blue => Stage::GeneratingBlue,
            Color::Purple => Stage::GeneratingPurple,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::CheckingPool => "checking-pool",
            Stage::GeneratingYellow => "generating-yellow",
            Stage::GeneratingGreen => "generating-green",
            Stage::GeneratingBlue => "generating-blue",
            Stage::GeneratingPurple => "generating-purple",
            Stage::CreatingPuzzles => "creating-puzzles",
            Stage::Complete => "complete",
            Stage::Error => "error",
        }
    }
}

pub type StageSink = mpsc::UnboundedSender<Stage>;

/// Sends a stage transition if a sink was supplied; a missing sink is the
/// silent no-op default (spec §9 "a null sink is the default").
pub(crate) fn emit(sink: Option<&StageSink>, stage: Stage) {
    if let Some(sink) = sink {
        let _ = sink.send(stage);
    }
}
