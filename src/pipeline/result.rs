//! `PipelineFillResult` — the wire-format result of a `FillWindow` run
//! (spec §6.3).

use serde::Serialize;

use crate::store::models::Color;

use super::error::PipelineErrorEntry;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ColorOutcome {
    pub generated: u32,
    pub saved: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupsByColor {
    pub yellow: ColorOutcome,
    pub green: ColorOutcome,
    pub blue: ColorOutcome,
    pub purple: ColorOutcome,
}

impl GroupsByColor {
    pub fn entry(&mut self, color: Color) -> &mut ColorOutcome {
        match color {
            Color::Yellow => &mut self.yellow,
            Color::Green => &mut self.green,
            Color::Blue => &mut self.blue,
            Color::Purple => &mut self.purple,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineFillResult {
    pub puzzles_created: u32,
    pub empty_days_remaining: u32,
    pub ai_generation_triggered: bool,
    pub groups_generated: u32,
    pub groups_saved: u32,
    pub groups_by_color: GroupsByColor,
    pub errors: Vec<PipelineErrorEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_uses_camel_case_field_names() {
        let result = PipelineFillResult::default();
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("puzzlesCreated").is_some());
        assert!(json.get("emptyDaysRemaining").is_some());
        assert!(json.get("groupsByColor").is_some());
    }
}
