//! Command packets and operator requests
//!
//! A [`CommandPacket`] is what travels to the creature; a
//! [`ControlRequest`] is what an operator (or a script) asks for before the
//! resolver turns it into a packet.

use serde::{Deserialize, Serialize};

use crate::types::{Direction, Phase, Region, Selection, SubPart};
use crate::Result;

// ----------------------------------------------------------------------------
// Command Packet
// ----------------------------------------------------------------------------

/// One protocol command, immutable once built
///
/// Field order is the wire order. Optional numeric fields are omitted from
/// the encoded line when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandPacket {
    pub target: Region,
    pub part: SubPart,
    pub cmd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    /// Normalized setpoint in `[0.0, 1.0]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,
}

impl CommandPacket {
    pub fn new(selection: Selection, cmd: impl Into<String>) -> Self {
        Self {
            target: selection.region(),
            part: selection.part(),
            cmd: cmd.into(),
            phase: None,
            level: None,
            rate: None,
            delta: None,
        }
    }

    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Set an absolute level, clamped into `[0.0, 1.0]`
    pub fn with_level(mut self, level: f64) -> Self {
        self.level = Some(level.clamp(0.0, 1.0));
        self
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = Some(delta);
        self
    }
}

// ----------------------------------------------------------------------------
// Control Request
// ----------------------------------------------------------------------------

/// Operator request for one gesture phase
///
/// The legacy form carries only `target`, `direction` and `phase`; a missing
/// `part` resolves to [`SubPart::Full`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRequest {
    pub target: Region,
    #[serde(default = "full_part")]
    pub part: SubPart,
    pub direction: Direction,
    pub phase: Phase,
}

fn full_part() -> SubPart {
    SubPart::Full
}

impl ControlRequest {
    /// Validated selection for this request
    pub fn selection(&self) -> Result<Selection> {
        Selection::new(self.target, self.part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_is_clamped() {
        let packet = CommandPacket::new(Selection::full(Region::Arms), "x").with_level(1.7);
        assert_eq!(packet.level, Some(1.0));
        let packet = CommandPacket::new(Selection::full(Region::Arms), "x").with_level(-0.2);
        assert_eq!(packet.level, Some(0.0));
    }

    #[test]
    fn test_legacy_request_defaults_part_to_full() {
        let request: ControlRequest =
            serde_json::from_str(r#"{"target":"tailSpine","direction":"left","phase":"start"}"#)
                .unwrap();
        assert_eq!(request.part, SubPart::Full);
        assert_eq!(request.selection().unwrap(), Selection::full(Region::TailSpine));
    }
}
