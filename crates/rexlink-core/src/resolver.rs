//! Mapping from gestures to protocol commands
//!
//! Every (sub-part, direction) pair belongs to one command family, and the
//! family decides what a `stop` looks like:
//!
//! | Family     | start / hold                 | stop                              |
//! |------------|------------------------------|-----------------------------------|
//! | `Setpoint` | absolute `level`             | same command at the neutral level |
//! | `Motion`   | verb with a fixed `rate`     | the family's explicit stop verb   |
//! | `Nudge`    | relative `delta` per tick    | same command, `stop` phase only   |
//! | `Trigger`  | one-shot verb, no phase      | same verb, `stop` phase only      |

use crate::capability::CapabilityTable;
use crate::packet::{CommandPacket, ControlRequest};
use crate::types::{Direction, Phase, Region, Selection, SubPart};
use crate::Result;

const WALK_RATE: f64 = 0.6;
const TURN_RATE: f64 = 0.4;
const ARMS_RATE: f64 = 0.5;
const HEAD_STEP: f64 = 0.05;

const LEVEL_HIGH: f64 = 1.0;
const LEVEL_LOW: f64 = 0.0;
const LEVEL_NEUTRAL: f64 = 0.5;

// ----------------------------------------------------------------------------
// Resolver Trait
// ----------------------------------------------------------------------------

/// Pure mapping from (selection, direction, phase) to a packet
pub trait CommandResolver: Send + Sync {
    /// Resolve a gesture phase, `None` when nothing may be transmitted
    fn resolve(&self, selection: Selection, direction: Direction, phase: Phase)
        -> Option<CommandPacket>;

    /// Resolve an operator request, validating its selection first
    fn resolve_request(&self, request: &ControlRequest) -> Result<Option<CommandPacket>> {
        let selection = request.selection()?;
        Ok(self.resolve(selection, request.direction, request.phase))
    }
}

// ----------------------------------------------------------------------------
// Command Families
// ----------------------------------------------------------------------------

/// How a command behaves across the phases of a held gesture
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandFamily {
    Setpoint {
        cmd: &'static str,
        level: f64,
        neutral: f64,
    },
    Motion {
        cmd: &'static str,
        rate: f64,
        stop: &'static str,
    },
    Nudge {
        cmd: &'static str,
        delta: f64,
    },
    Trigger {
        cmd: &'static str,
    },
}

impl CommandFamily {
    /// Short description of the stop rule, for operator listings
    pub fn stop_semantics(&self) -> &'static str {
        match self {
            CommandFamily::Setpoint { .. } => "neutral setpoint",
            CommandFamily::Motion { .. } => "explicit stop command",
            CommandFamily::Nudge { .. } | CommandFamily::Trigger { .. } => "cease repeating",
        }
    }

    pub fn cmd(&self) -> &'static str {
        match self {
            CommandFamily::Setpoint { cmd, .. }
            | CommandFamily::Motion { cmd, .. }
            | CommandFamily::Nudge { cmd, .. }
            | CommandFamily::Trigger { cmd } => cmd,
        }
    }

    fn packet(&self, selection: Selection, phase: Phase) -> CommandPacket {
        match (*self, phase) {
            (CommandFamily::Setpoint { cmd, neutral, .. }, Phase::Stop) => {
                CommandPacket::new(selection, cmd)
                    .with_phase(phase)
                    .with_level(neutral)
            }
            (CommandFamily::Setpoint { cmd, level, .. }, _) => CommandPacket::new(selection, cmd)
                .with_phase(phase)
                .with_level(level),
            (CommandFamily::Motion { stop, .. }, Phase::Stop) => {
                CommandPacket::new(selection, stop).with_phase(phase)
            }
            (CommandFamily::Motion { cmd, rate, .. }, _) => CommandPacket::new(selection, cmd)
                .with_phase(phase)
                .with_rate(rate),
            (CommandFamily::Nudge { cmd, .. }, Phase::Stop) => {
                CommandPacket::new(selection, cmd).with_phase(phase)
            }
            (CommandFamily::Nudge { cmd, delta }, _) => CommandPacket::new(selection, cmd)
                .with_phase(phase)
                .with_delta(delta),
            (CommandFamily::Trigger { cmd }, Phase::Stop) => {
                CommandPacket::new(selection, cmd).with_phase(phase)
            }
            // one-shot: start and hold repeat the identical packet
            (CommandFamily::Trigger { cmd }, _) => CommandPacket::new(selection, cmd),
        }
    }
}

fn setpoint(cmd: &'static str, level: f64) -> CommandFamily {
    CommandFamily::Setpoint {
        cmd,
        level,
        neutral: LEVEL_NEUTRAL,
    }
}

fn walk(cmd: &'static str, rate: f64) -> CommandFamily {
    CommandFamily::Motion {
        cmd,
        rate,
        stop: "rex_walk_stop",
    }
}

fn region_trigger(region: Region) -> CommandFamily {
    let cmd = match region {
        Region::HeadNeck => "rex_roar",
        Region::Arms => "rex_arms_wave",
        Region::TailSpine => "rex_tail_wag",
        Region::LegsPelvis => "rex_stomp",
    };
    CommandFamily::Trigger { cmd }
}

fn part_family(part: SubPart, direction: Direction) -> Option<CommandFamily> {
    use Direction::*;

    let family = match (part, direction) {
        (SubPart::Head, Up) => CommandFamily::Nudge {
            cmd: "rex_head_pitch",
            delta: HEAD_STEP,
        },
        (SubPart::Head, Down) => CommandFamily::Nudge {
            cmd: "rex_head_pitch",
            delta: -HEAD_STEP,
        },
        (SubPart::Head, Left) => CommandFamily::Nudge {
            cmd: "rex_head_yaw",
            delta: HEAD_STEP,
        },
        (SubPart::Head, Right) => CommandFamily::Nudge {
            cmd: "rex_head_yaw",
            delta: -HEAD_STEP,
        },
        (SubPart::Neck, Left) => setpoint("rex_neck_set", LEVEL_HIGH),
        (SubPart::Neck, Right) => setpoint("rex_neck_set", LEVEL_LOW),
        // jaw rests closed
        (SubPart::Jaw, Up) => CommandFamily::Setpoint {
            cmd: "rex_jaw_set",
            level: LEVEL_LOW,
            neutral: LEVEL_LOW,
        },
        (SubPart::Jaw, Down) => CommandFamily::Setpoint {
            cmd: "rex_jaw_set",
            level: LEVEL_HIGH,
            neutral: LEVEL_LOW,
        },
        (SubPart::Arms, Up) => CommandFamily::Motion {
            cmd: "rex_arms_raise",
            rate: ARMS_RATE,
            stop: "rex_arms_stop",
        },
        (SubPart::Arms, Down) => CommandFamily::Motion {
            cmd: "rex_arms_lower",
            rate: ARMS_RATE,
            stop: "rex_arms_stop",
        },
        (SubPart::Claws, Center) => CommandFamily::Trigger {
            cmd: "rex_claw_snap",
        },
        (SubPart::Tail, Left) => setpoint("rex_tail_set", LEVEL_HIGH),
        (SubPart::Tail, Right) => setpoint("rex_tail_set", LEVEL_LOW),
        (SubPart::Spine, Up) => setpoint("rex_spine_set", LEVEL_HIGH),
        (SubPart::Spine, Down) => setpoint("rex_spine_set", LEVEL_LOW),
        (SubPart::Legs, Up) => walk("rex_walk_forward", WALK_RATE),
        (SubPart::Legs, Down) => walk("rex_walk_backward", WALK_RATE),
        (SubPart::Legs, Left) => walk("rex_turn_left", TURN_RATE),
        (SubPart::Legs, Right) => walk("rex_turn_right", TURN_RATE),
        (SubPart::Pelvis, Left) => setpoint("rex_pelvis_set", LEVEL_HIGH),
        (SubPart::Pelvis, Right) => setpoint("rex_pelvis_set", LEVEL_LOW),
        _ => return None,
    };
    Some(family)
}

// ----------------------------------------------------------------------------
// Rex Resolver
// ----------------------------------------------------------------------------

/// Reference resolver for the rex animatronic
#[derive(Debug, Clone, Default)]
pub struct RexResolver {
    capabilities: CapabilityTable,
}

impl RexResolver {
    pub fn new(capabilities: CapabilityTable) -> Self {
        Self { capabilities }
    }

    pub fn capabilities(&self) -> &CapabilityTable {
        &self.capabilities
    }

    /// Command family behind a gesture, `None` when the table forbids it
    pub fn family(&self, selection: Selection, direction: Direction) -> Option<CommandFamily> {
        if !self.capabilities.permits(selection, direction) {
            return None;
        }
        match (selection.part(), direction) {
            (SubPart::Full, Direction::Center) => Some(region_trigger(selection.region())),
            (SubPart::Full, _) => part_family(selection.region().primary_part(), direction),
            (part, _) => part_family(part, direction),
        }
    }
}

impl CommandResolver for RexResolver {
    fn resolve(
        &self,
        selection: Selection,
        direction: Direction,
        phase: Phase,
    ) -> Option<CommandPacket> {
        self.family(selection, direction)
            .map(|family| family.packet(selection, phase))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(region: Region, part: SubPart) -> Selection {
        Selection::new(region, part).unwrap()
    }

    #[test]
    fn test_tail_setpoint_and_neutral_stop() {
        let resolver = RexResolver::default();
        let tail = select(Region::TailSpine, SubPart::Tail);

        let start = resolver.resolve(tail, Direction::Left, Phase::Start).unwrap();
        assert_eq!(start.cmd, "rex_tail_set");
        assert_eq!(start.level, Some(1.0));
        assert_eq!(start.phase, Some(Phase::Start));

        let right = resolver.resolve(tail, Direction::Right, Phase::Hold).unwrap();
        assert_eq!(right.level, Some(0.0));

        let stop = resolver.resolve(tail, Direction::Left, Phase::Stop).unwrap();
        assert_eq!(stop.cmd, "rex_tail_set");
        assert_eq!(stop.level, Some(0.5));
        assert_eq!(stop.phase, Some(Phase::Stop));
    }

    #[test]
    fn test_motion_stops_with_explicit_verb() {
        let resolver = RexResolver::default();
        let legs = select(Region::LegsPelvis, SubPart::Legs);

        let hold = resolver.resolve(legs, Direction::Up, Phase::Hold).unwrap();
        assert_eq!(hold.cmd, "rex_walk_forward");
        assert_eq!(hold.rate, Some(WALK_RATE));

        let stop = resolver.resolve(legs, Direction::Up, Phase::Stop).unwrap();
        assert_eq!(stop.cmd, "rex_walk_stop");
        assert_eq!(stop.rate, None);
    }

    #[test]
    fn test_trigger_repeats_identically() {
        let resolver = RexResolver::default();
        let claws = select(Region::Arms, SubPart::Claws);

        let start = resolver.resolve(claws, Direction::Center, Phase::Start).unwrap();
        let hold = resolver.resolve(claws, Direction::Center, Phase::Hold).unwrap();
        assert_eq!(start, hold);
        assert_eq!(start.phase, None);

        let stop = resolver.resolve(claws, Direction::Center, Phase::Stop).unwrap();
        assert_eq!(stop.cmd, "rex_claw_snap");
        assert_eq!(stop.phase, Some(Phase::Stop));
    }

    #[test]
    fn test_nudge_stop_carries_no_delta() {
        let resolver = RexResolver::default();
        let head = select(Region::HeadNeck, SubPart::Head);

        let down = resolver.resolve(head, Direction::Down, Phase::Start).unwrap();
        assert_eq!(down.delta, Some(-HEAD_STEP));
        let stop = resolver.resolve(head, Direction::Down, Phase::Stop).unwrap();
        assert_eq!(stop.delta, None);
    }

    #[test]
    fn test_forbidden_direction_resolves_to_none() {
        let resolver = RexResolver::default();
        let tail = select(Region::TailSpine, SubPart::Tail);
        for phase in [Phase::Start, Phase::Hold, Phase::Stop] {
            assert!(resolver.resolve(tail, Direction::Up, phase).is_none());
        }
    }

    #[test]
    fn test_full_part_borrows_primary_and_triggers_on_center() {
        let resolver = RexResolver::default();
        let full = Selection::full(Region::TailSpine);

        let left = resolver.resolve(full, Direction::Left, Phase::Start).unwrap();
        assert_eq!(left.cmd, "rex_tail_set");
        assert_eq!(left.part, SubPart::Full);

        let wag = resolver.resolve(full, Direction::Center, Phase::Start).unwrap();
        assert_eq!(wag.cmd, "rex_tail_wag");
    }

    #[test]
    fn test_every_permitted_gesture_resolves() {
        let resolver = RexResolver::default();
        for region in Region::ALL {
            for part in region.parts() {
                let selection = select(region, *part);
                for direction in Direction::ALL {
                    let permitted = resolver.capabilities().permits(selection, direction);
                    for phase in [Phase::Start, Phase::Hold, Phase::Stop] {
                        assert_eq!(
                            resolver.resolve(selection, direction, phase).is_some(),
                            permitted,
                            "{} {} {}",
                            selection,
                            direction,
                            phase
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_legacy_request_resolves_through_full() {
        let resolver = RexResolver::default();
        let request = crate::codec::parse_request(
            r#"{"target":"legsPelvis","direction":"up","phase":"start"}"#,
        )
        .unwrap();
        let packet = resolver.resolve_request(&request).unwrap().unwrap();
        assert_eq!(packet.cmd, "rex_walk_forward");
        assert_eq!(packet.part, SubPart::Full);
    }
}
