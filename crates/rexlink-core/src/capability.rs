//! Static direction validity per (region, sub-part)

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::types::{Direction, Region, Selection, SubPart};

/// Directions valid for one selection (at most five)
pub type DirectionSet = SmallVec<[Direction; 5]>;

// ----------------------------------------------------------------------------
// Capability Table
// ----------------------------------------------------------------------------

/// Read-only matrix of directions per (region, sub-part)
#[derive(Debug, Clone)]
pub struct CapabilityTable {
    entries: HashMap<(Region, SubPart), DirectionSet>,
}

impl CapabilityTable {
    /// Build a table from explicit entries; duplicates are merged
    pub fn from_entries<I, D>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Region, SubPart, D)>,
        D: IntoIterator<Item = Direction>,
    {
        let mut map: HashMap<(Region, SubPart), DirectionSet> = HashMap::new();
        for (region, part, directions) in entries {
            let set = map.entry((region, part)).or_default();
            for direction in directions {
                if !set.contains(&direction) {
                    set.push(direction);
                }
            }
        }
        for set in map.values_mut() {
            set.sort();
        }
        Self { entries: map }
    }

    /// Reference table for the rex animatronic
    pub fn rex() -> Self {
        use Direction::*;

        Self::from_entries([
            (Region::HeadNeck, SubPart::Head, vec![Up, Down, Left, Right]),
            (Region::HeadNeck, SubPart::Neck, vec![Left, Right]),
            (Region::HeadNeck, SubPart::Jaw, vec![Up, Down]),
            (Region::HeadNeck, SubPart::Full, vec![Up, Down, Left, Right, Center]),
            (Region::Arms, SubPart::Arms, vec![Up, Down]),
            (Region::Arms, SubPart::Claws, vec![Center]),
            (Region::Arms, SubPart::Full, vec![Up, Down, Center]),
            (Region::TailSpine, SubPart::Tail, vec![Left, Right]),
            (Region::TailSpine, SubPart::Spine, vec![Up, Down]),
            (Region::TailSpine, SubPart::Full, vec![Left, Right, Center]),
            (Region::LegsPelvis, SubPart::Legs, vec![Up, Down, Left, Right]),
            (Region::LegsPelvis, SubPart::Pelvis, vec![Left, Right]),
            (Region::LegsPelvis, SubPart::Full, vec![Up, Down, Left, Right, Center]),
        ])
    }

    pub fn permits(&self, selection: Selection, direction: Direction) -> bool {
        self.entries
            .get(&(selection.region(), selection.part()))
            .is_some_and(|set| set.contains(&direction))
    }

    /// Valid directions for a selection, empty when the selection is unknown
    pub fn directions(&self, selection: Selection) -> &[Direction] {
        self.entries
            .get(&(selection.region(), selection.part()))
            .map(|set| set.as_slice())
            .unwrap_or(&[])
    }
}

impl Default for CapabilityTable {
    fn default() -> Self {
        Self::rex()
    }
}
