//! Lane assignment for commit graphs.
//!
//! Commits are consumed in listing order (newest first, topologically
//! consistent) with no lookahead. Each lane slot remembers which commit hash it
//! is waiting for; a commit takes over the slot that waits for it, or the
//! lowest free slot when nobody does. The connector segments of each row are
//! derived from the slot occupancy before and after the commit, so row `i`'s
//! down segments always end on exactly the lanes row `i + 1`'s up segments
//! start from.

use std::collections::BTreeMap;

use gitlane_core::types::Commit;
use serde::{Deserialize, Serialize};

use crate::palette::Palette;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub from_lane: usize,
    pub to_lane: usize,
    pub color: String,
    /// Merge fan-out from the node towards an extra parent's lane.
    #[serde(default)]
    pub curve: bool,
}

impl Segment {
    fn straight(from_lane: usize, to_lane: usize, color: String) -> Self {
        Self {
            from_lane,
            to_lane,
            color,
            curve: false,
        }
    }

    fn merge_curve(from_lane: usize, to_lane: usize, color: String) -> Self {
        Self {
            from_lane,
            to_lane,
            color,
            curve: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneAssignment {
    pub lane: usize,
    pub color: String,
    /// Connectors above the node: previous row's occupancy into this row.
    pub up_segments: Vec<Segment>,
    /// Connectors below the node: this row into the next row's occupancy.
    pub down_segments: Vec<Segment>,
    /// Widest lane index seen; uniform across rows when produced by [`assign_lanes`].
    pub max_lane: usize,
}

/// Lane state for one traversal of one commit listing.
///
/// Create a fresh assigner per listing; state is never shared between
/// listings or repositories.
#[derive(Debug, Clone, Default)]
pub struct LaneAssigner {
    palette: Palette,
    active_lanes: Vec<Option<String>>,
    lane_colors: BTreeMap<usize, String>,
    max_lane: usize,
}

impl LaneAssigner {
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            active_lanes: Vec::new(),
            lane_colors: BTreeMap::new(),
            max_lane: 0,
        }
    }

    /// Hash each lane is currently waiting for; `None` marks a free slot.
    pub fn active_lanes(&self) -> &[Option<String>] {
        &self.active_lanes
    }

    pub fn max_lane(&self) -> usize {
        self.max_lane
    }

    pub fn process_next(&mut self, commit: &Commit) -> LaneAssignment {
        let hash = commit.hash.as_str();
        let prev_lanes = self.active_lanes.clone();

        // A commit nobody is waiting for (a branch tip, or a child hidden by a
        // filter) starts a fresh lane exactly like a root would.
        let lane = match lane_of(&self.active_lanes, hash) {
            Some(lane) => lane,
            None => claim_slot(&mut self.active_lanes, hash),
        };
        let color = self.ensure_color(lane);

        let mut up_segments = Vec::new();
        for (idx, occupant) in prev_lanes.iter().enumerate() {
            let Some(occupant) = occupant.as_deref() else {
                continue;
            };
            if occupant == hash {
                let incoming = self.lane_colors.get(&idx).cloned().unwrap_or(color.clone());
                up_segments.push(Segment::straight(idx, lane, incoming));
            } else {
                up_segments.push(Segment::straight(idx, idx, self.color_of(idx)));
            }
        }

        let mut next_lanes = self.active_lanes.clone();
        // First-parent convergence edges (from, to) when the first parent was
        // already awaited by another lane.
        let mut converge: Option<(usize, usize)> = None;

        match commit.parents.split_first() {
            None => next_lanes[lane] = None,
            Some((first, extra)) => {
                // The lane giving up the first parent is vacated only after the
                // extra parents are placed, so none of them lands in it.
                let mut vacate = None;
                match lane_of(&next_lanes, first) {
                    Some(existing) if existing < lane => {
                        vacate = Some(lane);
                        converge = Some((lane, existing));
                    }
                    Some(existing) if existing > lane => {
                        vacate = Some(existing);
                        next_lanes[lane] = Some(first.clone());
                        converge = Some((existing, lane));
                    }
                    _ => next_lanes[lane] = Some(first.clone()),
                }

                for parent in extra {
                    if parent == first || lane_of(&next_lanes, parent).is_some() {
                        continue;
                    }
                    let slot = claim_slot(&mut next_lanes, parent);
                    self.ensure_color(slot);
                }

                if let Some(idx) = vacate {
                    next_lanes[idx] = None;
                }
            }
        }

        while matches!(next_lanes.last(), Some(None)) {
            next_lanes.pop();
        }

        let mut down_segments = Vec::new();
        for (idx, occupant) in next_lanes.iter().enumerate() {
            if occupant.is_none() {
                continue;
            }
            if idx == lane {
                down_segments.push(Segment::straight(lane, idx, self.color_of(idx)));
            } else {
                down_segments.push(Segment::straight(idx, idx, self.color_of(idx)));
            }
        }

        if let Some((from, to)) = converge {
            down_segments.push(Segment::straight(from, to, self.color_of(from)));
        }

        let mut fanned_out: Vec<&str> = Vec::new();
        for parent in commit.parents.iter().skip(1) {
            if commit.parents.first() == Some(parent) || fanned_out.contains(&parent.as_str()) {
                continue;
            }
            fanned_out.push(parent);
            if let Some(parent_lane) = lane_of(&next_lanes, parent) {
                down_segments.push(Segment::merge_curve(lane, parent_lane, color.clone()));
            }
        }

        let widest = lane.max(next_lanes.len().saturating_sub(1));
        self.max_lane = self.max_lane.max(widest);
        self.active_lanes = next_lanes;

        LaneAssignment {
            lane,
            color,
            up_segments,
            down_segments,
            max_lane: self.max_lane,
        }
    }

    /// Colour of `lane`, fixed the first time the lane index is used.
    fn ensure_color(&mut self, lane: usize) -> String {
        let palette = &self.palette;
        self.lane_colors
            .entry(lane)
            .or_insert_with(|| palette.color_for_lane(lane).to_string())
            .clone()
    }

    fn color_of(&self, lane: usize) -> String {
        match self.lane_colors.get(&lane) {
            Some(color) => color.clone(),
            None => self.palette.color_for_lane(lane).to_string(),
        }
    }
}

/// Runs a fresh [`LaneAssigner`] over `commits` and stamps the overall
/// maximum lane on every row.
pub fn assign_lanes(commits: &[Commit], palette: Palette) -> Vec<LaneAssignment> {
    let mut assigner = LaneAssigner::new(palette);
    let mut rows = commits
        .iter()
        .map(|commit| assigner.process_next(commit))
        .collect::<Vec<_>>();

    let max_lane = assigner.max_lane();
    for row in &mut rows {
        row.max_lane = max_lane;
    }
    rows
}

/// Number of lane columns a renderer should draw when clamping to `cap`.
pub fn visible_lane_count(max_lane: usize, cap: usize) -> usize {
    if cap == 0 {
        return 0;
    }
    max_lane.min(cap - 1) + 1
}

fn lane_of(lanes: &[Option<String>], hash: &str) -> Option<usize> {
    lanes
        .iter()
        .position(|occupant| occupant.as_deref() == Some(hash))
}

/// Lowest free slot, or a new slot at the end.
fn claim_slot(lanes: &mut Vec<Option<String>>, hash: &str) -> usize {
    match lanes.iter().position(Option::is_none) {
        Some(idx) => {
            lanes[idx] = Some(hash.to_string());
            idx
        }
        None => {
            lanes.push(Some(hash.to_string()));
            lanes.len() - 1
        }
    }
}
