//! Overlay records: patches and splines
//!
//! Overlays are provided by the caller; the encoder serializes them after
//! the main frame payload and the decoder applies them on top of the
//! reconstructed frame. Auto-detection is out of scope.

use crate::consts::{
    MAX_SPLINE_COORD, MAX_SPLINE_POINTS, MIN_SPLINE_POINTS, SPLINE_DCT_LEN,
};
use crate::{Error, Result};

/// A rectangle copied from a reference frame slot into the current frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Patch {
    pub dest_x: u32,
    pub dest_y: u32,
    pub width: u32,
    pub height: u32,
    /// Reference slot index, 1 through 4
    pub reference_index: u8,
    pub source_x: u32,
    pub source_y: u32,
    /// Similarity score recorded by the caller, not serialized
    pub similarity: f32,
}

impl Patch {
    pub fn validate(&self, frame_w: u32, frame_h: u32) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::invalid("patch with zero extent"));
        }
        if !(1..=4).contains(&self.reference_index) {
            return Err(Error::invalid(format!(
                "patch reference index {} out of [1,4]",
                self.reference_index
            )));
        }
        if self.dest_x + self.width > frame_w || self.dest_y + self.height > frame_h {
            return Err(Error::invalid("patch destination exceeds frame bounds"));
        }
        if self.source_x + self.width > frame_w || self.source_y + self.height > frame_h {
            return Err(Error::invalid("patch source exceeds reference bounds"));
        }
        Ok(())
    }

    fn overlaps(&self, other: &Patch) -> bool {
        self.dest_x < other.dest_x + other.width
            && other.dest_x < self.dest_x + self.width
            && self.dest_y < other.dest_y + other.height
            && other.dest_y < self.dest_y + self.height
    }

    /// Try to fuse with a horizontally adjacent patch sharing the same
    /// reference slot and identical y-range in both source and destination.
    fn fuse_horizontal(&self, other: &Patch) -> Option<Patch> {
        if self.reference_index != other.reference_index
            || self.dest_y != other.dest_y
            || self.source_y != other.source_y
            || self.height != other.height
        {
            return None;
        }
        let (left, right) = if self.dest_x <= other.dest_x {
            (self, other)
        } else {
            (other, self)
        };
        if left.dest_x + left.width == right.dest_x
            && left.source_x + left.width == right.source_x
        {
            return Some(Patch {
                width: left.width + right.width,
                similarity: left.similarity.min(right.similarity),
                ..*left
            });
        }
        None
    }

    /// Vertical counterpart of `fuse_horizontal` (identical x-ranges).
    fn fuse_vertical(&self, other: &Patch) -> Option<Patch> {
        if self.reference_index != other.reference_index
            || self.dest_x != other.dest_x
            || self.source_x != other.source_x
            || self.width != other.width
        {
            return None;
        }
        let (top, bottom) = if self.dest_y <= other.dest_y {
            (self, other)
        } else {
            (other, self)
        };
        if top.dest_y + top.height == bottom.dest_y
            && top.source_y + top.height == bottom.source_y
        {
            return Some(Patch {
                height: top.height + bottom.height,
                similarity: top.similarity.min(bottom.similarity),
                ..*top
            });
        }
        None
    }
}

/// Fuse edge-adjacent patches until no fusion applies, then reject any
/// remaining overlap within the frame.
pub fn merge_patches(patches: &[Patch]) -> Result<Vec<Patch>> {
    let mut merged: Vec<Patch> = patches.to_vec();
    loop {
        let mut fused = None;
        'search: for i in 0..merged.len() {
            for j in (i + 1)..merged.len() {
                let pair = merged[i]
                    .fuse_horizontal(&merged[j])
                    .or_else(|| merged[i].fuse_vertical(&merged[j]));
                if let Some(p) = pair {
                    fused = Some((i, j, p));
                    break 'search;
                }
            }
        }
        match fused {
            Some((i, j, p)) => {
                merged.remove(j);
                merged[i] = p;
            }
            None => break,
        }
    }
    for i in 0..merged.len() {
        for j in (i + 1)..merged.len() {
            if merged[i].overlaps(&merged[j]) {
                return Err(Error::invalid(format!(
                    "patches {} and {} overlap after merging",
                    i, j
                )));
            }
        }
    }
    Ok(merged)
}

/// A spline overlay: control polygon plus color and width profiles as
/// 32-entry DCT coefficient arrays along the curve.
#[derive(Debug, Clone, PartialEq)]
pub struct Spline {
    /// Absolute control point coordinates
    pub points: Vec<(i32, i32)>,
    /// Color profiles along the curve, one per opponent channel
    pub color_dct: [[i32; SPLINE_DCT_LEN]; 3],
    /// Width profile along the curve
    pub sigma_dct: [i32; SPLINE_DCT_LEN],
}

impl Spline {
    pub fn validate(&self) -> Result<()> {
        if self.points.len() < MIN_SPLINE_POINTS {
            return Err(Error::invalid(format!(
                "spline needs at least {} control points, got {}",
                MIN_SPLINE_POINTS,
                self.points.len()
            )));
        }
        if self.points.len() > MAX_SPLINE_POINTS {
            return Err(Error::invalid(format!(
                "spline has {} control points, limit is {}",
                self.points.len(),
                MAX_SPLINE_POINTS
            )));
        }
        for &(x, y) in &self.points {
            if (x as i64).abs() >= MAX_SPLINE_COORD || (y as i64).abs() >= MAX_SPLINE_COORD {
                return Err(Error::invalid(format!(
                    "spline coordinate ({}, {}) out of range",
                    x, y
                )));
            }
        }
        Ok(())
    }
}
