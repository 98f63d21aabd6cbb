//! Registered fields and their traversal progress

use tracing::{debug, info};

use crate::geometry::Region;
use crate::segment::{segment_for_harvest, segment_for_planting, Granularity, Segment};

/// A region designated for crop work plus its per-pass cursor
#[derive(Debug, Clone)]
pub struct Field {
    index: usize,
    region: Region,
    harvest_segments: Option<Vec<Segment>>,
    planting_segments: Option<Vec<Segment>>,
    cursor: usize,
}

impl Field {
    pub fn new(index: usize, region: Region) -> Self {
        Self {
            index,
            region,
            harvest_segments: None,
            planting_segments: None,
            cursor: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn is_activated(&self) -> bool {
        self.harvest_segments.is_some() && self.planting_segments.is_some()
    }

    /// Compute both segment lists if they are not cached yet.
    ///
    /// Returns `true` when this call did the work.
    pub fn activate(&mut self) -> bool {
        if self.is_activated() {
            return false;
        }

        let harvest = segment_for_harvest(&self.region);
        let planting = segment_for_planting(&self.region);
        debug!(
            "Field {} activated: {} harvest bands, {} planting bands",
            self.index,
            harvest.len(),
            planting.len()
        );
        self.harvest_segments = Some(harvest);
        self.planting_segments = Some(planting);
        true
    }

    /// Segments for a pass; empty until the field is activated
    pub fn segments(&self, granularity: Granularity) -> &[Segment] {
        let cached = match granularity {
            Granularity::Harvest => &self.harvest_segments,
            Granularity::Planting => &self.planting_segments,
        };
        cached.as_deref().unwrap_or(&[])
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Segment under the cursor, `None` once the pass is complete
    pub fn current_segment(&self, granularity: Granularity) -> Option<Segment> {
        self.segments(granularity).get(self.cursor).copied()
    }

    pub fn is_pass_complete(&self, granularity: Granularity) -> bool {
        self.cursor >= self.segments(granularity).len()
    }

    /// Move past the current segment, never beyond the end of the list
    pub fn advance(&mut self, granularity: Granularity) -> usize {
        let len = self.segments(granularity).len();
        if self.cursor < len {
            self.cursor += 1;
        }
        self.cursor
    }

    pub fn reset_cursor(&mut self) {
        self.cursor = 0;
    }
}

/// All fields the operator registered, in registration order
#[derive(Debug, Default)]
pub struct FieldRegistry {
    fields: Vec<Field>,
    epoch: u64,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, returning its index
    pub fn register(&mut self, region: Region) -> usize {
        let index = self.fields.len();
        info!("Area selected: {}x{}", region.tile_width(), region.tile_height());
        self.fields.push(Field::new(index, region));
        index
    }

    /// Drop every field; bumps the epoch so running workers notice
    pub fn clear(&mut self) {
        self.fields.clear();
        self.epoch += 1;
    }

    /// Incremented on every reset
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn get(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Field> {
        self.fields.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
