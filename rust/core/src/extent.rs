// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Running scene extent
//!
//! Axis-aligned bounding box accumulated over every vertex of every
//! mesh, in f64 precision. Used both for the render-ready scene output
//! and for deciding whether a model needs an RTC (Relative-to-Center)
//! shift to avoid Float32 precision loss with large coordinates
//! (e.g. Swiss UTM).

/// Running axis-aligned bounding box over a vertex stream.
///
/// Starts at the canonical empty sentinel: `+inf` minimums, `-inf`
/// maximums. Expansion uses exact IEEE comparison, no tolerance, so the
/// final extent is independent of accumulation order.
#[derive(Debug, Clone)]
pub struct SceneExtent {
    /// Minimum X coordinate observed
    pub min_x: f64,
    /// Minimum Y coordinate observed
    pub min_y: f64,
    /// Minimum Z coordinate observed
    pub min_z: f64,
    /// Maximum X coordinate observed
    pub max_x: f64,
    /// Maximum Y coordinate observed
    pub max_y: f64,
    /// Maximum Z coordinate observed
    pub max_z: f64,
    /// Number of vertices accumulated
    pub sample_count: usize,
}

impl SceneExtent {
    /// Create an extent at the empty sentinel.
    pub fn new() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            min_z: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
            max_z: f64::NEG_INFINITY,
            sample_count: 0,
        }
    }

    /// Check whether at least one vertex has been observed.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.sample_count > 0
    }

    /// Expand the extent to include a vertex.
    #[inline]
    pub fn expand(&mut self, x: f64, y: f64, z: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.min_z = self.min_z.min(z);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        self.max_z = self.max_z.max(z);
        self.sample_count += 1;
    }

    /// The extent as `[minx, miny, maxx, maxy, minz, maxz]`, the shape
    /// consumed by the rendering collaborator. Empty extents keep the
    /// infinity sentinel rather than degrading to NaN.
    #[inline]
    pub fn extent(&self) -> [f64; 6] {
        [
            self.min_x, self.min_y, self.max_x, self.max_y, self.min_z, self.max_z,
        ]
    }

    /// Midpoint of the box per axis. Meaningful only once a vertex has
    /// been observed.
    #[inline]
    pub fn center(&self) -> [f64; 3] {
        [
            self.min_x + (self.max_x - self.min_x) / 2.0,
            self.min_y + (self.max_y - self.min_y) / 2.0,
            self.min_z + (self.max_z - self.min_z) / 2.0,
        ]
    }

    /// Per-axis span, `max - min`.
    #[inline]
    pub fn size(&self) -> [f64; 3] {
        [
            self.max_x - self.min_x,
            self.max_y - self.min_y,
            self.max_z - self.min_z,
        ]
    }

    /// Check if the extent reaches large coordinates (>10km from origin).
    #[inline]
    pub fn has_large_coordinates(&self) -> bool {
        const THRESHOLD: f64 = 10000.0; // 10km
        if !self.is_valid() {
            return false;
        }
        self.min_x.abs() > THRESHOLD
            || self.min_y.abs() > THRESHOLD
            || self.max_x.abs() > THRESHOLD
            || self.max_y.abs() > THRESHOLD
            || self.min_z.abs() > THRESHOLD
            || self.max_z.abs() > THRESHOLD
    }

    /// RTC offset for Float32-friendly rendering: the box center when
    /// the model sits at large coordinates, zero otherwise.
    #[inline]
    pub fn rtc_offset(&self) -> [f64; 3] {
        if self.has_large_coordinates() {
            self.center()
        } else {
            [0.0, 0.0, 0.0]
        }
    }
}

impl Default for SceneExtent {
    fn default() -> Self {
        Self::new()
    }
}
