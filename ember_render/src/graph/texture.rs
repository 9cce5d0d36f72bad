use glam::UVec2;

use crate::backend::{
    ImageFormat, ImageSettings, ImageTiling, ImageUsages, SampleCount, ShaderStages,
};

/// Identifies a declared virtual or imported texture.
///
/// Handles are dense indices; they stay valid for the lifetime of the
/// builder that issued them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(u32);

impl TextureHandle {
    /// The reserved sentinel; never returned by a builder.
    pub const INVALID: Self = Self(u32::MAX);

    pub(crate) fn new(index: usize) -> Self {
        debug_assert!(index < u32::MAX as usize);
        Self(index as u32)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

/// Immutable description of a virtual texture.
///
/// `usages` lists the usages declared up front; the builder extends
/// them with whatever the declared passes actually do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureSettings {
    pub size: UVec2,
    pub format: ImageFormat,
    pub mip_levels: u32,
    pub samples: SampleCount,
    pub tiling: ImageTiling,
    pub usages: ImageUsages,
}

impl TextureSettings {
    pub fn new(size: UVec2, format: ImageFormat) -> Self {
        Self {
            size,
            format,
            mip_levels: 1,
            samples: SampleCount::default(),
            tiling: ImageTiling::default(),
            usages: ImageUsages::empty(),
        }
    }

    /// Shape equality: everything except the usage flags.
    pub(crate) fn same_shape(&self, other: &Self) -> bool {
        self.size == other.size
            && self.format == other.format
            && self.mip_levels == other.mip_levels
            && self.samples == other.samples
            && self.tiling == other.tiling
    }

    pub(crate) fn image_settings(&self) -> ImageSettings {
        ImageSettings {
            size: self.size,
            format: self.format,
            mip_levels: self.mip_levels,
            samples: self.samples,
            tiling: self.tiling,
            usages: self.usages,
        }
    }
}

/// An inclusive range of live-pass indices.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct PassRange {
    pub first: usize,
    pub last: usize,
}

impl PassRange {
    pub const INVALID: Self = Self {
        first: usize::MAX,
        last: usize::MAX,
    };

    pub fn is_valid(&self) -> bool {
        self.first != usize::MAX
    }

    pub fn contains(&self, index: usize) -> bool {
        self.is_valid() && self.first <= index && index <= self.last
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        other.contains(self.first)
            || other.contains(self.last)
            || self.contains(other.first)
            || self.contains(other.last)
    }

    /// Grows the range to include `index`.
    pub fn extend(&mut self, index: usize) {
        if !self.is_valid() {
            *self = Self {
                first: index,
                last: index,
            };
        } else {
            self.first = self.first.min(index);
            self.last = self.last.max(index);
        }
    }

    pub fn union(mut self, other: Self) -> Self {
        if !other.is_valid() {
            return self;
        }
        if !self.is_valid() {
            return other;
        }
        self.first = self.first.min(other.first);
        self.last = self.last.max(other.last);
        self
    }
}

/// How one pass uses one texture.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum TextureUse {
    Sampled(ShaderStages),
    Input,
    ColorOutput { cleared: bool },
    DepthStencil { cleared: bool },
}

/// Per-texture usage record over one ordered pass list.
///
/// All pass indices refer to positions in the list the record was
/// collected from (declaration order before culling, live order
/// after).
#[derive(Clone, Debug)]
pub(crate) struct TextureData {
    pub handle: TextureHandle,
    pub used: bool,
    pub imported: bool,
    pub final_output: bool,
    pub sampled: Vec<(usize, ShaderStages)>,
    pub input: Vec<usize>,
    pub output: Vec<usize>,
    pub depth: Vec<usize>,
    pub clear: Vec<usize>,
    pub read_range: PassRange,
    pub write_range: PassRange,
    pub use_range: PassRange,
    /// Usage flags aggregated from every declared use.
    pub usages: ImageUsages,
    /// Physical texture this handle was aliased into.
    pub physical: Option<usize>,
}

impl TextureData {
    pub fn new(handle: TextureHandle) -> Self {
        Self {
            handle,
            used: false,
            imported: false,
            final_output: false,
            sampled: Vec::new(),
            input: Vec::new(),
            output: Vec::new(),
            depth: Vec::new(),
            clear: Vec::new(),
            read_range: PassRange::INVALID,
            write_range: PassRange::INVALID,
            use_range: PassRange::INVALID,
            usages: ImageUsages::empty(),
            physical: None,
        }
    }

    pub fn reads_at(&self, index: usize) -> bool {
        self.sampled.iter().any(|(i, _)| *i == index)
            || self.input.contains(&index)
            // A depth attachment that is not cleared loads the
            // previous contents.
            || (self.depth.contains(&index) && !self.clear.contains(&index))
    }

    pub fn writes_at(&self, index: usize) -> bool {
        self.output.contains(&index) || self.depth.contains(&index) || self.clear.contains(&index)
    }

    pub fn read_after(&self, index: usize) -> bool {
        self.sampled.iter().any(|(i, _)| *i > index)
            || self.input.iter().any(|i| *i > index)
            || self
                .depth
                .iter()
                .any(|i| *i > index && !self.clear.contains(i))
    }

    pub fn written_before(&self, index: usize) -> bool {
        self.output.iter().any(|i| *i < index)
            || self.depth.iter().any(|i| *i < index)
            || self.clear.iter().any(|i| *i < index)
    }

    /// The latest pass before `index` writing this texture.
    pub fn last_write_before(&self, index: usize) -> Option<usize> {
        self.output
            .iter()
            .chain(&self.depth)
            .chain(&self.clear)
            .copied()
            .filter(|i| *i < index)
            .max()
    }

    /// The latest pass writing this texture, `index` excluded.
    pub fn last_write(&self, exclude: usize) -> Option<usize> {
        self.output
            .iter()
            .chain(&self.depth)
            .chain(&self.clear)
            .copied()
            .filter(|i| *i != exclude)
            .max()
    }

    /// How pass `index` uses this texture, if at all.
    ///
    /// A handle appears in at most one category per pass, enforced at
    /// declaration time.
    pub fn usage_at(&self, index: usize) -> Option<TextureUse> {
        if let Some((_, stages)) = self.sampled.iter().find(|(i, _)| *i == index) {
            return Some(TextureUse::Sampled(*stages));
        }

        if self.input.contains(&index) {
            return Some(TextureUse::Input);
        }

        let cleared = self.clear.contains(&index);

        if self.output.contains(&index) {
            return Some(TextureUse::ColorOutput { cleared });
        }

        if self.depth.contains(&index) {
            return Some(TextureUse::DepthStencil { cleared });
        }

        None
    }

    pub fn update_ranges(&mut self) {
        let mut read = PassRange::INVALID;
        for (index, _) in &self.sampled {
            read.extend(*index);
        }
        for index in &self.input {
            read.extend(*index);
        }
        for index in &self.depth {
            if !self.clear.contains(index) {
                read.extend(*index);
            }
        }

        let mut write = PassRange::INVALID;
        for index in self.output.iter().chain(&self.depth).chain(&self.clear) {
            write.extend(*index);
        }

        self.read_range = read;
        self.write_range = write;
        self.use_range = read.union(write);
    }
}

#[cfg(test)]
mod tests {
    use super::PassRange;

    #[test]
    fn range_overlap_is_symmetric() {
        let a = PassRange { first: 0, last: 2 };
        let b = PassRange { first: 2, last: 5 };
        let c = PassRange { first: 3, last: 4 };

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(b.overlaps(&c));
    }

    #[test]
    fn invalid_range_contains_nothing() {
        assert!(!PassRange::INVALID.contains(0));
        assert!(!PassRange::INVALID.overlaps(&PassRange { first: 0, last: 9 }));
    }

    #[test]
    fn extend_grows_in_both_directions() {
        let mut range = PassRange::INVALID;
        range.extend(3);
        assert_eq!(range, PassRange { first: 3, last: 3 });
        range.extend(1);
        range.extend(5);
        assert_eq!(range, PassRange { first: 1, last: 5 });
    }
}
