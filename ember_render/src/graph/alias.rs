//! Transient-texture aliasing.
//!
//! Live textures are partitioned into physical slots by greedy
//! interval coloring: two textures may share one backing image iff
//! neither is imported, their live pass-ranges never overlap and their
//! image settings agree (with the newcomer's usages covered by the
//! slot's).

use super::texture::{PassRange, TextureData, TextureHandle, TextureSettings};

#[derive(Clone, Debug)]
pub(crate) struct PhysicalTextureAlias {
    pub handle: TextureHandle,
    pub imported: bool,
    /// Pinned: imported images are externally owned; the frame output
    /// outlives the frame on its way to presentation.
    pub pinned: bool,
    pub settings: TextureSettings,
    pub range: PassRange,
}

/// One backing image and the handles inhabiting it, in pass-range
/// order.
#[derive(Clone, Debug)]
pub(crate) struct PhysicalSlot {
    pub imported: bool,
    pub pinned: bool,
    pub settings: TextureSettings,
    pub members: Vec<(TextureHandle, PassRange)>,
}

impl PhysicalSlot {
    fn new(alias: &PhysicalTextureAlias) -> Self {
        Self {
            imported: alias.imported,
            pinned: alias.pinned,
            settings: alias.settings.clone(),
            members: vec![(alias.handle, alias.range)],
        }
    }

    fn accepts(&self, alias: &PhysicalTextureAlias) -> bool {
        if self.pinned || alias.pinned {
            return false;
        }

        if self.members.iter().any(|(_, range)| alias.range.overlaps(range)) {
            return false;
        }

        self.settings.same_shape(&alias.settings)
            && self.settings.usages.contains(alias.settings.usages)
    }

    fn insert(&mut self, alias: &PhysicalTextureAlias) {
        debug_assert!(self.accepts(alias), "incompatible alias");

        let position = self
            .members
            .iter()
            .position(|(_, range)| range.first > alias.range.first)
            .unwrap_or(self.members.len());
        self.members.insert(position, (alias.handle, alias.range));
    }
}

/// Assigns every live texture to a physical slot and records the
/// assignment in `datas`.
pub(crate) fn allocate(
    datas: &mut [TextureData],
    settings: &[TextureSettings],
) -> Vec<PhysicalSlot> {
    let mut aliases: Vec<PhysicalTextureAlias> = datas
        .iter()
        .filter(|data| data.used && data.use_range.is_valid())
        .map(|data| {
            let mut settings = settings[data.handle.index()].clone();
            settings.usages |= data.usages;

            PhysicalTextureAlias {
                handle: data.handle,
                imported: data.imported,
                pinned: data.imported || data.final_output,
                settings,
                range: data.use_range,
            }
        })
        .collect();

    // Earliest first; on equal start prefer the alias with the
    // stricter usage set so it seeds the slot others fold into.
    aliases.sort_by(|a, b| {
        (a.range.first, a.range.last)
            .cmp(&(b.range.first, b.range.last))
            .then_with(|| {
                b.settings
                    .usages
                    .bits()
                    .count_ones()
                    .cmp(&a.settings.usages.bits().count_ones())
            })
    });

    let mut slots: Vec<PhysicalSlot> = Vec::new();

    for alias in &aliases {
        let slot = slots.iter_mut().position(|slot| slot.accepts(alias));

        let index = match slot {
            Some(index) => {
                slots[index].insert(alias);
                index
            }
            None => {
                slots.push(PhysicalSlot::new(alias));
                slots.len() - 1
            }
        };

        datas[alias.handle.index()].physical = Some(index);
        tracing::debug!(
            handle = ?alias.handle,
            slot = index,
            range = ?alias.range,
            "assigned physical texture",
        );
    }

    debug_assert!(slots.iter().all(slot_ranges_disjoint));

    slots
}

fn slot_ranges_disjoint(slot: &PhysicalSlot) -> bool {
    for (i, (_, a)) in slot.members.iter().enumerate() {
        for (_, b) in &slot.members[i + 1..] {
            if a.overlaps(b) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use glam::UVec2;

    use crate::backend::{ImageFormat, ImageUsages};
    use crate::graph::texture::{PassRange, TextureData, TextureHandle, TextureSettings};

    use super::allocate;

    fn settings() -> TextureSettings {
        let mut settings = TextureSettings::new(UVec2::new(256, 256), ImageFormat::Rgba8Unorm);
        settings.usages = ImageUsages::RENDER_TARGET | ImageUsages::SHADER_SAMPLING;
        settings
    }

    fn data(handle: u32, first: usize, last: usize) -> TextureData {
        let mut data = TextureData::new(TextureHandle::new(handle as usize));
        data.used = true;
        data.use_range = PassRange { first, last };
        data.usages = ImageUsages::RENDER_TARGET;
        data
    }

    #[test]
    fn disjoint_ranges_share_a_slot() {
        let settings = vec![settings(), settings()];
        let mut datas = vec![data(0, 0, 1), data(1, 2, 3)];

        let slots = allocate(&mut datas, &settings);
        assert_eq!(slots.len(), 1);
        assert_eq!(datas[0].physical, Some(0));
        assert_eq!(datas[1].physical, Some(0));
    }

    #[test]
    fn overlapping_ranges_get_distinct_slots() {
        let settings = vec![settings(), settings()];
        let mut datas = vec![data(0, 0, 2), data(1, 1, 3)];

        let slots = allocate(&mut datas, &settings);
        assert_eq!(slots.len(), 2);
        assert_ne!(datas[0].physical, datas[1].physical);
    }

    #[test]
    fn shape_mismatch_prevents_aliasing() {
        let mut other = settings();
        other.size = UVec2::new(128, 128);

        let settings = vec![settings(), other];
        let mut datas = vec![data(0, 0, 1), data(1, 2, 3)];

        let slots = allocate(&mut datas, &settings);
        assert_eq!(slots.len(), 2);
    }

    #[test]
    fn imported_textures_are_never_shared() {
        let settings = vec![settings(), settings()];
        let mut datas = vec![data(0, 0, 1), data(1, 2, 3)];
        datas[0].imported = true;

        let slots = allocate(&mut datas, &settings);
        assert_eq!(slots.len(), 2);
        assert!(slots[datas[0].physical.unwrap()].imported);
        assert_eq!(slots[datas[0].physical.unwrap()].members.len(), 1);
    }

    #[test]
    fn usages_outside_the_slot_prevent_aliasing() {
        let mut restricted = settings();
        restricted.usages = ImageUsages::RENDER_TARGET;

        let settings = vec![restricted, settings()];
        let mut datas = vec![data(0, 0, 1), data(1, 2, 3)];
        datas[1].usages |= ImageUsages::SHADER_SAMPLING;

        let slots = allocate(&mut datas, &settings);
        assert_eq!(slots.len(), 2);
    }
}
