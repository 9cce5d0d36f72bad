//! Barrier planning.
//!
//! For every physical texture the planner walks the live passes in
//! order, tracking the layout, pipeline stages and access mask the
//! image currently holds, and emits the minimum set of image barriers
//! so that each pass finds the image in the state its declared usage
//! requires. Barriers are issued at pass boundaries, never inside a
//! render scope.

use crate::backend::{ImageBarrier, ImageLayout, MemoryAccesses, PipelineStages};

use super::alias::PhysicalSlot;
use super::texture::{TextureData, TextureHandle, TextureUse};

/// A planned barrier, owned by the physical texture it applies to and
/// consumed in execution order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TextureBarrier {
    /// The barrier is issued immediately before this live pass.
    pub before_pass: usize,
    pub barrier: ImageBarrier,
}

/// The subresource range barriers on this physical texture cover.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Subresource {
    pub base_layer: u32,
    pub layer_count: u32,
    pub base_mip_level: u32,
    pub mip_level_count: u32,
}

pub(crate) fn plan(
    slot: &PhysicalSlot,
    datas: &[TextureData],
    subresource: Subresource,
    live_pass_count: usize,
    present_after: Option<(TextureHandle, usize)>,
) -> Vec<TextureBarrier> {
    let mut barriers = Vec::new();

    // Transient images start each frame with undefined contents;
    // imported ones keep theirs, so their source layout must not
    // discard.
    let mut current_layout = if slot.imported {
        ImageLayout::General
    } else {
        ImageLayout::Undefined
    };
    let mut current_stages = PipelineStages::TOP_OF_PIPE;
    let mut current_access = MemoryAccesses::empty();
    let mut current_member: Option<TextureHandle> = None;

    for pass in 0..live_pass_count {
        let Some((handle, usage)) = usage_at(slot, datas, pass) else {
            continue;
        };

        if current_member.is_some_and(|member| member != handle) {
            // A different alias takes over the backing image; the
            // previous contents are no longer observable.
            current_layout = ImageLayout::Undefined;
        }
        current_member = Some(handle);

        let cleared = matches!(
            usage,
            TextureUse::ColorOutput { cleared: true } | TextureUse::DepthStencil { cleared: true }
        );
        if cleared {
            // The pass replaces the contents wholesale.
            current_layout = ImageLayout::Undefined;
        }

        let (required_layout, dst_stages, dst_access) = required_state(&usage);

        let satisfied = current_layout == required_layout
            && current_access.contains(dst_access)
            && current_stages.contains(dst_stages)
            // A write must still be ordered against the previous
            // write to be observable.
            && dst_access.is_read_only();

        if !satisfied {
            barriers.push(TextureBarrier {
                before_pass: pass,
                barrier: ImageBarrier {
                    src_stages: current_stages,
                    dst_stages,
                    src_access: current_access,
                    dst_access,
                    src_layout: current_layout,
                    dst_layout: required_layout,
                    base_layer: subresource.base_layer,
                    layer_count: subresource.layer_count,
                    base_mip_level: subresource.base_mip_level,
                    mip_level_count: subresource.mip_level_count,
                },
            });
        }

        current_layout = required_layout;
        current_stages = dst_stages;
        current_access = dst_access;

        // The render pass of the sink's last writer transitions the
        // attachment to the presentable layout on its own.
        if present_after == Some((handle, pass)) {
            current_layout = ImageLayout::Present;
        }
    }

    barriers
}

fn usage_at(
    slot: &PhysicalSlot,
    datas: &[TextureData],
    pass: usize,
) -> Option<(TextureHandle, TextureUse)> {
    // Member ranges are pairwise disjoint, so at most one member can
    // be active in any given pass.
    slot.members
        .iter()
        .filter(|(_, range)| range.contains(pass))
        .find_map(|(handle, _)| {
            datas[handle.index()]
                .usage_at(pass)
                .map(|usage| (*handle, usage))
        })
}

fn required_state(usage: &TextureUse) -> (ImageLayout, PipelineStages, MemoryAccesses) {
    match usage {
        TextureUse::Sampled(stages) => (
            ImageLayout::ShaderRead,
            stages.pipeline_stages(),
            MemoryAccesses::SHADER_READ,
        ),
        TextureUse::Input => (
            ImageLayout::Attachment,
            PipelineStages::FRAGMENT_SHADER,
            MemoryAccesses::INPUT_ATTACHMENT_READ,
        ),
        TextureUse::ColorOutput { .. } => (
            ImageLayout::Attachment,
            PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            MemoryAccesses::COLOR_ATTACHMENT_WRITE,
        ),
        TextureUse::DepthStencil { cleared } => {
            let mut access = MemoryAccesses::DEPTH_STENCIL_ATTACHMENT_WRITE;
            if !cleared {
                access |= MemoryAccesses::DEPTH_STENCIL_ATTACHMENT_READ;
            }
            (
                ImageLayout::Attachment,
                PipelineStages::EARLY_FRAGMENT_TESTS | PipelineStages::LATE_FRAGMENT_TESTS,
                access,
            )
        }
    }
}
