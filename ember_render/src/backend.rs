//! Backend boundary: the vocabulary the frame graph speaks and the
//! traits a GPU backend implements.
//!
//! The graph never touches a graphics API directly. It creates images,
//! image views, render passes and framebuffers through [`GraphDevice`]
//! and records barriers and render-pass scopes through
//! [`CommandRecorder`]; everything else (pipelines, draws, descriptor
//! sets) happens inside pass callbacks and is opaque to the graph.

use bitflags::bitflags;
use glam::UVec2;

use crate::color::{Color, DepthStencil};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    R8Unorm,
    Rg8Unorm,
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    R16Float,
    Rg16Float,
    Rgba16Float,
    R32Float,
    Rg32Float,
    Rgba32Float,
    Depth32Float,
    Depth24UnormStencil8,
}

impl ImageFormat {
    pub const fn is_srgb(&self) -> bool {
        matches!(self, Self::Rgba8UnormSrgb | Self::Bgra8UnormSrgb)
    }

    pub const fn is_depth(&self) -> bool {
        matches!(self, Self::Depth32Float | Self::Depth24UnormStencil8)
    }

    pub const fn has_stencil(&self) -> bool {
        matches!(self, Self::Depth24UnormStencil8)
    }
}

bitflags! {
    /// Ways an image may be used over its lifetime.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ImageUsages: u32 {
        /// Bound as a color or depth/stencil attachment.
        const RENDER_TARGET = 1 << 0;
        /// Sampled from a shader.
        const SHADER_SAMPLING = 1 << 1;
        /// Bound as an input attachment.
        const SHADER_INPUT = 1 << 2;
        const TRANSFER_SRC = 1 << 3;
        const TRANSFER_DST = 1 << 4;
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    /// Contents are undefined; the only valid source layout for a
    /// freshly allocated or discarded image.
    Undefined,
    /// Color or depth/stencil attachment.
    Attachment,
    /// Read-only shader access.
    ShaderRead,
    TransferSrc,
    TransferDst,
    /// Presentable to the swapchain.
    Present,
    General,
}

bitflags! {
    /// Pipeline stage mask of a barrier endpoint.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PipelineStages: u32 {
        const TOP_OF_PIPE = 1 << 0;
        const DRAW_INDIRECT = 1 << 1;
        const VERTEX_INPUT = 1 << 2;
        const VERTEX_SHADER = 1 << 3;
        const TESSELLATION_CONTROL_SHADER = 1 << 4;
        const TESSELLATION_EVALUATION_SHADER = 1 << 5;
        const GEOMETRY_SHADER = 1 << 6;
        const EARLY_FRAGMENT_TESTS = 1 << 7;
        const FRAGMENT_SHADER = 1 << 8;
        const LATE_FRAGMENT_TESTS = 1 << 9;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 10;
        const COMPUTE_SHADER = 1 << 11;
        const TRANSFER = 1 << 12;
        const BOTTOM_OF_PIPE = 1 << 13;
    }
}

bitflags! {
    /// Memory access mask of a barrier endpoint.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MemoryAccesses: u32 {
        const SHADER_READ = 1 << 0;
        const SHADER_WRITE = 1 << 1;
        const INPUT_ATTACHMENT_READ = 1 << 2;
        const COLOR_ATTACHMENT_READ = 1 << 3;
        const COLOR_ATTACHMENT_WRITE = 1 << 4;
        const DEPTH_STENCIL_ATTACHMENT_READ = 1 << 5;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 1 << 6;
        const TRANSFER_READ = 1 << 7;
        const TRANSFER_WRITE = 1 << 8;
    }
}

impl MemoryAccesses {
    const WRITES: Self = Self::SHADER_WRITE
        .union(Self::COLOR_ATTACHMENT_WRITE)
        .union(Self::DEPTH_STENCIL_ATTACHMENT_WRITE)
        .union(Self::TRANSFER_WRITE);

    /// Returns `true` if the mask names no write access.
    ///
    /// An empty mask is also read-only.
    pub const fn is_read_only(&self) -> bool {
        !self.intersects(Self::WRITES)
    }
}

bitflags! {
    /// Shader stages a sampled texture is read from.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u32 {
        const VERTEX = 1 << 0;
        const TESSELLATION_CONTROL = 1 << 1;
        const TESSELLATION_EVALUATION = 1 << 2;
        const GEOMETRY = 1 << 3;
        const FRAGMENT = 1 << 4;
        const COMPUTE = 1 << 5;
    }
}

impl ShaderStages {
    /// The pipeline stages a barrier must cover so that these shader
    /// stages observe it.
    pub fn pipeline_stages(&self) -> PipelineStages {
        let mut stages = PipelineStages::empty();

        if self.contains(Self::VERTEX) {
            stages |= PipelineStages::VERTEX_SHADER;
        }
        if self.contains(Self::TESSELLATION_CONTROL) {
            stages |= PipelineStages::TESSELLATION_CONTROL_SHADER;
        }
        if self.contains(Self::TESSELLATION_EVALUATION) {
            stages |= PipelineStages::TESSELLATION_EVALUATION_SHADER;
        }
        if self.contains(Self::GEOMETRY) {
            stages |= PipelineStages::GEOMETRY_SHADER;
        }
        if self.contains(Self::FRAGMENT) {
            stages |= PipelineStages::FRAGMENT_SHADER;
        }
        if self.contains(Self::COMPUTE) {
            stages |= PipelineStages::COMPUTE_SHADER;
        }

        stages
    }
}

/// What happens to an attachment's previous contents when a render
/// pass begins.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AttachmentLoad {
    DontCare,
    Clear,
    Load,
}

/// What happens to an attachment's contents when a render pass ends.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AttachmentStore {
    DontCare,
    Store,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SampleCount {
    #[default]
    X1,
    X2,
    X4,
    X8,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ImageTiling {
    #[default]
    Optimal,
    Linear,
}

/// Everything the backend needs to allocate an image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageSettings {
    pub size: UVec2,
    pub format: ImageFormat,
    pub mip_levels: u32,
    pub samples: SampleCount,
    pub tiling: ImageTiling,
    pub usages: ImageUsages,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AttachmentDescription {
    pub format: ImageFormat,
    pub samples: SampleCount,
    pub load_op: AttachmentLoad,
    pub store_op: AttachmentStore,
    pub initial_layout: ImageLayout,
    pub final_layout: ImageLayout,
}

#[derive(Clone, Debug)]
pub struct RenderPassDescriptor<'a> {
    pub attachments: &'a [AttachmentDescription],
}

pub struct FramebufferDescriptor<'a, D>
where
    D: GraphDevice + ?Sized,
{
    pub render_pass: &'a D::RenderPass,
    pub size: UVec2,
    /// One view per attachment, in attachment order.
    pub views: Vec<&'a D::ImageView>,
}

/// A layout transition plus execution/memory dependency on one image
/// subresource range.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ImageBarrier {
    pub src_stages: PipelineStages,
    pub dst_stages: PipelineStages,
    pub src_access: MemoryAccesses,
    pub dst_access: MemoryAccesses,
    pub src_layout: ImageLayout,
    pub dst_layout: ImageLayout,
    pub base_layer: u32,
    pub layer_count: u32,
    pub base_mip_level: u32,
    pub mip_level_count: u32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ClearValue {
    Color(Color),
    DepthStencil(DepthStencil),
}

/// Factory side of the backend.
///
/// `Image` is `Clone` because imported images are shared between the
/// caller and every plan built from them; backends typically hand out
/// reference-counted handles.
pub trait GraphDevice {
    type Image: Clone;
    type ImageView;
    type RenderPass;
    type Framebuffer;
    type CommandBuffer: CommandRecorder<Self>;

    fn create_image(&self, settings: &ImageSettings) -> Self::Image;

    fn create_image_view(&self, image: &Self::Image, layer: u32, mip_level: u32)
        -> Self::ImageView;

    fn create_render_pass(&self, descriptor: &RenderPassDescriptor<'_>) -> Self::RenderPass;

    fn create_framebuffer(&self, descriptor: &FramebufferDescriptor<'_, Self>)
        -> Self::Framebuffer;

    /// A secondary command buffer recording into the thread-local pool
    /// for `thread_index`.
    fn create_secondary_command_buffer(&self, thread_index: usize) -> Self::CommandBuffer;
}

/// Recording side of the backend.
pub trait CommandRecorder<D>
where
    D: GraphDevice + ?Sized,
{
    /// Opens a render-pass scope. With `secondary_buffers` the scope
    /// only accepts buffers submitted through
    /// [`execute_secondary_commands`](Self::execute_secondary_commands).
    fn begin_render_pass(
        &mut self,
        render_pass: &D::RenderPass,
        framebuffer: &D::Framebuffer,
        clear_values: &[ClearValue],
        secondary_buffers: bool,
    );

    fn end_render_pass(&mut self);

    fn image_barrier(&mut self, image: &D::Image, barrier: &ImageBarrier);

    fn execute_secondary_commands(&mut self, buffers: Vec<D::CommandBuffer>);
}

#[cfg(test)]
mod tests {
    use super::{MemoryAccesses, PipelineStages, ShaderStages};

    #[test]
    fn read_only_access_masks() {
        assert!(MemoryAccesses::SHADER_READ.is_read_only());
        assert!(MemoryAccesses::empty().is_read_only());
        assert!(!MemoryAccesses::COLOR_ATTACHMENT_WRITE.is_read_only());
        assert!(!(MemoryAccesses::SHADER_READ | MemoryAccesses::TRANSFER_WRITE).is_read_only());
    }

    #[test]
    fn shader_stages_map_to_pipeline_stages() {
        let stages = ShaderStages::VERTEX | ShaderStages::FRAGMENT;
        assert_eq!(
            stages.pipeline_stages(),
            PipelineStages::VERTEX_SHADER | PipelineStages::FRAGMENT_SHADER,
        );
    }
}
