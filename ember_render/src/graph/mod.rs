//! The frame graph: declarative passes and textures compiled into a
//! dependency-ordered, barrier-annotated execution plan.
//!
//! A frame is declared once through [`FrameGraphBuilder`], compiled
//! with [`FrameGraphBuilder::build`] and executed every frame with
//! [`FrameGraph::execute`]. Compilation culls passes that never reach
//! the designated frame output, orders the survivors along their data
//! dependencies, folds transient textures whose live ranges never
//! overlap onto shared physical images, and plans the image barriers
//! the executor later replays.

mod alias;
mod barriers;
mod builder;
mod executor;
mod pass;
mod physical;
mod texture;


pub use barriers::TextureBarrier;
pub use builder::FrameGraphBuilder;
pub use executor::{FrameGraphContext, FrameResources};
pub use pass::PassBuilder;
pub use texture::{TextureHandle, TextureSettings};

use glam::UVec2;
use hashbrown::HashMap;
use thiserror::Error;

use crate::backend::{ClearValue, GraphDevice};

use pass::PassCallback;
use physical::RenderTarget;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// The pass dependency graph cannot be linearized.
    #[error("the pass dependency graph contains a cycle")]
    CyclicDependency,
    /// A pass's inputs or outputs disagree in size.
    #[error("pass `{pass}` expected size {expected:?}, found {found:?}")]
    SizeMismatch {
        pass: String,
        expected: UVec2,
        found: UVec2,
    },
    /// The same texture was declared more than once by one pass.
    #[error("pass `{pass}` already uses texture {handle:?}")]
    DoubleUsage {
        pass: String,
        handle: TextureHandle,
    },
    /// A second texture was designated as the frame output.
    #[error("a frame output texture is already designated")]
    MultipleFrameOutputs,
    /// No frame output was designated, or no pass writes it.
    #[error("no texture is designated as the frame output, or no pass writes it")]
    NoFrameOutput,
    /// The handle was not issued by this builder.
    #[error("unknown texture handle {0:?}")]
    UnknownTexture(TextureHandle),
}

/// A compiled plan: the live passes in execution order plus the
/// physical textures (and their planned barriers) backing every
/// declared handle.
///
/// The graph owns its images, views, render passes and framebuffers;
/// imported images are shared with the caller and never destroyed
/// here. Rebuilding produces a new `FrameGraph`; the previous one
/// stays valid until dropped.
pub struct FrameGraph<D>
where
    D: GraphDevice,
{
    pub(crate) passes: Vec<LivePass<D>>,
    pub(crate) textures: Vec<PhysicalTexture<D>>,
    pub(crate) slot_of: HashMap<TextureHandle, usize>,
}

pub(crate) struct LivePass<D>
where
    D: GraphDevice,
{
    pub name: String,
    pub callback: Option<PassCallback<D>>,
    pub render_target: Option<RenderTarget<D>>,
    pub clear_values: Vec<ClearValue>,
    pub use_render_frame_output: bool,
    pub use_secondary_buffers: bool,
}

pub(crate) struct PhysicalTexture<D>
where
    D: GraphDevice,
{
    pub image: D::Image,
    pub view: D::ImageView,
    pub imported: bool,
    pub barriers: Vec<TextureBarrier>,
}

impl<D> FrameGraph<D>
where
    D: GraphDevice,
{
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Names of the live passes in execution order.
    pub fn pass_names(&self) -> impl Iterator<Item = &str> {
        self.passes.iter().map(|pass| pass.name.as_str())
    }

    pub fn pass_uses_render_frame_output(&self, index: usize) -> bool {
        self.passes[index].use_render_frame_output
    }

    pub fn physical_texture_count(&self) -> usize {
        self.textures.len()
    }

    /// The physical texture a handle was aliased into, if the handle
    /// survived culling.
    pub fn physical_texture_index(&self, handle: TextureHandle) -> Option<usize> {
        self.slot_of.get(&handle).copied()
    }

    /// The planned barriers of one physical texture, in execution
    /// order.
    pub fn texture_barriers(&self, physical_index: usize) -> &[TextureBarrier] {
        &self.textures[physical_index].barriers
    }

    /// Resolves a handle to the image view bound for the current plan.
    pub fn image_view(&self, handle: TextureHandle) -> Option<&D::ImageView> {
        self.slot_of
            .get(&handle)
            .map(|slot| &self.textures[*slot].view)
    }
}
