//! Plan execution: replaying a compiled frame graph into a command
//! buffer.

use std::any::Any;

use hashbrown::HashMap;
use tracing::trace_span;

use crate::backend::{CommandRecorder, GraphDevice};

use super::texture::TextureHandle;
use super::{FrameGraph, PhysicalTexture};

/// Resources that must outlive the frame currently being recorded.
///
/// Returned by [`FrameGraph::execute`]; the frame loop drops it once
/// the matching frame-in-flight fence has signaled, which destroys
/// everything the pass callbacks queued through
/// [`FrameGraphContext::destroy_after_use`].
#[derive(Default)]
pub struct FrameResources {
    resources: Vec<Box<dyn Any>>,
}

impl FrameResources {
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    fn push(&mut self, resource: Box<dyn Any>) {
        self.resources.push(resource);
    }
}

/// The view of the executor a pass callback records through.
pub struct FrameGraphContext<'a, D>
where
    D: GraphDevice,
{
    pub(crate) device: &'a D,
    pub(crate) command_buffer: &'a mut D::CommandBuffer,
    pub(crate) frame_index: usize,
    pub(crate) textures: &'a [PhysicalTexture<D>],
    pub(crate) slot_of: &'a HashMap<TextureHandle, usize>,
    pub(crate) resources: &'a mut FrameResources,
    pub(crate) secondary_buffers: bool,
}

impl<D> FrameGraphContext<'_, D>
where
    D: GraphDevice,
{
    /// The command buffer currently recording this pass.
    pub fn command_buffer(&mut self) -> &mut D::CommandBuffer {
        self.command_buffer
    }

    /// Resolves a texture handle to the image view bound for this
    /// frame.
    pub fn image_view(&self, handle: TextureHandle) -> Option<&D::ImageView> {
        self.slot_of
            .get(&handle)
            .map(|slot| &self.textures[*slot].view)
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Defers destruction of `resource` until the current frame has
    /// finished on the GPU.
    pub fn destroy_after_use<R>(&mut self, resource: R)
    where
        R: Any,
    {
        self.resources.push(Box::new(resource));
    }

    /// A secondary command buffer recording into the pool of
    /// `thread_index`.
    ///
    /// Only meaningful inside a pass that enabled secondary command
    /// buffers.
    pub fn create_secondary_command_buffer(&self, thread_index: usize) -> D::CommandBuffer {
        debug_assert!(
            self.secondary_buffers,
            "pass did not enable secondary command buffers",
        );
        self.device.create_secondary_command_buffer(thread_index)
    }

    /// Submits secondary command buffers recorded by worker threads
    /// into the current render scope.
    pub fn execute_secondary_commands(&mut self, buffers: Vec<D::CommandBuffer>) {
        self.command_buffer.execute_secondary_commands(buffers);
    }
}

impl<D> FrameGraph<D>
where
    D: GraphDevice,
{
    /// Replays the compiled plan into `command_buffer`: for each live
    /// pass, the pending barriers, the render scope (if the pass has
    /// attachments) and the pass callback, in that order.
    pub fn execute(
        &mut self,
        device: &D,
        command_buffer: &mut D::CommandBuffer,
        frame_index: usize,
    ) -> FrameResources {
        let _span = trace_span!("FrameGraph::execute", frame_index).entered();

        let mut resources = FrameResources::default();

        let Self {
            passes,
            textures,
            slot_of,
        } = self;

        for (index, pass) in passes.iter_mut().enumerate() {
            for texture in textures.iter() {
                for barrier in &texture.barriers {
                    if barrier.before_pass == index {
                        command_buffer.image_barrier(&texture.image, &barrier.barrier);
                    }
                }
            }

            if let Some(target) = &pass.render_target {
                command_buffer.begin_render_pass(
                    &target.render_pass,
                    &target.framebuffer,
                    &pass.clear_values,
                    pass.use_secondary_buffers,
                );
            }

            if let Some(callback) = &pass.callback {
                let mut context = FrameGraphContext {
                    device,
                    command_buffer: &mut *command_buffer,
                    frame_index,
                    textures: textures.as_slice(),
                    slot_of: &*slot_of,
                    resources: &mut resources,
                    secondary_buffers: pass.use_secondary_buffers,
                };

                let mut callback = callback.borrow_mut();
                (*callback)(&mut context);
            }

            if pass.render_target.is_some() {
                command_buffer.end_render_pass();
            }
        }

        resources
    }
}
