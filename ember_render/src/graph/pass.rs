use std::cell::RefCell;
use std::rc::Rc;

use glam::UVec2;
use hashbrown::HashSet;

use crate::backend::{GraphDevice, ShaderStages};
use crate::color::{Color, DepthStencil};

use super::executor::FrameGraphContext;
use super::texture::{TextureHandle, TextureSettings};
use super::GraphError;

/// The callback recorded into a pass's render scope each frame.
///
/// Shared between the builder (which keeps the declaration across
/// rebuilds) and every compiled plan.
pub(crate) type PassCallback<D> = Rc<RefCell<dyn FnMut(&mut FrameGraphContext<'_, D>)>>;

#[derive(Clone, Debug)]
pub(crate) struct OutputAttachment {
    pub handle: TextureHandle,
    pub index: u32,
    pub clear: Option<Color>,
}

#[derive(Clone, Debug)]
pub(crate) struct DepthAttachment {
    pub handle: TextureHandle,
    pub clear: Option<DepthStencil>,
}

/// A declared pass: a named unit of work with texture usage
/// declarations and an execution callback.
pub(crate) struct FrameGraphPass<D>
where
    D: GraphDevice,
{
    pub name: String,
    pub use_render_frame_output: bool,
    pub use_secondary_buffers: bool,
    pub callback: Option<PassCallback<D>>,
    pub sampled: Vec<(TextureHandle, ShaderStages)>,
    pub inputs: Vec<(TextureHandle, u32)>,
    pub outputs: Vec<OutputAttachment>,
    pub depth: Option<DepthAttachment>,
    registered: HashSet<TextureHandle>,
    input_size: Option<UVec2>,
    output_size: Option<UVec2>,
}

impl<D> FrameGraphPass<D>
where
    D: GraphDevice,
{
    pub fn new(name: String) -> Self {
        Self {
            name,
            use_render_frame_output: false,
            use_secondary_buffers: false,
            callback: None,
            sampled: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            depth: None,
            registered: HashSet::new(),
            input_size: None,
            output_size: None,
        }
    }

    /// The common `(width, height)` of the outputs and depth
    /// attachment, if any were declared.
    pub fn output_size(&self) -> Option<UVec2> {
        self.output_size
    }

    pub fn writes_any(&self) -> bool {
        !self.outputs.is_empty() || self.depth.is_some()
    }
}

/// Mutable view of a freshly created pass, returned by
/// [`FrameGraphBuilder::create_pass`](super::FrameGraphBuilder::create_pass).
///
/// Declaration errors (double use of a handle, disagreeing sizes) are
/// reported by the setter that introduces them; the pass is left
/// unchanged in that case.
pub struct PassBuilder<'a, D>
where
    D: GraphDevice,
{
    pub(crate) pass: &'a mut FrameGraphPass<D>,
    pub(crate) textures: &'a [TextureSettings],
}

impl<D> PassBuilder<'_, D>
where
    D: GraphDevice,
{
    pub fn name(&self) -> &str {
        &self.pass.name
    }

    /// Marks the synthesized physical pass as rendering to the frame
    /// output.
    pub fn enable_render_frame_output(&mut self, enable: bool) -> &mut Self {
        self.pass.use_render_frame_output = enable;
        self
    }

    /// Opens this pass's render scope for secondary command buffers;
    /// the callback then records through
    /// [`FrameGraphContext::create_secondary_command_buffer`].
    pub fn enable_secondary_command_buffers(&mut self, enable: bool) -> &mut Self {
        self.pass.use_secondary_buffers = enable;
        self
    }

    pub fn set_execution_callback<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnMut(&mut FrameGraphContext<'_, D>) + 'static,
    {
        self.pass.callback = Some(Rc::new(RefCell::new(callback)));
        self
    }

    /// Declares `handle` as sampled by the shader stages in `stages`.
    pub fn add_sampled_texture(
        &mut self,
        handle: TextureHandle,
        stages: ShaderStages,
    ) -> Result<(), GraphError> {
        self.check_known(handle)?;
        self.register(handle)?;
        self.pass.sampled.push((handle, stages));
        Ok(())
    }

    /// Declares `handle` as an input attachment bound at `index`.
    pub fn add_input_texture(&mut self, handle: TextureHandle, index: u32) -> Result<(), GraphError> {
        let size = self.texture_size(handle)?;
        validate_size(&self.pass.name, &mut self.pass.input_size, size)?;
        self.register(handle)?;
        self.pass.inputs.push((handle, index));
        Ok(())
    }

    /// Declares `handle` as a color output bound at `index`.
    pub fn add_output_texture(
        &mut self,
        handle: TextureHandle,
        index: u32,
    ) -> Result<(), GraphError> {
        self.output_texture(handle, index, None)
    }

    /// Like [`add_output_texture`](Self::add_output_texture), but the
    /// attachment is cleared to `clear_color` when the pass begins.
    pub fn add_cleared_output_texture(
        &mut self,
        handle: TextureHandle,
        index: u32,
        clear_color: Color,
    ) -> Result<(), GraphError> {
        self.output_texture(handle, index, Some(clear_color))
    }

    /// Binds `handle` as the depth/stencil attachment.
    pub fn set_depth_texture(&mut self, handle: TextureHandle) -> Result<(), GraphError> {
        self.depth_texture(handle, None)
    }

    /// Like [`set_depth_texture`](Self::set_depth_texture), but the
    /// attachment is cleared when the pass begins.
    pub fn set_cleared_depth_texture(
        &mut self,
        handle: TextureHandle,
        clear: DepthStencil,
    ) -> Result<(), GraphError> {
        self.depth_texture(handle, Some(clear))
    }

    fn output_texture(
        &mut self,
        handle: TextureHandle,
        index: u32,
        clear: Option<Color>,
    ) -> Result<(), GraphError> {
        let size = self.texture_size(handle)?;
        validate_size(&self.pass.name, &mut self.pass.output_size, size)?;
        self.register(handle)?;
        self.pass.outputs.push(OutputAttachment {
            handle,
            index,
            clear,
        });
        Ok(())
    }

    fn depth_texture(
        &mut self,
        handle: TextureHandle,
        clear: Option<DepthStencil>,
    ) -> Result<(), GraphError> {
        // Only one depth/stencil attachment per pass.
        if self.pass.depth.is_some() {
            return Err(GraphError::DoubleUsage {
                pass: self.pass.name.clone(),
                handle,
            });
        }

        let size = self.texture_size(handle)?;
        validate_size(&self.pass.name, &mut self.pass.output_size, size)?;
        self.register(handle)?;
        self.pass.depth = Some(DepthAttachment { handle, clear });
        Ok(())
    }

    fn check_known(&self, handle: TextureHandle) -> Result<(), GraphError> {
        if handle.is_valid() && handle.index() < self.textures.len() {
            Ok(())
        } else {
            Err(GraphError::UnknownTexture(handle))
        }
    }

    fn texture_size(&self, handle: TextureHandle) -> Result<UVec2, GraphError> {
        self.check_known(handle)?;
        Ok(self.textures[handle.index()].size)
    }

    fn register(&mut self, handle: TextureHandle) -> Result<(), GraphError> {
        if !self.pass.registered.insert(handle) {
            return Err(GraphError::DoubleUsage {
                pass: self.pass.name.clone(),
                handle,
            });
        }
        Ok(())
    }
}

fn validate_size(
    pass: &str,
    slot: &mut Option<UVec2>,
    size: UVec2,
) -> Result<(), GraphError> {
    match slot {
        None => {
            *slot = Some(size);
            Ok(())
        }
        Some(expected) if *expected == size => Ok(()),
        Some(expected) => Err(GraphError::SizeMismatch {
            pass: pass.to_owned(),
            expected: *expected,
            found: size,
        }),
    }
}
