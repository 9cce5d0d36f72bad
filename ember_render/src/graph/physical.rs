//! Physical-pass synthesis: per live pass, the render-pass object,
//! framebuffer and clear values the executor replays.

use crate::backend::{
    AttachmentDescription, AttachmentLoad, AttachmentStore, ClearValue, FramebufferDescriptor,
    GraphDevice, ImageLayout, RenderPassDescriptor,
};
use crate::color::Color;

use super::pass::FrameGraphPass;
use super::texture::{TextureData, TextureHandle, TextureSettings};
use super::PhysicalTexture;

/// The render scope of one live pass.
pub(crate) struct RenderTarget<D>
where
    D: GraphDevice,
{
    pub render_pass: D::RenderPass,
    pub framebuffer: D::Framebuffer,
}

/// Builds the render target and clear values for `pass`, or `None`
/// when the pass declares no attachments and no render scope is
/// opened for it.
pub(crate) fn synthesize<D>(
    device: &D,
    pass: &FrameGraphPass<D>,
    position: usize,
    datas: &[TextureData],
    settings: &[TextureSettings],
    textures: &[PhysicalTexture<D>],
    sink: TextureHandle,
    sink_last_writer: Option<usize>,
) -> (Option<RenderTarget<D>>, Vec<ClearValue>)
where
    D: GraphDevice,
{
    if !pass.writes_any() {
        return (None, Vec::new());
    }

    // Attachment order: color outputs by declared binding index, then
    // the depth/stencil attachment.
    let mut outputs: Vec<_> = pass.outputs.iter().collect();
    outputs.sort_by_key(|attachment| attachment.index);

    let mut descriptions = Vec::with_capacity(outputs.len() + 1);
    let mut clear_values = Vec::with_capacity(outputs.len() + 1);
    let mut views = Vec::with_capacity(outputs.len() + 1);

    for attachment in &outputs {
        let data = &datas[attachment.handle.index()];
        let texture_settings = &settings[attachment.handle.index()];

        let load_op = if attachment.clear.is_some() {
            AttachmentLoad::Clear
        } else if data.written_before(position) {
            AttachmentLoad::Load
        } else {
            AttachmentLoad::DontCare
        };

        let final_layout = if attachment.handle == sink && Some(position) == sink_last_writer {
            ImageLayout::Present
        } else {
            ImageLayout::Attachment
        };

        descriptions.push(AttachmentDescription {
            format: texture_settings.format,
            samples: texture_settings.samples,
            load_op,
            store_op: store_op(data, position),
            initial_layout: ImageLayout::Attachment,
            final_layout,
        });
        clear_values.push(ClearValue::Color(attachment.clear.unwrap_or(Color::BLACK)));
        views.push(attachment.handle);
    }

    if let Some(depth) = &pass.depth {
        let data = &datas[depth.handle.index()];
        let texture_settings = &settings[depth.handle.index()];

        let load_op = if depth.clear.is_some() {
            AttachmentLoad::Clear
        } else if data.written_before(position) {
            AttachmentLoad::Load
        } else {
            AttachmentLoad::DontCare
        };

        descriptions.push(AttachmentDescription {
            format: texture_settings.format,
            samples: texture_settings.samples,
            load_op,
            store_op: store_op(data, position),
            initial_layout: ImageLayout::Attachment,
            final_layout: ImageLayout::Attachment,
        });
        clear_values.push(ClearValue::DepthStencil(depth.clear.unwrap_or_default()));
        views.push(depth.handle);
    }

    let render_pass = device.create_render_pass(&RenderPassDescriptor {
        attachments: &descriptions,
    });

    let framebuffer = device.create_framebuffer(&FramebufferDescriptor {
        render_pass: &render_pass,
        // Validated at declaration time: every attachment shares it.
        size: pass.output_size().unwrap(),
        views: views
            .iter()
            .map(|handle| {
                let slot = datas[handle.index()].physical.unwrap();
                &textures[slot].view
            })
            .collect(),
    });

    (
        Some(RenderTarget {
            render_pass,
            framebuffer,
        }),
        clear_values,
    )
}

fn store_op(data: &TextureData, position: usize) -> AttachmentStore {
    if data.read_after(position) || data.final_output || data.imported {
        AttachmentStore::Store
    } else {
        AttachmentStore::DontCare
    }
}
