//! Frame-graph compilation.
//!
//! [`FrameGraphBuilder`] accumulates texture and pass declarations;
//! [`FrameGraphBuilder::build`] culls passes that never reach the
//! frame output, orders the survivors, aliases transient textures onto
//! physical images, plans barriers and synthesizes the per-pass render
//! objects. The builder keeps its declarations across builds, so a
//! graph can be recompiled whenever the declarations change.

use std::collections::BTreeSet;

use hashbrown::{HashMap, HashSet};
use tracing::trace_span;

use crate::backend::{GraphDevice, ImageUsages};

use super::alias;
use super::barriers::{self, Subresource};
use super::pass::{FrameGraphPass, PassBuilder};
use super::physical;
use super::texture::{TextureData, TextureHandle, TextureSettings};
use super::{FrameGraph, GraphError, LivePass, PhysicalTexture};

pub(crate) struct ImportedTexture<D>
where
    D: GraphDevice,
{
    pub image: D::Image,
    pub layer: u32,
    pub mip_level: u32,
}

pub struct FrameGraphBuilder<D>
where
    D: GraphDevice,
{
    textures: Vec<TextureSettings>,
    imported: HashMap<TextureHandle, ImportedTexture<D>>,
    passes: Vec<FrameGraphPass<D>>,
    final_output: Option<TextureHandle>,
}

impl<D> FrameGraphBuilder<D>
where
    D: GraphDevice,
{
    pub fn new() -> Self {
        Self {
            textures: Vec::new(),
            imported: HashMap::new(),
            passes: Vec::new(),
            final_output: None,
        }
    }

    /// Declares a virtual texture; the builder allocates (and possibly
    /// aliases) the backing image at build time.
    pub fn create_texture(&mut self, settings: TextureSettings) -> TextureHandle {
        let handle = TextureHandle::new(self.textures.len());
        self.textures.push(settings);
        handle
    }

    /// Declares an externally owned image.
    ///
    /// `settings` describe the imported image; imported textures are
    /// never aliased and keep their contents between frames.
    pub fn import_texture(
        &mut self,
        image: D::Image,
        settings: TextureSettings,
        layer: u32,
        mip_level: u32,
    ) -> TextureHandle {
        let handle = TextureHandle::new(self.textures.len());
        self.textures.push(settings);
        self.imported.insert(
            handle,
            ImportedTexture {
                image,
                layer,
                mip_level,
            },
        );
        handle
    }

    /// Designates `handle` as the frame's output sink; liveness
    /// propagates backward from it.
    pub fn set_final_output(&mut self, handle: TextureHandle) -> Result<(), GraphError> {
        if handle.index() >= self.textures.len() {
            return Err(GraphError::UnknownTexture(handle));
        }

        match self.final_output {
            Some(existing) if existing != handle => Err(GraphError::MultipleFrameOutputs),
            _ => {
                self.final_output = Some(handle);
                Ok(())
            }
        }
    }

    /// Appends a pass; declare its texture usage through the returned
    /// [`PassBuilder`].
    pub fn create_pass(&mut self, name: impl Into<String>) -> PassBuilder<'_, D> {
        self.passes.push(FrameGraphPass::new(name.into()));

        PassBuilder {
            pass: self.passes.last_mut().unwrap(),
            textures: &self.textures,
        }
    }

    pub fn texture_settings(&self, handle: TextureHandle) -> Option<&TextureSettings> {
        self.textures.get(handle.index())
    }

    /// Compiles the declarations into an executable [`FrameGraph`].
    ///
    /// On error the declarations are retained and no partial plan is
    /// observable; a previously built graph is unaffected.
    pub fn build(&mut self, device: &D) -> Result<FrameGraph<D>, GraphError> {
        let _span = trace_span!("FrameGraphBuilder::build").entered();

        let sink = self.final_output.ok_or(GraphError::NoFrameOutput)?;

        // Usage records over the declared pass list.
        let declared: Vec<&FrameGraphPass<D>> = self.passes.iter().collect();
        let datas = collect_texture_data(self.textures.len(), &self.imported, sink, &declared);

        if !datas[sink.index()].write_range.is_valid() {
            return Err(GraphError::NoFrameOutput);
        }

        let used = compute_used(&declared, &datas, sink);
        let dependencies = compute_dependencies(&declared, &datas, &used);
        let order = topological_order(&used, &dependencies)?;

        for (index, pass) in declared.iter().enumerate() {
            if !used[index] {
                tracing::debug!(pass = %pass.name, "culled pass");
            }
        }

        // Re-collect usage records over the live, ordered pass list;
        // every index from here on is a live-pass position.
        let live: Vec<&FrameGraphPass<D>> = order.iter().map(|i| &self.passes[*i]).collect();
        let mut datas = collect_texture_data(self.textures.len(), &self.imported, sink, &live);

        let slots = alias::allocate(&mut datas, &self.textures);

        let mut textures = Vec::with_capacity(slots.len());
        let mut subresources = Vec::with_capacity(slots.len());
        for slot in &slots {
            let (image, view, subresource, imported) = match slot
                .members
                .first()
                .and_then(|(handle, _)| self.imported.get(handle))
            {
                Some(import) => {
                    let view =
                        device.create_image_view(&import.image, import.layer, import.mip_level);
                    let subresource = Subresource {
                        base_layer: import.layer,
                        layer_count: 1,
                        base_mip_level: import.mip_level,
                        mip_level_count: 1,
                    };
                    (import.image.clone(), view, subresource, true)
                }
                None => {
                    let image = device.create_image(&slot.settings.image_settings());
                    let view = device.create_image_view(&image, 0, 0);
                    let subresource = Subresource {
                        base_layer: 0,
                        layer_count: 1,
                        base_mip_level: 0,
                        mip_level_count: slot.settings.mip_levels,
                    };
                    (image, view, subresource, false)
                }
            };

            subresources.push(subresource);
            textures.push(PhysicalTexture {
                image,
                view,
                imported,
                barriers: Vec::new(),
            });
        }

        let sink_last_writer = datas[sink.index()].last_write_before(usize::MAX);

        for (index, slot) in slots.iter().enumerate() {
            textures[index].barriers = barriers::plan(
                slot,
                &datas,
                subresources[index],
                live.len(),
                sink_last_writer.map(|position| (sink, position)),
            );
        }

        let mut passes = Vec::with_capacity(live.len());
        for (position, pass) in live.iter().enumerate() {
            let (render_target, clear_values) = physical::synthesize(
                device,
                pass,
                position,
                &datas,
                &self.textures,
                &textures,
                sink,
                sink_last_writer,
            );

            passes.push(LivePass {
                name: pass.name.clone(),
                callback: pass.callback.clone(),
                render_target,
                clear_values,
                use_render_frame_output: pass.use_render_frame_output,
                use_secondary_buffers: pass.use_secondary_buffers,
            });
        }

        let slot_of = datas
            .iter()
            .filter_map(|data| data.physical.map(|slot| (data.handle, slot)))
            .collect();

        Ok(FrameGraph {
            passes,
            textures,
            slot_of,
        })
    }
}

impl<D> Default for FrameGraphBuilder<D>
where
    D: GraphDevice,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Builds one usage record per texture over `passes`; indices are
/// positions in `passes`.
fn collect_texture_data<D>(
    texture_count: usize,
    imported: &HashMap<TextureHandle, ImportedTexture<D>>,
    sink: TextureHandle,
    passes: &[&FrameGraphPass<D>],
) -> Vec<TextureData>
where
    D: GraphDevice,
{
    let mut datas: Vec<TextureData> = (0..texture_count)
        .map(|index| TextureData::new(TextureHandle::new(index)))
        .collect();

    for (position, pass) in passes.iter().enumerate() {
        for (handle, stages) in &pass.sampled {
            let data = &mut datas[handle.index()];
            data.sampled.push((position, *stages));
            data.usages |= ImageUsages::SHADER_SAMPLING;
        }

        for (handle, _) in &pass.inputs {
            let data = &mut datas[handle.index()];
            data.input.push(position);
            data.usages |= ImageUsages::SHADER_INPUT;
        }

        for attachment in &pass.outputs {
            let data = &mut datas[attachment.handle.index()];
            data.output.push(position);
            data.usages |= ImageUsages::RENDER_TARGET;

            if attachment.clear.is_some() {
                data.clear.push(position);
                data.usages |= ImageUsages::TRANSFER_DST;
            }
        }

        if let Some(depth) = &pass.depth {
            let data = &mut datas[depth.handle.index()];
            data.depth.push(position);
            data.usages |= ImageUsages::RENDER_TARGET;

            if depth.clear.is_some() {
                data.clear.push(position);
                data.usages |= ImageUsages::TRANSFER_DST;
            }
        }
    }

    for data in &mut datas {
        data.imported = imported.contains_key(&data.handle);
        data.final_output = data.handle == sink;
        data.used = !data.sampled.is_empty()
            || !data.input.is_empty()
            || !data.output.is_empty()
            || !data.depth.is_empty();
        data.update_ranges();
    }

    datas
}

/// Backward liveness: a pass is live iff it writes the sink or writes
/// a texture a later live pass reads.
fn compute_used<D>(passes: &[&FrameGraphPass<D>], datas: &[TextureData], sink: TextureHandle) -> Vec<bool>
where
    D: GraphDevice,
{
    let mut used = vec![false; passes.len()];

    for index in (0..passes.len()).rev() {
        let pass = passes[index];

        let mut live = written_handles(pass).any(|handle| handle == sink);

        if !live {
            live = written_handles(pass).any(|handle| {
                let data = &datas[handle.index()];
                data.sampled.iter().any(|(i, _)| *i > index && used[*i])
                    || data.input.iter().any(|i| *i > index && used[*i])
                    || data
                        .depth
                        .iter()
                        .any(|i| *i > index && used[*i] && !data.clear.contains(i))
            });
        }

        used[index] = live;
    }

    used
}

/// Dependencies among live passes, by declaration index.
///
/// A reader depends on the latest preceding writer of each texture it
/// reads ("latest writer wins"); with no preceding writer it depends
/// on the last writer overall, which is what surfaces declaration
/// cycles. Writers serialize against the previous writer.
fn compute_dependencies<D>(
    passes: &[&FrameGraphPass<D>],
    datas: &[TextureData],
    used: &[bool],
) -> Vec<HashSet<usize>>
where
    D: GraphDevice,
{
    let mut dependencies: Vec<HashSet<usize>> = vec![HashSet::new(); passes.len()];

    for (index, pass) in passes.iter().enumerate() {
        if !used[index] {
            continue;
        }

        let deps = &mut dependencies[index];

        for handle in read_handles(pass) {
            let data = &datas[handle.index()];

            // "Latest writer wins": the value a reader observes comes
            // from the latest preceding writer. A texture only written
            // later still forces an ordering edge; that edge is what
            // turns mutually-reading pass pairs into detectable cycles.
            let writer = data
                .last_write_before(index)
                .filter(|writer| used[*writer])
                .or_else(|| data.last_write(index).filter(|writer| used[*writer]));

            if let Some(writer) = writer {
                deps.insert(writer);
            }
        }

        // A depth attachment without a clear loads whatever an earlier
        // writer left; later writers impose nothing on it.
        if let Some(depth) = pass.depth.as_ref().filter(|depth| depth.clear.is_none()) {
            if let Some(writer) = datas[depth.handle.index()]
                .last_write_before(index)
                .filter(|writer| used[*writer])
            {
                deps.insert(writer);
            }
        }

        for handle in written_handles(pass) {
            if let Some(writer) = datas[handle.index()]
                .last_write_before(index)
                .filter(|writer| used[*writer])
            {
                deps.insert(writer);
            }
        }

        deps.remove(&index);
    }

    dependencies
}

/// Stable topological order over the live passes: among ready passes
/// the lowest declaration index goes first.
fn topological_order(
    used: &[bool],
    dependencies: &[HashSet<usize>],
) -> Result<Vec<usize>, GraphError> {
    let live: Vec<usize> = (0..used.len()).filter(|i| used[*i]).collect();

    let mut indegree: HashMap<usize, usize> = HashMap::new();
    let mut successors: HashMap<usize, Vec<usize>> = HashMap::new();

    for &index in &live {
        indegree.insert(index, dependencies[index].len());
        for &dependency in &dependencies[index] {
            successors.entry(dependency).or_default().push(index);
        }
    }

    let mut ready: BTreeSet<usize> = live
        .iter()
        .copied()
        .filter(|index| indegree[index] == 0)
        .collect();

    let mut order = Vec::with_capacity(live.len());

    while let Some(&index) = ready.first() {
        ready.remove(&index);
        order.push(index);

        for &successor in successors.get(&index).map(Vec::as_slice).unwrap_or(&[]) {
            let count = indegree.get_mut(&successor).unwrap();
            *count -= 1;
            if *count == 0 {
                ready.insert(successor);
            }
        }
    }

    if order.len() != live.len() {
        return Err(GraphError::CyclicDependency);
    }

    Ok(order)
}

/// Sampled and input-attachment reads; depth loads are handled
/// separately because they never force an edge to a later writer.
fn read_handles<'a, D>(pass: &'a FrameGraphPass<D>) -> impl Iterator<Item = TextureHandle> + 'a
where
    D: GraphDevice,
{
    pass.sampled
        .iter()
        .map(|(handle, _)| *handle)
        .chain(pass.inputs.iter().map(|(handle, _)| *handle))
}

fn written_handles<'a, D>(pass: &'a FrameGraphPass<D>) -> impl Iterator<Item = TextureHandle> + 'a
where
    D: GraphDevice,
{
    pass.outputs
        .iter()
        .map(|attachment| attachment.handle)
        .chain(pass.depth.iter().map(|depth| depth.handle))
}
