use std::sync::Arc;

use crate::resource::{ResourceId, Subresource};
use crate::state::ResourceStates;
use crate::track::{ResourceStateManager, ResourceStateTable, SafetyChecks};

use super::allocator::CommandAllocator;
use super::{
    Command, DescriptorLayoutHandle, DescriptorTableHandle, IndexFormat, PipelineHandle,
    PrimitiveTopology,
};

/// A deferred command list.
///
/// Every operation appends a [`Command`] in call order instead of reaching
/// the device; resource-touching operations additionally record usage
/// annotations that let the replay loop synthesize the minimal set of
/// state barriers. Recording is single-threaded per encoder.
pub struct CommandEncoder {
    table: Arc<ResourceStateTable>,
    commands: Vec<Command>,
    state: ResourceStateManager,
    current_vertex_buffer: Option<ResourceId>,
    current_index_buffer: Option<ResourceId>,
}

impl CommandEncoder {
    pub fn new(
        table: Arc<ResourceStateTable>,
        allocator: &mut CommandAllocator,
        checks: SafetyChecks,
    ) -> Self {
        Self {
            table,
            commands: allocator.obtain(),
            state: ResourceStateManager::new(checks),
            current_vertex_buffer: None,
            current_index_buffer: None,
        }
    }

    /// Discards everything recorded so far and starts over on storage from
    /// `allocator`, optionally seeding an initial pipeline. The committed
    /// state table is not touched.
    pub fn reset(&mut self, allocator: &mut CommandAllocator, initial_pipeline: Option<PipelineHandle>) {
        let storage = std::mem::replace(&mut self.commands, allocator.obtain());
        allocator.reclaim(storage);

        self.state.reset();
        self.current_vertex_buffer = None;
        self.current_index_buffer = None;

        if let Some(pipeline) = initial_pipeline {
            self.commands.push(Command::SetPipeline { pipeline });
        }
    }

    /// Ends recording. Replay is driven by [`super::CommandQueue`].
    pub fn finish(&mut self) {
        log::trace!("finished recording {} commands", self.commands.len());
    }

    #[inline]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub(crate) fn replay_parts(&mut self) -> (&[Command], &mut ResourceStateManager) {
        (&self.commands, &mut self.state)
    }

    fn pre_read(&mut self, resource: ResourceId, subresource: Subresource, states: ResourceStates) {
        self.state
            .track_pre_read(&mut self.commands, &self.table, resource, subresource, states);
    }

    fn post_read(&mut self, resource: ResourceId, subresource: Subresource, states: ResourceStates) {
        self.state
            .track_post_read(&mut self.commands, &self.table, resource, subresource, states);
    }

    fn pre_write(&mut self, resource: ResourceId, subresource: Subresource, states: ResourceStates) {
        self.state
            .track_pre_write(&mut self.commands, &self.table, resource, subresource, states);
    }

    fn post_write(&mut self, resource: ResourceId, subresource: Subresource, states: ResourceStates) {
        self.state
            .track_post_write(&mut self.commands, &self.table, resource, subresource, states);
    }

    fn pre_draw(&mut self, indexed: bool) {
        if let Some(buffer) = self.current_vertex_buffer {
            self.pre_read(
                buffer,
                Subresource::Whole,
                ResourceStates::VERTEX_AND_CONSTANT_BUFFER,
            );
        }
        if indexed {
            if let Some(buffer) = self.current_index_buffer {
                self.pre_read(buffer, Subresource::Whole, ResourceStates::INDEX_BUFFER);
            }
        }
    }

    fn post_draw(&mut self, indexed: bool) {
        if let Some(buffer) = self.current_vertex_buffer {
            self.post_read(
                buffer,
                Subresource::Whole,
                ResourceStates::VERTEX_AND_CONSTANT_BUFFER,
            );
        }
        if indexed {
            if let Some(buffer) = self.current_index_buffer {
                self.post_read(buffer, Subresource::Whole, ResourceStates::INDEX_BUFFER);
            }
        }
    }

    pub fn draw(&mut self, vertex_count: u32, start_vertex: u32) {
        self.pre_draw(false);
        self.commands.push(Command::Draw {
            vertex_count,
            start_vertex,
        });
        self.post_draw(false);
    }

    pub fn draw_indexed(&mut self, index_count: u32, start_index: u32, base_vertex: i32) {
        self.pre_draw(true);
        self.commands.push(Command::DrawIndexed {
            index_count,
            start_index,
            base_vertex,
        });
        self.post_draw(true);
    }

    pub fn draw_instanced(
        &mut self,
        vertex_count: u32,
        start_vertex: u32,
        instance_count: u32,
        start_instance: u32,
    ) {
        self.pre_draw(false);
        self.commands.push(Command::DrawInstanced {
            vertex_count,
            start_vertex,
            instance_count,
            start_instance,
        });
        self.post_draw(false);
    }

    pub fn draw_indexed_instanced(
        &mut self,
        index_count: u32,
        start_index: u32,
        base_vertex: i32,
        instance_count: u32,
        start_instance: u32,
    ) {
        self.pre_draw(true);
        self.commands.push(Command::DrawIndexedInstanced {
            index_count,
            start_index,
            base_vertex,
            instance_count,
            start_instance,
        });
        self.post_draw(true);
    }

    pub fn set_primitive_topology(&mut self, topology: PrimitiveTopology) {
        self.commands.push(Command::SetPrimitiveTopology { topology });
    }

    pub fn set_pipeline(&mut self, pipeline: PipelineHandle) {
        self.commands.push(Command::SetPipeline { pipeline });
    }

    pub fn set_stencil_ref(&mut self, reference: u32) {
        self.commands.push(Command::SetStencilRef { reference });
    }

    pub fn set_vertex_buffer(&mut self, buffer: ResourceId, slot: u32, offset: u64) {
        self.current_vertex_buffer = Some(buffer);
        self.commands.push(Command::SetVertexBuffer {
            buffer,
            slot,
            offset,
        });
    }

    pub fn set_index_buffer(&mut self, buffer: ResourceId, format: IndexFormat, offset: u64) {
        self.current_index_buffer = Some(buffer);
        self.commands.push(Command::SetIndexBuffer {
            buffer,
            format,
            offset,
        });
    }

    pub fn set_descriptor_layout(&mut self, layout: DescriptorLayoutHandle) {
        self.commands.push(Command::SetDescriptorLayout { layout });
    }

    pub fn set_descriptor_table(&mut self, index: u32, table: DescriptorTableHandle) {
        self.commands.push(Command::SetDescriptorTable { index, table });
    }

    pub fn copy_resource(&mut self, dst: ResourceId, src: ResourceId) {
        self.pre_write(dst, Subresource::Whole, ResourceStates::COPY_DEST);
        self.pre_read(src, Subresource::Whole, ResourceStates::COPY_SOURCE);
        self.commands.push(Command::CopyResource { dst, src });
        self.post_write(dst, Subresource::Whole, ResourceStates::COPY_DEST);
        self.post_read(src, Subresource::Whole, ResourceStates::COPY_SOURCE);
    }

    pub fn copy_buffer(
        &mut self,
        dst: ResourceId,
        dst_offset: u64,
        src: ResourceId,
        src_offset: u64,
        byte_count: u64,
    ) {
        self.pre_write(dst, Subresource::Whole, ResourceStates::COPY_DEST);
        self.pre_read(src, Subresource::Whole, ResourceStates::COPY_SOURCE);
        self.commands.push(Command::CopyBuffer {
            dst,
            dst_offset,
            src,
            src_offset,
            byte_count,
        });
        self.post_write(dst, Subresource::Whole, ResourceStates::COPY_DEST);
        self.post_read(src, Subresource::Whole, ResourceStates::COPY_SOURCE);
    }

    pub fn copy_texture(
        &mut self,
        dst: ResourceId,
        dst_subresource: u32,
        src: ResourceId,
        src_subresource: u32,
    ) {
        self.pre_write(
            dst,
            Subresource::Index(dst_subresource),
            ResourceStates::COPY_DEST,
        );
        self.pre_read(
            src,
            Subresource::Index(src_subresource),
            ResourceStates::COPY_SOURCE,
        );
        self.commands.push(Command::CopyTexture {
            dst,
            dst_subresource,
            src,
            src_subresource,
        });
        self.post_write(
            dst,
            Subresource::Index(dst_subresource),
            ResourceStates::COPY_DEST,
        );
        self.post_read(
            src,
            Subresource::Index(src_subresource),
            ResourceStates::COPY_SOURCE,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::super::UsageTag;
    use super::*;
    use crate::resource::{BufferDescription, ResourceDescription};

    fn test_table(ids: &[ResourceId]) -> Arc<ResourceStateTable> {
        let table = ResourceStateTable::new();
        for &id in ids {
            table.track(
                id,
                ResourceDescription::Buffer(BufferDescription { size: 1024 }),
                ResourceStates::COMMON,
            );
        }
        Arc::new(table)
    }

    fn usage_commands(commands: &[Command]) -> Vec<(ResourceId, ResourceStates, UsageTag)> {
        commands
            .iter()
            .filter_map(|command| match *command {
                Command::ResourceUsage {
                    resource,
                    states,
                    tag,
                    ..
                } => Some((resource, states, tag)),
                _ => None,
            })
            .collect()
    }

    fn pre_usages_for(commands: &[Command], id: ResourceId) -> usize {
        usage_commands(commands)
            .iter()
            .filter(|(resource, _, tag)| {
                *resource == id && matches!(tag, UsageTag::PreUsage | UsageTag::PreUsageFirst)
            })
            .count()
    }

    #[test]
    fn consecutive_reads_share_one_pre_usage() {
        let vb = ResourceId(1);
        let table = test_table(&[vb]);
        let mut allocator = CommandAllocator::new(64).unwrap();
        let mut encoder = CommandEncoder::new(table, &mut allocator, SafetyChecks::default());

        encoder.set_vertex_buffer(vb, 0, 0);
        encoder.draw(3, 0);
        encoder.draw(3, 3);

        // One read run: a single pre-usage, one post marker per draw.
        assert_eq!(pre_usages_for(encoder.commands(), vb), 1);
        let posts = usage_commands(encoder.commands())
            .iter()
            .filter(|(_, _, tag)| matches!(tag, UsageTag::PostUsageFinal))
            .count();
        assert_eq!(posts, 2);
    }

    #[test]
    fn merged_reads_widen_the_recorded_states() {
        let buffer = ResourceId(1);
        let table = test_table(&[buffer]);
        let mut allocator = CommandAllocator::new(64).unwrap();
        let mut encoder = CommandEncoder::new(table, &mut allocator, SafetyChecks::default());

        // The same buffer read both as vertex input and as index input.
        encoder.set_vertex_buffer(buffer, 0, 0);
        encoder.set_index_buffer(buffer, IndexFormat::Uint16, 0);
        encoder.draw(3, 0);
        encoder.draw_indexed(3, 0, 0);

        assert_eq!(pre_usages_for(encoder.commands(), buffer), 1);
        let (_, states, _) = usage_commands(encoder.commands())
            .into_iter()
            .find(|(_, _, tag)| matches!(tag, UsageTag::PreUsage | UsageTag::PreUsageFirst))
            .unwrap();
        assert_eq!(
            states,
            ResourceStates::VERTEX_AND_CONSTANT_BUFFER | ResourceStates::INDEX_BUFFER
        );
    }

    #[test]
    fn write_interrupts_a_read_run() {
        let vb = ResourceId(1);
        let staging = ResourceId(2);
        let table = test_table(&[vb, staging]);
        let mut allocator = CommandAllocator::new(64).unwrap();
        let mut encoder = CommandEncoder::new(table, &mut allocator, SafetyChecks::default());

        encoder.set_vertex_buffer(vb, 0, 0);
        encoder.draw(3, 0);
        encoder.copy_buffer(vb, 0, staging, 0, 64);
        encoder.draw(3, 0);

        // Read run, write boundary, new read run: three pre-usages.
        assert_eq!(pre_usages_for(encoder.commands(), vb), 3);
    }

    #[test]
    fn indexed_draw_tracks_index_buffer() {
        let vb = ResourceId(1);
        let ib = ResourceId(2);
        let table = test_table(&[vb, ib]);
        let mut allocator = CommandAllocator::new(64).unwrap();
        let mut encoder = CommandEncoder::new(table, &mut allocator, SafetyChecks::default());

        encoder.set_vertex_buffer(vb, 0, 0);
        encoder.set_index_buffer(ib, IndexFormat::Uint32, 0);
        encoder.draw_indexed(6, 0, 0);

        assert_eq!(pre_usages_for(encoder.commands(), ib), 1);
        let (_, states, _) = usage_commands(encoder.commands())
            .into_iter()
            .find(|(resource, _, _)| *resource == ib)
            .unwrap();
        assert_eq!(states, ResourceStates::INDEX_BUFFER);
    }

    #[test]
    fn usage_changes_are_chained_forward() {
        let vb = ResourceId(1);
        let staging = ResourceId(2);
        let table = test_table(&[vb, staging]);
        let mut allocator = CommandAllocator::new(64).unwrap();
        let mut encoder = CommandEncoder::new(table, &mut allocator, SafetyChecks::default());

        encoder.set_vertex_buffer(vb, 0, 0);
        encoder.draw(3, 0);
        encoder.copy_buffer(vb, 0, staging, 0, 64);

        // The draw's post marker must point at the copy's pre-write.
        let commands = encoder.commands();
        let post_index = commands
            .iter()
            .position(|command| {
                matches!(
                    command,
                    Command::ResourceUsage {
                        resource,
                        tag: UsageTag::PostUsageFinal,
                        ..
                    } if *resource == vb
                )
            })
            .unwrap();
        let Command::ResourceUsage { next_usage, .. } = commands[post_index] else {
            unreachable!();
        };
        let next = next_usage.expect("post marker must be linked to the write");
        assert!(matches!(
            commands[next as usize],
            Command::ResourceUsage { resource, states, .. }
                if resource == vb && states == ResourceStates::COPY_DEST
        ));
    }

    #[test]
    fn reset_discards_recording_and_reseeds_pipeline() {
        let vb = ResourceId(1);
        let table = test_table(&[vb]);
        let mut allocator = CommandAllocator::new(64).unwrap();
        let mut encoder = CommandEncoder::new(table, &mut allocator, SafetyChecks::default());

        encoder.set_vertex_buffer(vb, 0, 0);
        encoder.draw(3, 0);
        assert!(!encoder.commands().is_empty());

        encoder.reset(&mut allocator, Some(PipelineHandle(7)));
        assert_eq!(
            encoder.commands(),
            &[Command::SetPipeline {
                pipeline: PipelineHandle(7)
            }]
        );

        // Bindings were dropped with the recording.
        encoder.draw(3, 0);
        assert_eq!(pre_usages_for(encoder.commands(), vb), 0);
    }

    #[test]
    fn untracked_resources_record_no_usage() {
        let table = Arc::new(ResourceStateTable::new());
        let mut allocator = CommandAllocator::new(64).unwrap();
        let mut encoder = CommandEncoder::new(table, &mut allocator, SafetyChecks::default());

        encoder.set_vertex_buffer(ResourceId(9), 0, 0);
        encoder.draw(3, 0);

        assert_eq!(
            encoder
                .commands()
                .iter()
                .filter(|command| !command.is_device_command())
                .count(),
            0
        );
    }
}
