use std::sync::Arc;

use crate::device::DeviceSink;
use crate::track::ResourceStateTable;

use super::encoder::CommandEncoder;
use super::{Command, UsageTag};

/// Replays recorded command lists against a device.
///
/// Usage annotations stage barriers into the list's state manager; pending
/// barriers are flushed exactly once immediately before the next device
/// command. After replay the list's final states are committed to the
/// shared table.
pub struct CommandQueue {
    table: Arc<ResourceStateTable>,
}

impl CommandQueue {
    pub fn new(table: Arc<ResourceStateTable>) -> Self {
        Self { table }
    }

    pub fn execute<D: DeviceSink>(&self, list: &mut CommandEncoder, device: &mut D) {
        let (commands, state) = list.replay_parts();
        let table = &*self.table;

        for index in 0..commands.len() {
            match commands[index] {
                Command::ResourceUsage {
                    resource,
                    subresource,
                    states,
                    tag,
                    next_usage,
                } => match tag {
                    UsageTag::PreUsage | UsageTag::PreUsageFirst => {
                        state.transition_resource(resource, subresource, states, table);
                    }
                    UsageTag::PostUsageFinal => {
                        // A linked post marker means the next state of this
                        // subresource is already known; open the transition
                        // here so the GPU can overlap it.
                        if let Some(next) = next_usage {
                            if let Some(Command::ResourceUsage {
                                resource,
                                subresource,
                                states,
                                ..
                            }) = commands.get(next as usize).copied()
                            {
                                state.transition_resource_begin(
                                    resource,
                                    subresource,
                                    states,
                                    table,
                                );
                            }
                        }
                    }
                },
                command => {
                    state.flush(table, device);
                    dispatch(command, device);
                }
            }
        }

        state.flush(table, device);
        state.commit_final_state(table);
    }

    pub fn execute_all<'a, D: DeviceSink>(
        &self,
        lists: impl IntoIterator<Item = &'a mut CommandEncoder>,
        device: &mut D,
    ) {
        for list in lists {
            self.execute(list, device);
        }
    }
}

fn dispatch<D: DeviceSink>(command: Command, device: &mut D) {
    match command {
        Command::Draw {
            vertex_count,
            start_vertex,
        } => device.draw(vertex_count, start_vertex),
        Command::DrawIndexed {
            index_count,
            start_index,
            base_vertex,
        } => device.draw_indexed(index_count, start_index, base_vertex),
        Command::DrawInstanced {
            vertex_count,
            start_vertex,
            instance_count,
            start_instance,
        } => device.draw_instanced(vertex_count, start_vertex, instance_count, start_instance),
        Command::DrawIndexedInstanced {
            index_count,
            start_index,
            base_vertex,
            instance_count,
            start_instance,
        } => device.draw_indexed_instanced(
            index_count,
            start_index,
            base_vertex,
            instance_count,
            start_instance,
        ),
        Command::SetPrimitiveTopology { topology } => device.set_primitive_topology(topology),
        Command::SetPipeline { pipeline } => device.set_pipeline(pipeline),
        Command::SetStencilRef { reference } => device.set_stencil_ref(reference),
        Command::SetVertexBuffer {
            buffer,
            slot,
            offset,
        } => device.set_vertex_buffer(buffer, slot, offset),
        Command::SetIndexBuffer {
            buffer,
            format,
            offset,
        } => device.set_index_buffer(buffer, format, offset),
        Command::SetDescriptorLayout { layout } => device.set_descriptor_layout(layout),
        Command::SetDescriptorTable { index, table } => device.set_descriptor_table(index, table),
        Command::CopyResource { dst, src } => device.copy_resource(dst, src),
        Command::CopyBuffer {
            dst,
            dst_offset,
            src,
            src_offset,
            byte_count,
        } => device.copy_buffer(dst, dst_offset, src, src_offset, byte_count),
        Command::CopyTexture {
            dst,
            dst_subresource,
            src,
            src_subresource,
        } => device.copy_texture(dst, dst_subresource, src, src_subresource),
        Command::ResourceUsage { .. } => {}
    }
}
