use crate::barrier::ResourceBarrier;
use crate::command::{
    DescriptorLayoutHandle, DescriptorTableHandle, IndexFormat, PipelineHandle, PrimitiveTopology,
};
use crate::resource::ResourceId;

/// Receives replayed commands and barrier batches.
///
/// One entry point per command kind; a backend translates each call into
/// the matching native call. The replay loop guarantees that every barrier
/// batch affecting a command is submitted before that command is
/// dispatched.
pub trait DeviceSink {
    fn submit_barriers(&mut self, barriers: &[ResourceBarrier]);

    fn draw(&mut self, vertex_count: u32, start_vertex: u32);
    fn draw_indexed(&mut self, index_count: u32, start_index: u32, base_vertex: i32);
    fn draw_instanced(
        &mut self,
        vertex_count: u32,
        start_vertex: u32,
        instance_count: u32,
        start_instance: u32,
    );
    fn draw_indexed_instanced(
        &mut self,
        index_count: u32,
        start_index: u32,
        base_vertex: i32,
        instance_count: u32,
        start_instance: u32,
    );

    fn set_primitive_topology(&mut self, topology: PrimitiveTopology);
    fn set_pipeline(&mut self, pipeline: PipelineHandle);
    fn set_stencil_ref(&mut self, reference: u32);
    fn set_vertex_buffer(&mut self, buffer: ResourceId, slot: u32, offset: u64);
    fn set_index_buffer(&mut self, buffer: ResourceId, format: IndexFormat, offset: u64);
    fn set_descriptor_layout(&mut self, layout: DescriptorLayoutHandle);
    fn set_descriptor_table(&mut self, index: u32, table: DescriptorTableHandle);

    fn copy_resource(&mut self, dst: ResourceId, src: ResourceId);
    fn copy_buffer(
        &mut self,
        dst: ResourceId,
        dst_offset: u64,
        src: ResourceId,
        src_offset: u64,
        byte_count: u64,
    );
    fn copy_texture(&mut self, dst: ResourceId, dst_subresource: u32, src: ResourceId, src_subresource: u32);
}
