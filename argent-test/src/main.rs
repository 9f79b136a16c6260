use std::sync::Arc;

use anyhow::Result;

use argent_rhi::command::{CommandAllocator, CommandEncoder, CommandQueue, IndexFormat};
use argent_rhi::track::{ResourceStateTable, SafetyChecks};
use argent_rhi::{
    BufferDescription, DescriptorLayoutHandle, DescriptorTableHandle, DeviceSink, PipelineHandle,
    PrimitiveTopology, ResourceBarrier, ResourceDescription, ResourceId, ResourceStates,
    TextureDescription,
};

/// A device sink that logs every call it receives instead of talking to a
/// GPU. Useful for inspecting what the hazard tracker actually submits.
#[derive(Default)]
struct LoggingDevice {
    barriers: usize,
    commands: usize,
}

impl DeviceSink for LoggingDevice {
    fn submit_barriers(&mut self, barriers: &[ResourceBarrier]) {
        self.barriers += barriers.len();
        for barrier in barriers {
            log::info!("barrier {barrier:?}");
        }
    }

    fn draw(&mut self, vertex_count: u32, start_vertex: u32) {
        self.commands += 1;
        log::info!("draw {vertex_count} vertices from {start_vertex}");
    }

    fn draw_indexed(&mut self, index_count: u32, start_index: u32, base_vertex: i32) {
        self.commands += 1;
        log::info!("draw {index_count} indices from {start_index} (base {base_vertex})");
    }

    fn draw_instanced(
        &mut self,
        vertex_count: u32,
        start_vertex: u32,
        instance_count: u32,
        start_instance: u32,
    ) {
        self.commands += 1;
        log::info!(
            "draw {vertex_count} vertices from {start_vertex}, {instance_count} instances from {start_instance}"
        );
    }

    fn draw_indexed_instanced(
        &mut self,
        index_count: u32,
        start_index: u32,
        base_vertex: i32,
        instance_count: u32,
        start_instance: u32,
    ) {
        self.commands += 1;
        log::info!(
            "draw {index_count} indices from {start_index} (base {base_vertex}), {instance_count} instances from {start_instance}"
        );
    }

    fn set_primitive_topology(&mut self, topology: PrimitiveTopology) {
        self.commands += 1;
        log::info!("topology {topology:?}");
    }

    fn set_pipeline(&mut self, pipeline: PipelineHandle) {
        self.commands += 1;
        log::info!("pipeline {pipeline:?}");
    }

    fn set_stencil_ref(&mut self, reference: u32) {
        self.commands += 1;
        log::info!("stencil ref {reference}");
    }

    fn set_vertex_buffer(&mut self, buffer: ResourceId, slot: u32, offset: u64) {
        self.commands += 1;
        log::info!("vertex buffer {buffer:?} in slot {slot} at {offset}");
    }

    fn set_index_buffer(&mut self, buffer: ResourceId, format: IndexFormat, offset: u64) {
        self.commands += 1;
        log::info!("index buffer {buffer:?} ({format:?}) at {offset}");
    }

    fn set_descriptor_layout(&mut self, layout: DescriptorLayoutHandle) {
        self.commands += 1;
        log::info!("descriptor layout {layout:?}");
    }

    fn set_descriptor_table(&mut self, index: u32, table: DescriptorTableHandle) {
        self.commands += 1;
        log::info!("descriptor table {table:?} at {index}");
    }

    fn copy_resource(&mut self, dst: ResourceId, src: ResourceId) {
        self.commands += 1;
        log::info!("copy {src:?} -> {dst:?}");
    }

    fn copy_buffer(
        &mut self,
        dst: ResourceId,
        dst_offset: u64,
        src: ResourceId,
        src_offset: u64,
        byte_count: u64,
    ) {
        self.commands += 1;
        log::info!("copy {byte_count} bytes {src:?}+{src_offset} -> {dst:?}+{dst_offset}");
    }

    fn copy_texture(&mut self, dst: ResourceId, dst_subresource: u32, src: ResourceId, src_subresource: u32) {
        self.commands += 1;
        log::info!("copy {src:?}[{src_subresource}] -> {dst:?}[{dst_subresource}]");
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let table = Arc::new(ResourceStateTable::new());

    let staging = ResourceId(1);
    let vertex_buffer = ResourceId(2);
    let index_buffer = ResourceId(3);
    let material = ResourceId(4);

    table.track(
        staging,
        ResourceDescription::Buffer(BufferDescription { size: 64 << 10 }),
        ResourceStates::GENERIC_READ,
    );
    table.track(
        vertex_buffer,
        ResourceDescription::Buffer(BufferDescription { size: 16 << 10 }),
        ResourceStates::COMMON,
    );
    table.track(
        index_buffer,
        ResourceDescription::Buffer(BufferDescription { size: 4 << 10 }),
        ResourceStates::COMMON,
    );
    table.track(
        material,
        ResourceDescription::Texture(TextureDescription {
            width: 512,
            height: 512,
            mip_levels: 4,
            array_layers: 1,
        }),
        ResourceStates::PIXEL_SHADER_RESOURCE,
    );

    let upload = ResourceId(5);
    table.track(
        upload,
        ResourceDescription::Texture(TextureDescription {
            width: 512,
            height: 512,
            mip_levels: 4,
            array_layers: 1,
        }),
        ResourceStates::COPY_SOURCE,
    );

    let mut allocator = CommandAllocator::new(4096)?;
    let mut encoder =
        CommandEncoder::new(Arc::clone(&table), &mut allocator, SafetyChecks::default());

    // Upload geometry and the top texture mip, then render with them.
    encoder.copy_buffer(vertex_buffer, 0, staging, 0, 16 << 10);
    encoder.copy_buffer(index_buffer, 0, staging, 16 << 10, 4 << 10);
    encoder.copy_texture(material, 0, upload, 0);
    encoder.set_pipeline(PipelineHandle(1));
    encoder.set_primitive_topology(PrimitiveTopology::TriangleList);
    encoder.set_descriptor_layout(DescriptorLayoutHandle(1));
    encoder.set_descriptor_table(0, DescriptorTableHandle(1));
    encoder.set_vertex_buffer(vertex_buffer, 0, 0);
    encoder.set_index_buffer(index_buffer, IndexFormat::Uint16, 0);
    encoder.draw_indexed(1024, 0, 0);
    encoder.draw_indexed_instanced(1024, 0, 0, 8, 0);
    encoder.finish();

    let queue = CommandQueue::new(Arc::clone(&table));
    let mut device = LoggingDevice::default();
    queue.execute(&mut encoder, &mut device);

    println!(
        "replayed {} device commands with {} synthesized barriers",
        device.commands, device.barriers
    );

    Ok(())
}
