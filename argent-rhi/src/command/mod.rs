pub mod allocator;
pub mod encoder;
pub mod queue;

pub use allocator::{CommandAllocError, CommandAllocator};
pub use encoder::CommandEncoder;
pub use queue::CommandQueue;

use crate::resource::{ResourceId, Subresource};
use crate::state::ResourceStates;

/// Opaque handle to a compiled pipeline state object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineHandle(pub u64);

/// Opaque handle to a descriptor layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorLayoutHandle(pub u64);

/// Opaque handle to a bound descriptor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorTableHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
}

/// Why a [`Command::ResourceUsage`] annotation was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageTag {
    /// First touch of the resource in this list.
    PreUsageFirst,
    /// The resource's required state changes ahead of a dependent command.
    PreUsage,
    /// The last recorded command of a usage run lies behind this point.
    PostUsageFinal,
}

/// One recorded operation. Variants carry only the fields their kind needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Draw {
        vertex_count: u32,
        start_vertex: u32,
    },
    DrawIndexed {
        index_count: u32,
        start_index: u32,
        base_vertex: i32,
    },
    DrawInstanced {
        vertex_count: u32,
        start_vertex: u32,
        instance_count: u32,
        start_instance: u32,
    },
    DrawIndexedInstanced {
        index_count: u32,
        start_index: u32,
        base_vertex: i32,
        instance_count: u32,
        start_instance: u32,
    },
    SetPrimitiveTopology {
        topology: PrimitiveTopology,
    },
    SetPipeline {
        pipeline: PipelineHandle,
    },
    SetStencilRef {
        reference: u32,
    },
    SetVertexBuffer {
        buffer: ResourceId,
        slot: u32,
        offset: u64,
    },
    SetIndexBuffer {
        buffer: ResourceId,
        format: IndexFormat,
        offset: u64,
    },
    SetDescriptorLayout {
        layout: DescriptorLayoutHandle,
    },
    SetDescriptorTable {
        index: u32,
        table: DescriptorTableHandle,
    },
    CopyResource {
        dst: ResourceId,
        src: ResourceId,
    },
    CopyBuffer {
        dst: ResourceId,
        dst_offset: u64,
        src: ResourceId,
        src_offset: u64,
        byte_count: u64,
    },
    CopyTexture {
        dst: ResourceId,
        dst_subresource: u32,
        src: ResourceId,
        src_subresource: u32,
    },
    /// Usage annotation consumed by the replay loop to stage barriers;
    /// never dispatched to the device.
    ResourceUsage {
        resource: ResourceId,
        subresource: Subresource,
        states: ResourceStates,
        tag: UsageTag,
        /// Index of the usage command that next changes this
        /// (resource, subresource)'s state, patched in during recording.
        next_usage: Option<u32>,
    },
}

impl Command {
    /// True for commands the device executes, as opposed to annotations.
    #[inline]
    pub fn is_device_command(&self) -> bool {
        !matches!(self, Command::ResourceUsage { .. })
    }
}

/// Points an already-recorded usage command at the usage that supersedes it.
pub(crate) fn link_next_usage(commands: &mut [Command], prev: u32, next: u32) {
    if let Some(Command::ResourceUsage { next_usage, .. }) = commands.get_mut(prev as usize) {
        *next_usage = Some(next);
    }
}

// Recorded streams are long and dense; the largest variant caps them all.
static_assertions::const_assert!(std::mem::size_of::<Command>() <= 48);
static_assertions::assert_impl_all!(Command: Send, Sync, Copy);
