use crate::resource::{ResourceId, Subresource};
use crate::state::ResourceStates;

bitflags::bitflags! {
    /// Split-barrier phase markers.
    ///
    /// A begin-only barrier starts a transition the GPU may overlap with
    /// unrelated work; the matching end-only barrier must be submitted
    /// before the next command that depends on the new state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BarrierFlags: u8 {
        const BEGIN_ONLY = 1 << 0;
        const END_ONLY = 1 << 1;
    }
}

/// A state change of one subresource (or a whole resource) between two
/// accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub resource: ResourceId,
    pub subresource: Subresource,
    pub state_before: ResourceStates,
    pub state_after: ResourceStates,
    pub flags: BarrierFlags,
}

/// A synchronization instruction submitted to the device ahead of dependent
/// commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceBarrier {
    Transition(Transition),
    /// Orders successive unordered-access operations on the same resource.
    UnorderedAccess { resource: Option<ResourceId> },
    /// Makes `after` the active resource in memory it aliases with `before`.
    Aliasing {
        before: Option<ResourceId>,
        after: Option<ResourceId>,
    },
}

impl ResourceBarrier {
    /// Shorthand for a full (non-split) transition.
    pub fn transition(
        resource: ResourceId,
        subresource: Subresource,
        state_before: ResourceStates,
        state_after: ResourceStates,
    ) -> Self {
        Self::Transition(Transition {
            resource,
            subresource,
            state_before,
            state_after,
            flags: BarrierFlags::empty(),
        })
    }
}
