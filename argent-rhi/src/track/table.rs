use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::resource::{ResourceDescription, ResourceId, Subresource};
use crate::state::ResourceStates;

use super::states::SubresourceStates;

#[derive(Debug, Clone)]
struct TrackedResource {
    description: ResourceDescription,
    states: SubresourceStates,
}

/// The committed states of every live resource of one device.
///
/// Command lists seed their local tracking from this table under the read
/// lock and merge their final states back under the write lock. One table
/// exists per device/session and is shared between recording threads.
#[derive(Debug, Default)]
pub struct ResourceStateTable {
    entries: RwLock<HashMap<ResourceId, TrackedResource>>,
}

static_assertions::assert_impl_all!(ResourceStateTable: Send, Sync);

impl ResourceStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource, or re-registers it with a new shape and state.
    /// Resources must be tracked before any list can transition them.
    pub fn track(
        &self,
        resource: ResourceId,
        description: ResourceDescription,
        initial_state: ResourceStates,
    ) {
        log::debug!(
            "tracking {resource:?} ({} subresources) at {initial_state:?}",
            description.subresource_count()
        );

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            resource,
            TrackedResource {
                description,
                states: SubresourceStates::new_uniform(
                    description.subresource_count(),
                    initial_state,
                ),
            },
        );
    }

    /// Forgets a resource on destruction. Lists still holding its id will
    /// treat further interactions with it as no-ops.
    pub fn release(&self, resource: ResourceId) {
        log::debug!("releasing {resource:?}");

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(&resource);
    }

    pub fn description(&self, resource: ResourceId) -> Option<ResourceDescription> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&resource).map(|entry| entry.description)
    }

    pub fn subresource_count(&self, resource: ResourceId) -> Option<u32> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&resource)
            .map(|entry| entry.states.subresource_count())
    }

    /// The last committed state of `subresource`, or `None` when the
    /// resource is untracked or its committed subresources disagree and the
    /// whole resource was queried.
    pub fn committed(&self, resource: ResourceId, subresource: Subresource) -> Option<ResourceStates> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&resource)
            .and_then(|entry| entry.states.get(subresource))
    }

    /// Merges a finished list's local states into the committed states.
    ///
    /// Only subresources the list actually observed are overwritten; the
    /// rest keep their previous committed state. Called at most once per
    /// list; concurrent commits against overlapping resources serialize on
    /// the write lock with last-committer-wins semantics.
    pub fn commit(&self, local: &HashMap<ResourceId, SubresourceStates>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for (resource, states) in local {
            let Some(entry) = entries.get_mut(resource) else {
                // Released while the list was recording.
                log::trace!("skipping commit of released {resource:?}");
                continue;
            };

            let count = entry
                .states
                .subresource_count()
                .min(states.subresource_count());
            for index in 0..count {
                let subresource = Subresource::Index(index);
                if let Some(state) = states.get(subresource) {
                    entry.states.set(subresource, state);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::BufferDescription;

    fn buffer(size: u64) -> ResourceDescription {
        ResourceDescription::Buffer(BufferDescription { size })
    }

    fn texture(mips: u32, layers: u32) -> ResourceDescription {
        ResourceDescription::Texture(crate::resource::TextureDescription {
            width: 64,
            height: 64,
            mip_levels: mips,
            array_layers: layers,
        })
    }

    #[test]
    fn track_query_release() {
        let table = ResourceStateTable::new();
        let id = ResourceId(1);

        assert_eq!(table.committed(id, Subresource::Whole), None);

        table.track(id, buffer(256), ResourceStates::COMMON);
        assert_eq!(table.subresource_count(id), Some(1));
        assert_eq!(
            table.committed(id, Subresource::Whole),
            Some(ResourceStates::COMMON)
        );

        table.release(id);
        assert_eq!(table.committed(id, Subresource::Whole), None);
    }

    #[test]
    fn commit_merges_per_subresource() {
        let table = ResourceStateTable::new();
        let id = ResourceId(7);
        table.track(id, texture(4, 1), ResourceStates::PIXEL_SHADER_RESOURCE);

        // The list only observed subresource 0.
        let mut states = SubresourceStates::new_unknown(4);
        states.set(Subresource::Index(0), ResourceStates::COPY_SOURCE);
        let mut local = HashMap::new();
        local.insert(id, states);

        table.commit(&local);

        assert_eq!(
            table.committed(id, Subresource::Index(0)),
            Some(ResourceStates::COPY_SOURCE)
        );
        for index in 1..4 {
            assert_eq!(
                table.committed(id, Subresource::Index(index)),
                Some(ResourceStates::PIXEL_SHADER_RESOURCE)
            );
        }
        assert_eq!(table.committed(id, Subresource::Whole), None);
    }

    #[test]
    fn concurrent_disjoint_commits() {
        let table = ResourceStateTable::new();
        let left = ResourceId(1);
        let right = ResourceId(2);
        table.track(left, buffer(64), ResourceStates::COMMON);
        table.track(right, buffer(64), ResourceStates::COMMON);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                let mut states = SubresourceStates::new_unknown(1);
                states.set(Subresource::Index(0), ResourceStates::COPY_DEST);
                let mut local = HashMap::new();
                local.insert(left, states);
                table.commit(&local);
            });
            scope.spawn(|| {
                let mut states = SubresourceStates::new_unknown(1);
                states.set(Subresource::Index(0), ResourceStates::INDEX_BUFFER);
                let mut local = HashMap::new();
                local.insert(right, states);
                table.commit(&local);
            });
        });

        assert_eq!(
            table.committed(left, Subresource::Whole),
            Some(ResourceStates::COPY_DEST)
        );
        assert_eq!(
            table.committed(right, Subresource::Whole),
            Some(ResourceStates::INDEX_BUFFER)
        );
    }
}
