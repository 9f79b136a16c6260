use std::collections::HashMap;
use std::collections::hash_map::Entry;

use smallvec::SmallVec;

use crate::barrier::{BarrierFlags, ResourceBarrier, Transition};
use crate::command::{self, Command, UsageTag};
use crate::device::DeviceSink;
use crate::resource::{ResourceId, Subresource};
use crate::state::ResourceStates;

use super::states::SubresourceStates;
use super::table::ResourceStateTable;
use super::usage::UsageIndices;

/// How the tracking layer reacts to queries it cannot satisfy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SafetyChecks {
    /// Degrade the offending call to a no-op and keep rendering. The worst
    /// outcome is a missed elision, i.e. one extra harmless barrier.
    #[default]
    Lenient,
    /// Panic with a description of the offending call.
    Strict,
}

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("resource {0:?} is not tracked by the state table")]
    ResourceNotTracked(ResourceId),
    #[error("subresource {index} out of range for {resource:?} ({count} subresources)")]
    InvalidSubresource {
        resource: ResourceId,
        index: u32,
        count: u32,
    },
}

fn fault(checks: SafetyChecks, error: TrackingError) {
    match checks {
        SafetyChecks::Lenient => log::trace!("{error}; skipping"),
        SafetyChecks::Strict => panic!("{error}"),
    }
}

/// A subresource first touched by this list before its committed state was
/// known. Resolved against the state table when the list executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialStateChange {
    pub resource: ResourceId,
    pub subresource: Subresource,
    pub state: ResourceStates,
}

/// Per-list hazard tracking and barrier synthesis.
///
/// During recording it maintains usage runs per subresource and emits
/// [`Command::ResourceUsage`] annotations into the command stream. During
/// replay those annotations drive [`Self::transition_resource`] /
/// [`Self::transition_resource_begin`], which elide transitions already
/// implied by the known state and accumulate the rest as pending barriers
/// until [`Self::flush`] hands them to the device.
#[derive(Debug, Default)]
pub struct ResourceStateManager {
    checks: SafetyChecks,
    local: HashMap<ResourceId, SubresourceStates>,
    usage: HashMap<ResourceId, UsageIndices>,
    initial: Vec<InitialStateChange>,
    delta: SmallVec<[ResourceBarrier; 16]>,
}

impl ResourceStateManager {
    pub fn new(checks: SafetyChecks) -> Self {
        Self {
            checks,
            ..Self::default()
        }
    }

    /// Pending explicit barriers accumulated since the last flush.
    #[inline]
    pub fn pending_barriers(&self) -> &[ResourceBarrier] {
        &self.delta
    }

    /// First-touch state changes not yet resolved against the table.
    #[inline]
    pub fn initial_state_changes(&self) -> &[InitialStateChange] {
        &self.initial
    }

    /// Requests `state_after` for a subresource, emitting at most one
    /// pending barrier. Nothing is emitted when the known state already
    /// implies the request or when the subresource was never seen before
    /// (an initial state change is queued instead).
    pub fn transition_resource(
        &mut self,
        resource: ResourceId,
        subresource: Subresource,
        state_after: ResourceStates,
        table: &ResourceStateTable,
    ) {
        self.transition(resource, subresource, state_after, false, table);
    }

    /// Split variant of [`Self::transition_resource`]: emitted barriers are
    /// begin-only and the local state is left untouched until the matching
    /// end barrier closes the transition.
    pub fn transition_resource_begin(
        &mut self,
        resource: ResourceId,
        subresource: Subresource,
        state_after: ResourceStates,
        table: &ResourceStateTable,
    ) {
        self.transition(resource, subresource, state_after, true, table);
    }

    /// Routes a whole barrier record: transitions go through hazard
    /// tracking, everything else is passed through as pending.
    pub fn resource_barrier(&mut self, barrier: ResourceBarrier, table: &ResourceStateTable) {
        match barrier {
            ResourceBarrier::Transition(t) => {
                self.transition(t.resource, t.subresource, t.state_after, false, table)
            }
            other => self.delta.push(other),
        }
    }

    pub fn resource_barrier_begin(&mut self, barrier: ResourceBarrier, table: &ResourceStateTable) {
        match barrier {
            ResourceBarrier::Transition(t) => {
                self.transition(t.resource, t.subresource, t.state_after, true, table)
            }
            other => self.delta.push(other),
        }
    }

    pub fn uav_barrier(&mut self, resource: Option<ResourceId>) {
        self.delta.push(ResourceBarrier::UnorderedAccess { resource });
    }

    pub fn alias_barrier(&mut self, before: Option<ResourceId>, after: Option<ResourceId>) {
        self.delta.push(ResourceBarrier::Aliasing { before, after });
    }

    fn transition(
        &mut self,
        resource: ResourceId,
        subresource: Subresource,
        state_after: ResourceStates,
        split: bool,
        table: &ResourceStateTable,
    ) {
        if let Some(local) = self.local.get_mut(&resource) {
            if let Subresource::Index(index) = subresource {
                let count = local.subresource_count();
                if index >= count {
                    fault(
                        self.checks,
                        TrackingError::InvalidSubresource {
                            resource,
                            index,
                            count,
                        },
                    );
                    return;
                }
            }

            let mut began = false;

            if subresource == Subresource::Whole && !local.is_uniform() {
                // The subresources disagree: transition each one that does
                // not already satisfy the request.
                for index in 0..local.subresource_count() {
                    let sub = Subresource::Index(index);
                    match local.get(sub) {
                        None => self.initial.push(InitialStateChange {
                            resource,
                            subresource: sub,
                            state: state_after,
                        }),
                        Some(current) if !current.implies(state_after) => {
                            let mut flags = BarrierFlags::empty();
                            if split {
                                flags |= BarrierFlags::BEGIN_ONLY;
                                local.set_begin(sub, true);
                                began = true;
                            } else if local.has_begin(sub) {
                                flags |= BarrierFlags::END_ONLY;
                                local.set_begin(sub, false);
                            }
                            self.delta.push(ResourceBarrier::Transition(Transition {
                                resource,
                                subresource: sub,
                                state_before: current,
                                state_after,
                                flags,
                            }));
                        }
                        Some(_) => {}
                    }
                }
            } else {
                match local.get(subresource) {
                    None => self.initial.push(InitialStateChange {
                        resource,
                        subresource,
                        state: state_after,
                    }),
                    Some(current) if !current.implies(state_after) => {
                        let mut flags = BarrierFlags::empty();
                        if split {
                            flags |= BarrierFlags::BEGIN_ONLY;
                            local.set_begin(subresource, true);
                            began = true;
                        } else if local.has_begin(subresource) {
                            flags |= BarrierFlags::END_ONLY;
                            local.set_begin(subresource, false);
                        }
                        self.delta.push(ResourceBarrier::Transition(Transition {
                            resource,
                            subresource,
                            state_before: current,
                            state_after,
                            flags,
                        }));
                    }
                    Some(_) => {}
                }
            }

            // An open begin keeps the old state live until its end barrier.
            if !began {
                local.set(subresource, state_after);
            }
        } else {
            let Some(count) = table.subresource_count(resource) else {
                fault(self.checks, TrackingError::ResourceNotTracked(resource));
                return;
            };
            if let Subresource::Index(index) = subresource {
                if index >= count {
                    fault(
                        self.checks,
                        TrackingError::InvalidSubresource {
                            resource,
                            index,
                            count,
                        },
                    );
                    return;
                }
            }

            self.initial.push(InitialStateChange {
                resource,
                subresource,
                state: state_after,
            });
            let mut local = SubresourceStates::new_unknown(count);
            local.set(subresource, state_after);
            self.local.insert(resource, local);
        }
    }

    /// Submits everything pending as one batch: first-touch states patched
    /// up against the committed table, then the explicit barriers in
    /// recorded order. Each pending entry is submitted exactly once.
    pub fn flush<D: DeviceSink + ?Sized>(&mut self, table: &ResourceStateTable, device: &mut D) {
        if self.initial.is_empty() && self.delta.is_empty() {
            return;
        }

        let mut batch = self.resolve_initial_states(table);
        batch.extend(self.delta.drain(..));

        if !batch.is_empty() {
            log::trace!("flushing {} barriers", batch.len());
            device.submit_barriers(&batch);
        }
    }

    fn resolve_initial_states(
        &mut self,
        table: &ResourceStateTable,
    ) -> SmallVec<[ResourceBarrier; 16]> {
        let mut resolved = SmallVec::new();

        for change in self.initial.drain(..) {
            match change.subresource {
                Subresource::Whole => {
                    let Some(count) = table.subresource_count(change.resource) else {
                        continue;
                    };
                    if let Some(committed) = table.committed(change.resource, Subresource::Whole) {
                        if !committed.implies(change.state) {
                            resolved.push(ResourceBarrier::transition(
                                change.resource,
                                Subresource::Whole,
                                committed,
                                change.state,
                            ));
                        }
                    } else {
                        // Committed subresources disagree; patch each one up
                        // individually.
                        for index in 0..count {
                            let sub = Subresource::Index(index);
                            if let Some(committed) = table.committed(change.resource, sub) {
                                if !committed.implies(change.state) {
                                    resolved.push(ResourceBarrier::transition(
                                        change.resource,
                                        sub,
                                        committed,
                                        change.state,
                                    ));
                                }
                            }
                        }
                    }
                }
                sub @ Subresource::Index(_) => {
                    if let Some(committed) = table.committed(change.resource, sub) {
                        if !committed.implies(change.state) {
                            resolved.push(ResourceBarrier::transition(
                                change.resource,
                                sub,
                                committed,
                                change.state,
                            ));
                        }
                    }
                }
            }
        }

        resolved
    }

    /// Merges the list's final states into the committed table and clears
    /// them. Meaningful at most once per recorded list.
    pub fn commit_final_state(&mut self, table: &ResourceStateTable) {
        table.commit(&self.local);
        self.local.clear();
    }

    /// Drops every piece of per-list state. The committed table is left
    /// untouched.
    pub fn reset(&mut self) {
        self.local.clear();
        self.usage.clear();
        self.initial.clear();
        self.delta.clear();
    }

    fn usage_entry(
        &mut self,
        resource: ResourceId,
        table: &ResourceStateTable,
    ) -> Option<&mut UsageIndices> {
        match self.usage.entry(resource) {
            Entry::Occupied(entry) => Some(entry.into_mut()),
            Entry::Vacant(entry) => {
                let Some(count) = table.subresource_count(resource) else {
                    fault(self.checks, TrackingError::ResourceNotTracked(resource));
                    return None;
                };
                Some(entry.insert(UsageIndices::new(count)))
            }
        }
    }

    /// Read hook invoked before the dependent command is recorded.
    ///
    /// The first read after a write opens a read run: a pre-usage
    /// annotation is recorded and the previous usage (if any) is linked
    /// forward to it. Further reads of the same run merge their bits into
    /// that annotation instead of recording a new one.
    pub fn track_pre_read(
        &mut self,
        commands: &mut Vec<Command>,
        table: &ResourceStateTable,
        resource: ResourceId,
        subresource: Subresource,
        states: ResourceStates,
    ) {
        debug_assert!(states.is_read_only());

        let checks = self.checks;
        let index = commands.len() as u32;
        let Some(usage) = self.usage_entry(resource, table) else {
            return;
        };
        let count = usage.subresource_count();
        let Some(slot) = usage.slot_mut(subresource) else {
            if let Subresource::Index(sub) = subresource {
                fault(
                    checks,
                    TrackingError::InvalidSubresource {
                        resource,
                        index: sub,
                        count,
                    },
                );
            }
            return;
        };

        match slot.first_read {
            None => {
                let previous = slot.last_usage;
                slot.first_read = Some(index);

                commands.push(Command::ResourceUsage {
                    resource,
                    subresource,
                    states,
                    tag: if previous.is_none() {
                        UsageTag::PreUsageFirst
                    } else {
                        UsageTag::PreUsage
                    },
                    next_usage: None,
                });
                if let Some(previous) = previous {
                    command::link_next_usage(commands, previous, index);
                }
            }
            Some(first) => {
                // Same uninterrupted read run: widen the recorded request.
                if let Some(Command::ResourceUsage { states: recorded, .. }) =
                    commands.get_mut(first as usize)
                {
                    if (*recorded | states).is_read_only() {
                        *recorded |= states;
                    }
                }
            }
        }
    }

    /// Read hook invoked after the dependent command is recorded. Marks the
    /// (current) end of the read run; only the last such marker of a run is
    /// ever linked to a following usage change.
    pub fn track_post_read(
        &mut self,
        commands: &mut Vec<Command>,
        table: &ResourceStateTable,
        resource: ResourceId,
        subresource: Subresource,
        states: ResourceStates,
    ) {
        let checks = self.checks;
        let index = commands.len() as u32;
        let Some(usage) = self.usage_entry(resource, table) else {
            return;
        };
        let count = usage.subresource_count();
        let Some(slot) = usage.slot_mut(subresource) else {
            if let Subresource::Index(sub) = subresource {
                fault(
                    checks,
                    TrackingError::InvalidSubresource {
                        resource,
                        index: sub,
                        count,
                    },
                );
            }
            return;
        };

        commands.push(Command::ResourceUsage {
            resource,
            subresource,
            states,
            tag: UsageTag::PostUsageFinal,
            next_usage: None,
        });
        slot.last_read = Some(index);
        slot.last_usage = Some(index);
    }

    /// Write hook invoked before the dependent command is recorded. A write
    /// always ends any read run and is never merged with other accesses.
    pub fn track_pre_write(
        &mut self,
        commands: &mut Vec<Command>,
        table: &ResourceStateTable,
        resource: ResourceId,
        subresource: Subresource,
        states: ResourceStates,
    ) {
        debug_assert!(states.is_write());

        let checks = self.checks;
        let index = commands.len() as u32;
        let Some(usage) = self.usage_entry(resource, table) else {
            return;
        };
        let count = usage.subresource_count();
        let Some(slot) = usage.slot_mut(subresource) else {
            if let Subresource::Index(sub) = subresource {
                fault(
                    checks,
                    TrackingError::InvalidSubresource {
                        resource,
                        index: sub,
                        count,
                    },
                );
            }
            return;
        };

        let previous = slot.last_usage;
        slot.first_read = None;
        slot.last_read = None;

        commands.push(Command::ResourceUsage {
            resource,
            subresource,
            states,
            tag: if previous.is_none() {
                UsageTag::PreUsageFirst
            } else {
                UsageTag::PreUsage
            },
            next_usage: None,
        });
        if let Some(previous) = previous {
            command::link_next_usage(commands, previous, index);
        }
    }

    /// Write hook invoked after the dependent command is recorded.
    pub fn track_post_write(
        &mut self,
        commands: &mut Vec<Command>,
        table: &ResourceStateTable,
        resource: ResourceId,
        subresource: Subresource,
        states: ResourceStates,
    ) {
        let checks = self.checks;
        let index = commands.len() as u32;
        let Some(usage) = self.usage_entry(resource, table) else {
            return;
        };
        let count = usage.subresource_count();
        let Some(slot) = usage.slot_mut(subresource) else {
            if let Subresource::Index(sub) = subresource {
                fault(
                    checks,
                    TrackingError::InvalidSubresource {
                        resource,
                        index: sub,
                        count,
                    },
                );
            }
            return;
        };

        slot.first_read = None;
        slot.last_read = None;

        commands.push(Command::ResourceUsage {
            resource,
            subresource,
            states,
            tag: UsageTag::PostUsageFinal,
            next_usage: None,
        });
        slot.last_usage = Some(index);
    }

    #[cfg(test)]
    fn local_state(&self, resource: ResourceId) -> Option<&SubresourceStates> {
        self.local.get(&resource)
    }
}
