use crate::resource::Subresource;
use crate::state::ResourceStates;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct SubresourceSlot {
    /// `None` until a state for this subresource becomes known.
    state: Option<ResourceStates>,
    /// An opened split barrier has not been closed yet.
    has_begin: bool,
}

/// Known states of one resource: either one state covering the whole
/// resource, or one state per subresource once they diverge.
///
/// The two representations are mutually exclusive. Setting a single
/// subresource on a uniform resource fans the uniform state out; once every
/// subresource agrees again the representation collapses back to uniform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubresourceStates {
    uniform: bool,
    state: Option<ResourceStates>,
    has_begin: bool,
    subresources: Vec<SubresourceSlot>,
}

impl SubresourceStates {
    /// A resource whose state is known and identical for every subresource.
    pub fn new_uniform(subresource_count: u32, state: ResourceStates) -> Self {
        Self {
            uniform: true,
            state: Some(state),
            has_begin: false,
            subresources: vec![SubresourceSlot::default(); subresource_count as usize],
        }
    }

    /// A resource this list has not observed yet.
    pub fn new_unknown(subresource_count: u32) -> Self {
        Self {
            uniform: true,
            state: None,
            has_begin: false,
            subresources: vec![SubresourceSlot::default(); subresource_count as usize],
        }
    }

    #[inline]
    pub fn subresource_count(&self) -> u32 {
        self.subresources.len() as u32
    }

    #[inline]
    pub fn is_uniform(&self) -> bool {
        self.uniform
    }

    /// The known state of `subresource`, or `None` when it is unknown.
    ///
    /// Querying [`Subresource::Whole`] while the subresources disagree also
    /// yields `None`; there is no single answer in that representation.
    pub fn get(&self, subresource: Subresource) -> Option<ResourceStates> {
        match subresource {
            Subresource::Whole => {
                if self.uniform {
                    self.state
                } else {
                    None
                }
            }
            Subresource::Index(index) => {
                if self.uniform {
                    self.state
                } else {
                    self.subresources.get(index as usize).and_then(|slot| slot.state)
                }
            }
        }
    }

    /// Records a new state, fanning out of or collapsing back into the
    /// uniform representation as needed. Out-of-range indices are ignored.
    pub fn set(&mut self, subresource: Subresource, state: ResourceStates) {
        match subresource {
            Subresource::Whole => {
                self.uniform = true;
                self.state = Some(state);
            }
            Subresource::Index(index) => {
                let index = index as usize;
                if index >= self.subresources.len() {
                    return;
                }

                if self.uniform {
                    if self.state == Some(state) {
                        return;
                    }
                    let previous = self.state;
                    let previous_begin = self.has_begin;
                    for slot in &mut self.subresources {
                        slot.state = previous;
                        slot.has_begin = previous_begin;
                    }
                    self.uniform = false;
                }

                self.subresources[index].state = Some(state);

                if self.subresources.iter().all(|slot| slot.state == Some(state)) {
                    self.uniform = true;
                    self.state = Some(state);
                    self.has_begin = self.subresources.iter().any(|slot| slot.has_begin);
                }
            }
        }
    }

    pub fn has_begin(&self, subresource: Subresource) -> bool {
        match subresource {
            Subresource::Whole => self.has_begin,
            Subresource::Index(index) => self
                .subresources
                .get(index as usize)
                .is_some_and(|slot| slot.has_begin),
        }
    }

    pub fn set_begin(&mut self, subresource: Subresource, value: bool) {
        match subresource {
            Subresource::Whole => self.has_begin = value,
            Subresource::Index(index) => {
                if let Some(slot) = self.subresources.get_mut(index as usize) {
                    slot.has_begin = value;
                }
            }
        }
    }
}
