//! Static transition tables.

use crate::builder::TransitionTableBuilder;
use crate::core::{Event, Guard};
use crate::machine::{MachineDefinition, RejectionReason};

/// One declared `(from, event) -> to` edge.
pub struct TransitionEdge<M: MachineDefinition> {
    pub from: M::State,
    pub event: &'static str,
    pub to: M::State,
    pub guard: Option<Guard<M::Payload, M::Event>>,
}

impl<M: MachineDefinition> TransitionEdge<M> {
    /// Check whether this edge accepts `event` for `payload` (pure).
    pub fn permits(&self, payload: &M::Payload, event: &M::Event) -> bool {
        self.guard.as_ref().is_none_or(|g| g.check(payload, event))
    }
}

/// Mapping from `(state, event name)` to the target state.
///
/// Pairs that are not listed are illegal; there is no fallback edge.
pub struct TransitionTable<M: MachineDefinition> {
    edges: Vec<TransitionEdge<M>>,
}

impl<M: MachineDefinition> TransitionTable<M> {
    pub fn builder() -> TransitionTableBuilder<M> {
        TransitionTableBuilder::new()
    }

    pub(crate) fn from_edges(edges: Vec<TransitionEdge<M>>) -> Self {
        Self { edges }
    }

    /// The edge declared for `(from, event)`, ignoring guards.
    pub fn edge(&self, from: &M::State, event: &str) -> Option<&TransitionEdge<M>> {
        self.edges
            .iter()
            .find(|edge| edge.from == *from && edge.event == event)
    }

    /// Resolve an event against the table.
    pub fn lookup(
        &self,
        from: &M::State,
        payload: &M::Payload,
        event: &M::Event,
    ) -> Result<&TransitionEdge<M>, RejectionReason> {
        let edge = self
            .edge(from, event.name())
            .ok_or(RejectionReason::NoEdge)?;
        if edge.permits(payload, event) {
            Ok(edge)
        } else {
            Err(RejectionReason::GuardBlocked)
        }
    }

    pub fn allows(&self, from: &M::State, payload: &M::Payload, event: &M::Event) -> bool {
        self.lookup(from, payload, event).is_ok()
    }

    /// Names of the events declared from `from`, in declaration order.
    ///
    /// Guards are not evaluated; an event listed here may still be blocked.
    pub fn events_from<'a>(&'a self, from: &'a M::State) -> impl Iterator<Item = &'static str> + 'a {
        self.edges
            .iter()
            .filter(move |edge| edge.from == *from)
            .map(|edge| edge.event)
    }

    pub fn edges(&self) -> &[TransitionEdge<M>] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
