//! Builder for transition tables.

use crate::builder::error::BuildError;
use crate::core::{Guard, State};
use crate::machine::{MachineDefinition, TransitionEdge, TransitionTable};

/// Fluent builder for a machine kind's transition table.
///
/// Each `(from, event)` pair may be declared once; anything not declared is
/// an illegal transition.
pub struct TransitionTableBuilder<M: MachineDefinition> {
    edges: Vec<TransitionEdge<M>>,
}

impl<M: MachineDefinition> TransitionTableBuilder<M> {
    pub fn new() -> Self {
        Self { edges: Vec::new() }
    }

    /// Declare an unconditional edge.
    pub fn edge(mut self, from: M::State, event: &'static str, to: M::State) -> Self {
        self.edges.push(TransitionEdge {
            from,
            event,
            to,
            guard: None,
        });
        self
    }

    /// Declare the same edge from several source states.
    pub fn edges_from<I>(mut self, from: I, event: &'static str, to: M::State) -> Self
    where
        I: IntoIterator<Item = M::State>,
    {
        for state in from {
            self = self.edge(state, event, to.clone());
        }
        self
    }

    /// Declare an edge that is only taken when `predicate` holds.
    pub fn guarded<F>(mut self, from: M::State, event: &'static str, to: M::State, predicate: F) -> Self
    where
        F: Fn(&M::Payload, &M::Event) -> bool + Send + Sync + 'static,
    {
        self.edges.push(TransitionEdge {
            from,
            event,
            to,
            guard: Some(Guard::new(predicate)),
        });
        self
    }

    /// Build the table, rejecting empty tables and ambiguous edges.
    pub fn build(self) -> Result<TransitionTable<M>, BuildError> {
        if self.edges.is_empty() {
            return Err(BuildError::EmptyTable);
        }

        for (index, edge) in self.edges.iter().enumerate() {
            let duplicate = self.edges[..index]
                .iter()
                .any(|earlier| earlier.from == edge.from && earlier.event == edge.event);
            if duplicate {
                return Err(BuildError::DuplicateEdge {
                    from: edge.from.name().to_string(),
                    event: edge.event,
                });
            }
        }

        Ok(TransitionTable::from_edges(self.edges))
    }
}

impl<M: MachineDefinition> Default for TransitionTableBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Event;
    use crate::state_enum;

    state_enum! {
        enum Door {
            Closed => "closed",
            Open => "open",
            Locked => "locked",
        }
    }

    #[derive(Debug)]
    enum DoorEvent {
        Open,
        Close,
        Lock,
    }

    impl Event for DoorEvent {
        fn name(&self) -> &'static str {
            match self {
                Self::Open => "open",
                Self::Close => "close",
                Self::Lock => "lock",
            }
        }
    }

    struct DoorMachine;

    impl MachineDefinition for DoorMachine {
        const KIND: &'static str = "door";
        type State = Door;
        type Event = DoorEvent;
        type Payload = u32;

        fn initial_state() -> Door {
            Door::Closed
        }

        fn initial_payload() -> u32 {
            0
        }

        fn table() -> Result<TransitionTable<Self>, BuildError> {
            TransitionTableBuilder::new()
                .edge(Door::Closed, "open", Door::Open)
                .edge(Door::Open, "close", Door::Closed)
                .guarded(Door::Closed, "lock", Door::Locked, |opens: &u32, _| *opens > 0)
                .build()
        }

        fn apply(opens: &mut u32, _from: &Door, to: &Door, _event: DoorEvent) {
            if *to == Door::Open {
                *opens += 1;
            }
        }

        fn step(_state: &Door, opens: &u32) -> u32 {
            *opens
        }
    }

    #[test]
    fn builder_requires_edges() {
        let result = TransitionTableBuilder::<DoorMachine>::new().build();
        assert!(matches!(result, Err(BuildError::EmptyTable)));
    }

    #[test]
    fn builder_rejects_duplicate_pairs() {
        let result = TransitionTableBuilder::<DoorMachine>::new()
            .edge(Door::Closed, "open", Door::Open)
            .edge(Door::Closed, "open", Door::Locked)
            .build();

        assert_eq!(
            result.err(),
            Some(BuildError::DuplicateEdge {
                from: "closed".to_string(),
                event: "open",
            })
        );
    }

    #[test]
    fn edges_from_expands_sources() {
        let table = TransitionTableBuilder::<DoorMachine>::new()
            .edges_from([Door::Open, Door::Locked], "close", Door::Closed)
            .build()
            .unwrap();

        assert_eq!(table.len(), 2);
        assert!(table.edge(&Door::Locked, "close").is_some());
        assert!(table.edge(&Door::Closed, "close").is_none());
    }

    #[test]
    fn guarded_edge_consults_payload() {
        let table = DoorMachine::table().unwrap();

        assert!(!table.allows(&Door::Closed, &0, &DoorEvent::Lock));
        assert!(table.allows(&Door::Closed, &1, &DoorEvent::Lock));
        assert!(!table.allows(&Door::Open, &1, &DoorEvent::Lock));
        assert!(table.allows(&Door::Open, &1, &DoorEvent::Close));
        assert!(!table.allows(&Door::Open, &1, &DoorEvent::Open));
    }
}
