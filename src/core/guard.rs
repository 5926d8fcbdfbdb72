//! Guard predicates for controlling state transitions.
//!
//! A guard refines a table edge: the `(state, event)` pair must be declared
//! AND the guard must hold for the current payload and the incoming event.

use std::fmt;

/// Pure predicate over a machine payload and the event being applied.
///
/// # Example
///
/// ```rust
/// use waymark::core::Guard;
///
/// struct Draft {
///     step: usize,
/// }
///
/// let can_go_back = Guard::new(|draft: &Draft, _event: &()| draft.step > 0);
///
/// assert!(can_go_back.check(&Draft { step: 2 }, &()));
/// assert!(!can_go_back.check(&Draft { step: 0 }, &()));
/// ```
pub struct Guard<P, E> {
    predicate: Box<dyn Fn(&P, &E) -> bool + Send + Sync>,
}

impl<P, E> Guard<P, E> {
    /// Create a guard from a pure predicate function.
    ///
    /// The predicate must be deterministic and free of side effects.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&P, &E) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Box::new(predicate),
        }
    }

    /// Create a guard that only looks at the payload.
    pub fn on_payload<F>(predicate: F) -> Self
    where
        F: Fn(&P) -> bool + Send + Sync + 'static,
    {
        Self::new(move |payload, _event| predicate(payload))
    }

    /// Evaluate the predicate.
    pub fn check(&self, payload: &P, event: &E) -> bool {
        (self.predicate)(payload, event)
    }
}

impl<P, E> fmt::Debug for Guard<P, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Payload {
        step: usize,
        valid: Vec<bool>,
    }

    #[derive(Debug)]
    enum Ev {
        Advance,
        Jump(usize),
    }

    #[test]
    fn guard_sees_payload_and_event() {
        let guard = Guard::new(|p: &Payload, e: &Ev| match e {
            Ev::Advance => p.valid[p.step],
            Ev::Jump(to) => *to < p.valid.len(),
        });

        let payload = Payload {
            step: 0,
            valid: vec![true, false],
        };

        assert!(guard.check(&payload, &Ev::Advance));
        assert!(guard.check(&payload, &Ev::Jump(1)));
        assert!(!guard.check(&payload, &Ev::Jump(2)));
    }

    #[test]
    fn payload_guard_ignores_event() {
        let guard = Guard::on_payload(|p: &Payload| p.step > 0);
        let payload = Payload {
            step: 1,
            valid: vec![],
        };

        assert!(guard.check(&payload, &Ev::Advance));
        assert!(guard.check(&payload, &Ev::Jump(9)));
    }

    #[test]
    fn guard_is_deterministic() {
        let guard = Guard::on_payload(|p: &Payload| p.step % 2 == 0);
        let payload = Payload {
            step: 4,
            valid: vec![],
        };

        assert_eq!(
            guard.check(&payload, &Ev::Advance),
            guard.check(&payload, &Ev::Advance)
        );
    }
}
