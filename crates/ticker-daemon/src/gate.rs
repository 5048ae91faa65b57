//! Two-phase flip gate.
//!
//! A gate holds at most one pending mutation. `trigger` starts a flip and
//! hands back a token; the core applies the mutation when the midpoint
//! signal for that token arrives and reopens the gate on the settle signal.
//! Signals carrying any other token are ignored.

use ticker_proto::protocol::GatePhase;

#[derive(Debug)]
pub struct AnimationGate<M> {
    phase: GatePhase,
    token: u64,
    pending: Option<M>,
}

impl<M> Default for AnimationGate<M> {
    fn default() -> Self {
        Self {
            phase: GatePhase::Idle,
            token: 0,
            pending: None,
        }
    }
}

impl<M> AnimationGate<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> GatePhase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == GatePhase::Idle
    }

    /// Start a flip carrying `mutation`. Rejected (returns `None`, nothing
    /// changes) while a flip is already in flight.
    pub fn trigger(&mut self, mutation: M) -> Option<u64> {
        if !self.is_idle() {
            return None;
        }
        self.token += 1;
        self.phase = GatePhase::Flipping;
        self.pending = Some(mutation);
        Some(self.token)
    }

    /// The mutation to apply now. Yields at most once per flip.
    pub fn take_midpoint(&mut self, token: u64) -> Option<M> {
        if self.phase != GatePhase::Flipping || token != self.token {
            return None;
        }
        self.pending.take()
    }

    /// End the flip. Returns false for a stale token.
    pub fn settle(&mut self, token: u64) -> bool {
        if self.phase != GatePhase::Flipping || token != self.token {
            return false;
        }
        self.phase = GatePhase::Idle;
        self.pending = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_trigger_is_rejected_while_flipping() {
        let mut gate = AnimationGate::new();
        let token = gate.trigger("first").unwrap();
        assert_eq!(gate.phase(), GatePhase::Flipping);
        assert_eq!(gate.trigger("second"), None);

        assert_eq!(gate.take_midpoint(token), Some("first"));
        assert_eq!(gate.take_midpoint(token), None);
        assert!(gate.settle(token));
        assert!(gate.is_idle());
    }

    #[test]
    fn test_stale_tokens_are_ignored() {
        let mut gate = AnimationGate::new();
        let old = gate.trigger(1).unwrap();
        assert!(gate.settle(old));

        let current = gate.trigger(2).unwrap();
        assert_ne!(old, current);
        assert_eq!(gate.take_midpoint(old), None);
        assert!(!gate.settle(old));
        assert_eq!(gate.phase(), GatePhase::Flipping);
        assert_eq!(gate.take_midpoint(current), Some(2));
    }

    #[test]
    fn test_settle_without_midpoint_drops_mutation() {
        let mut gate = AnimationGate::new();
        let token = gate.trigger("lost").unwrap();
        assert!(gate.settle(token));
        assert_eq!(gate.take_midpoint(token), None);
    }
}
