//! Remote participant tracking and agent detection

use serde::{Deserialize, Serialize};

/// Whether `identity` names the conversation agent.
///
/// The rule is a case-insensitive substring match against `marker`
/// (`"agent"` by default), so `"Agent-Bot"` and `"tutor_agent_2"` both
/// qualify.
pub fn is_agent_identity(identity: &str, marker: &str) -> bool {
    if marker.is_empty() {
        return false;
    }
    identity.to_lowercase().contains(&marker.to_lowercase())
}

/// Ordered set of remote participant identities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRoster {
    identities: Vec<String>,
}

impl ParticipantRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `identity` at the end. Returns `false` if it was already present.
    pub fn insert(&mut self, identity: &str) -> bool {
        if self.contains(identity) {
            return false;
        }
        self.identities.push(identity.to_string());
        true
    }

    /// Remove `identity`. Returns `false` if it was not present.
    pub fn remove(&mut self, identity: &str) -> bool {
        let before = self.identities.len();
        self.identities.retain(|p| p != identity);
        self.identities.len() != before
    }

    /// Replace the roster with a fresh snapshot, dropping duplicates
    pub fn replace<I, S>(&mut self, identities: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.identities.clear();
        for identity in identities {
            self.insert(identity.as_ref());
        }
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.identities.iter().any(|p| p == identity)
    }

    /// First identity, in roster order, that matches the agent rule
    pub fn first_agent(&self, marker: &str) -> Option<&str> {
        self.identities
            .iter()
            .map(String::as_str)
            .find(|identity| is_agent_identity(identity, marker))
    }

    pub fn identities(&self) -> &[String] {
        &self.identities
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn clear(&mut self) {
        self.identities.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn agent_rule_is_case_insensitive() {
        assert!(is_agent_identity("Agent-Bot", "agent"));
        assert!(is_agent_identity("tutor_AGENT", "agent"));
        assert!(!is_agent_identity("user-42", "agent"));
        assert!(!is_agent_identity("anything", ""));
    }

    #[test]
    fn first_agent_in_enumeration_order() {
        let mut roster = ParticipantRoster::new();
        roster.replace(["user-42", "Agent-Bot", "agent-2"]);
        assert_eq!(roster.first_agent("agent"), Some("Agent-Bot"));

        roster.replace(["user-42", "user-7"]);
        assert_eq!(roster.first_agent("agent"), None);
    }

    #[test]
    fn replace_drops_duplicates() {
        let mut roster = ParticipantRoster::new();
        roster.replace(["p1", "p1", "agent-1"]);
        assert_eq!(roster.identities(), ["p1", "agent-1"]);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Join(u8),
        Leave(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..6).prop_map(Op::Join),
            (0u8..6).prop_map(Op::Leave),
        ]
    }

    proptest! {
        #[test]
        fn roster_never_duplicates_or_resurrects(ops in proptest::collection::vec(op(), 0..64)) {
            let mut roster = ParticipantRoster::new();
            let mut last_op: std::collections::HashMap<u8, bool> = Default::default();

            for op in &ops {
                match *op {
                    Op::Join(n) => {
                        roster.insert(&format!("p{}", n));
                        last_op.insert(n, true);
                    }
                    Op::Leave(n) => {
                        roster.remove(&format!("p{}", n));
                        last_op.insert(n, false);
                    }
                }

                let mut seen = std::collections::HashSet::new();
                for identity in roster.identities() {
                    prop_assert!(seen.insert(identity.clone()), "duplicate {}", identity);
                }
            }

            for (n, joined) in last_op {
                prop_assert_eq!(roster.contains(&format!("p{}", n)), joined);
            }
        }
    }
}
