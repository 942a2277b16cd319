//! Instance subset selection.

use flotilla_provider::Instance;

/// Narrows an operation's target set, by identity number or "all".
///
/// `Numbers(vec![])` selects everything: callers pass whatever numbers the
/// user listed, and listing none means the whole project. This is a
/// documented corner case, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selector {
    #[default]
    All,
    Numbers(Vec<u32>),
}

impl Selector {
    /// The explicit identity numbers, when there are any to filter by.
    pub fn numbers(&self) -> Option<&[u32]> {
        match self {
            Self::All => None,
            Self::Numbers(numbers) if numbers.is_empty() => None,
            Self::Numbers(numbers) => Some(numbers),
        }
    }

    /// Filter `instances` down to the selected subset.
    ///
    /// An instance only matches a number-based selector through a decodable
    /// `Name` tag; untagged or unreadable instances never match.
    pub fn select(&self, instances: Vec<Instance>) -> Vec<Instance> {
        match self.numbers() {
            None => instances,
            Some(numbers) => instances
                .into_iter()
                .filter(|instance| {
                    matches!(instance.identity_number(), Ok(Some(n)) if numbers.contains(&n))
                })
                .collect(),
        }
    }
}
