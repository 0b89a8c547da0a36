//! Which actions run in a given invocation

use std::collections::BTreeSet;

/// Skip/do name sets shared by every action in a run
///
/// A name in `skip` never runs, even if it is also in `only`. A non-empty
/// `only` set restricts the run to the names it contains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionPolicy {
    skip: BTreeSet<String>,
    only: BTreeSet<String>,
}

impl SelectionPolicy {
    pub fn new<S, D>(skip: S, only: D) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        Self {
            skip: skip.into_iter().map(Into::into).collect(),
            only: only.into_iter().map(Into::into).collect(),
        }
    }

    /// Run everything
    pub fn all() -> Self {
        Self::default()
    }

    pub fn should_run(&self, name: &str) -> bool {
        if self.skip.contains(name) {
            return false;
        }
        self.only.is_empty() || self.only.contains(name)
    }

    /// Names in either set that are not in `known`
    pub fn unknown_names<'a>(&'a self, known: &[&str]) -> Vec<&'a str> {
        self.skip
            .iter()
            .chain(self.only.iter())
            .map(String::as_str)
            .filter(|name| !known.contains(name))
            .collect()
    }
}
