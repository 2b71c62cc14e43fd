//! Accept-list: operator-curated mapping of external-package members known
//! not to retain pointer arguments nor start concurrent activity
//! (§6 "Accept-list format", §4.6, GLOSSARY).

use serde::Deserialize;
use std::collections::{HashMap, HashSet};

/// Parsed accept-list document.
///
/// Unknown packages default to "external / unsafe" (§6): callers
/// ask [`AcceptList::allows`], which returns `false` for any package or
/// member not explicitly listed, never an `Option` the caller must unwrap.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcceptList {
    #[serde(default)]
    accept: HashMap<String, HashSet<String>>,
}

impl AcceptList {
    /// Parse an accept-list document in the YAML shape shown in §6:
    ///
    /// ```yaml
    /// accept:
    ///   fmt:     [Println, Printf, Sprintf, Errorf, Fprintf]
    ///   strings: [HasPrefix, HasSuffix, Split, Join]
    /// ```
    pub fn parse(source: &str) -> crate::error::Result<Self> {
        let list: AcceptList = serde_yaml::from_str(source)?;
        Ok(list)
    }

    /// An accept-list with no entries; every package is "external / unsafe".
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when `package` has an entry and that entry lists `member`
    /// (§4.6 Call-expression rule: "if the callee resolves via the
    /// package resolver to a package whose accept-list entry contains the
    /// callee's selector, suppress").
    #[must_use]
    pub fn allows(&self, package: &str, member: &str) -> bool {
        self.accept
            .get(package)
            .is_some_and(|members| members.contains(member))
    }
}
