//! Fact data model (§3, §9).
//!
//! Base-case facts are singleton tags set by one of the four analyzers.
//! The inductive fact is a bitmask over those tags plus `ExternalFunc`,
//! composed by the propagator. The fact base is modeled as an interface
//! with `export`/`import`/`enumerate`/`reset` operations (§9) held
//! behind one owner per package analysis; it is never shared across
//! packages (§5).

use crate::analysis::callgraph::ParameterId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseFact {
    WritesInput,
    CapturesAsync,
    ComparesPtr,
    NestedCallsite,
}

pub const WRITES_INPUT: u8 = 1 << 0;
pub const CAPTURES_ASYNC: u8 = 1 << 1;
pub const COMPARES_PTR: u8 = 1 << 2;
pub const NESTED_CALLSITE: u8 = 1 << 3;
pub const EXTERNAL_FUNC: u8 = 1 << 4;

impl BaseFact {
    pub fn bit(self) -> u8 {
        match self {
            BaseFact::WritesInput => WRITES_INPUT,
            BaseFact::CapturesAsync => CAPTURES_ASYNC,
            BaseFact::ComparesPtr => COMPARES_PTR,
            BaseFact::NestedCallsite => NESTED_CALLSITE,
        }
    }
}

/// Render a bitmask as the diagnostic `reason` string §3 calls for
/// ("reason equal to the bitmask's string").
pub fn bitmask_to_reason(bits: u8) -> String {
    let names = [
        (WRITES_INPUT, "WritesInput"),
        (CAPTURES_ASYNC, "CapturesAsync"),
        (COMPARES_PTR, "ComparesPtr"),
        (NESTED_CALLSITE, "NestedCallsite"),
        (EXTERNAL_FUNC, "ExternalFunc"),
    ];
    names
        .iter()
        .filter(|(bit, _)| bits & bit != 0)
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join("+")
}

/// Single-owner fact store for one package analysis.
#[derive(Debug, Default)]
pub struct FactBase {
    base: HashMap<ParameterId, u8>,
    inductive: HashMap<ParameterId, u8>,
}

impl FactBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set-valued: exporting the same fact twice is a no-op (§3
    /// invariant: "No parameter carries more than one copy of a given
    /// base-case fact").
    pub fn export_fact(&mut self, param: ParameterId, fact: BaseFact) {
        *self.base.entry(param).or_insert(0) |= fact.bit();
    }

    pub fn base_facts(&self, param: ParameterId) -> u8 {
        self.base.get(&param).copied().unwrap_or(0)
    }

    /// ORs `bits` into the inductive bitmask for `param`. Returns whether
    /// any new bit was set, so the propagator's fixed-point loop can detect
    /// convergence (§4.5.2).
    pub fn import_fact(&mut self, param: ParameterId, bits: u8) -> bool {
        let entry = self.inductive.entry(param).or_insert(0);
        let before = *entry;
        *entry |= bits;
        *entry != before
    }

    pub fn inductive_bits(&self, param: ParameterId) -> u8 {
        self.inductive.get(&param).copied().unwrap_or(0)
    }

    /// Seed every parameter's inductive bitmask with its own base-case
    /// facts, the zero-hop case of propagation (§8 invariant 2:
    /// "either the base-case analyzer set it on p, or there exists a call
    /// site where..."). Called once before the propagator's fixed-point
    /// loop; `ExternalFunc` is never part of a base-case fact, so it is
    /// untouched here.
    pub fn seed_self(&mut self) {
        let seeds: Vec<(ParameterId, u8)> = self.base.iter().map(|(&p, &b)| (p, b)).collect();
        for (param, bits) in seeds {
            self.import_fact(param, bits);
        }
    }

    pub fn all_facts(&self) -> impl Iterator<Item = (ParameterId, u8)> + '_ {
        self.inductive.iter().map(|(k, v)| (*k, *v))
    }

    pub fn reset(&mut self) {
        self.base.clear();
        self.inductive.clear();
    }
}
