//! Caller-supplied observation of an evaluation.

use std::cell::Cell;

use kava_core::Type;

/// Receives events as the interpreter runs. Every method defaults to doing
/// nothing.
pub trait DiagnosticSink {
    fn node_evaluated(&self, _label: &'static str) {}

    fn member_resolved(&self, _owner: &str, _signature: &str) {}

    fn loop_iteration(&self) {}

    fn exception_raised(&self, _ty: &Type) {}
}

#[derive(Copy, Clone, Debug, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {}

/// Event counts, readable after (or during) an evaluation.
#[derive(Debug, Default)]
pub struct Counters {
    nodes: Cell<u64>,
    resolutions: Cell<u64>,
    iterations: Cell<u64>,
    exceptions: Cell<u64>,
}

impl Counters {
    pub fn nodes(&self) -> u64 {
        self.nodes.get()
    }

    pub fn resolutions(&self) -> u64 {
        self.resolutions.get()
    }

    pub fn iterations(&self) -> u64 {
        self.iterations.get()
    }

    pub fn exceptions(&self) -> u64 {
        self.exceptions.get()
    }

    pub fn reset(&self) {
        self.nodes.set(0);
        self.resolutions.set(0);
        self.iterations.set(0);
        self.exceptions.set(0);
    }
}

fn bump(counter: &Cell<u64>) {
    counter.set(counter.get() + 1);
}

impl DiagnosticSink for Counters {
    fn node_evaluated(&self, _label: &'static str) {
        bump(&self.nodes);
    }

    fn member_resolved(&self, _owner: &str, _signature: &str) {
        bump(&self.resolutions);
    }

    fn loop_iteration(&self) {
        bump(&self.iterations);
    }

    fn exception_raised(&self, _ty: &Type) {
        bump(&self.exceptions);
    }
}
