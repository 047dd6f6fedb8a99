// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Per-run record of predictor calls

use crate::prediction::Prediction;
use crate::types::Inputs;
use parking_lot::Mutex;
use std::sync::Arc;

/// One predictor call
#[derive(Debug, Clone)]
pub struct TraceEntry {
    /// Id of the predictor that ran
    pub predictor_id: u64,
    /// Inputs it received
    pub inputs: Inputs,
    /// What it produced
    pub prediction: Prediction,
}

/// Shared collector; clones append to the same list.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    entries: Arc<Mutex<Vec<TraceEntry>>>,
}

impl Trace {
    /// Create an empty trace
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a call
    pub fn record(&self, predictor_id: u64, inputs: Inputs, prediction: Prediction) {
        self.entries.lock().push(TraceEntry {
            predictor_id,
            inputs,
            prediction,
        });
    }

    /// Snapshot of the recorded calls
    pub fn entries(&self) -> Vec<TraceEntry> {
        self.entries.lock().clone()
    }

    /// Calls made by one predictor
    pub fn for_predictor(&self, predictor_id: u64) -> Vec<TraceEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.predictor_id == predictor_id)
            .cloned()
            .collect()
    }

    /// Number of recorded calls
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
