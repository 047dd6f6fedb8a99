// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Module trait
//!
//! A module is a program built from one or more [`Predict`]ers. Optimizers
//! see a module only through its named predictors, so any struct that can
//! list them can be compiled, saved and loaded.

use crate::error::{Error, Result};
use crate::predict::{Predict, PredictState};
use crate::prediction::Prediction;
use crate::settings::Settings;
use crate::types::Inputs;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;

/// Core trait for executable modules.
#[async_trait]
pub trait Module: Send + Sync {
    /// Execute the module with given inputs.
    async fn forward(&self, ctx: &Settings, inputs: &Inputs) -> Result<Prediction>;

    /// Predictors with stable names, in a fixed order.
    fn named_predictors(&self) -> Vec<(String, &Predict)>;

    /// Mutable access to the same predictors, same names and order.
    fn named_predictors_mut(&mut self) -> Vec<(String, &mut Predict)>;

    /// Get module name for debugging and tracing.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Write every predictor's instructions and demos as pretty JSON.
    fn save(&self, path: &Path) -> Result<()> {
        let state: BTreeMap<String, PredictState> = self
            .named_predictors()
            .into_iter()
            .map(|(name, p)| (name, p.dump_state()))
            .collect();
        let json = serde_json::to_string_pretty(&state)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), predictors = state.len(), "saved program");
        Ok(())
    }

    /// Restore state written by [`Module::save`].
    ///
    /// Every predictor of this module must be present in the file.
    fn load(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        let mut state: BTreeMap<String, PredictState> = serde_json::from_str(&content)?;
        let predictors = self.named_predictors_mut();
        // Nothing is applied unless every predictor has an entry.
        if let Some((name, _)) = predictors.iter().find(|(name, _)| !state.contains_key(name)) {
            return Err(Error::module(format!(
                "{} has no state for predictor {name:?}",
                path.display()
            )));
        }
        for (name, predictor) in predictors {
            if let Some(entry) = state.remove(&name) {
                predictor.load_state(entry);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Module for Predict {
    async fn forward(&self, ctx: &Settings, inputs: &Inputs) -> Result<Prediction> {
        self.call(ctx, inputs).await
    }

    fn named_predictors(&self) -> Vec<(String, &Predict)> {
        vec![("self".to_string(), self)]
    }

    fn named_predictors_mut(&mut self) -> Vec<(String, &mut Predict)> {
        vec![("self".to_string(), self)]
    }

    fn name(&self) -> &str {
        &self.signature().name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::example::Example;

    #[test]
    fn test_save_and_load_predict() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("router.json");

        let mut program = Predict::from_spec("ticket_text -> team").unwrap();
        program.set_instructions("Route carefully.");
        program.set_demos(vec![Example::new()
            .with("ticket_text", "refund")
            .with("team", "Billing")
            .with_inputs(["ticket_text"])]);
        program.save(&path).unwrap();

        let mut restored = Predict::from_spec("ticket_text -> team").unwrap();
        restored.load(&path).unwrap();
        assert_eq!(restored.signature().instructions, "Route carefully.");
        assert_eq!(restored.demos()[0].get_str("team"), Some("Billing"));
        assert_eq!(restored.demos()[0].input_keys(), ["ticket_text".to_string()]);
    }

    #[test]
    fn test_load_missing_predictor_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        std::fs::write(&path, "{}").unwrap();

        let mut program = Predict::from_spec("q -> a").unwrap();
        assert!(matches!(program.load(&path), Err(Error::Module(_))));
    }

    #[derive(Clone)]
    struct TwoStage {
        draft: Predict,
        polish: Predict,
    }

    #[async_trait]
    impl Module for TwoStage {
        async fn forward(&self, ctx: &Settings, inputs: &Inputs) -> Result<Prediction> {
            self.draft.call(ctx, inputs).await
        }

        fn named_predictors(&self) -> Vec<(String, &Predict)> {
            vec![("draft".into(), &self.draft), ("polish".into(), &self.polish)]
        }

        fn named_predictors_mut(&mut self) -> Vec<(String, &mut Predict)> {
            vec![
                ("draft".into(), &mut self.draft),
                ("polish".into(), &mut self.polish),
            ]
        }
    }

    #[test]
    fn test_partial_state_leaves_program_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");

        let mut draft_only = Predict::from_spec("q -> a").unwrap();
        draft_only.set_instructions("Draft tersely.");
        let state: BTreeMap<String, PredictState> =
            [("draft".to_string(), draft_only.dump_state())].into();
        std::fs::write(&path, serde_json::to_string(&state).unwrap()).unwrap();

        let mut program = TwoStage {
            draft: Predict::from_spec("q -> a").unwrap(),
            polish: Predict::from_spec("a -> b").unwrap(),
        };
        let before = program.draft.signature().instructions.clone();
        let err = program.load(&path).unwrap_err();
        assert!(err.to_string().contains("polish"));
        assert_eq!(program.draft.signature().instructions, before);
    }
}
