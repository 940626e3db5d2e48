//! Orchestration for a single controller run.
//!
//! Selectors are resolved against the store and folded into one plan per
//! entry, so an entry gets exactly one command per output no matter how
//! many selectors touched it. Policy when several adjustments meet on one
//! entry:
//!
//! - step directions accumulate in listed order;
//! - a `--from-file` preset replaces the levels and the steps are dropped;
//! - `--reset` wins over everything else.
//!
//! An entry's new levels are only kept if every one of its outputs accepted
//! them. The document is written once, after all entries were tried.

use std::collections::BTreeMap;

use tracing::{debug, info, instrument, warn};

use crate::core::command;
use crate::core::delta;
use crate::core::selector::Selector;
use crate::core::types::{Deltas, Direction, Levels};
use crate::error::{ControlError, Result};
use crate::io::executor::CommandRunner;
use crate::io::state_store::{EntryId, StateStore, load_preset};

/// Knobs for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Step sizes for entries that do not define their own.
    pub defaults: Deltas,
    /// Write the document back after applying. Off for dry runs.
    pub persist: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            defaults: Deltas::default(),
            persist: true,
        }
    }
}

/// One entry whose new levels were applied and kept.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedEntry {
    pub label: String,
    pub levels: Levels,
}

/// Outcome of a run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub applied: Vec<AppliedEntry>,
    /// Recoverable failures, in the order they happened.
    pub failures: Vec<ControlError>,
    /// Set when the document could not be written back.
    pub persist_error: Option<ControlError>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.persist_error.is_none()
    }
}

#[derive(Debug, Default)]
struct Plan {
    directions: Vec<Direction>,
    preset: Option<Levels>,
}

/// Apply `selectors` to `store`, run the display tool, and persist.
///
/// No selectors at all re-applies every entry unchanged. Every failure,
/// including one to persist, lands in the report.
#[instrument(skip_all, fields(selectors = selectors.len(), entries = store.len()))]
pub fn run<R: CommandRunner>(
    store: &mut StateStore,
    selectors: &[Selector],
    runner: &R,
    options: &RunOptions,
) -> RunReport {
    let mut report = RunReport::default();
    let plans: BTreeMap<EntryId, Plan> = if selectors.is_empty() {
        debug!("no selectors, resynchronizing every entry");
        store
            .entry_ids()
            .into_iter()
            .map(|id| (id, Plan::default()))
            .collect()
    } else {
        build_plans(store, selectors, &mut report.failures)
    };

    for (id, plan) in plans {
        let current = store.levels(id);
        let deltas = store.deltas(id, &options.defaults);
        let levels = match plan.preset {
            Some(preset) if !plan.directions.contains(&Direction::Reset) => preset,
            _ => delta::apply_all(current, &deltas, &plan.directions),
        };
        let label = store.label(id);
        debug!(entry = %label, ?plan.directions, ?current, ?levels, "planned");

        let outputs: Vec<String> = store.outputs(id).into_iter().map(str::to_string).collect();
        let mut all_ok = true;
        for output in &outputs {
            if let Err(err) = apply_output(runner, output, &levels) {
                warn!(error = %err, "output not updated");
                report.failures.push(err);
                all_ok = false;
            }
        }

        if all_ok {
            store.set_levels(id, levels);
            info!(
                entry = %label,
                brightness = levels.brightness,
                gamma = ?levels.gamma,
                "applied"
            );
            report.applied.push(AppliedEntry { label, levels });
        }
    }

    if options.persist {
        if let Err(err) = store.save() {
            warn!(error = %err, "state not persisted");
            report.persist_error = Some(err);
        }
    }
    report
}

/// Fold selectors into one plan per entry, keyed in document order.
fn build_plans(
    store: &StateStore,
    selectors: &[Selector],
    failures: &mut Vec<ControlError>,
) -> BTreeMap<EntryId, Plan> {
    let mut plans: BTreeMap<EntryId, Plan> = BTreeMap::new();

    for selector in selectors {
        let targets = match selector.target.as_deref() {
            None => store.entry_ids(),
            Some(identifier) => match store.resolve(identifier) {
                Ok(id) => vec![id],
                Err(err) => {
                    warn!(error = %err, "selector skipped");
                    failures.push(err);
                    continue;
                }
            },
        };

        for id in targets {
            let preset = match &selector.preset {
                None => None,
                Some(path) => {
                    let outputs = store.outputs(id);
                    match load_preset(path, outputs[0]) {
                        Ok(levels) => Some(levels),
                        Err(err) => {
                            warn!(error = %err, "selector skipped for entry");
                            failures.push(err);
                            continue;
                        }
                    }
                }
            };
            let plan = plans.entry(id).or_default();
            plan.directions.extend(selector.directions.iter().copied());
            if preset.is_some() {
                plan.preset = preset;
            }
        }
    }

    plans
}

fn apply_output<R: CommandRunner>(runner: &R, output: &str, levels: &Levels) -> Result<()> {
    let args = command::build(output, levels);
    let failed = |reason: String| ControlError::ExternalCommandFailed {
        output: output.to_string(),
        reason,
    };
    match runner.execute(&args) {
        Ok(outcome) if outcome.success => Ok(()),
        Ok(outcome) => Err(failed(outcome.failure_reason())),
        Err(err) => Err(failed(format!("{:#}", err))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{RESET_GAMMA, StateDocument};
    use crate::test_support::{RecordingRunner, SCENARIO_STATE, assert_close, record, write_state};

    fn scenario_store(dir: &std::path::Path) -> StateStore {
        StateStore::load(&write_state(dir, SCENARIO_STATE)).expect("load")
    }

    #[test]
    fn same_output_in_two_selectors_accumulates() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = scenario_store(temp.path());
        let runner = RecordingRunner::default();
        let selectors = vec![
            Selector::targeted("primary", [Direction::Brighter]),
            Selector::targeted("HDMI-1", [Direction::Brighter]),
        ];

        let report = run(&mut store, &selectors, &runner, &RunOptions::default());

        assert!(report.is_success());
        assert_eq!(runner.calls().len(), 1);
        let id = store.resolve("HDMI-1").expect("resolve");
        assert_close(store.levels(id).brightness, 1.2);
    }

    #[test]
    fn reset_wins_over_other_directions_for_same_output() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = scenario_store(temp.path());
        let runner = RecordingRunner::default();
        let selectors = vec![
            Selector::targeted("DVI-1", [Direction::Dimmer, Direction::Redder]),
            Selector::targeted("DVI-1", [Direction::Reset, Direction::Brighter]),
        ];

        run(&mut store, &selectors, &runner, &RunOptions::default());

        let id = store.resolve("DVI-1").expect("resolve");
        assert_eq!(store.levels(id), Levels::RESET);
    }

    #[test]
    fn broadcast_and_named_selectors_compose() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = scenario_store(temp.path());
        let runner = RecordingRunner::default();
        let selectors = vec![
            Selector::broadcast([Direction::Dimmer]),
            Selector::targeted("primary", [Direction::Dimmer]),
        ];

        run(&mut store, &selectors, &runner, &RunOptions::default());

        assert_close(store.levels(EntryId(0)).brightness, 0.8);
        assert_close(store.levels(EntryId(1)).brightness, 0.85);
        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn failed_output_keeps_old_levels_and_others_proceed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = scenario_store(temp.path());
        let runner = RecordingRunner::failing_for(&["HDMI-1"]);

        let report = run(
            &mut store,
            &[Selector::broadcast([Direction::Dimmer])],
            &runner,
            &RunOptions::default(),
        );

        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            &report.failures[0],
            ControlError::ExternalCommandFailed { output, .. } if output == "HDMI-1"
        ));
        assert_eq!(store.levels(EntryId(0)).brightness, 1.0);
        assert_close(store.levels(EntryId(1)).brightness, 0.85);

        let reloaded = StateStore::load(store.path()).expect("reload");
        assert_eq!(reloaded.levels(EntryId(0)).brightness, 1.0);
        assert_close(reloaded.levels(EntryId(1)).brightness, 0.85);
    }

    #[test]
    fn runner_error_is_reported_as_command_failure() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = scenario_store(temp.path());
        let runner = RecordingRunner::erroring();

        let report = run(
            &mut store,
            &[Selector::targeted("DVI-1", [Direction::Bluer])],
            &runner,
            &RunOptions::default(),
        );

        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].to_string().contains("spawn failed"));
    }

    #[test]
    fn empty_selector_list_resyncs_every_entry() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = scenario_store(temp.path());
        let runner = RecordingRunner::default();

        let report = run(&mut store, &[], &runner, &RunOptions::default());

        assert_eq!(report.applied.len(), 2);
        assert_eq!(runner.outputs(), vec!["HDMI-1", "DVI-1"]);
        assert_eq!(store.levels(EntryId(0)), Levels { brightness: 1.0, gamma: RESET_GAMMA });
    }

    #[test]
    fn preset_replaces_levels_but_reset_still_wins() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = scenario_store(temp.path());
        let preset = temp.path().join("night.json");
        std::fs::write(
            &preset,
            r#"[{"output": "HDMI-1", "brightness": 0.6, "gamma": [1.0, 0.8, 0.7]},
                {"output": "DVI-1", "brightness": 0.5, "gamma": [1.0, 0.9, 0.8]}]"#,
        )
        .expect("write preset");
        let runner = RecordingRunner::default();
        let selectors = vec![
            Selector {
                preset: Some(preset.clone()),
                ..Selector::targeted("primary", [Direction::Brighter])
            },
            Selector {
                preset: Some(preset),
                ..Selector::targeted("DVI-1", [Direction::Reset])
            },
        ];

        run(&mut store, &selectors, &runner, &RunOptions::default());

        assert_eq!(
            store.levels(EntryId(0)),
            Levels {
                brightness: 0.6,
                gamma: [1.0, 0.8, 0.7]
            }
        );
        assert_eq!(store.levels(EntryId(1)), Levels::RESET);
    }

    #[test]
    fn missing_preset_skips_only_that_selector() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = scenario_store(temp.path());
        let runner = RecordingRunner::default();
        let selectors = vec![
            Selector {
                preset: Some(temp.path().join("absent.json")),
                ..Selector::targeted("primary", [])
            },
            Selector::targeted("DVI-1", [Direction::Dimmer]),
        ];

        let report = run(&mut store, &selectors, &runner, &RunOptions::default());

        assert!(matches!(
            report.failures.as_slice(),
            [ControlError::PresetUnavailable { .. }]
        ));
        assert_eq!(runner.outputs(), vec!["DVI-1"]);
    }

    #[test]
    fn shared_document_drives_every_output_with_one_value() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_state(
            temp.path(),
            r#"{"outputs": ["HDMI-1", "DVI-1"], "brightness": 1.0, "gamma": [1.0, 1.0, 1.0]}"#,
        );
        let mut store = StateStore::load(&path).expect("load");
        let runner = RecordingRunner::default();

        run(
            &mut store,
            &[Selector::broadcast([Direction::Redder])],
            &runner,
            &RunOptions::default(),
        );

        assert_eq!(runner.outputs(), vec!["HDMI-1", "DVI-1"]);
        let calls = runner.calls();
        assert_eq!(calls[0][5], "1.000:0.975:0.950");
        assert_eq!(calls[1][5], "1.000:0.975:0.950");
        assert_close(store.levels(EntryId(0)).gamma[2], 0.95);
    }

    #[test]
    fn config_defaults_apply_where_record_has_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = scenario_store(temp.path());
        let runner = RecordingRunner::default();
        let options = RunOptions {
            defaults: Deltas {
                brightness_delta: 0.25,
                gamma_delta: [0.1, 0.1, 0.1],
            },
            persist: true,
        };

        run(
            &mut store,
            &[Selector::broadcast([Direction::Brighter])],
            &runner,
            &options,
        );

        assert_close(store.levels(EntryId(0)).brightness, 1.25);
        // DVI-1 carries its own brightness_delta.
        assert_close(store.levels(EntryId(1)).brightness, 1.15);
    }

    #[test]
    fn dry_run_does_not_write() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = scenario_store(temp.path());
        let before = std::fs::read_to_string(store.path()).expect("read");
        let runner = RecordingRunner::default();
        let options = RunOptions {
            persist: false,
            ..RunOptions::default()
        };

        run(
            &mut store,
            &[Selector::broadcast([Direction::Dimmer])],
            &runner,
            &options,
        );

        assert_eq!(std::fs::read_to_string(store.path()).expect("read"), before);
    }

    #[test]
    fn persist_failure_keeps_earlier_failures_in_report() {
        let temp = tempfile::tempdir().expect("tempdir");
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "not a directory").expect("write");
        let mut store = StateStore::from_document(
            &blocker.join("outputs.json"),
            StateDocument::Outputs(vec![record("HDMI-1", Some("primary")), record("DVI-1", None)]),
        )
        .expect("store");
        let runner = RecordingRunner::failing_for(&["DVI-1"]);
        let selectors = vec![
            Selector::targeted("nonexistent", [Direction::Brighter]),
            Selector::broadcast([Direction::Dimmer]),
        ];

        let report = run(&mut store, &selectors, &runner, &RunOptions::default());

        assert!(!report.is_success());
        assert!(matches!(
            report.failures.as_slice(),
            [
                ControlError::UnknownOutput(_),
                ControlError::ExternalCommandFailed { .. }
            ]
        ));
        assert!(matches!(
            report.persist_error,
            Some(ControlError::PersistFailure { .. })
        ));
        assert_eq!(report.applied.len(), 1);
    }
}
