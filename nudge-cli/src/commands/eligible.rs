//! Survey eligibility report for a persisted client state.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use nudge_core::eligibility::select_language;
use nudge_core::state::persist::{load_snapshot, save_snapshot};
use nudge_core::state::{ClientState, DisplayOption, StateStore};
use serde::Serialize;
use tracing::debug;

use crate::config::{ConfigLoader, NudgeConfig};

#[derive(Args, Debug)]
pub struct EligibleArgs {
    /// Client state snapshot (defaults to the configured state path)
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Write the recomputed eligible list back to the snapshot
    #[arg(long)]
    pub save: bool,
}

/// One survey's standing for the current person
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyVerdict {
    pub id: String,
    pub name: String,
    pub eligible: bool,
    /// `None` when the survey is not offered in the person's language
    pub language: Option<String>,
    pub display_option: DisplayOption,
    pub displays: usize,
    pub responded: bool,
}

pub async fn run(args: EligibleArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let path = state_path(&args, &config);
    debug!(path = %path.display(), "Loading client state");

    let state = load_snapshot(&path)
        .await
        .with_context(|| format!("Failed to load client state from {}", path.display()))?;
    let store = StateStore::from_state(state);
    let current = store.get();

    if args.save {
        save_snapshot(&path, &current)
            .await
            .with_context(|| format!("Failed to save client state to {}", path.display()))?;
    }

    let verdicts = verdicts(&current);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&verdicts)?);
    } else if verdicts.is_empty() {
        println!("No surveys in the environment snapshot.");
    } else {
        println!("{}", render_table(&verdicts));
        println!(
            "{} of {} surveys eligible",
            current.filtered_surveys.len(),
            verdicts.len()
        );
    }

    Ok(())
}

fn state_path(args: &EligibleArgs, config: &NudgeConfig) -> PathBuf {
    args.state.clone().unwrap_or_else(|| config.state.path.clone())
}

/// Verdicts for every survey in the catalog, in catalog order
pub fn verdicts(state: &ClientState) -> Vec<SurveyVerdict> {
    state
        .environment
        .surveys
        .iter()
        .map(|survey| SurveyVerdict {
            id: survey.id.clone(),
            name: survey.name.clone(),
            eligible: state.is_eligible(&survey.id),
            language: select_language(survey, &state.person.attributes),
            display_option: survey.display_option,
            displays: state.person.display_count(&survey.id),
            responded: state.person.has_responded(&survey.id),
        })
        .collect()
}

fn render_table(verdicts: &[SurveyVerdict]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Survey", "Name", "Eligible", "Language", "Option", "Displays", "Responded",
        ]);

    for v in verdicts {
        let eligible = if v.eligible {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::Red)
        };
        let language = match &v.language {
            Some(code) => Cell::new(code),
            None => Cell::new("unsupported").fg(Color::Yellow),
        };
        table.add_row(vec![
            Cell::new(&v.id),
            Cell::new(&v.name),
            eligible,
            language,
            Cell::new(option_label(v.display_option)),
            Cell::new(v.displays),
            Cell::new(if v.responded { "yes" } else { "no" }),
        ]);
    }

    table
}

fn option_label(option: DisplayOption) -> &'static str {
    match option {
        DisplayOption::DisplayOnce => "once",
        DisplayOption::DisplayMultiple => "multiple",
        DisplayOption::DisplaySome => "some",
        DisplayOption::RespondMultiple => "respond multiple",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nudge_core::state::{EnvironmentSnapshot, PersonSnapshot, Survey};

    fn state() -> ClientState {
        let mut once = Survey::new("s1", "Onboarding");
        once.display_option = DisplayOption::DisplayOnce;
        let environment = EnvironmentSnapshot {
            surveys: vec![once, Survey::new("s2", "NPS")],
            ..Default::default()
        };
        let person = PersonSnapshot::default()
            .with_display("s1", chrono_now())
            .with_response("s2");
        StateStore::new(environment, person).get().as_ref().clone()
    }

    fn chrono_now() -> chrono::DateTime<chrono::Utc> {
        "2026-01-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_verdicts_follow_history() {
        let verdicts = verdicts(&state());
        assert_eq!(verdicts.len(), 2);

        assert_eq!(verdicts[0].id, "s1");
        assert!(!verdicts[0].eligible);
        assert_eq!(verdicts[0].displays, 1);

        assert_eq!(verdicts[1].id, "s2");
        assert!(!verdicts[1].eligible);
        assert!(verdicts[1].responded);
        assert_eq!(verdicts[1].language.as_deref(), Some("default"));
    }

    #[test]
    fn test_explicit_state_path_wins() {
        let args = EligibleArgs {
            state: Some(PathBuf::from("/tmp/explicit.json")),
            json: false,
            save: false,
        };
        let config = NudgeConfig::default();
        assert_eq!(state_path(&args, &config), PathBuf::from("/tmp/explicit.json"));
    }

    #[test]
    fn test_table_has_a_row_per_survey() {
        let table = render_table(&verdicts(&state()));
        assert_eq!(table.row_iter().count(), 2);
    }
}
