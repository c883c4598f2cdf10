//! Preview tables and run summaries.
//!
//! Tables never show more than `MAX_TABLE_ROWS` rows; the summary still carries
//! every record the org reported.
use crate::extract::{ExtractedRecordSet, UserRecord};
use crate::filter::{FilterCriteria, LockAction};
use serde_json::{json, Value};

pub const MAX_TABLE_ROWS: usize = 500;

const NAME_HEADER: &str = "NAME";
const PROFILE_HEADER: &str = "PROFILE";

/// Where in the workflow a summary was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Preview,
    Empty,
    Declined,
    Final,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSummary {
    pub phase: Phase,
    pub records: ExtractedRecordSet,
    pub message: String,
    pub updated_count: Option<usize>,
}

impl WorkflowSummary {
    /// True when the org reported at least one changed login.
    pub fn changed_anything(&self) -> bool {
        self.updated_count.is_some_and(|count| count > 0)
    }

    /// Machine-readable output for `--json`.
    ///
    /// Runs that changed nothing keep the historical `deleted` key.
    pub fn json_output(&self, org_id: Option<&str>) -> Value {
        if self.changed_anything() {
            json!({ "orgId": org_id, "outputString": self.message })
        } else {
            json!({ "deleted": [], "outputString": self.message })
        }
    }
}

/// Builds phase summaries for one action and filter.
pub struct Reporter<'a> {
    action: LockAction,
    filter: &'a FilterCriteria,
}

impl<'a> Reporter<'a> {
    pub fn new(action: LockAction, filter: &'a FilterCriteria) -> Self {
        Self { action, filter }
    }

    pub fn report(&self, records: ExtractedRecordSet, phase: Phase) -> WorkflowSummary {
        match phase {
            Phase::Preview => WorkflowSummary {
                phase,
                message: format!(
                    "Found {} records:\n{}",
                    records.len(),
                    render_table(&records)
                ),
                records,
                updated_count: None,
            },
            Phase::Empty => WorkflowSummary {
                phase,
                records: Vec::new(),
                message: format!(
                    "No matching user records found for all profiles except {}",
                    self.filter.excluded_profiles().join(",")
                ),
                updated_count: None,
            },
            Phase::Declined => WorkflowSummary {
                phase,
                records: Vec::new(),
                message: self.nothing_changed(),
                updated_count: None,
            },
            Phase::Final if records.is_empty() => WorkflowSummary {
                phase,
                records,
                message: self.nothing_changed(),
                updated_count: Some(0),
            },
            Phase::Final => {
                let count = records.len();
                WorkflowSummary {
                    phase,
                    message: format!(
                        "updated {count} {}, records:\n{}",
                        if count == 1 { "user" } else { "users" },
                        render_table(&records)
                    ),
                    records,
                    updated_count: Some(count),
                }
            }
        }
    }

    fn nothing_changed(&self) -> String {
        format!("No user has been {}", self.action.past_participle())
    }
}

/// Two-column NAME/PROFILE table over at most `MAX_TABLE_ROWS` records.
pub fn render_table(records: &[UserRecord]) -> String {
    let shown = &records[..records.len().min(MAX_TABLE_ROWS)];
    let name_width = shown
        .iter()
        .map(|record| record.name.chars().count())
        .chain(std::iter::once(NAME_HEADER.len()))
        .max()
        .unwrap_or(NAME_HEADER.len());

    let mut lines = Vec::with_capacity(shown.len() + 1);
    lines.push(row(NAME_HEADER, PROFILE_HEADER, name_width));
    for record in shown {
        lines.push(row(&record.name, &record.profile_name, name_width));
    }
    lines.join("\n")
}

fn row(name: &str, profile: &str, name_width: usize) -> String {
    let pad = name_width - name.chars().count();
    format!("{name}{}  {profile}", " ".repeat(pad))
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, profile: &str) -> UserRecord {
        UserRecord {
            id: None,
            name: name.to_string(),
            profile_name: profile.to_string(),
        }
    }

    fn filter() -> FilterCriteria {
        FilterCriteria::from_flags(None, "system administrator,Administrateur système").unwrap()
    }

    fn many(count: usize) -> Vec<UserRecord> {
        (0..count)
            .map(|index| user(&format!("User {index}"), "Standard User"))
            .collect()
    }

    #[test]
    fn table_aligns_profile_column() {
        let table = render_table(&[
            user("Dimitri Monge", "Standard User"),
            user("Al", "Utilisateur standard"),
        ]);
        assert_eq!(
            table,
            "NAME           PROFILE\n\
             Dimitri Monge  Standard User\n\
             Al             Utilisateur standard"
        );
    }

    #[test]
    fn table_is_capped_at_500_rows() {
        let table = render_table(&many(750));
        assert_eq!(table.lines().count(), MAX_TABLE_ROWS + 1);
        assert!(table.contains("User 499"));
        assert!(!table.contains("User 500"));
    }

    #[test]
    fn preview_keeps_all_records_but_caps_table() {
        let filter = filter();
        let reporter = Reporter::new(LockAction::Unfreeze, &filter);
        let summary = reporter.report(many(600), Phase::Preview);
        assert_eq!(summary.records.len(), 600);
        assert!(summary.message.starts_with("Found 600 records:\n"));
        assert_eq!(summary.message.lines().count(), 1 + 1 + MAX_TABLE_ROWS);
        assert_eq!(summary.updated_count, None);
    }

    #[test]
    fn final_caps_table_independently() {
        let filter = filter();
        let reporter = Reporter::new(LockAction::Unfreeze, &filter);
        let summary = reporter.report(many(501), Phase::Final);
        assert_eq!(summary.updated_count, Some(501));
        assert_eq!(summary.records.len(), 501);
        assert_eq!(summary.message.lines().count(), 1 + 1 + MAX_TABLE_ROWS);
    }

    #[test]
    fn empty_message_names_exclusions() {
        let filter = filter();
        let reporter = Reporter::new(LockAction::Unfreeze, &filter);
        let summary = reporter.report(Vec::new(), Phase::Empty);
        assert!(summary.records.is_empty());
        assert_eq!(
            summary.message,
            "No matching user records found for all profiles except system administrator,Administrateur système"
        );
    }

    #[test]
    fn declined_drops_records() {
        let filter = filter();
        let reporter = Reporter::new(LockAction::Unfreeze, &filter);
        let summary = reporter.report(vec![user("A", "P")], Phase::Declined);
        assert!(summary.records.is_empty());
        assert_eq!(summary.message, "No user has been unfrozen");

        let reporter = Reporter::new(LockAction::Freeze, &filter);
        let summary = reporter.report(Vec::new(), Phase::Declined);
        assert_eq!(summary.message, "No user has been frozen");
    }

    #[test]
    fn final_reports_count() {
        let filter = filter();
        let reporter = Reporter::new(LockAction::Unfreeze, &filter);
        let summary = reporter.report(vec![user("Dimitri Monge", "Standard User")], Phase::Final);
        assert_eq!(summary.updated_count, Some(1));
        assert!(summary.message.starts_with("updated 1 user, records:\n"));
        assert!(summary.message.contains("Dimitri Monge  Standard User"));
    }

    #[test]
    fn final_without_records_changed_nothing() {
        let filter = filter();
        let reporter = Reporter::new(LockAction::Unfreeze, &filter);
        let summary = reporter.report(Vec::new(), Phase::Final);
        assert_eq!(summary.updated_count, Some(0));
        assert_eq!(summary.message, "No user has been unfrozen");
        assert!(!summary.changed_anything());
    }

    #[test]
    fn json_output_shapes() {
        let filter = filter();
        let reporter = Reporter::new(LockAction::Unfreeze, &filter);
        let empty = reporter.report(Vec::new(), Phase::Empty);
        assert_eq!(
            empty.json_output(Some("00D")),
            json!({"deleted": [], "outputString": empty.message})
        );

        let done = reporter.report(vec![user("A", "P")], Phase::Final);
        assert_eq!(
            done.json_output(Some("00D")),
            json!({"orgId": "00D", "outputString": done.message})
        );
    }
}
