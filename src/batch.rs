//! Remote batch operation shared by the preview and mutation phases.
//!
//! Both phases run `build_snippet -> execute -> extract` with the same
//! `FilterCriteria`; only the mutation snippet flips `IsFrozen` and persists.
//! The mutation snippet re-reads the users after `update`, so its output is
//! the persisted set rather than the preview selection.
use crate::apex::{ApexExecutor, ClientIdentity, RemoteExecutionRequest};
use crate::extract::{extract, ExtractedRecordSet, OUTPUT_PREFIX, OUTPUT_SUFFIX};
use crate::filter::{FilterCriteria, LockAction};
use anyhow::{Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    Preview,
    Mutate,
}

impl BatchMode {
    fn label(self, action: LockAction) -> &'static str {
        match (self, action) {
            (BatchMode::Preview, LockAction::Freeze) => "apex-freeze-preview.apex",
            (BatchMode::Preview, LockAction::Unfreeze) => "apex-unfreeze-preview.apex",
            (BatchMode::Mutate, LockAction::Freeze) => "apex-freeze.apex",
            (BatchMode::Mutate, LockAction::Unfreeze) => "apex-unfreeze.apex",
        }
    }
}

/// Anonymous Apex selecting the candidate logins and echoing their users.
///
/// In `Mutate` mode each login's `IsFrozen` is set to the action's target
/// value and the list is persisted before the users are re-selected.
pub fn build_snippet(filter: &FilterCriteria, action: LockAction, mode: BatchMode) -> String {
    let mut apex = String::new();
    apex.push_str(&format!(
        "list<userLogin> userLoginList = [{}]; \n",
        filter.user_login_query(action)
    ));
    apex.push_str("Set<Id> userIdList = new Set<Id>();\n");
    apex.push_str("if(userLoginList != null && userLoginList.size()> 0){\n");
    apex.push_str("for(UserLogin userfromList : userLoginList){\n");
    if mode == BatchMode::Mutate {
        apex.push_str(&format!("userfromList.isFrozen = {};\n", action.target_state()));
    }
    apex.push_str("userIdList.add(userfromList.UserId);\n");
    apex.push_str("}\n");
    apex.push_str("}\n");
    if mode == BatchMode::Mutate {
        apex.push_str("update userLoginList;\n");
    }
    apex.push_str(
        "list<User> userList = [SELECT Id,Name,Profile.Name FROM User WHERE Id IN :userIdList];\n",
    );
    apex.push_str(&format!(
        "system.debug('{OUTPUT_PREFIX}'+JSON.serialize(userList)+'{OUTPUT_SUFFIX}'); \n"
    ));
    apex
}

/// One filter/action pair bound to an org, run in either mode.
pub struct BatchOperation<'a> {
    executor: &'a dyn ApexExecutor,
    identity: &'a ClientIdentity,
    filter: &'a FilterCriteria,
    action: LockAction,
    debug: bool,
}

impl<'a> BatchOperation<'a> {
    pub fn new(
        executor: &'a dyn ApexExecutor,
        identity: &'a ClientIdentity,
        filter: &'a FilterCriteria,
        action: LockAction,
        debug: bool,
    ) -> Self {
        Self {
            executor,
            identity,
            filter,
            action,
            debug,
        }
    }

    pub fn action(&self) -> LockAction {
        self.action
    }

    pub fn filter(&self) -> &FilterCriteria {
        self.filter
    }

    pub fn identity(&self) -> &ClientIdentity {
        self.identity
    }

    pub fn executor(&self) -> &dyn ApexExecutor {
        self.executor
    }

    /// Execute the snippet for `mode` and extract the reported users.
    pub fn run(&self, mode: BatchMode) -> Result<ExtractedRecordSet> {
        let label = mode.label(self.action);
        let request = RemoteExecutionRequest {
            snippet: build_snippet(self.filter, self.action, mode),
            label,
            identity: self.identity,
            debug: self.debug,
        };
        let result = self
            .executor
            .execute(&request)
            .with_context(|| format!("execute {label}"))?;
        let records = extract(&result.raw_log).with_context(|| format!("read {label} output"))?;
        let ids: Vec<&str> = records
            .iter()
            .filter_map(|record| record.id.as_deref())
            .collect();
        tracing::debug!(label, count = records.len(), ?ids, "batch records extracted");
        Ok(records)
    }
}
