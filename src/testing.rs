//! Scripted stand-ins for the remote org and the operator.
use crate::apex::{ApexExecutor, ClientIdentity, RemoteExecutionRequest, RemoteExecutionResult};
use crate::confirm::Confirmer;
use crate::error::OrgUserError;
use anyhow::{anyhow, Result};
use std::cell::RefCell;
use std::collections::VecDeque;

/// What the fake executor saw for one call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub label: String,
    pub snippet: String,
    pub target_org: String,
    pub debug: bool,
}

/// Executor replaying canned logs (or failures) in order.
pub struct FakeExecutor {
    responses: RefCell<VecDeque<Result<String, OrgUserError>>>,
    calls: RefCell<Vec<RecordedCall>>,
    org_id: String,
}

impl FakeExecutor {
    pub fn new(responses: Vec<Result<String, OrgUserError>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            calls: RefCell::new(Vec::new()),
            org_id: "00D000000000001EAA".to_string(),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }
}

impl ApexExecutor for FakeExecutor {
    fn execute(&self, request: &RemoteExecutionRequest<'_>) -> Result<RemoteExecutionResult> {
        self.calls.borrow_mut().push(RecordedCall {
            label: request.label.to_string(),
            snippet: request.snippet.clone(),
            target_org: request.identity.target_org().to_string(),
            debug: request.debug,
        });
        match self.responses.borrow_mut().pop_front() {
            Some(Ok(raw_log)) => Ok(RemoteExecutionResult { raw_log }),
            Some(Err(err)) => Err(err.into()),
            None => Err(anyhow!("unexpected remote call {}", request.label)),
        }
    }

    fn org_id(&self, _identity: &ClientIdentity) -> Result<String> {
        Ok(self.org_id.clone())
    }
}

/// Confirmer answering from a fixed script and counting prompts.
pub struct ScriptedConfirm {
    answers: VecDeque<bool>,
    pub prompts: Vec<String>,
}

impl ScriptedConfirm {
    pub fn new(answers: &[bool]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            prompts: Vec::new(),
        }
    }
}

impl Confirmer for ScriptedConfirm {
    fn confirm(&mut self, prompt: &str, _default: bool) -> Result<bool> {
        self.prompts.push(prompt.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| anyhow!("unexpected confirmation prompt: {prompt}"))
    }
}

/// Debug log in the shape Salesforce returns: source echo, then the payload.
pub fn log_with(users: &[(&str, &str)]) -> String {
    let body = users
        .iter()
        .enumerate()
        .map(|(index, (name, profile))| {
            serde_json::json!({
                "attributes": {"type": "User"},
                "Id": format!("005{index:012}"),
                "Name": name,
                "Profile": {"Name": profile},
            })
        })
        .collect::<Vec<_>>();
    format!(
        "59.0 APEX_CODE,DEBUG\nExecute Anonymous: system.debug('OUTPUTVALUE='+JSON.serialize(userList)+'END_OUTPUTVALUE');\n\
         12:00:00.0 (1)|USER_DEBUG|[9]|DEBUG|OUTPUTVALUE={}END_OUTPUTVALUE\n\
         12:00:00.1 (2)|CODE_UNIT_FINISHED|execute_anonymous_apex\n",
        serde_json::Value::Array(body)
    )
}
