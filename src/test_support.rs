use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::api::{AddReminderOutcome, ChatReply, HealthApi, UploadFile};
use crate::error::ApiError;
use crate::lifecycle::{dispatch, ApiResponse, Dashboard, PendingOperation};
use crate::reminders::{Reminder, ReminderDraft};
use crate::session::SessionContext;

pub fn session() -> SessionContext {
    SessionContext {
        user_id: 42,
        username: "tester".to_string(),
    }
}

pub fn reminder(id: i64, name: &str) -> Reminder {
    Reminder {
        id,
        medicine_name: name.to_string(),
        dosage: "5mg".to_string(),
        frequency: "daily".to_string(),
        time: "08:00".to_string(),
    }
}

impl Dashboard {
    /// Issue `op` inline, settle it, then run any follow-ups the same way.
    pub async fn run(&mut self, api: &dyn HealthApi, session: &SessionContext, op: PendingOperation) {
        let mut queue = vec![op];
        while let Some(op) = queue.pop() {
            let result = dispatch(api, session, &op.request).await;
            for follow_up in self.settle(op, result) {
                queue.push(self.follow_up(follow_up));
            }
        }
    }
}

/// Replays queued responses in order and records every call it receives.
#[derive(Default)]
pub struct StubApi {
    responses: Mutex<VecDeque<Result<ApiResponse, ApiError>>>,
    calls: Mutex<Vec<String>>,
}

impl StubApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: Result<ApiResponse, ApiError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn next(&self, call: String) -> Result<ApiResponse, ApiError> {
        self.calls.lock().unwrap().push(call.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("stub api has no queued response for {call}"))
    }
}

#[async_trait]
impl HealthApi for StubApi {
    async fn chat(&self, _session: &SessionContext, message: &str) -> Result<ChatReply, ApiError> {
        match self.next(format!("chat:{message}"))? {
            ApiResponse::Chat(reply) => Ok(reply),
            other => panic!("queued {other:?} for chat"),
        }
    }

    async fn upload_report(&self, _session: &SessionContext, file: &UploadFile) -> Result<String, ApiError> {
        match self.next(format!("upload_report:{}", file.name))? {
            ApiResponse::Upload(analysis) => Ok(analysis),
            other => panic!("queued {other:?} for upload_report"),
        }
    }

    async fn add_reminder(&self, _session: &SessionContext, draft: &ReminderDraft) -> Result<AddReminderOutcome, ApiError> {
        match self.next(format!("add_reminder:{}", draft.medicine_name))? {
            ApiResponse::AddReminder(outcome) => Ok(outcome),
            other => panic!("queued {other:?} for add_reminder"),
        }
    }

    async fn force_add_reminder(&self, _session: &SessionContext, draft: &ReminderDraft) -> Result<(), ApiError> {
        match self.next(format!("force_add_reminder:{}", draft.medicine_name))? {
            ApiResponse::ForceAdded => Ok(()),
            other => panic!("queued {other:?} for force_add_reminder"),
        }
    }

    async fn list_reminders(&self, _session: &SessionContext) -> Result<Vec<Reminder>, ApiError> {
        match self.next("list_reminders".to_string())? {
            ApiResponse::Reminders(reminders) => Ok(reminders),
            other => panic!("queued {other:?} for list_reminders"),
        }
    }

    async fn delete_reminder(&self, _session: &SessionContext, reminder_id: i64) -> Result<(), ApiError> {
        match self.next(format!("delete_reminder:{reminder_id}"))? {
            ApiResponse::Deleted => Ok(()),
            other => panic!("queued {other:?} for delete_reminder"),
        }
    }

    async fn login(&self, username: &str, _password: &str) -> Result<SessionContext, ApiError> {
        self.calls.lock().unwrap().push(format!("login:{username}"));
        Ok(SessionContext {
            user_id: 42,
            username: username.to_string(),
        })
    }

    async fn health(&self) -> Result<serde_json::Value, ApiError> {
        self.calls.lock().unwrap().push("health".to_string());
        Ok(serde_json::json!({"status": "healthy"}))
    }
}
