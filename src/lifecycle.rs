//! Request lifecycle for every remote operation the dashboard issues.
//!
//! A `submit_*` call validates input, puts a placeholder in the chat log when
//! the operation has one, and hands back a [`PendingOperation`]. The caller
//! runs [`dispatch`] wherever it likes (the TUI spawns it) and feeds the result
//! to [`Dashboard::settle`], which consumes the operation. Every placeholder is
//! therefore replaced or removed exactly once.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::api::{AddReminderOutcome, ChatReply, HealthApi, UploadFile};
use crate::error::ApiError;
use crate::markdown::{convert_markdown_to_html, format_interaction_details};
use crate::messages::{MessageId, MessageLog, Sender};
use crate::reminders::{Reminder, ReminderDraft};
use crate::session::SessionContext;

pub const CHAT_PLACEHOLDER: &str = r#"<div class="loading"><div class="spinner"></div></div>"#;
pub const UPLOAD_PLACEHOLDER: &str =
    r#"<div class="loading"><div class="spinner"></div><p>Analyzing your medical report...</p></div>"#;

pub const NOT_AN_IMAGE: &str = "Please upload an image file (JPG, PNG, etc.)";
const CHAT_SERVER_ERROR: &str =
    "Sorry, I encountered an error processing your request. Please try again.";
const CHAT_CONNECTION_ERROR: &str = "Connection error. Please check if the server is running.";
const UPLOAD_SERVER_ERROR: &str = "Error analyzing the report. Please try again.";
const UPLOAD_CONNECTION_ERROR: &str =
    "Error uploading file. Please check if the server is running.";
const REMINDER_CONNECTION_ERROR: &str = "Connection error. Please try again.";
const DEFER_ADVICE: &str = "**Reminder not added.** Please review this medication with your \
doctor or pharmacist before adding it to your schedule.";

/// Values of `ChatReply::action` that mean the reminder list changed.
const REMINDER_ACTIONS: &[&str] = &["reminder_added", "reminder_deleted", "reminder_updated"];
/// Phrases the backend puts in chat replies after changing reminders. Only
/// consulted when the reply has no `action` field.
const REMINDER_MARKERS: &[&str] = &[
    "Medication Reminder Added",
    "Reminder Deleted Successfully",
    "Reminder Updated Successfully",
];

pub const ALERT_TTL: Duration = Duration::from_secs(3);
pub const HIGHLIGHT_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Chat,
    Upload,
    AddReminder,
    ForceAddReminder,
    DeleteReminder,
    ListReminders,
}

#[derive(Debug, Clone)]
pub enum ApiRequest {
    Chat { message: String },
    Upload { file: UploadFile },
    AddReminder { draft: ReminderDraft },
    ForceAddReminder { draft: ReminderDraft },
    DeleteReminder { reminder_id: i64 },
    ListReminders,
}

impl ApiRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            ApiRequest::Chat { .. } => OperationKind::Chat,
            ApiRequest::Upload { .. } => OperationKind::Upload,
            ApiRequest::AddReminder { .. } => OperationKind::AddReminder,
            ApiRequest::ForceAddReminder { .. } => OperationKind::ForceAddReminder,
            ApiRequest::DeleteReminder { .. } => OperationKind::DeleteReminder,
            ApiRequest::ListReminders => OperationKind::ListReminders,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Chat(ChatReply),
    Upload(String),
    AddReminder(AddReminderOutcome),
    ForceAdded,
    Deleted,
    Reminders(Vec<Reminder>),
}

/// An issued operation waiting for its single response.
#[derive(Debug)]
pub struct PendingOperation {
    pub id: OperationId,
    pub kind: OperationKind,
    pub placeholder: Option<MessageId>,
    pub started_at: Instant,
    pub request: ApiRequest,
}

/// A finished remote call, ready for [`Dashboard::settle`]
#[derive(Debug)]
pub struct Completion {
    pub op: PendingOperation,
    pub result: Result<ApiResponse, ApiError>,
}

/// Work the caller should start after a settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    ReloadReminders,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Success,
    Danger,
    Info,
}

#[derive(Debug, Clone)]
pub struct Alert {
    pub text: String,
    pub level: AlertLevel,
    pub expires_at: Instant,
}

/// Server-detected conflict between the drafted medication and current ones
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionWarning {
    pub conflicting_drugs: Vec<String>,
    /// Already formatted as HTML
    pub interaction_details: String,
    pub pending: ReminderDraft,
}

/// Issue the single remote call for `request`.
pub async fn dispatch(
    api: &dyn HealthApi,
    session: &SessionContext,
    request: &ApiRequest,
) -> Result<ApiResponse, ApiError> {
    match request {
        ApiRequest::Chat { message } => api.chat(session, message).await.map(ApiResponse::Chat),
        ApiRequest::Upload { file } => api.upload_report(session, file).await.map(ApiResponse::Upload),
        ApiRequest::AddReminder { draft } => {
            api.add_reminder(session, draft).await.map(ApiResponse::AddReminder)
        }
        ApiRequest::ForceAddReminder { draft } => {
            api.force_add_reminder(session, draft).await.map(|_| ApiResponse::ForceAdded)
        }
        ApiRequest::DeleteReminder { reminder_id } => {
            api.delete_reminder(session, *reminder_id).await.map(|_| ApiResponse::Deleted)
        }
        ApiRequest::ListReminders => api.list_reminders(session).await.map(ApiResponse::Reminders),
    }
}

/// Run `op` to completion. Owned arguments so it can be moved into a task.
pub async fn execute(
    api: Arc<dyn HealthApi>,
    session: SessionContext,
    op: PendingOperation,
) -> Completion {
    let result = dispatch(api.as_ref(), &session, &op.request).await;
    Completion { op, result }
}

pub fn reply_changed_reminders(reply: &ChatReply) -> bool {
    match reply.action.as_deref() {
        Some(action) => REMINDER_ACTIONS.contains(&action),
        None => REMINDER_MARKERS.iter().any(|m| reply.response.contains(m)),
    }
}

/// UI-agnostic dashboard state: the chat log plus the reminder tab.
#[derive(Debug, Default)]
pub struct Dashboard {
    pub log: MessageLog,
    pub reminders: Vec<Reminder>,
    pub draft: ReminderDraft,
    pub warning: Option<InteractionWarning>,
    /// Reminder id awaiting the user's yes/no
    pub pending_delete: Option<i64>,
    /// Reminder ids with a delete call in flight
    pub deleting: HashSet<i64>,
    pub alerts: Vec<Alert>,
    pub reminders_highlight_until: Option<Instant>,
    /// Backend agent that produced the latest chat answer
    pub last_agent: Option<String>,
    in_flight: HashMap<OperationId, OperationKind>,
    next_op: u64,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_in_flight(&self, kind: OperationKind) -> bool {
        self.in_flight.values().any(|k| *k == kind)
    }

    pub fn reminders_highlighted(&self, now: Instant) -> bool {
        self.reminders_highlight_until.is_some_and(|until| now < until)
    }

    fn begin(&mut self, request: ApiRequest, placeholder: Option<MessageId>) -> PendingOperation {
        self.next_op += 1;
        let id = OperationId(self.next_op);
        let kind = request.kind();
        self.in_flight.insert(id, kind);
        tracing::debug!(op = id.0, ?kind, "operation started");
        PendingOperation {
            id,
            kind,
            placeholder,
            started_at: Instant::now(),
            request,
        }
    }

    pub fn alert(&mut self, text: impl Into<String>, level: AlertLevel) {
        self.alerts.push(Alert {
            text: text.into(),
            level,
            expires_at: Instant::now() + ALERT_TTL,
        });
    }

    /// Drop expired alerts and highlights.
    pub fn tick(&mut self, now: Instant) {
        self.alerts.retain(|a| a.expires_at > now);
        if self.reminders_highlight_until.is_some_and(|until| now >= until) {
            self.reminders_highlight_until = None;
        }
    }

    pub fn submit_chat(&mut self, text: &str) -> Option<PendingOperation> {
        let message = text.trim();
        if message.is_empty() {
            return None;
        }

        self.log.append(Sender::User, message);
        let placeholder = self.log.append(Sender::Assistant, CHAT_PLACEHOLDER);
        Some(self.begin(
            ApiRequest::Chat { message: message.to_string() },
            Some(placeholder),
        ))
    }

    pub fn submit_upload(&mut self, file: UploadFile) -> Option<PendingOperation> {
        if !file.is_image() {
            tracing::info!(name = %file.name, mime = %file.mime, "rejected non-image upload");
            self.log.append(Sender::Assistant, NOT_AN_IMAGE);
            return None;
        }

        self.log.append(Sender::User, format!("📎 Uploaded: {}", file.name));
        let placeholder = self.log.append(Sender::Assistant, UPLOAD_PLACEHOLDER);
        Some(self.begin(ApiRequest::Upload { file }, Some(placeholder)))
    }

    /// Submit the reminder form as it currently stands.
    pub fn submit_reminder(&mut self) -> Option<PendingOperation> {
        if let Some(field) = self.draft.first_missing() {
            self.alert(format!("{field} is required"), AlertLevel::Danger);
            return None;
        }
        let draft = self.draft.clone();
        Some(self.begin(ApiRequest::AddReminder { draft }, None))
    }

    /// Resolve the open warning by adding the reminder anyway.
    pub fn force_add(&mut self) -> Option<PendingOperation> {
        let warning = self.warning.take()?;
        Some(self.begin(ApiRequest::ForceAddReminder { draft: warning.pending }, None))
    }

    /// Resolve the open warning by dismissing it. The form keeps its values.
    pub fn cancel_warning(&mut self) -> bool {
        self.warning.take().is_some()
    }

    /// Resolve the open warning by leaving the decision to a professional.
    pub fn defer_warning(&mut self) -> bool {
        let Some(warning) = self.warning.take() else {
            return false;
        };
        self.draft.clear();
        self.log
            .append(Sender::Assistant, convert_markdown_to_html(DEFER_ADVICE));
        self.alert(
            format!(
                "{} was not added. Please consult your healthcare provider.",
                warning.pending.medicine_name
            ),
            AlertLevel::Info,
        );
        true
    }

    /// First step of a delete: remember the target until it's confirmed.
    pub fn request_delete(&mut self, reminder_id: i64) {
        self.pending_delete = Some(reminder_id);
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Second step of a delete. Without a prior `request_delete` nothing is issued.
    pub fn confirm_delete(&mut self) -> Option<PendingOperation> {
        let reminder_id = self.pending_delete.take()?;
        self.deleting.insert(reminder_id);
        Some(self.begin(ApiRequest::DeleteReminder { reminder_id }, None))
    }

    pub fn load_reminders(&mut self) -> PendingOperation {
        self.begin(ApiRequest::ListReminders, None)
    }

    pub fn follow_up(&mut self, follow_up: FollowUp) -> PendingOperation {
        match follow_up {
            FollowUp::ReloadReminders => self.load_reminders(),
        }
    }

    /// Apply the outcome of `op`. Consumes it, so each operation settles once.
    pub fn settle(
        &mut self,
        op: PendingOperation,
        result: Result<ApiResponse, ApiError>,
    ) -> Vec<FollowUp> {
        self.in_flight.remove(&op.id);
        let elapsed_ms = op.started_at.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::debug!(op = op.id.0, kind = ?op.kind, elapsed_ms, "operation succeeded"),
            Err(err) => tracing::warn!(op = op.id.0, kind = ?op.kind, elapsed_ms, error = %err, "operation failed"),
        }

        if let ApiRequest::DeleteReminder { reminder_id } = &op.request {
            self.deleting.remove(reminder_id);
        }

        match result {
            Ok(response) => self.settle_success(op, response),
            Err(err) => {
                self.settle_failure(op, err);
                Vec::new()
            }
        }
    }

    fn settle_success(&mut self, op: PendingOperation, response: ApiResponse) -> Vec<FollowUp> {
        match (op.request, response) {
            (ApiRequest::Chat { .. }, ApiResponse::Chat(reply)) => {
                self.finish_placeholder(op.placeholder, convert_markdown_to_html(&reply.response));
                if reply.agent.is_some() {
                    self.last_agent = reply.agent.clone();
                }
                if reply_changed_reminders(&reply) {
                    self.reminders_highlight_until = Some(Instant::now() + HIGHLIGHT_TTL);
                    return vec![FollowUp::ReloadReminders];
                }
                Vec::new()
            }
            (ApiRequest::Upload { .. }, ApiResponse::Upload(analysis)) => {
                self.finish_placeholder(op.placeholder, convert_markdown_to_html(&analysis));
                Vec::new()
            }
            (ApiRequest::AddReminder { draft }, ApiResponse::AddReminder(outcome)) => match outcome {
                AddReminderOutcome::Added => {
                    self.draft.clear();
                    self.alert("Reminder added successfully!", AlertLevel::Success);
                    vec![FollowUp::ReloadReminders]
                }
                AddReminderOutcome::InteractionWarning {
                    conflicting_drugs,
                    interaction_details,
                } => {
                    tracing::info!(medicine = %draft.medicine_name, ?conflicting_drugs, "interaction warning");
                    self.warning = Some(InteractionWarning {
                        conflicting_drugs,
                        interaction_details: format_interaction_details(&interaction_details),
                        pending: draft,
                    });
                    Vec::new()
                }
            },
            (ApiRequest::ForceAddReminder { .. }, ApiResponse::ForceAdded) => {
                self.draft.clear();
                self.alert(
                    "Reminder added successfully (interaction warning bypassed)",
                    AlertLevel::Success,
                );
                vec![FollowUp::ReloadReminders]
            }
            (ApiRequest::DeleteReminder { .. }, ApiResponse::Deleted) => {
                self.alert("Reminder deleted successfully!", AlertLevel::Success);
                vec![FollowUp::ReloadReminders]
            }
            (ApiRequest::ListReminders, ApiResponse::Reminders(reminders)) => {
                self.reminders = reminders;
                Vec::new()
            }
            (request, response) => {
                tracing::error!(kind = ?request.kind(), ?response, "response does not match request");
                self.settle_failure_parts(
                    request.kind(),
                    op.placeholder,
                    ApiError::Decode("unexpected response type".to_string()),
                );
                Vec::new()
            }
        }
    }

    fn settle_failure(&mut self, op: PendingOperation, err: ApiError) {
        self.settle_failure_parts(op.kind, op.placeholder, err);
    }

    fn settle_failure_parts(
        &mut self,
        kind: OperationKind,
        placeholder: Option<MessageId>,
        err: ApiError,
    ) {
        if let Some(id) = placeholder {
            self.log.remove(id);
        }

        let detail = err.detail().map(str::to_string);
        let transport = err.is_transport();
        let pick = |server_default: &str, connection: &str| -> String {
            if transport {
                connection.to_string()
            } else {
                detail.clone().unwrap_or_else(|| server_default.to_string())
            }
        };

        match kind {
            OperationKind::Chat => {
                let text = pick(CHAT_SERVER_ERROR, CHAT_CONNECTION_ERROR);
                self.log.append(Sender::Assistant, text);
            }
            OperationKind::Upload => {
                let text = pick(UPLOAD_SERVER_ERROR, UPLOAD_CONNECTION_ERROR);
                self.log.append(Sender::Assistant, text);
            }
            OperationKind::AddReminder | OperationKind::ForceAddReminder => {
                let text = pick("Error adding reminder", REMINDER_CONNECTION_ERROR);
                self.alert(text, AlertLevel::Danger);
            }
            OperationKind::DeleteReminder => {
                let text = pick("Error deleting reminder", REMINDER_CONNECTION_ERROR);
                self.alert(text, AlertLevel::Danger);
            }
            OperationKind::ListReminders => {
                tracing::error!(error = %err, "failed to load reminders");
            }
        }
    }

    fn finish_placeholder(&mut self, placeholder: Option<MessageId>, html: String) {
        let replaced = placeholder.is_some_and(|id| self.log.replace(id, html.clone()));
        if !replaced {
            self.log.append(Sender::Assistant, html);
        }
    }
}
