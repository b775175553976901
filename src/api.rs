use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use anyhow::{Context, Result};

use crate::config::Config;
use crate::error::ApiError;
use crate::reminders::{Reminder, ReminderDraft};
use crate::session::SessionContext;

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    user_id: i64,
}

/// Reply to a chat message
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatReply {
    pub response: String,
    /// Backend agent that produced the answer
    #[serde(default)]
    pub agent: Option<String>,
    /// Structured side-effect tag, e.g. `reminder_added`. Older servers omit it.
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Deserialize)]
struct UploadReply {
    analysis: String,
}

#[derive(Serialize)]
struct ReminderRequest<'a> {
    user_id: i64,
    medicine_name: &'a str,
    dosage: &'a str,
    frequency: &'a str,
    time: &'a str,
}

impl<'a> ReminderRequest<'a> {
    fn new(session: &SessionContext, draft: &'a ReminderDraft) -> Self {
        Self {
            user_id: session.user_id,
            medicine_name: &draft.medicine_name,
            dosage: &draft.dosage,
            frequency: &draft.frequency,
            time: &draft.time,
        }
    }
}

#[derive(Deserialize)]
struct AddReminderReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    interaction_warning: bool,
    #[serde(default)]
    conflicting_drugs: Vec<String>,
    #[serde(default)]
    interaction_details: String,
}

/// What the server did with an add-reminder request
#[derive(Debug, Clone, PartialEq)]
pub enum AddReminderOutcome {
    Added,
    /// Nothing was stored; the user has to resolve the conflict first.
    InteractionWarning {
        conflicting_drugs: Vec<String>,
        interaction_details: String,
    },
}

#[derive(Deserialize)]
struct RemindersReply {
    reminders: Vec<Reminder>,
}

#[derive(Serialize)]
struct DeleteRequest {
    reminder_id: i64,
    user_id: i64,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginReply {
    user: SessionContext,
}

/// An image picked for report analysis
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            mime: mime_for_path(path).to_string(),
            bytes,
        })
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

/// Content type guessed from the file extension
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Operations offered by the healthcare API
#[async_trait]
pub trait HealthApi: Send + Sync {
    async fn chat(&self, session: &SessionContext, message: &str) -> Result<ChatReply, ApiError>;
    async fn upload_report(&self, session: &SessionContext, file: &UploadFile) -> Result<String, ApiError>;
    async fn add_reminder(&self, session: &SessionContext, draft: &ReminderDraft) -> Result<AddReminderOutcome, ApiError>;
    async fn force_add_reminder(&self, session: &SessionContext, draft: &ReminderDraft) -> Result<(), ApiError>;
    async fn list_reminders(&self, session: &SessionContext) -> Result<Vec<Reminder>, ApiError>;
    async fn delete_reminder(&self, session: &SessionContext, reminder_id: i64) -> Result<(), ApiError>;
    async fn login(&self, username: &str, password: &str) -> Result<SessionContext, ApiError>;
    async fn health(&self) -> Result<serde_json::Value, ApiError>;
}

#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder().user_agent(concat!("healthdesk/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("failed to initialize HTTP client")?;

        Ok(Self {
            client,
            base_url: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Check the status and decode the body, pulling `detail` out of error bodies.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ApiError::Server {
            status,
            detail: error_detail(&body),
        });
    }

    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// `detail` is only surfaced when it's a plain string. Validation errors carry
/// a structured list that isn't fit for display.
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("detail")
        .and_then(|d| d.as_str())
        .filter(|d| !d.trim().is_empty())
        .map(str::to_string)
}

#[async_trait]
impl HealthApi for HttpApi {
    async fn chat(&self, session: &SessionContext, message: &str) -> Result<ChatReply, ApiError> {
        let request = ChatRequest {
            message,
            user_id: session.user_id,
        };
        let response = self.client.post(self.url("/chat")).json(&request).send().await?;
        read_json(response).await
    }

    async fn upload_report(&self, session: &SessionContext, file: &UploadFile) -> Result<String, ApiError> {
        let part = multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime)?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("user_id", session.user_id.to_string());

        let response = self
            .client
            .post(self.url("/upload-report"))
            .multipart(form)
            .send()
            .await?;
        let reply: UploadReply = read_json(response).await?;
        Ok(reply.analysis)
    }

    async fn add_reminder(&self, session: &SessionContext, draft: &ReminderDraft) -> Result<AddReminderOutcome, ApiError> {
        let response = self
            .client
            .post(self.url("/add-reminder"))
            .json(&ReminderRequest::new(session, draft))
            .send()
            .await?;
        let reply: AddReminderReply = read_json(response).await?;
        add_reminder_outcome(reply)
    }

    async fn force_add_reminder(&self, session: &SessionContext, draft: &ReminderDraft) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("/force-add-reminder"))
            .json(&ReminderRequest::new(session, draft))
            .send()
            .await?;
        let reply: AddReminderReply = read_json(response).await?;
        if reply.success {
            Ok(())
        } else {
            Err(ApiError::Decode("force-add reply did not report success".to_string()))
        }
    }

    async fn list_reminders(&self, session: &SessionContext) -> Result<Vec<Reminder>, ApiError> {
        let response = self
            .client
            .get(self.url("/get-reminders"))
            .query(&[("user_id", session.user_id)])
            .send()
            .await?;
        let reply: RemindersReply = read_json(response).await?;
        Ok(reply.reminders)
    }

    async fn delete_reminder(&self, session: &SessionContext, reminder_id: i64) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url("/delete-reminder"))
            .json(&DeleteRequest {
                reminder_id,
                user_id: session.user_id,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Server {
            status,
            detail: error_detail(&body),
        })
    }

    async fn login(&self, username: &str, password: &str) -> Result<SessionContext, ApiError> {
        let response = self
            .client
            .post(self.url("/login"))
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        let reply: LoginReply = read_json(response).await?;
        Ok(reply.user)
    }

    async fn health(&self) -> Result<serde_json::Value, ApiError> {
        let response = self.client.get(self.url("/health")).send().await?;
        read_json(response).await
    }
}

fn add_reminder_outcome(reply: AddReminderReply) -> Result<AddReminderOutcome, ApiError> {
    if reply.interaction_warning {
        Ok(AddReminderOutcome::InteractionWarning {
            conflicting_drugs: reply.conflicting_drugs,
            interaction_details: reply.interaction_details,
        })
    } else if reply.success {
        Ok(AddReminderOutcome::Added)
    } else {
        Err(ApiError::Decode(
            "add-reminder reply reported neither success nor an interaction warning".to_string(),
        ))
    }
}
