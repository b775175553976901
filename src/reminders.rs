use serde::{Deserialize, Serialize};

pub const EMPTY_REMINDERS_TEXT: &str =
    "No reminders yet. Add your first medication reminder above.";

/// A medication reminder as stored by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub medicine_name: String,
    pub dosage: String,
    pub frequency: String,
    pub time: String,
}

/// Contents of the add-reminder form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderDraft {
    pub medicine_name: String,
    pub dosage: String,
    pub frequency: String,
    pub time: String,
}

impl ReminderDraft {
    pub const FIELD_LABELS: [&'static str; 4] = ["Medicine", "Dosage", "Frequency", "Time"];

    pub fn field(&self, idx: usize) -> &str {
        match idx {
            0 => &self.medicine_name,
            1 => &self.dosage,
            2 => &self.frequency,
            _ => &self.time,
        }
    }

    pub fn field_mut(&mut self, idx: usize) -> &mut String {
        match idx {
            0 => &mut self.medicine_name,
            1 => &mut self.dosage,
            2 => &mut self.frequency,
            _ => &mut self.time,
        }
    }

    /// Label of the first blank field, if any
    pub fn first_missing(&self) -> Option<&'static str> {
        (0..Self::FIELD_LABELS.len())
            .find(|&i| self.field(i).trim().is_empty())
            .map(|i| Self::FIELD_LABELS[i])
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderRow {
    pub title: String,
    pub details: String,
    /// Reminder id the row's delete action targets
    pub delete_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderListView {
    Empty(&'static str),
    Rows(Vec<ReminderRow>),
}

pub fn render_reminder_list(reminders: &[Reminder]) -> ReminderListView {
    if reminders.is_empty() {
        return ReminderListView::Empty(EMPTY_REMINDERS_TEXT);
    }

    ReminderListView::Rows(
        reminders
            .iter()
            .map(|r| ReminderRow {
                title: format!("💊 {}", r.medicine_name),
                details: format!("📏 {} • 🔄 {} • ⏰ {}", r.dosage, r.frequency, r.time),
                delete_id: r.id,
            })
            .collect(),
    )
}
