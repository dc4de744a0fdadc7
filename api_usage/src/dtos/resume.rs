use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeTemplate {
    #[default]
    Classic,
    Modern,
    Compact,
}

impl ResumeTemplate {
    pub fn css_class(&self) -> &'static str {
        match self {
            ResumeTemplate::Classic => "resume resume--classic",
            ResumeTemplate::Modern => "resume resume--modern",
            ResumeTemplate::Compact => "resume resume--compact",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResumeEntry {
    pub heading: String,
    pub subheading: Option<String>,
    /// Free form, e.g. "2021 - 2024".
    pub period: Option<String>,
    #[serde(default)]
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResumeSection {
    pub title: String,
    #[serde(default)]
    pub entries: Vec<ResumeEntry>,
}

/// A resume as structured data. Every field is user text and is escaped on
/// render.
#[derive(Debug, Clone, Deserialize)]
pub struct ResumeDocument {
    pub full_name: String,
    pub headline: Option<String>,
    #[serde(default)]
    pub contact: Vec<String>,
    pub summary: Option<String>,
    #[serde(default)]
    pub sections: Vec<ResumeSection>,
    #[serde(default)]
    pub template: ResumeTemplate,
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub resume_id: String,
    /// Paid one-off receipt for this resume. Without it the download counts
    /// against the plan's quota.
    pub receipt_id: Option<Uuid>,
    pub document: ResumeDocument,
}
