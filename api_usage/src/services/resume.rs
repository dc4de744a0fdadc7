use std::fmt::Write;

use common::error::{AppError, Res};
use entitlements::{EntitlementEngine, FeatureKey};
use uuid::Uuid;

use crate::dtos::resume::{DownloadRequest, ResumeDocument, ResumeEntry};

/// Escapes text for use in HTML element content and quoted attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn validate(document: &ResumeDocument) -> Res<()> {
    if document.full_name.trim().is_empty() {
        return Err(AppError::BadRequest("full_name is required".to_string()));
    }
    if let Some(section) = document.sections.iter().find(|s| s.title.trim().is_empty()) {
        return Err(AppError::BadRequest(format!(
            "Section with {} entries has no title",
            section.entries.len()
        )));
    }
    Ok(())
}

fn render_entry(html: &mut String, entry: &ResumeEntry) {
    html.push_str("<div class=\"entry\">");
    let _ = write!(html, "<h3>{}</h3>", escape_html(entry.heading.trim()));
    if let Some(sub) = non_blank(&entry.subheading) {
        let _ = write!(html, "<p class=\"subheading\">{}</p>", escape_html(sub));
    }
    if let Some(period) = non_blank(&entry.period) {
        let _ = write!(html, "<p class=\"period\">{}</p>", escape_html(period));
    }
    let bullets: Vec<&str> = entry
        .bullets
        .iter()
        .map(|b| b.trim())
        .filter(|b| !b.is_empty())
        .collect();
    if !bullets.is_empty() {
        html.push_str("<ul>");
        for bullet in bullets {
            let _ = write!(html, "<li>{}</li>", escape_html(bullet));
        }
        html.push_str("</ul>");
    }
    html.push_str("</div>");
}

/// Renders a validated document to a standalone HTML page.
pub fn render_html(document: &ResumeDocument) -> String {
    let name = escape_html(document.full_name.trim());
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{}</title></head><body><article class=\"{}\">",
        name,
        document.template.css_class()
    );
    let _ = write!(html, "<header><h1>{}</h1>", name);
    if let Some(headline) = non_blank(&document.headline) {
        let _ = write!(html, "<p class=\"headline\">{}</p>", escape_html(headline));
    }
    let contact: Vec<String> = document
        .contact
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(escape_html)
        .collect();
    if !contact.is_empty() {
        let _ = write!(html, "<p class=\"contact\">{}</p>", contact.join(" | "));
    }
    html.push_str("</header>");

    if let Some(summary) = non_blank(&document.summary) {
        let _ = write!(
            html,
            "<section class=\"summary\"><p>{}</p></section>",
            escape_html(summary)
        );
    }
    for section in &document.sections {
        let _ = write!(html, "<section><h2>{}</h2>", escape_html(section.title.trim()));
        for entry in &section.entries {
            render_entry(&mut html, entry);
        }
        html.push_str("</section>");
    }
    html.push_str("</article></body></html>");
    html
}

/// Renders a resume for download.
///
/// With a receipt the download is paid for and the receipt is spent;
/// otherwise it counts against the plan's `resume_downloads` quota. Free
/// users without a receipt get `QuotaExceeded` carrying the one-off price.
pub async fn download(engine: &EntitlementEngine, user_id: Uuid, req: &DownloadRequest) -> Res<String> {
    let resume_id = req.resume_id.trim();
    if resume_id.is_empty() {
        return Err(AppError::BadRequest("resume_id is required".to_string()));
    }
    validate(&req.document)?;
    let html = render_html(&req.document);

    match req.receipt_id {
        Some(receipt_id) => {
            engine.redeem_one_off(user_id, receipt_id, resume_id).await?;
        }
        None => {
            engine.consume(user_id, FeatureKey::ResumeDownloads).await?;
        }
    }
    log::info!("User {} downloaded resume {}", user_id, resume_id);
    Ok(html)
}
