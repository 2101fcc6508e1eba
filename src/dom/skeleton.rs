use ngw_generation::SectionId;

use super::{escape_html, Document, RequiredAssets};
use crate::error::Result;

/// Text shown in place of a section the backend failed to generate.
pub const SECTION_ERROR_TEXT: &str = "Failed to load section";

const PROGRESS_ID: &str = "ngw-progress";

/// Progress of one section in the floating indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionStatus {
    Pending,
    Loading,
    Done,
    Error,
}

impl SectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionStatus::Pending => "pending",
            SectionStatus::Loading => "loading",
            SectionStatus::Done => "done",
            SectionStatus::Error => "error",
        }
    }

    fn icon(&self) -> &'static str {
        match self {
            SectionStatus::Pending => "fa-regular fa-circle",
            SectionStatus::Loading => "fa-solid fa-spinner fa-spin",
            SectionStatus::Done => "fa-solid fa-check",
            SectionStatus::Error => "fa-solid fa-triangle-exclamation",
        }
    }
}

fn section_label(id: SectionId) -> &'static str {
    match id {
        SectionId::Header => "Header",
        SectionId::Content => "Content",
        SectionId::Footer => "Footer",
    }
}

fn skeleton_block(id: SectionId) -> String {
    let inner = match id {
        SectionId::Header => {
            r#"<div class="h-16 max-w-7xl mx-auto px-6 flex items-center justify-between"><div class="h-8 w-32 rounded bg-gray-200"></div><div class="flex gap-4"><div class="h-4 w-16 rounded bg-gray-200"></div><div class="h-4 w-16 rounded bg-gray-200"></div><div class="h-4 w-16 rounded bg-gray-200"></div></div></div>"#
        }
        SectionId::Content => {
            r#"<div class="max-w-7xl mx-auto px-6 py-16 space-y-6"><div class="h-10 w-2/3 rounded bg-gray-200"></div><div class="h-4 w-full rounded bg-gray-200"></div><div class="h-4 w-5/6 rounded bg-gray-200"></div><div class="grid grid-cols-3 gap-6 pt-8"><div class="h-40 rounded bg-gray-200"></div><div class="h-40 rounded bg-gray-200"></div><div class="h-40 rounded bg-gray-200"></div></div></div>"#
        }
        SectionId::Footer => {
            r#"<div class="max-w-7xl mx-auto px-6 py-10 grid grid-cols-4 gap-6"><div class="h-4 rounded bg-gray-200"></div><div class="h-4 rounded bg-gray-200"></div><div class="h-4 rounded bg-gray-200"></div><div class="h-4 rounded bg-gray-200"></div></div>"#
        }
    };
    format!(
        r#"<div data-skeleton="{id}" class="ngw-skeleton animate-pulse" aria-busy="true">{inner}</div>"#
    )
}

fn progress_row(id: SectionId, status: SectionStatus) -> String {
    format!(
        r#"<li data-progress="{id}" data-status="{status}" class="flex items-center gap-2"><i class="{icon}"></i><span>{label}</span></li>"#,
        status = status.as_str(),
        icon = status.icon(),
        label = section_label(id),
    )
}

fn progress_indicator() -> String {
    let rows: String = SectionId::ALL
        .iter()
        .map(|id| progress_row(*id, SectionStatus::Pending))
        .collect();
    format!(
        r#"<div id="{PROGRESS_ID}" class="fixed bottom-6 right-6 z-50 rounded-lg bg-white shadow-lg px-4 py-3 text-sm" role="status"><p class="font-semibold mb-2">Generating page…</p><ul>{rows}</ul></div>"#
    )
}

/// Visible stand-in for a section that failed to generate.
pub fn section_placeholder(id: SectionId) -> String {
    format!(
        r#"<div data-section="{id}" class="ngw-section-error py-12 text-center text-gray-500"><i class="fa-solid fa-triangle-exclamation"></i> <p>{}</p></div>"#,
        escape_html(SECTION_ERROR_TEXT)
    )
}

impl Document {
    /// Swap the body for the header/content/footer skeleton and the
    /// floating progress indicator.
    pub fn show_skeleton(&mut self, assets: &RequiredAssets) -> Result<()> {
        self.ensure_head_assets(assets)?;
        let mut body: String = SectionId::ALL.iter().map(|id| skeleton_block(*id)).collect();
        body.push_str(&progress_indicator());
        self.replace_body(&body, None)
    }

    /// Update one row of the progress indicator. No-op once it is gone.
    pub fn set_progress(&mut self, id: SectionId, status: SectionStatus) -> Result<()> {
        let css = format!(r#"#{PROGRESS_ID} [data-progress="{id}"]"#);
        self.replace_first(&css, &progress_row(id, status))?;
        Ok(())
    }

    pub fn hide_progress(&mut self) -> Result<()> {
        self.remove_all(&format!("#{PROGRESS_ID}"))
    }

    /// Replace a section's skeleton (or its previously revealed content)
    /// with finished markup. Returns `false` if neither is on the page.
    pub fn reveal_section(&mut self, id: SectionId, html: &str) -> Result<bool> {
        let wrapped = format!(r#"<div data-section="{id}" class="ngw-fade-in">{html}</div>"#);
        if self.replace_first(&format!(r#"[data-skeleton="{id}"]"#), &wrapped)? {
            return Ok(true);
        }
        if self.replace_first(&format!(r#"[data-section="{id}"]"#), &wrapped)? {
            return Ok(true);
        }
        tracing::warn!(section = %id, "no skeleton or section to reveal into");
        Ok(false)
    }

    /// Show the failure placeholder for a section.
    pub fn reveal_section_error(&mut self, id: SectionId) -> Result<bool> {
        let placeholder = section_placeholder(id);
        if self.replace_first(&format!(r#"[data-skeleton="{id}"]"#), &placeholder)? {
            return Ok(true);
        }
        self.replace_first(&format!(r#"[data-section="{id}"]"#), &placeholder)
    }
}
