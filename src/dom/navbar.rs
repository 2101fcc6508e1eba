use super::escape_html;
use crate::nav_stack::{EntryType, NavigationStack};

/// Deterministic navigation bar for generated pages.
///
/// Home always links back to landing. The root segment is a clickable crumb
/// only when something sits below it; the current entry is plain text.
pub fn render_nav_bar(stack: &NavigationStack) -> String {
    let mut crumbs = String::new();
    crumbs.push_str(
        r#"<a href="/" data-action="back-to-landing" class="flex items-center gap-1 hover:text-gray-900"><i class="fa-solid fa-house"></i><span>Home</span></a>"#,
    );

    let entries = stack.entries();
    for (idx, entry) in entries.iter().enumerate() {
        crumbs.push_str(r#"<i class="fa-solid fa-chevron-right text-xs text-gray-400"></i>"#);
        let name = escape_html(&entry.name);
        let is_last = idx + 1 == entries.len();
        if !is_last && entry.entry_type == EntryType::Segment {
            crumbs.push_str(&format!(
                r#"<a href="?page={slug}" data-segment="{slug}" class="hover:text-gray-900">{name}</a>"#,
                slug = escape_html(&entry.slug),
            ));
        } else {
            crumbs.push_str(&format!(
                r#"<span aria-current="page" class="font-medium text-gray-900">{name}</span>"#
            ));
        }
    }

    format!(
        r#"<nav data-ngw-nav aria-label="Site navigation" class="sticky top-0 z-40 bg-white/90 backdrop-blur border-b border-gray-200"><div class="max-w-7xl mx-auto px-6 h-12 flex items-center gap-2 text-sm text-gray-600">{crumbs}</div></nav>"#
    )
}
