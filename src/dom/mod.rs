//! The live document and the operations that mutate it.
//!
//! The document is kept as serialized HTML. Mutations go through `lol_html`
//! rewrites so untouched markup stays byte-for-byte identical; lookups parse
//! with `scraper`. Nothing here holds parsed trees beyond a single call.

mod navbar;
mod replace;
mod skeleton;
mod validate;

use std::borrow::Cow;
use std::cell::Cell;

use lol_html::html_content::{ContentType, Element};
use lol_html::{element, rewrite_str, ElementContentHandlers, HandlerResult, RewriteStrSettings};
use scraper::{Html, Selector};

use crate::error::{NavError, Result};

pub use navbar::render_nav_bar;
pub use replace::{error_page, strip_generated_navigation, AI_NAVIGATION_SELECTORS};
pub use skeleton::{section_placeholder, SectionStatus, SECTION_ERROR_TEXT};
pub use validate::{validate_generated_html, ValidationWarning};

/// Third-party assets every generated page relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredAssets {
    /// `<script src>` of the CSS framework
    pub framework_script: String,
    /// `<link rel="stylesheet" href>` of the icon font
    pub icon_stylesheet: String,
}

/// The page currently on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    html: String,
}

impl Document {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    /// The full serialized document.
    pub fn outer_html(&self) -> &str {
        &self.html
    }

    /// Swap the whole document (landing restore, error page).
    pub fn set_html(&mut self, html: impl Into<String>) {
        self.html = html.into();
    }

    /// Whether any element matches `css`.
    pub fn contains(&self, css: &str) -> Result<bool> {
        let selector = parse_selector(css)?;
        let parsed = Html::parse_document(&self.html);
        let found = parsed.select(&selector).next().is_some();
        Ok(found)
    }

    /// Inner HTML of `<body>`.
    pub fn body_inner_html(&self) -> Result<String> {
        let selector = parse_selector("body")?;
        let parsed = Html::parse_document(&self.html);
        let inner = parsed
            .select(&selector)
            .next()
            .map(|body| body.inner_html())
            .unwrap_or_default();
        Ok(inner)
    }

    /// Append head children of `source` (`<style>`, `<link>`, `<script src>`)
    /// that the document does not already have. Returns how many were added.
    ///
    /// Links dedup by `href`, scripts by `src`, styles by their text.
    pub fn merge_head(&mut self, source: &str) -> Result<usize> {
        let existing = HeadInventory::collect(&self.html)?;
        let incoming = Html::parse_document(source);
        let selector = parse_selector("head > style, head > link, head > script[src]")?;

        let mut additions = String::new();
        let mut added = 0;
        let mut seen = existing;
        for el in incoming.select(&selector) {
            let node = el.value();
            let fresh = match node.name() {
                "link" => node.attr("href").map(|href| seen.links.insert(href.to_string())),
                "script" => node.attr("src").map(|src| seen.scripts.insert(src.to_string())),
                _ => Some(seen.styles.insert(el.inner_html())),
            };
            if fresh.unwrap_or(true) {
                additions.push_str(&el.html());
                added += 1;
            }
        }

        if added > 0 {
            self.append_to_head(&additions)?;
            tracing::debug!(added, "merged head elements");
        }
        Ok(added)
    }

    /// Make sure the framework script and icon stylesheet are in `<head>` once.
    pub fn ensure_head_assets(&mut self, assets: &RequiredAssets) -> Result<()> {
        let existing = HeadInventory::collect(&self.html)?;
        let mut additions = String::new();
        if !existing.scripts.contains(&assets.framework_script) {
            additions.push_str(&format!(
                r#"<script src="{}"></script>"#,
                escape_html(&assets.framework_script)
            ));
        }
        if !existing.links.contains(&assets.icon_stylesheet) {
            additions.push_str(&format!(
                r#"<link rel="stylesheet" href="{}">"#,
                escape_html(&assets.icon_stylesheet)
            ));
        }
        if !additions.is_empty() {
            self.append_to_head(&additions)?;
        }
        Ok(())
    }

    /// Replace the body's contents and, when given, its attributes.
    ///
    /// A document without a `<body>` is rebuilt around the new contents.
    pub fn replace_body(&mut self, inner: &str, attributes: Option<&[(String, String)]>) -> Result<()> {
        let found = Cell::new(false);
        let rewritten = rewrite_str(
            &self.html,
            RewriteStrSettings {
                element_content_handlers: vec![element!("body", |el| {
                    found.set(true);
                    if let Some(attributes) = attributes {
                        let current: Vec<String> =
                            el.attributes().iter().map(|a| a.name()).collect();
                        for name in current {
                            el.remove_attribute(&name);
                        }
                        for (name, value) in attributes {
                            el.set_attribute(name, value)?;
                        }
                    }
                    el.set_inner_content(inner, ContentType::Html);
                    Ok(())
                })],
                ..RewriteStrSettings::default()
            },
        )?;

        if found.get() {
            self.html = rewritten;
        } else {
            tracing::warn!("document has no <body>; rebuilding it");
            self.html = format!(
                "<!DOCTYPE html><html><head></head><body>{}</body></html>",
                inner
            );
        }
        Ok(())
    }

    /// Replace the first element matching `css` with `replacement`.
    /// Returns whether anything matched.
    pub(crate) fn replace_first(&mut self, css: &str, replacement: &str) -> Result<bool> {
        let replaced = Cell::new(false);
        let rewritten = rewrite_str(
            &self.html,
            RewriteStrSettings {
                element_content_handlers: vec![on_element(css, |el| {
                    if !replaced.get() {
                        el.replace(replacement, ContentType::Html);
                        replaced.set(true);
                    }
                    Ok(())
                })?],
                ..RewriteStrSettings::default()
            },
        )?;
        if replaced.get() {
            self.html = rewritten;
        }
        Ok(replaced.get())
    }

    /// Remove every element matching `css`.
    pub(crate) fn remove_all(&mut self, css: &str) -> Result<()> {
        self.html = rewrite_str(
            &self.html,
            RewriteStrSettings {
                element_content_handlers: vec![on_element(css, |el| {
                    el.remove();
                    Ok(())
                })?],
                ..RewriteStrSettings::default()
            },
        )?;
        Ok(())
    }

    fn append_to_head(&mut self, additions: &str) -> Result<()> {
        let found = Cell::new(false);
        let rewritten = rewrite_str(
            &self.html,
            RewriteStrSettings {
                element_content_handlers: vec![element!("head", |el| {
                    if !found.get() {
                        el.append(additions, ContentType::Html);
                        found.set(true);
                    }
                    Ok(())
                })],
                ..RewriteStrSettings::default()
            },
        )?;
        if found.get() {
            self.html = rewritten;
        } else {
            tracing::warn!("document has no <head>; dropping {} bytes of head markup", additions.len());
        }
        Ok(())
    }
}

/// What the document's head already references.
#[derive(Debug, Default)]
struct HeadInventory {
    links: std::collections::HashSet<String>,
    scripts: std::collections::HashSet<String>,
    styles: std::collections::HashSet<String>,
}

impl HeadInventory {
    fn collect(html: &str) -> Result<Self> {
        let parsed = Html::parse_document(html);
        let selector = parse_selector("head link[href], head script[src], head style")?;
        let mut inventory = Self::default();
        for el in parsed.select(&selector) {
            let node = el.value();
            match node.name() {
                "link" => {
                    if let Some(href) = node.attr("href") {
                        inventory.links.insert(href.to_string());
                    }
                }
                "script" => {
                    if let Some(src) = node.attr("src") {
                        inventory.scripts.insert(src.to_string());
                    }
                }
                _ => {
                    inventory.styles.insert(el.inner_html());
                }
            }
        }
        Ok(inventory)
    }
}

/// A rewrite handler for a runtime selector; invalid selectors are errors, not panics.
pub(crate) fn on_element<'h, F>(
    css: &str,
    handler: F,
) -> Result<(Cow<'static, lol_html::Selector>, ElementContentHandlers<'h>)>
where
    F: FnMut(&mut Element<'_, '_>) -> HandlerResult + 'h,
{
    let selector: lol_html::Selector = css
        .parse()
        .map_err(|e: lol_html::errors::SelectorError| NavError::Selector(format!("{}: {}", css, e)))?;
    Ok((Cow::Owned(selector), ElementContentHandlers::default().element(handler)))
}

pub(crate) fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| NavError::Selector(format!("{}: {}", css, e)))
}

/// Escape text for use in element content or a quoted attribute.
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html><html><head><title>Acme</title><link rel="stylesheet" href="/site.css"><style>.a{color:red}</style></head><body class="landing" data-theme="light"><main>Hello</main></body></html>"#;

    fn assets() -> RequiredAssets {
        RequiredAssets {
            framework_script: "https://cdn.example.com/tailwind.js".to_string(),
            icon_stylesheet: "https://cdn.example.com/icons.css".to_string(),
        }
    }

    #[test]
    fn test_merge_head_dedups_links_and_styles() {
        let mut doc = Document::new(PAGE);
        let incoming = r#"<html><head><link rel="stylesheet" href="/site.css"><link rel="stylesheet" href="/pricing.css"><style>.a{color:red}</style><style>.b{}</style></head><body></body></html>"#;
        let added = doc.merge_head(incoming).unwrap();
        assert_eq!(added, 2);
        assert_eq!(doc.outer_html().matches("/site.css").count(), 1);
        assert!(doc.outer_html().contains("/pricing.css"));
        assert!(doc.outer_html().contains(".b{}"));

        // Second merge adds nothing
        assert_eq!(doc.merge_head(incoming).unwrap(), 0);
    }

    #[test]
    fn test_ensure_head_assets_is_idempotent() {
        let mut doc = Document::new(PAGE);
        doc.ensure_head_assets(&assets()).unwrap();
        doc.ensure_head_assets(&assets()).unwrap();
        assert_eq!(doc.outer_html().matches("tailwind.js").count(), 1);
        assert_eq!(doc.outer_html().matches("icons.css").count(), 1);
    }

    #[test]
    fn test_replace_body_copies_attributes() {
        let mut doc = Document::new(PAGE);
        let attrs = vec![("class".to_string(), "pricing".to_string())];
        doc.replace_body("<p>New</p>", Some(&attrs)).unwrap();
        assert!(doc.outer_html().contains(r#"<body class="pricing"><p>New</p></body>"#));
        assert!(!doc.outer_html().contains("data-theme"));
        assert!(doc.outer_html().contains("<title>Acme</title>"));
    }

    #[test]
    fn test_replace_body_without_attributes_keeps_existing() {
        let mut doc = Document::new(PAGE);
        doc.replace_body("<p>New</p>", None).unwrap();
        assert!(doc.outer_html().contains(r#"data-theme="light""#));
        assert_eq!(doc.body_inner_html().unwrap(), "<p>New</p>");
    }

    #[test]
    fn test_replace_first_and_remove_all() {
        let mut doc = Document::new(PAGE);
        assert!(doc.replace_first("main", "<section>Swapped</section>").unwrap());
        assert!(!doc.replace_first("aside", "<p>x</p>").unwrap());
        assert!(doc.contains("section").unwrap());
        doc.remove_all("section").unwrap();
        assert!(!doc.contains("section").unwrap());
    }

    #[test]
    fn test_untouched_markup_is_preserved() {
        let mut doc = Document::new(PAGE);
        doc.remove_all("aside").unwrap();
        assert_eq!(doc.outer_html(), PAGE);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}
