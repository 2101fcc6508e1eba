use lol_html::{rewrite_str, RewriteStrSettings};
use scraper::Html;

use super::{escape_html, navbar::render_nav_bar, on_element, parse_selector, Document, RequiredAssets};
use crate::error::Result;
use crate::nav_stack::NavigationStack;

/// Navigation that generated pages tend to invent and that would compete
/// with the injected bar. Includes previously injected bars.
pub const AI_NAVIGATION_SELECTORS: &[&str] = &[
    "nav.fixed",
    "nav.sticky",
    r#"nav[class*="fixed"]"#,
    r#"nav[class*="sticky"]"#,
    r#"[id*="mobile-menu"]"#,
    r#"[class*="mobile-menu"]"#,
    "[data-mobile-menu]",
    r#"nav[aria-label="breadcrumb"]"#,
    r#"nav[aria-label="Breadcrumb"]"#,
    ".breadcrumbs",
    "ol.breadcrumb",
    "[data-ngw-nav]",
];

/// Remove generated navigation from a body fragment.
pub fn strip_generated_navigation(fragment: &str) -> Result<String> {
    let mut handlers = Vec::with_capacity(AI_NAVIGATION_SELECTORS.len());
    for css in AI_NAVIGATION_SELECTORS {
        handlers.push(on_element(css, |el| {
            el.remove();
            Ok(())
        })?);
    }
    let stripped = rewrite_str(
        fragment,
        RewriteStrSettings {
            element_content_handlers: handlers,
            ..RewriteStrSettings::default()
        },
    )?;
    Ok(stripped)
}

/// Body markup of the error page. The only way out is back to landing.
pub fn error_page(message: &str) -> String {
    format!(
        r#"<main class="min-h-screen flex items-center justify-center px-6"><div class="max-w-md text-center space-y-6"><i class="fa-solid fa-circle-exclamation text-5xl text-red-500"></i><h1 class="text-2xl font-semibold">Something went wrong</h1><p class="text-gray-600" data-ngw-error>{}</p><button type="button" data-action="back-to-landing" class="rounded-lg bg-gray-900 px-5 py-2.5 text-white">Back to home</button></div></main>"#,
        escape_html(message)
    )
}

impl Document {
    /// Display a generated page: merge its head into ours, take over its
    /// body attributes and contents, and (unless skipped) swap its own
    /// navigation for the deterministic bar.
    pub fn replace_content(
        &mut self,
        html: &str,
        skip_nav_injection: bool,
        stack: &NavigationStack,
        assets: &RequiredAssets,
    ) -> Result<()> {
        self.merge_head(html)?;
        self.ensure_head_assets(assets)?;

        let (attributes, inner) = {
            let incoming = Html::parse_document(html);
            let selector = parse_selector("body")?;
            match incoming.select(&selector).next() {
                Some(body) => {
                    let attrs: Vec<(String, String)> = body
                        .value()
                        .attrs()
                        .map(|(name, value)| (name.to_string(), value.to_string()))
                        .collect();
                    (attrs, body.inner_html())
                }
                None => (Vec::new(), html.to_string()),
            }
        };

        let inner = if skip_nav_injection {
            inner
        } else {
            let mut with_bar = render_nav_bar(stack);
            with_bar.push_str(&strip_generated_navigation(&inner)?);
            with_bar
        };

        self.replace_body(&inner, Some(&attributes))
    }

    /// Show the error page in place of the current body.
    pub fn render_error_page(&mut self, message: &str, assets: &RequiredAssets) -> Result<()> {
        self.ensure_head_assets(assets)?;
        let no_attributes: &[(String, String)] = &[];
        self.replace_body(&error_page(message), Some(no_attributes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURRENT: &str = r#"<!DOCTYPE html><html><head><title>Acme</title></head><body class="landing"><main>Landing</main></body></html>"#;

    const GENERATED: &str = r##"<!DOCTYPE html><html><head><style>.hero{}</style></head><body class="bg-white text-gray-900"><nav class="fixed top-0 w-full"><a href="#">Menu</a></nav><div id="mobile-menu-overlay">Overlay</div><nav aria-label="breadcrumb"><ol class="breadcrumb"><li>Home</li></ol></nav><section class="hero">Pricing</section></body></html>"##;

    fn assets() -> RequiredAssets {
        RequiredAssets {
            framework_script: "https://cdn.example.com/tailwind.js".to_string(),
            icon_stylesheet: "https://cdn.example.com/icons.css".to_string(),
        }
    }

    #[test]
    fn test_strip_removes_every_generated_nav() {
        let stripped = strip_generated_navigation(
            r#"<nav class="sticky top-0">A</nav><nav class="lg:fixed">B</nav><div class="mobile-menu">C</div><div data-mobile-menu>D</div><div class="breadcrumbs">E</div><nav data-ngw-nav>F</nav><nav class="inline">Keep</nav>"#,
        )
        .unwrap();
        assert_eq!(stripped, r#"<nav class="inline">Keep</nav>"#);
    }

    #[test]
    fn test_replace_content_injects_bar_and_copies_body() {
        let mut doc = Document::new(CURRENT);
        let stack = NavigationStack::segment("pricing", None);
        doc.replace_content(GENERATED, false, &stack, &assets()).unwrap();

        let html = doc.outer_html();
        assert!(html.contains(r#"<body class="bg-white text-gray-900"><nav data-ngw-nav"#));
        assert!(html.contains(r#"<section class="hero">Pricing</section>"#));
        assert!(!html.contains("Overlay"));
        assert!(!html.contains("Menu"));
        assert!(!html.contains(r#"aria-label="breadcrumb""#));
        assert!(html.contains(".hero{}"));
        assert!(html.contains("<title>Acme</title>"));
        assert_eq!(html.matches("data-ngw-nav").count(), 1);
    }

    #[test]
    fn test_replace_content_can_skip_nav_injection() {
        let mut doc = Document::new(CURRENT);
        doc.replace_content(GENERATED, true, &NavigationStack::empty(), &assets())
            .unwrap();
        assert!(!doc.outer_html().contains("data-ngw-nav"));
        assert!(doc.outer_html().contains("Overlay"));
    }

    #[test]
    fn test_repeated_replacement_keeps_one_bar() {
        let mut doc = Document::new(CURRENT);
        let stack = NavigationStack::segment("pricing", None);
        doc.replace_content(GENERATED, false, &stack, &assets()).unwrap();
        let again = doc.outer_html().to_string();
        doc.replace_content(&again, false, &stack, &assets()).unwrap();
        assert_eq!(doc.outer_html().matches("<nav data-ngw-nav").count(), 1);
    }

    #[test]
    fn test_error_page_only_offers_landing() {
        let mut doc = Document::new(CURRENT);
        doc.render_error_page("Page generation timed out. Please try again in a moment.", &assets())
            .unwrap();
        let html = doc.outer_html();
        assert!(html.contains("Page generation timed out"));
        assert!(html.contains(r#"data-action="back-to-landing""#));
        assert!(!html.contains("Landing"));
        assert!(html.contains("<body>"));
    }
}
