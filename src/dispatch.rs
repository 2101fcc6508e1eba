//! Click delegation.
//!
//! A click is resolved by walking an ordered list of rules. Each rule looks
//! for the nearest element on the clicked path (clicked element first, then
//! its ancestors) carrying its attributes; the first rule that produces an
//! action wins. Clicks no rule claims are inert.

use std::fmt;

use scraper::{ElementRef, Html};

use crate::dom::parse_selector;
use crate::error::Result;

/// One element on the clicked path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickedElement {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
}

impl ClickedElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Attribute value, if present and not blank.
    fn non_empty(&self, name: &str) -> Option<&str> {
        self.attr(name).map(str::trim).filter(|v| !v.is_empty())
    }

    fn from_element(el: ElementRef<'_>) -> Self {
        let node = el.value();
        Self {
            tag: node.name().to_string(),
            attributes: node
                .attrs()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
            text: normalize_whitespace(&el.text().collect::<String>()),
        }
    }
}

/// The clicked element followed by its ancestors, innermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickTarget {
    path: Vec<ClickedElement>,
}

impl ClickTarget {
    pub fn new(clicked: ClickedElement) -> Self {
        Self {
            path: vec![clicked],
        }
    }

    pub fn with_ancestor(mut self, ancestor: ClickedElement) -> Self {
        self.path.push(ancestor);
        self
    }

    /// Resolve the first element matching `css` in a serialized document.
    pub fn from_document(html: &str, css: &str) -> Result<Option<Self>> {
        let selector = parse_selector(css)?;
        let parsed = Html::parse_document(html);
        let Some(el) = parsed.select(&selector).next() else {
            return Ok(None);
        };
        let mut path = vec![ClickedElement::from_element(el)];
        path.extend(
            el.ancestors()
                .filter_map(ElementRef::wrap)
                .map(ClickedElement::from_element),
        );
        Ok(Some(Self { path }))
    }

    pub fn path(&self) -> &[ClickedElement] {
        &self.path
    }

    /// Nearest element on the path that satisfies `pred`, like `closest()`.
    fn closest(&self, pred: impl Fn(&ClickedElement) -> bool) -> Option<&ClickedElement> {
        self.path.iter().find(|el| pred(el))
    }
}

/// Deprecated item attributes still emitted by older generated pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyAttribute {
    FeatureId,
    SolutionId,
    CapabilityId,
    ItemId,
}

impl LegacyAttribute {
    pub const ALL: [LegacyAttribute; 4] = [
        LegacyAttribute::FeatureId,
        LegacyAttribute::SolutionId,
        LegacyAttribute::CapabilityId,
        LegacyAttribute::ItemId,
    ];

    pub fn attribute(&self) -> &'static str {
        match self {
            LegacyAttribute::FeatureId => "data-feature-id",
            LegacyAttribute::SolutionId => "data-solution-id",
            LegacyAttribute::CapabilityId => "data-capability-id",
            LegacyAttribute::ItemId => "data-item-id",
        }
    }

    /// Segment the item belongs to when neither the element nor the
    /// current page names one.
    pub fn default_segment(&self) -> Option<&'static str> {
        match self {
            LegacyAttribute::FeatureId => Some("features"),
            LegacyAttribute::SolutionId => Some("solutions"),
            LegacyAttribute::CapabilityId => Some("capabilities"),
            LegacyAttribute::ItemId => None,
        }
    }
}

/// What a click asks the controller to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavAction {
    Segment {
        slug: String,
    },
    Topic {
        parent: String,
        topic: String,
    },
    /// Old-style item link; handled exactly like `Topic`.
    LegacyItem {
        attribute: LegacyAttribute,
        parent: String,
        item: String,
    },
    BackToLanding,
    Cta {
        cta_type: String,
        label: String,
    },
}

impl NavAction {
    /// Map deprecated variants onto the transition they stand for.
    pub fn into_canonical(self) -> Self {
        match self {
            NavAction::LegacyItem { parent, item, .. } => NavAction::Topic {
                parent,
                topic: item,
            },
            other => other,
        }
    }

    /// Identifier recorded in the behavior signals.
    pub fn click_id(&self) -> String {
        match self {
            NavAction::Segment { slug } => format!("segment:{}", slug),
            NavAction::Topic { parent, topic } => format!("topic:{}/{}", parent, topic),
            NavAction::LegacyItem { parent, item, .. } => format!("topic:{}/{}", parent, item),
            NavAction::BackToLanding => "back-to-landing".to_string(),
            NavAction::Cta { cta_type, .. } => format!("cta:{}", cta_type),
        }
    }
}

impl fmt::Display for NavAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.click_id())
    }
}

/// Page state the rules may consult.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchContext<'a> {
    /// Slug of the current root segment, if any
    pub current_segment: Option<&'a str>,
}

type Matcher = fn(&ClickTarget, &DispatchContext<'_>) -> Option<NavAction>;

/// A named predicate/handler pair.
pub struct Rule {
    pub name: &'static str,
    matcher: Matcher,
}

/// Evaluated top to bottom; the order settles attribute clashes.
pub const RULES: &[Rule] = &[
    Rule {
        name: "segment",
        matcher: match_segment,
    },
    Rule {
        name: "topic",
        matcher: match_topic,
    },
    Rule {
        name: "legacy-item",
        matcher: match_legacy_item,
    },
    Rule {
        name: "back-to-landing",
        matcher: match_back_to_landing,
    },
    Rule {
        name: "cta",
        matcher: match_cta,
    },
];

const CTA_ACTIONS: [&str; 3] = ["cta-primary", "cta-secondary", "cta-footer"];

/// Resolve a click. Returns the winning rule's name and its action.
pub fn dispatch(target: &ClickTarget, ctx: &DispatchContext<'_>) -> Option<(&'static str, NavAction)> {
    RULES
        .iter()
        .find_map(|rule| (rule.matcher)(target, ctx).map(|action| (rule.name, action)))
}

fn match_segment(target: &ClickTarget, _: &DispatchContext<'_>) -> Option<NavAction> {
    let el = target.closest(|el| el.non_empty("data-segment").is_some())?;
    Some(NavAction::Segment {
        slug: el.non_empty("data-segment")?.to_string(),
    })
}

fn match_topic(target: &ClickTarget, _: &DispatchContext<'_>) -> Option<NavAction> {
    let el = target.closest(|el| {
        el.non_empty("data-topic").is_some() && el.non_empty("data-parent-segment").is_some()
    })?;
    Some(NavAction::Topic {
        parent: el.non_empty("data-parent-segment")?.to_string(),
        topic: el.non_empty("data-topic")?.to_string(),
    })
}

fn match_legacy_item(target: &ClickTarget, ctx: &DispatchContext<'_>) -> Option<NavAction> {
    let (el, attribute) = target.path.iter().find_map(|el| {
        LegacyAttribute::ALL
            .into_iter()
            .find(|a| el.non_empty(a.attribute()).is_some())
            .map(|a| (el, a))
    })?;
    let item = el.non_empty(attribute.attribute())?.to_string();
    let parent = el
        .non_empty("data-parent-segment")
        .or(ctx.current_segment)
        .or(attribute.default_segment());
    let Some(parent) = parent else {
        tracing::debug!(item = %item, "legacy item without a segment; ignoring");
        return None;
    };
    tracing::debug!(attribute = attribute.attribute(), "deprecated item attribute clicked");
    Some(NavAction::LegacyItem {
        attribute,
        parent: parent.to_string(),
        item,
    })
}

fn match_back_to_landing(target: &ClickTarget, _: &DispatchContext<'_>) -> Option<NavAction> {
    target
        .closest(|el| el.attr("data-action") == Some("back-to-landing"))
        .map(|_| NavAction::BackToLanding)
}

fn match_cta(target: &ClickTarget, _: &DispatchContext<'_>) -> Option<NavAction> {
    let el = target.closest(|el| {
        el.attr("data-action")
            .is_some_and(|action| CTA_ACTIONS.contains(&action))
    })?;
    Some(NavAction::Cta {
        cta_type: el.non_empty("data-cta-type").unwrap_or("default").to_string(),
        label: el.text.clone(),
    })
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
