use std::fmt;

/// Generated documents shorter than this are almost certainly truncated.
const MIN_DOCUMENT_LEN: usize = 200;

/// Something suspicious about a generated document. Never blocks display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    TooShort { len: usize },
    MissingBodyClose,
    MissingHtmlClose,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::TooShort { len } => {
                write!(f, "document is only {} bytes long", len)
            }
            ValidationWarning::MissingBodyClose => f.write_str("missing </body>"),
            ValidationWarning::MissingHtmlClose => f.write_str("missing </html>"),
        }
    }
}

/// Check a generated document and log what looks wrong.
pub fn validate_generated_html(html: &str) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let trimmed = html.trim();
    if trimmed.len() < MIN_DOCUMENT_LEN {
        warnings.push(ValidationWarning::TooShort { len: trimmed.len() });
    }
    let lower = trimmed.to_ascii_lowercase();
    if !lower.contains("</body>") {
        warnings.push(ValidationWarning::MissingBodyClose);
    }
    if !lower.contains("</html>") {
        warnings.push(ValidationWarning::MissingHtmlClose);
    }
    for warning in &warnings {
        tracing::warn!("generated HTML: {}", warning);
    }
    warnings
}
