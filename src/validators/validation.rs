//! Validation infrastructure
//!
//! A [`ValidationContext`] collects the diagnostics of one validation run;
//! every schema kind implements [`DocumentValidator`] on top of it.

use crate::documents::Document;
use crate::error::{Diagnostic, Error, Result, Severity};
use roxmltree::Node;

/// A schema that can check a parsed document
pub trait DocumentValidator {
    /// Short name used in log records (`"DTD"`, `"XSD"`)
    fn kind(&self) -> &'static str;

    /// Check `document`, reporting problems through `context`
    fn validate_document(&self, document: &Document<'_>, context: &mut ValidationContext<'_, '_>);
}

/// Collected state of a single validation run
#[derive(Debug)]
pub struct ValidationContext<'d, 'input> {
    document: &'d Document<'input>,
    diagnostics: Vec<Diagnostic>,
}

impl<'d, 'input> ValidationContext<'d, 'input> {
    /// Create a context for `document`
    pub fn new(document: &'d Document<'input>) -> Self {
        Self {
            document,
            diagnostics: Vec::new(),
        }
    }

    /// The document being validated
    pub fn document(&self) -> &'d Document<'input> {
        self.document
    }

    /// Report a validity error at `node`
    pub fn error(&mut self, node: Node<'_, '_>, message: impl Into<String>) {
        self.report(Some(node), Severity::Error, message.into());
    }

    /// Report a warning at `node`
    pub fn warning(&mut self, node: Option<Node<'_, '_>>, message: impl Into<String>) {
        self.report(node, Severity::Warning, message.into());
    }

    /// Report a problem that stops validation
    pub fn fatal(&mut self, message: impl Into<String>) {
        self.report(None, Severity::Fatal, message.into());
    }

    fn report(&mut self, node: Option<Node<'_, '_>>, severity: Severity, message: String) {
        let mut diagnostic = Diagnostic::new(message).with_severity(severity);

        if let Some(node) = node {
            let (line, column) = self.document.position(node);
            diagnostic = diagnostic
                .with_position(line, column)
                .with_path(element_path(node));
        }

        tracing::warn!(
            severity = %diagnostic.severity,
            line = diagnostic.line,
            column = diagnostic.column,
            "{}",
            diagnostic.message
        );

        self.diagnostics.push(diagnostic);
    }

    /// Whether any error has been reported so far
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Finish the run
    pub fn into_report(self) -> ValidationReport {
        ValidationReport {
            diagnostics: self.diagnostics,
        }
    }
}

/// `/root/child/grandchild` path of an element
pub fn element_path(node: Node<'_, '_>) -> String {
    let mut names: Vec<&str> = node
        .ancestors()
        .filter(|n| n.is_element())
        .map(|n| n.tag_name().name())
        .collect();
    names.reverse();

    let mut path = String::new();
    for name in names {
        path.push('/');
        path.push_str(name);
    }
    path
}

/// Outcome of validating one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Every diagnostic in reporting order
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    /// A report with nothing in it
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the document is valid (warnings allowed)
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Error and fatal diagnostics
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    /// Warning diagnostics
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    /// Turn an invalid report into [`Error::SchemaValidation`] with `reason`
    pub fn into_result(self, reason: &str) -> Result<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(Error::SchemaValidation {
                reason: reason.to_string(),
                diagnostics: self.diagnostics,
            })
        }
    }
}
