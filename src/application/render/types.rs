use thiserror::Error;

/// Output of compiling one post body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPost {
    /// Sanitised HTML ready to embed in the post layout.
    pub html: String,
    /// Indicates whether the body contains highlighted code blocks.
    pub contains_code: bool,
    /// Indicates whether the body contains Mermaid diagrams, which need the
    /// client-side renderer.
    pub contains_mermaid: bool,
}

/// Structured errors surfaced by the compile pipeline.
///
/// The display strings double as the user-facing classification keys used by
/// [`super::describe_failure`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("Could not parse `<{component}>` at {line}:{column}: {reason}")]
    Syntax {
        component: String,
        line: usize,
        column: usize,
        reason: String,
    },
    #[error(
        "Unexpected character `{found}` (U+{code:04X}) at {line}:{column} in `<{component}>` tag"
    )]
    UnexpectedCharacter {
        component: String,
        found: char,
        code: u32,
        line: usize,
        column: usize,
    },
    #[error(
        "Expected component `{name}` to be defined: you likely forgot to import, export, or provide it."
    )]
    UnknownComponent { name: String },
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
    #[error("syntax highlighting failed: {language}: {message}")]
    Highlighting { language: String, message: String },
}

impl RenderError {
    pub(crate) fn unexpected(component: &str, found: char, (line, column): (usize, usize)) -> Self {
        Self::UnexpectedCharacter {
            component: component.to_string(),
            found,
            code: u32::from(found),
            line,
            column,
        }
    }

    pub(crate) fn syntax(
        component: &str,
        (line, column): (usize, usize),
        reason: impl Into<String>,
    ) -> Self {
        Self::Syntax {
            component: component.to_string(),
            line,
            column,
            reason: reason.into(),
        }
    }
}

/// Pure MDX-to-HTML compiler. Implementations must be deterministic: the same
/// source yields the same output or error.
pub trait RenderService: Send + Sync {
    fn compile(&self, source: &str) -> Result<CompiledPost, RenderError>;
}
