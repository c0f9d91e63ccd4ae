//! Shared error utilities

use miette::{NamedSource, SourceSpan};
use std::path::Path;

/// Toggle this to add spaces for iTerm2 clickability
const ADD_SPACES_FOR_ITERM: bool = true;

/// Format a file path for error display
///
/// Paths under the working directory are shown relative to it. When
/// ADD_SPACES_FOR_ITERM is true, adds a space before the path to make it
/// clickable in iTerm2.
pub fn format_error_path(path: &Path) -> String {
    let display_path = std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok())
        .unwrap_or(path);
    let path_str = display_path.display().to_string();

    if ADD_SPACES_FOR_ITERM {
        format!(" {path_str}")
    } else {
        path_str
    }
}

/// Create a NamedSource with proper formatting for error display
pub fn create_named_source(path: &Path, content: String) -> NamedSource<String> {
    NamedSource::new(format_error_path(path), content)
}

/// Span for a 1-based line and column, clamped to the end of the source
pub fn line_column_span(source: &str, line: usize, column: usize) -> SourceSpan {
    let line_start = if line <= 1 {
        0
    } else {
        source
            .match_indices('\n')
            .nth(line - 2)
            .map(|(idx, _)| idx + 1)
            .unwrap_or(source.len())
    };

    SourceSpan::from((line_start + column.saturating_sub(1)).min(source.len()))
}
