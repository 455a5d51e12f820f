use std::fmt;
use std::ops::Range;

/// Line context of the token the parser stopped at.
#[derive(Debug, Clone)]
pub struct ErrorHighlight {
    pub line: usize,
    pub column: usize,
    pub line_text: String,
    pub pointer_line: String,
}

impl ErrorHighlight {
    /// Renders the line followed by a `^` marker under the offending column.
    pub fn render(&self) -> String {
        format!(
            "line {} column {}\n{}\n{}",
            self.line, self.column, self.line_text, self.pointer_line
        )
    }

    /// Locates `span` inside `source`.
    pub fn from_span(source: &str, span: Range<usize>) -> Option<Self> {
        if source.is_empty() {
            return None;
        }

        let mut offset = span.start.min(source.len());
        if offset == source.len() {
            offset -= 1;
        }
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }

        let line_start = source[..offset].rfind('\n').map_or(0, |pos| pos + 1);
        let line_end = source[offset..].find('\n').map_or(source.len(), |pos| offset + pos);
        let line = source[..line_start].matches('\n').count() + 1;

        let prefix = &source[line_start..offset];
        let column = prefix.chars().count() + 1;
        // Tabs are kept so the marker lines up in terminals.
        let mut pointer_line: String = prefix.chars().map(|c| if c == '\t' { '\t' } else { ' ' }).collect();
        pointer_line.push('^');

        Some(ErrorHighlight {
            line,
            column,
            line_text: source[line_start..line_end].trim_end_matches('\r').to_owned(),
            pointer_line,
        })
    }
}

impl fmt::Display for ErrorHighlight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlight_second_line() {
        let source = "#usda 1.0\ndef Xform \"World\" ]";
        let offset = source.find(']').unwrap();
        let highlight = ErrorHighlight::from_span(source, offset..offset + 1).unwrap();
        assert_eq!(highlight.line, 2);
        assert_eq!(highlight.column, 19);
        assert_eq!(highlight.line_text, "def Xform \"World\" ]");
        assert_eq!(highlight.pointer_line.len(), 19);
        assert!(highlight.render().starts_with("line 2 column 19"));
    }

    #[test]
    fn empty_source_has_no_highlight() {
        assert!(ErrorHighlight::from_span("", 0..0).is_none());
    }
}
