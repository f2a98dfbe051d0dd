use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Renders the label shown in a hunk header for a line number.
pub trait LineLocaliser: Send + Sync {
    /// Label for `line`, e.g. `Line 12:`.
    fn line_label(&self, line: u64) -> String;
}

/// Message template where `$1` stands for the line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineNumberTemplate {
    template: String,
}

impl LineNumberTemplate {
    /// Template from a message string such as `Zeile $1:`.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// English `Line $1:`.
    pub fn english() -> Self {
        Self::new("Line $1:")
    }
}

impl Default for LineNumberTemplate {
    fn default() -> Self {
        Self::english()
    }
}

impl LineLocaliser for LineNumberTemplate {
    fn line_label(&self, line: u64) -> String {
        self.template.replace("$1", &line.to_string())
    }
}

const PLACEHOLDER_PATTERN: &str = r"<!--LINE (\d+)-->";

fn placeholder() -> Option<&'static Regex> {
    static PLACEHOLDER: OnceLock<Option<Regex>> = OnceLock::new();
    PLACEHOLDER
        .get_or_init(|| match Regex::new(PLACEHOLDER_PATTERN) {
            Ok(regex) => Some(regex),
            Err(err) => {
                tracing::error!(error = %err, "line placeholder pattern rejected");
                None
            }
        })
        .as_ref()
}

/// Replaces every `<!--LINE n-->` placeholder with a localised label.
///
/// With `reduced` set, the label for line 1 is left empty.
pub fn localise_line_numbers<'b>(
    body: &'b str,
    localiser: &dyn LineLocaliser,
    reduced: bool,
) -> Cow<'b, str> {
    let Some(placeholder) = placeholder() else {
        return Cow::Borrowed(body);
    };
    placeholder.replace_all(body, |caps: &Captures<'_>| {
        let Ok(line) = caps[1].parse::<u64>() else {
            return caps[0].to_owned();
        };
        if reduced && line == 1 {
            return String::new();
        }
        html_escape::encode_text(&localiser.line_label(line)).into_owned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_pattern_compiles() {
        assert!(placeholder().is_some());
    }

    #[test]
    fn replaces_every_placeholder() {
        let body = "<td><!--LINE 3--></td><td><!--LINE 14--></td>";
        assert_eq!(
            localise_line_numbers(body, &LineNumberTemplate::english(), false),
            "<td>Line 3:</td><td>Line 14:</td>"
        );
    }

    #[test]
    fn same_body_serves_other_languages() {
        let body = "<!--LINE 7-->";
        let german = LineNumberTemplate::new("Zeile $1:");
        assert_eq!(localise_line_numbers(body, &german, false), "Zeile 7:");
    }

    #[test]
    fn reduced_mode_blanks_line_one() {
        let body = "[<!--LINE 1-->][<!--LINE 2-->]";
        assert_eq!(
            localise_line_numbers(body, &LineNumberTemplate::english(), true),
            "[][Line 2:]"
        );
    }

    #[test]
    fn labels_are_escaped() {
        let odd = LineNumberTemplate::new("<b>$1</b>");
        assert_eq!(
            localise_line_numbers("<!--LINE 2-->", &odd, false),
            "&lt;b&gt;2&lt;/b&gt;"
        );
    }

    #[test]
    fn body_without_placeholders_is_borrowed() {
        let out = localise_line_numbers("<tr></tr>", &LineNumberTemplate::english(), false);
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn oversized_numbers_are_left_alone() {
        let body = "<!--LINE 99999999999999999999999-->";
        assert_eq!(
            localise_line_numbers(body, &LineNumberTemplate::english(), false),
            body
        );
    }
}
