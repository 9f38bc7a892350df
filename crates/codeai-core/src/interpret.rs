//! Response interpretation.
//!
//! Converts the raw text returned by a model into an ordered list of
//! [`Block`]s. Only three constructs are recognized: ATX-style headings,
//! fenced code regions and plain lines. Everything else degrades to a
//! paragraph, so [`parse`] never fails.

use serde::{Deserialize, Serialize};

const FENCE: &str = "```";
const MAX_HEADING_LEVEL: u8 = 6;

/// One unit of interpreted content, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// `# Title` style line. `level` is in `1..=6`.
    Heading { level: u8, text: String },
    /// A single non-blank line with backticks and asterisks removed.
    Paragraph { text: String },
    /// Verbatim lines between an opening and a closing fence.
    CodeBlock { lines: Vec<String> },
}

impl Block {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self::Heading {
            level: level.clamp(1, MAX_HEADING_LEVEL),
            text: text.into(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::Paragraph { text: text.into() }
    }

    pub fn code<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::CodeBlock {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

/// Interprets `text` as a sequence of blocks.
///
/// Scans line by line with a single "inside fence" flag:
/// - a line whose trimmed form starts with three backticks opens or closes a
///   fence and is itself consumed (including any language tag);
/// - lines inside a fence are buffered untouched;
/// - outside a fence, `#`+ followed by whitespace is a heading, any other
///   non-blank line is a paragraph, blank lines are skipped.
///
/// A fence still open at end of input is dropped together with its lines.
pub fn parse(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut inside_fence = false;
    let mut code_lines: Vec<String> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with(FENCE) {
            if inside_fence {
                blocks.push(Block::CodeBlock {
                    lines: std::mem::take(&mut code_lines),
                });
            } else {
                code_lines.clear();
            }
            inside_fence = !inside_fence;
            continue;
        }

        if inside_fence {
            code_lines.push(line.to_string());
        } else if let Some((level, heading)) = split_heading(trimmed) {
            blocks.push(Block::Heading {
                level,
                text: heading.to_string(),
            });
        } else if !trimmed.is_empty() {
            blocks.push(Block::Paragraph {
                text: strip_inline_markers(trimmed),
            });
        }
    }

    blocks
}

/// Returns `(level, text)` when `line` is `#`+ followed by whitespace.
fn split_heading(line: &str) -> Option<(u8, &str)> {
    let rest = line.trim_start_matches('#');
    let hashes = line.len() - rest.len();
    if hashes == 0 || !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let level = hashes.min(usize::from(MAX_HEADING_LEVEL)) as u8;
    Some((level, rest.trim_start()))
}

fn strip_inline_markers(line: &str) -> String {
    line.chars().filter(|c| !matches!(c, '`' | '*')).collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_empty_input_yields_nothing() {
        assert_eq!(parse(""), Vec::<Block>::new());
    }

    #[test]
    fn test_heading_paragraph_and_code() {
        let blocks = parse("# Title\nHello\n```\ncode line\n```\n");
        assert_eq!(
            blocks,
            vec![
                Block::heading(1, "Title"),
                Block::paragraph("Hello"),
                Block::code(["code line"]),
            ]
        );
    }

    #[rstest]
    #[case("# One", 1, "One")]
    #[case("### Three", 3, "Three")]
    #[case("###### Six", 6, "Six")]
    #[case("####### Too Deep", 6, "Too Deep")]
    #[case("############ Way Too Deep", 6, "Way Too Deep")]
    #[case("##\tTabbed", 2, "Tabbed")]
    #[case("   ##    Indented   ", 2, "Indented")]
    fn test_heading_levels(#[case] input: &str, #[case] level: u8, #[case] text: &str) {
        assert_eq!(
            parse(input),
            vec![Block::Heading {
                level,
                text: text.to_string()
            }]
        );
    }

    #[rstest]
    #[case("#hashtag", "#hashtag")]
    #[case("#", "#")]
    #[case("#   ", "#")]
    #[case("not # a heading", "not # a heading")]
    fn test_hash_without_whitespace_is_paragraph(#[case] input: &str, #[case] text: &str) {
        assert_eq!(parse(input), vec![Block::paragraph(text)]);
    }

    #[rstest]
    #[case("a*b*c `d`", "abc d")]
    #[case("**bold** and *em*", "bold and em")]
    #[case("`inline` code", "inline code")]
    #[case("***", "")]
    #[case("  ` `  ", " ")]
    #[case("_under_ [link](x) ~x~", "_under_ [link](x) ~x~")]
    fn test_paragraph_strips_backticks_and_asterisks(#[case] input: &str, #[case] text: &str) {
        assert_eq!(parse(input), vec![Block::paragraph(text)]);
    }

    #[test]
    fn test_blank_lines_emit_nothing() {
        assert_eq!(
            parse("first\n\n   \n\t\nsecond\n"),
            vec![Block::paragraph("first"), Block::paragraph("second")]
        );
    }

    #[test]
    fn test_unterminated_fence_discards_buffer() {
        assert_eq!(parse("```\norphan\n"), Vec::<Block>::new());
    }

    #[test]
    fn test_unterminated_fence_keeps_earlier_blocks() {
        assert_eq!(
            parse("# Setup\nRun this:\n```rust\nfn main() {}\n"),
            vec![Block::heading(1, "Setup"), Block::paragraph("Run this:")]
        );
    }

    #[test]
    fn test_fence_language_tag_is_consumed() {
        assert_eq!(
            parse("```rust\nlet x = 1;\n```"),
            vec![Block::code(["let x = 1;"])]
        );
    }

    #[test]
    fn test_code_lines_are_verbatim() {
        assert_eq!(
            parse("```\n    indented *star* `tick`\n\n# not a heading\n```"),
            vec![Block::code([
                "    indented *star* `tick`",
                "",
                "# not a heading"
            ])]
        );
    }

    #[test]
    fn test_empty_fence_is_empty_code_block() {
        assert_eq!(parse("```\n```"), vec![Block::CodeBlock { lines: vec![] }]);
    }

    #[test]
    fn test_indented_fence_and_trailing_text_on_close() {
        assert_eq!(
            parse("  ```python\nprint(1)\n  ``` done\nafter"),
            vec![Block::code(["print(1)"]), Block::paragraph("after")]
        );
    }

    #[test]
    fn test_consecutive_fences_reset_buffer() {
        assert_eq!(
            parse("```\na\n```\n```\nb\n```"),
            vec![Block::code(["a"]), Block::code(["b"])]
        );
    }

    #[test]
    fn test_crlf_line_endings() {
        assert_eq!(
            parse("# T\r\n```\r\nx = 1\r\n```\r\n"),
            vec![Block::heading(1, "T"), Block::code(["x = 1"])]
        );
    }

    /// Without fences every non-blank line maps to exactly one block, in order.
    #[test]
    fn test_fence_free_input_is_line_for_line() {
        const LINES: &[&str] = &[
            "",
            "   ",
            "# h",
            "####### deep",
            "#tag",
            "a*b",
            "`x`",
            "  text  ",
            "``",
        ];

        for a in LINES {
            for b in LINES {
                for c in LINES {
                    let source = [*a, *b, *c].join("\n");
                    let blocks = parse(&source);

                    assert!(
                        !blocks
                            .iter()
                            .any(|block| matches!(block, Block::CodeBlock { .. })),
                        "unexpected code block for {source:?}"
                    );

                    let expected: Vec<Block> = [*a, *b, *c]
                        .iter()
                        .flat_map(|line| parse(line))
                        .collect();
                    assert_eq!(blocks, expected, "order differs for {source:?}");

                    let non_blank = [*a, *b, *c]
                        .iter()
                        .filter(|line| !line.trim().is_empty())
                        .count();
                    assert_eq!(blocks.len(), non_blank, "count differs for {source:?}");
                }
            }
        }
    }

    #[test]
    fn test_block_serializes_with_type_tag() {
        let json = serde_json::to_value(Block::heading(2, "Intro")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "heading", "level": 2, "text": "Intro"})
        );
    }
}
