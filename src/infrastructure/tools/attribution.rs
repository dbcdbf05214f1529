//! # Write Attribution
//!
//! Marks content written by the agent with comments in the target file's own
//! syntax: a header on new files, a trailing note on each changed line otherwise.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommentStyle {
    Line(&'static str),
    Block(&'static str, &'static str),
}

impl CommentStyle {
    fn for_path(path: &str) -> Self {
        let extension = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        match extension {
            "py" => CommentStyle::Line("# "),
            "js" | "ts" | "java" | "c" | "cpp" | "cs" | "rs" => CommentStyle::Line("// "),
            "html" | "xml" | "md" => CommentStyle::Block("<!-- ", " -->"),
            "css" | "scss" => CommentStyle::Block("/* ", " */"),
            _ => CommentStyle::Line("# "),
        }
    }

    fn wrap(&self, text: &str) -> String {
        match self {
            CommentStyle::Line(start) => format!("{start}{text}"),
            CommentStyle::Block(start, end) => format!("{start}{text}{end}"),
        }
    }
}

/// Annotated content plus the counts reported back to the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attributed {
    pub content: String,
    pub created: bool,
    pub lines: usize,
    /// Absolute difference in line count against the previous content.
    pub delta: usize,
}

/// `previous` is `None` when the file does not exist yet.
pub fn annotate(path: &str, previous: Option<&str>, content: &str, timestamp: &str) -> Attributed {
    let style = CommentStyle::for_path(path);

    let annotated = match previous {
        None => {
            let header = style.wrap(&format!("File created by AI Agent on {timestamp}"));
            if content.trim().is_empty() {
                format!("{header}\n")
            } else {
                format!("{header}\n{content}")
            }
        }
        Some(old) => {
            let note = format!(" {}", style.wrap(&format!("Modified by AI Agent on {timestamp}")));
            let old_lines: Vec<&str> = old.lines().collect();
            content
                .lines()
                .enumerate()
                .map(|(i, line)| {
                    let changed = old_lines.get(i).is_none_or(|old_line| *old_line != line);
                    if changed && !line.trim().is_empty() {
                        format!("{line}{note}")
                    } else {
                        line.to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
    };

    let lines = annotated.lines().count();
    let old_count = previous.map(|old| old.lines().count()).unwrap_or(0);

    Attributed {
        created: previous.is_none(),
        lines,
        delta: lines.abs_diff(old_count),
        content: annotated,
    }
}
