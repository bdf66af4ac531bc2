use super::indent::IndentUtil;

/// Indentation helpers handed to program fragments, plus the `rv` slot a
/// fragment may fill instead of returning its text.
///
/// `indent` starts at the expansion's base indent (tabs expanded) and is
/// moved by [`shift`](Self::shift) and [`unshift`](Self::unshift).
#[derive(Debug, Clone)]
pub struct SnippetUtil {
    indent_util: IndentUtil,
    initial_indent: String,
    pub indent: String,
    current: String,
    rv: Option<String>,
}

impl SnippetUtil {
    pub fn new(initial_indent: &str, current: impl Into<String>, indent_util: IndentUtil) -> Self {
        let initial_indent = indent_util.indent_to_spaces(initial_indent);
        Self {
            indent_util,
            indent: initial_indent.clone(),
            initial_indent,
            current: current.into(),
            rv: None,
        }
    }

    /// The fragment's text before this evaluation.
    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn rv(&self) -> &str {
        self.rv.as_deref().unwrap_or_default()
    }

    pub fn set_rv(&mut self, value: impl Into<String>) {
        self.rv = Some(value.into());
    }

    pub fn rv_changed(&self) -> bool {
        self.rv.is_some()
    }

    pub(crate) fn take_rv(&mut self) -> Option<String> {
        self.rv.take()
    }

    pub fn shift(&mut self, amount: usize) {
        let width = self.indent_util.sw() * amount;
        self.indent.extend(std::iter::repeat_n(' ', width));
    }

    pub fn unshift(&mut self, amount: usize) {
        let width = self.indent_util.sw() * amount;
        let keep = self.indent.chars().count().saturating_sub(width);
        self.indent = self.indent.chars().take(keep).collect();
    }

    pub fn reset_indent(&mut self) {
        self.indent = self.initial_indent.clone();
    }

    /// Prefixes `line` with an indent. Without an explicit one the current
    /// indent is used, minus the base indent while `rv` is still a single
    /// line (the host already indented the first line).
    pub fn mkline(&self, line: &str, indent: Option<&str>) -> String {
        let indent = match indent {
            Some(explicit) => explicit.to_string(),
            None => {
                let mut indent = self.indent.clone();
                if !self.rv().contains('\n') {
                    indent = indent
                        .chars()
                        .skip(self.initial_indent.chars().count())
                        .collect();
                }
                self.indent_util.spaces_to_indent(&indent)
            }
        };
        indent + line
    }

    /// Appends a new, properly indented line to `rv`.
    pub fn push_line(&mut self, line: &str) {
        let mut rv = self.rv.take().unwrap_or_default();
        rv.push('\n');
        self.rv = Some(rv);
        let line = self.mkline(line, None);
        if let Some(rv) = self.rv.as_mut() {
            rv.push_str(&line);
        }
    }
}
