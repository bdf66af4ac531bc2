/// Indentation settings of the host buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndentUtil {
    /// Columns per indent level; 0 means "same as `tabstop`".
    pub shiftwidth: usize,
    /// Columns per tab character.
    pub tabstop: usize,
    /// Indent with spaces instead of tabs.
    pub expandtab: bool,
}

impl Default for IndentUtil {
    fn default() -> Self {
        Self {
            shiftwidth: 4,
            tabstop: 4,
            expandtab: true,
        }
    }
}

impl IndentUtil {
    /// Effective shiftwidth.
    pub fn sw(&self) -> usize {
        if self.shiftwidth == 0 {
            self.tabstop
        } else {
            self.shiftwidth
        }
    }

    /// Expands tabs to spaces, each tab running to the next tab stop.
    pub fn indent_to_spaces(&self, indent: &str) -> String {
        let ts = self.tabstop.max(1);
        let mut out = String::with_capacity(indent.len());
        let mut col = 0;
        for c in indent.chars() {
            if c == '\t' {
                let width = ts - col % ts;
                out.extend(std::iter::repeat_n(' ', width));
                col += width;
            } else {
                out.push(c);
                col += 1;
            }
        }
        out
    }

    /// Turns runs of `tabstop` spaces back into tabs unless `expandtab`.
    pub fn spaces_to_indent(&self, indent: &str) -> String {
        if self.expandtab || self.tabstop == 0 {
            return indent.to_string();
        }
        indent.replace(&" ".repeat(self.tabstop), "\t")
    }
}
