use crate::eval::FragmentKind;

/// Backtick-delimited code fragments.
pub struct Fragment;

impl Fragment {
    pub const TICK: char = '`';
    pub const PROGRAM_TAG: &'static str = "`!p";
    pub const SCRIPT_TAG: &'static str = "`!v";

    /// Which fragment starts at `lookahead`, if any. Tagged kinds need a
    /// whitespace character right after the tag; anything else that starts
    /// with a backtick is shell code.
    pub fn kind(lookahead: &str) -> Option<FragmentKind> {
        if Self::tagged(lookahead, Self::PROGRAM_TAG) {
            Some(FragmentKind::Program)
        } else if Self::tagged(lookahead, Self::SCRIPT_TAG) {
            Some(FragmentKind::Script)
        } else if lookahead.starts_with(Self::TICK) {
            Some(FragmentKind::Shell)
        } else {
            None
        }
    }

    fn tagged(lookahead: &str, tag: &str) -> bool {
        lookahead
            .strip_prefix(tag)
            .and_then(|rest| rest.chars().next())
            .is_some_and(char::is_whitespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_fragment_kinds() {
        assert_eq!(Fragment::kind("`!p snip.rv"), Some(FragmentKind::Program));
        assert_eq!(Fragment::kind("`!v\tstrftime"), Some(FragmentKind::Script));
        assert_eq!(Fragment::kind("`date`"), Some(FragmentKind::Shell));
        assert_eq!(Fragment::kind("plain"), None);
    }

    #[test]
    fn tag_without_whitespace_is_shell() {
        assert_eq!(Fragment::kind("`!pwd`"), Some(FragmentKind::Shell));
        assert_eq!(Fragment::kind("`!v"), Some(FragmentKind::Shell));
    }
}
