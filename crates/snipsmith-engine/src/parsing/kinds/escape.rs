/// Backslash escapes that turn a special character into literal text.
pub struct Escape;

impl Escape {
    pub const LEAD: char = '\\';
    /// Characters that may follow [`Escape::LEAD`] at scope level.
    pub const SPECIALS: &'static str = "{}\\$`";
    /// Characters whose escapes are skipped while looking for a closing brace.
    pub const BRACES: &'static str = "{}";

    /// True if `lookahead` starts with `\` followed by one of `chars`.
    pub fn check(lookahead: &str, chars: &str) -> bool {
        let mut it = lookahead.chars();
        it.next() == Some(Self::LEAD) && it.next().is_some_and(|c| chars.contains(c))
    }
}
