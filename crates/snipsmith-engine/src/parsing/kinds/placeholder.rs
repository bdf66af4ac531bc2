/// Dollar-sigil placeholders: tabstops, mirrors and transformations.
pub struct Placeholder;

impl Placeholder {
    pub const SIGIL: char = '$';
    pub const OPEN: &'static str = "${";
    pub const CLOSE: char = '}';
    pub const DEFAULT_SEP: char = ':';
    pub const SEGMENT_SEP: char = '/';

    /// `${N/`
    pub fn is_transformation(lookahead: &str) -> bool {
        after_number(lookahead, Self::OPEN) == Some(Some(Self::SEGMENT_SEP))
    }

    /// `${N:` or `${N}`
    pub fn is_tabstop(lookahead: &str) -> bool {
        matches!(
            after_number(lookahead, Self::OPEN),
            Some(Some(Self::DEFAULT_SEP | Self::CLOSE))
        )
    }

    /// `$N`
    pub fn is_mirror(lookahead: &str) -> bool {
        let mut buf = [0u8; 4];
        after_number(lookahead, Self::SIGIL.encode_utf8(&mut buf)).is_some()
    }
}

/// Strips `prefix`, then at least one ASCII digit. Returns the character that
/// follows the digits (`None` inside when the input ends there), or `None`
/// when the shape does not match.
fn after_number(s: &str, prefix: &str) -> Option<Option<char>> {
    let rest = s.strip_prefix(prefix)?;
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    Some(rest[digits..].chars().next())
}
