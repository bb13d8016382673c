use std::fmt;

pub const NAME_CHARS: [u8; 32] = *b".12345abcdefghijklmnopqrstuvwxyz";
pub const NAME_MAX_LEN: usize = 13;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParseNameError {
    /// The name contains a disallowed character.
    BadChar(u8),
    /// The name is over the maximum allowed length.
    TooLong,
}

impl fmt::Display for ParseNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseNameError::BadChar(c) => write!(f, "bad character '{}'", *c as char),
            ParseNameError::TooLong => write!(f, "name is too long"),
        }
    }
}

/// Packs up to 13 characters: twelve 5-bit symbols followed by one 4-bit
/// symbol that must fall in `.` to `j`.
pub fn name_from_bytes<I>(iter: I) -> Result<u64, ParseNameError>
where
    I: IntoIterator<Item = u8>,
{
    let mut value = 0u64;
    for (i, c) in iter.into_iter().enumerate() {
        let symbol = u64::from(char_to_symbol(c).ok_or(ParseNameError::BadChar(c))?);
        match i {
            0..=11 => value |= symbol << (59 - 5 * i),
            12 if symbol <= 0x0F => value |= symbol,
            12 => return Err(ParseNameError::BadChar(c)),
            _ => return Err(ParseNameError::TooLong),
        }
    }
    Ok(value)
}

fn char_to_symbol(c: u8) -> Option<u8> {
    match c {
        b'.' => Some(0),
        b'1'..=b'5' => Some(c - b'1' + 1),
        b'a'..=b'z' => Some(c - b'a' + 6),
        _ => None,
    }
}

pub fn name_to_bytes(value: u64) -> [u8; NAME_MAX_LEN] {
    let mut chars = [b'.'; NAME_MAX_LEN];
    for (i, c) in chars.iter_mut().enumerate() {
        let symbol = if i < 12 {
            (value >> (59 - 5 * i)) & 0x1F
        } else {
            value & 0x0F
        };
        *c = NAME_CHARS[symbol as usize];
    }
    chars
}
