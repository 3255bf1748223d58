/// Folds a single UTF-16 code unit to its lowercase form.
///
/// ASCII uppercase letters take the bit-twiddling fast path. Everything else
/// goes through the Unicode simple lowercase mapping, restricted to mappings
/// that stay a single BMP code unit; units without such a mapping (including
/// unpaired surrogates) are returned unchanged.
#[inline]
pub(crate) fn fold_code_unit(c: u16) -> u16 {
    if (u16::from(b'A')..=u16::from(b'Z')).contains(&c) {
        return c | 0x20;
    }
    if c < 0x80 {
        return c;
    }
    char::from_u32(u32::from(c)).map_or(c, |ch| {
        let mut lower = ch.to_lowercase();
        match (lower.next(), lower.next()) {
            (Some(l), None) => u16::try_from(u32::from(l)).unwrap_or(c),
            _ => c,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_ascii() {
        assert_eq!(fold_code_unit(u16::from(b'A')), u16::from(b'a'));
        assert_eq!(fold_code_unit(u16::from(b'Z')), u16::from(b'z'));
        assert_eq!(fold_code_unit(u16::from(b'a')), u16::from(b'a'));
        assert_eq!(fold_code_unit(u16::from(b'0')), u16::from(b'0'));
        assert_eq!(fold_code_unit(u16::from(b' ')), u16::from(b' '));
    }

    #[test]
    fn test_fold_bmp() {
        // U+00C9 LATIN CAPITAL LETTER E WITH ACUTE -> U+00E9
        assert_eq!(fold_code_unit(0x00C9), 0x00E9);
        // U+0410 CYRILLIC CAPITAL LETTER A -> U+0430
        assert_eq!(fold_code_unit(0x0410), 0x0430);
    }

    #[test]
    fn test_fold_no_single_unit_mapping() {
        // U+0130 LATIN CAPITAL LETTER I WITH DOT ABOVE lowercases to two
        // code points and must stay unchanged.
        assert_eq!(fold_code_unit(0x0130), 0x0130);
        // Unpaired surrogates are not characters and must stay unchanged.
        assert_eq!(fold_code_unit(0xD800), 0xD800);
        assert_eq!(fold_code_unit(0xDFFF), 0xDFFF);
    }
}
