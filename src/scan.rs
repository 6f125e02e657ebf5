//! Lexical helpers shared by the front end and the recognizers.
//!
//! All functions are aware of quoted strings, template literals (including
//! `${...}` holes) and comments, so brackets inside them never count.

fn closer(open: u8) -> u8 {
    match open {
        b'(' => b')',
        b'[' => b']',
        _ => b'}',
    }
}

/// Index just past the closing quote of the string starting at `start`.
/// Unterminated strings run to the end of input.
pub fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            c if c == quote => return i + 1,
            b'\n' => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Index just past the closing backtick of the template literal at `start`.
pub fn skip_template(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return Some(i + 1),
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                i = match_bracket(bytes, i + 1)? + 1;
            }
            _ => i += 1,
        }
    }
    None
}

/// If a comment starts at `start`, the index just past it.
pub fn skip_comment(bytes: &[u8], start: usize) -> Option<usize> {
    if bytes.get(start) != Some(&b'/') {
        return None;
    }
    match bytes.get(start + 1) {
        Some(b'/') => {
            let mut i = start + 2;
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            Some(i)
        }
        Some(b'*') => {
            let mut i = start + 2;
            while i + 1 < bytes.len() {
                if bytes[i] == b'*' && bytes[i + 1] == b'/' {
                    return Some(i + 2);
                }
                i += 1;
            }
            Some(bytes.len())
        }
        _ => None,
    }
}

/// Skips whatever lexical unit starts at `i` if it is a string, template or
/// comment. Returns `None` when `i` starts ordinary code.
pub fn skip_opaque(bytes: &[u8], i: usize) -> Option<usize> {
    match bytes[i] {
        b'\'' | b'"' => Some(skip_string(bytes, i)),
        b'`' => Some(skip_template(bytes, i).unwrap_or(bytes.len())),
        b'/' => skip_comment(bytes, i),
        _ => None,
    }
}

fn match_bracket(bytes: &[u8], open: usize) -> Option<usize> {
    let first = *bytes.get(open)?;
    if !matches!(first, b'(' | b'[' | b'{') {
        return None;
    }
    let mut stack = vec![closer(first)];
    let mut i = open + 1;
    while i < bytes.len() {
        if let Some(next) = skip_opaque(bytes, i) {
            i = next;
            continue;
        }
        match bytes[i] {
            c @ (b'(' | b'[' | b'{') => stack.push(closer(c)),
            c @ (b')' | b']' | b'}') => {
                if stack.pop()? != c {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index of the bracket closing the one at `open`.
pub fn find_matching(code: &str, open: usize) -> Option<usize> {
    match_bracket(code.as_bytes(), open)
}

/// Splits `code` on `sep` occurring outside brackets, strings and comments.
/// Pieces are trimmed; a trailing empty piece (trailing comma) is dropped.
pub fn split_top_level(code: &str, sep: u8) -> Vec<String> {
    let bytes = code.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if let Some(next) = skip_opaque(bytes, i) {
            i = next;
            continue;
        }
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                parts.push(code[start..i].trim().to_string());
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(code[start..].trim().to_string());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Position of the first `needle` byte at bracket depth zero, outside strings.
pub fn find_top_level(code: &str, needle: u8) -> Option<usize> {
    let bytes = code.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        if let Some(next) = skip_opaque(bytes, i) {
            i = next;
            continue;
        }
        match bytes[i] {
            c if c == needle && depth == 0 => return Some(i),
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_ignores_brackets_in_strings_and_templates() {
        let code = "Text(')' + `(${a(1)}`)";
        assert_eq!(find_matching(code, 4), Some(code.len() - 1));
    }

    #[test]
    fn matching_rejects_mismatched_closers() {
        assert_eq!(find_matching("(a]", 0), None);
        assert_eq!(find_matching("(a", 0), None);
    }

    #[test]
    fn matching_skips_comments() {
        let code = "{ // }\n a }";
        assert_eq!(find_matching(code, 0), Some(code.len() - 1));
    }

    #[test]
    fn split_respects_nesting() {
        assert_eq!(
            split_top_level("a, f(b, c), { d: 1, e: 2 }, 'x,y'", b','),
            vec!["a", "f(b, c)", "{ d: 1, e: 2 }", "'x,y'"]
        );
        assert_eq!(split_top_level("", b','), Vec::<String>::new());
        assert_eq!(split_top_level("a, b,", b','), vec!["a", "b"]);
    }

    #[test]
    fn find_top_level_skips_nested() {
        assert_eq!(find_top_level("f(a = 1) = 2", b'='), Some(9));
        assert_eq!(find_top_level("'='", b'='), None);
    }
}
