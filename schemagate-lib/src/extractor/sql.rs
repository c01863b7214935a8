//! Small quote-aware scanning helpers shared by the SQL extractors.

/// Index of the `)` matching the `(` at `open`, skipping quoted text.
pub fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'(') {
        return None;
    }
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => i = skip_quoted(bytes, i),
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Given the index of an opening quote, return the index of its closing quote
/// (or the last byte when unterminated).
fn skip_quoted(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == b'\\' && quote != b'`' {
            i += 2;
            continue;
        }
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i;
        }
        i += 1;
    }
    bytes.len().saturating_sub(1)
}

/// Split on commas that sit outside parentheses and quotes. Each part keeps
/// its byte offset into `text`.
pub fn split_top_level(text: &str) -> Vec<(usize, &str)> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => i = skip_quoted(bytes, i),
            b'(' => depth += 1,
            b')' => depth -= 1,
            b',' if depth == 0 => {
                parts.push((start, &text[start..i]));
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start < text.len() {
        parts.push((start, &text[start..]));
    }
    parts
}

/// Read one identifier at the start of `text` (after whitespace), quoted or
/// bare, including `schema.table` qualification. Returns the unqualified,
/// unquoted name and the byte offset just past it.
pub fn read_identifier(text: &str) -> Option<(String, usize)> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    let mut last = None;
    loop {
        let (part, end) = read_identifier_part(text, i)?;
        last = Some(part);
        i = end;
        if bytes.get(i) == Some(&b'.') {
            i += 1;
            continue;
        }
        break;
    }
    last.map(|name| (name, i))
}

fn read_identifier_part(text: &str, start: usize) -> Option<(String, usize)> {
    let bytes = text.as_bytes();
    let first = *bytes.get(start)?;
    if first == b'`' || first == b'"' || first == b'[' {
        let close = if first == b'[' { b']' } else { first };
        let mut i = start + 1;
        let mut name = Vec::new();
        while i < bytes.len() {
            if bytes[i] == close {
                if close != b']' && bytes.get(i + 1) == Some(&close) {
                    name.push(close);
                    i += 2;
                    continue;
                }
                return Some((String::from_utf8_lossy(&name).into_owned(), i + 1));
            }
            name.push(bytes[i]);
            i += 1;
        }
        return None;
    }
    let end = text[start..]
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_' || *c == '$'))
        .map(|(idx, _)| start + idx)
        .unwrap_or(text.len());
    if end == start {
        return None;
    }
    Some((text[start..end].to_string(), end))
}

/// Leading keyword of `text`, upper-cased, with the offset just past it.
pub fn leading_word(text: &str) -> Option<(String, usize)> {
    let trimmed_start = text.len() - text.trim_start().len();
    let rest = &text[trimmed_start..];
    let len = rest
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map(|(idx, _)| idx)
        .unwrap_or(rest.len());
    if len == 0 {
        return None;
    }
    Some((rest[..len].to_uppercase(), trimmed_start + len))
}

/// Consume `keyword` (case-insensitive, whole word) at the start of `text`.
pub fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    match leading_word(text) {
        Some((word, end)) if word == keyword => Some(&text[end..]),
        _ => None,
    }
}

/// Replace the contents of quoted string literals with spaces so keyword
/// searches do not match inside `COMMENT '...'` or defaults.
pub fn blank_literals(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = bytes.to_vec();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\'' || bytes[i] == b'"' {
            let end = skip_quoted(bytes, i);
            for b in out.iter_mut().take(end).skip(i + 1) {
                if *b != b'\n' {
                    *b = b' ';
                }
            }
            i = end;
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// 1-based line of `offset` within a statement starting at `start_line`.
pub fn line_at(text: &str, offset: usize, start_line: usize) -> usize {
    let offset = offset.min(text.len());
    start_line + text.as_bytes()[..offset].iter().filter(|b| **b == b'\n').count()
}

/// Offset of the first non-whitespace byte at or after `offset`.
pub fn skip_whitespace(text: &str, offset: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = offset;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Whitespace-collapsed first line of a statement, for messages.
pub fn summarize(text: &str) -> String {
    let first_line = text.trim().lines().next().unwrap_or_default();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > 80 {
        let cut: String = collapsed.chars().take(77).collect();
        format!("{}...", cut)
    } else {
        collapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_paren_skips_quotes() {
        let text = "(a, ')', (b))";
        assert_eq!(matching_paren(text, 0), Some(text.len() - 1));
        assert_eq!(matching_paren("x(", 1), None);
    }

    #[test]
    fn splits_on_top_level_commas() {
        let parts: Vec<&str> = split_top_level("a INT, b DECIMAL(10,2), c ENUM('x,y')")
            .into_iter()
            .map(|(_, p)| p.trim())
            .collect();
        assert_eq!(parts, vec!["a INT", "b DECIMAL(10,2)", "c ENUM('x,y')"]);
    }

    #[test]
    fn reads_quoted_and_qualified_identifiers() {
        assert_eq!(read_identifier("  `shop`.`Orders` (").unwrap().0, "Orders");
        assert_eq!(read_identifier("users(").unwrap(), ("users".to_string(), 5));
        assert_eq!(read_identifier("\"weird name\" x").unwrap().0, "weird name");
        assert!(read_identifier("  (").is_none());
    }

    #[test]
    fn keyword_helpers() {
        assert_eq!(leading_word("  drop column x").unwrap().0, "DROP");
        assert_eq!(strip_keyword("COLUMN x", "COLUMN"), Some(" x"));
        assert_eq!(strip_keyword("COLUMNS x", "COLUMN"), None);
    }

    #[test]
    fn blanks_literals_and_counts_lines() {
        assert_eq!(blank_literals("a 'ENGINE' b"), "a '      ' b");
        assert_eq!(line_at("a\nb\nc", 4, 10), 12);
    }
}
