//! Splits SQL text into statements without parsing them.
//!
//! Quotes (`'`, `"`, backticks) are respected, comments are blanked out of the
//! statement text but kept with their line numbers, and `DELIMITER` directives
//! switch the terminator the way the mysql client does.

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub line: usize,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct RawStatement {
    /// Statement text with comments blanked; newlines are preserved so byte
    /// offsets map back to source lines.
    pub text: String,
    pub start_line: usize,
    /// Comments preceding the statement, inside it, or trailing its terminator
    /// on the same line.
    pub comments: Vec<Comment>,
}

#[derive(Debug, Default)]
pub struct Lexed {
    pub statements: Vec<RawStatement>,
    pub comments: Vec<Comment>,
}

#[derive(Default)]
struct Pending {
    text: Vec<u8>,
    start_line: Option<usize>,
    comments: Vec<Comment>,
}

impl Pending {
    fn is_blank(&self) -> bool {
        self.start_line.is_none()
    }
}

pub fn lex(source: &str) -> Lexed {
    let bytes = source.as_bytes();
    let mut lexed = Lexed::default();
    let mut pending = Pending::default();
    let mut delimiter = b";".to_vec();
    let mut line = 1usize;
    let mut closed_on_line: Option<usize> = None;
    let mut at_line_start = true;
    let mut i = 0;

    while i < bytes.len() {
        if at_line_start {
            at_line_start = false;
            let line_end = find_line_end(bytes, i);
            let content = source[i..line_end].trim();
            if pending.is_blank() && starts_with_ci(content, "DELIMITER ") {
                let new_delimiter = content["DELIMITER ".len()..].trim();
                if !new_delimiter.is_empty() {
                    delimiter = new_delimiter.as_bytes().to_vec();
                }
                i = line_end;
                continue;
            }
        }

        let b = bytes[i];
        if b == b'\n' {
            line += 1;
            closed_on_line = None;
            at_line_start = true;
            if !pending.is_blank() {
                pending.text.push(b'\n');
            }
            i += 1;
            continue;
        }

        // Comments.
        let line_comment = (b == b'-'
            && bytes.get(i + 1) == Some(&b'-')
            && bytes.get(i + 2).map_or(true, |c| c.is_ascii_whitespace()))
            || b == b'#';
        if line_comment {
            let end = find_line_end(bytes, i);
            let marker = if b == b'#' { 1 } else { 2 };
            let comment = Comment {
                line,
                text: source[i + marker..end].trim().to_string(),
            };
            attach_comment(&mut lexed, &mut pending, closed_on_line, comment);
            i = end;
            continue;
        }
        if b == b'/' && bytes.get(i + 1) == Some(&b'*') {
            let end = find_block_end(bytes, i + 2);
            let body_end = if end >= i + 4 && bytes[..end].ends_with(b"*/") {
                end - 2
            } else {
                end
            };
            let body = &source[i + 2..body_end];
            let comment = Comment {
                line,
                text: body.trim().to_string(),
            };
            attach_comment(&mut lexed, &mut pending, closed_on_line, comment);
            for &c in &bytes[i..end] {
                if c == b'\n' {
                    line += 1;
                    if !pending.is_blank() {
                        pending.text.push(b'\n');
                    }
                } else if !pending.is_blank() {
                    pending.text.push(b' ');
                }
            }
            i = end;
            continue;
        }

        // Terminator.
        if bytes[i..].starts_with(&delimiter) {
            if !pending.is_blank() {
                finish(&mut lexed, &mut pending);
                closed_on_line = Some(line);
            }
            i += delimiter.len();
            continue;
        }

        if b.is_ascii_whitespace() {
            if !pending.is_blank() {
                pending.text.push(b);
            }
            i += 1;
            continue;
        }

        if pending.is_blank() {
            pending.start_line = Some(line);
        }

        // Quoted text is copied verbatim, newlines included.
        if b == b'\'' || b == b'"' || b == b'`' {
            let end = find_quote_end(bytes, i);
            for &c in &bytes[i..end] {
                if c == b'\n' {
                    line += 1;
                }
            }
            pending.text.extend_from_slice(&bytes[i..end]);
            i = end;
            continue;
        }

        pending.text.push(b);
        i += 1;
    }

    if !pending.is_blank() {
        finish(&mut lexed, &mut pending);
    }
    lexed
}

fn attach_comment(
    lexed: &mut Lexed,
    pending: &mut Pending,
    closed_on_line: Option<usize>,
    comment: Comment,
) {
    lexed.comments.push(comment.clone());
    match (closed_on_line, lexed.statements.last_mut()) {
        (Some(closed), Some(previous)) if closed == comment.line && pending.is_blank() => {
            previous.comments.push(comment);
        }
        _ => pending.comments.push(comment),
    }
}

fn finish(lexed: &mut Lexed, pending: &mut Pending) {
    let done = std::mem::take(pending);
    let text = String::from_utf8_lossy(&done.text).trim_end().to_string();
    lexed.statements.push(RawStatement {
        text,
        start_line: done.start_line.unwrap_or(1),
        comments: done.comments,
    });
}

fn find_line_end(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|b| *b == b'\n')
        .map(|p| from + p)
        .unwrap_or(bytes.len())
}

/// Index just past the closing `*/`, or end of input.
fn find_block_end(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i + 1 < bytes.len() {
        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            return i + 2;
        }
        i += 1;
    }
    bytes.len()
}

/// Index just past the closing quote, or end of input.
fn find_quote_end(bytes: &[u8], start: usize) -> usize {
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
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

fn starts_with_ci(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_statements_and_tracks_lines() {
        let lexed = lex("CREATE TABLE a (id INT);\n\nALTER TABLE a\n  ADD COLUMN b INT;\n");
        assert_eq!(lexed.statements.len(), 2);
        assert_eq!(lexed.statements[0].start_line, 1);
        assert_eq!(lexed.statements[1].start_line, 3);
        assert!(lexed.statements[1].text.contains("ADD COLUMN b INT"));
    }

    #[test]
    fn ignores_delimiters_inside_quotes_and_comments() {
        let lexed = lex("INSERT INTO t VALUES ('a;b'); -- trailing; comment\n/* x; y */ SELECT 1;");
        assert_eq!(lexed.statements.len(), 2);
        assert!(lexed.statements[0].text.contains("'a;b'"));
        assert_eq!(lexed.statements[0].comments[0].text, "trailing; comment");
        assert_eq!(lexed.statements[1].text.trim(), "SELECT 1");
    }

    #[test]
    fn leading_comments_belong_to_next_statement() {
        let lexed = lex("-- schemagate:guarded backfilled\nALTER TABLE t DROP COLUMN x;");
        assert_eq!(lexed.statements.len(), 1);
        assert_eq!(lexed.statements[0].start_line, 2);
        assert_eq!(
            lexed.statements[0].comments[0].text,
            "schemagate:guarded backfilled"
        );
    }

    #[test]
    fn honours_delimiter_directive() {
        let sql = "DELIMITER $$\nCREATE TRIGGER t BEFORE INSERT ON x FOR EACH ROW BEGIN SET NEW.a = 1; END$$\nDELIMITER ;\nSELECT 1;";
        let lexed = lex(sql);
        assert_eq!(lexed.statements.len(), 2);
        assert!(lexed.statements[0].text.ends_with("END"));
        assert_eq!(lexed.statements[1].start_line, 4);
    }

    #[test]
    fn keeps_line_numbers_across_block_comments() {
        let lexed = lex("/* one\ntwo */\nCREATE TABLE t (\n  id INT /* c */\n);");
        let stmt = &lexed.statements[0];
        assert_eq!(stmt.start_line, 3);
        assert_eq!(stmt.text.lines().count(), 3);
    }
}
