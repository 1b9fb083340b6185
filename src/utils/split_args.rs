use bytes::Bytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Outside,
    InDouble,
    InSingle,
}

/// Split an inline request line into arguments, where every argument can be
/// in a programming-language REPL-alike form:
///
/// ```text
/// foo bar "newlines are supported\n" and "\xff\x00otherstuff" 'single \' quoted'
/// ```
///
/// Double-quoted tokens decode `\xHH` and the `\n \r \t \b \a` escapes; any
/// other backslashed byte stands for itself. Single-quoted tokens only know
/// the `\'` escape. A closing quote must be followed by whitespace or the
/// end of the line.
///
/// Returns `None` for unbalanced quotes or a closing quote followed by a
/// non-space byte, `Some(vec![])` for an all-whitespace line.
pub fn split_args(line: &[u8]) -> Option<Vec<Bytes>> {
    let mut args = Vec::new();
    let mut i = 0;

    loop {
        while i < line.len() && is_space(line[i]) {
            i += 1;
        }
        if i >= line.len() {
            return Some(args);
        }

        let mut current = Vec::new();
        let mut state = State::Outside;
        loop {
            if i >= line.len() {
                if state != State::Outside {
                    // unterminated quotes
                    return None;
                }
                break;
            }
            let byte = line[i];
            match state {
                State::Outside => match byte {
                    b if is_space(b) => break,
                    b'"' => state = State::InDouble,
                    b'\'' => state = State::InSingle,
                    b => current.push(b),
                },
                State::InDouble => {
                    if byte == b'\\'
                        && i + 3 < line.len()
                        && line[i + 1] == b'x'
                        && line[i + 2].is_ascii_hexdigit()
                        && line[i + 3].is_ascii_hexdigit()
                    {
                        current.push(hex_digit(line[i + 2]) * 16 + hex_digit(line[i + 3]));
                        i += 3;
                    } else if byte == b'\\' && i + 1 < line.len() {
                        i += 1;
                        current.push(match line[i] {
                            b'n' => b'\n',
                            b'r' => b'\r',
                            b't' => b'\t',
                            b'b' => 0x08,
                            b'a' => 0x07,
                            other => other,
                        });
                    } else if byte == b'"' {
                        if i + 1 < line.len() && !is_space(line[i + 1]) {
                            return None;
                        }
                        i += 1;
                        break;
                    } else {
                        current.push(byte);
                    }
                }
                State::InSingle => {
                    if byte == b'\\' && i + 1 < line.len() && line[i + 1] == b'\'' {
                        current.push(b'\'');
                        i += 1;
                    } else if byte == b'\'' {
                        if i + 1 < line.len() && !is_space(line[i + 1]) {
                            return None;
                        }
                        i += 1;
                        break;
                    } else {
                        current.push(byte);
                    }
                }
            }
            i += 1;
        }
        args.push(Bytes::from(current));
    }
}

fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n' | 0)
}

fn hex_digit(byte: u8) -> u8 {
    match byte {
        b'0'..=b'9' => byte - b'0',
        b'a'..=b'f' => byte - b'a' + 10,
        b'A'..=b'F' => byte - b'A' + 10,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(line: &str) -> Option<Vec<Bytes>> {
        split_args(line.as_bytes())
    }

    fn tokens(line: &str) -> Vec<Bytes> {
        split(line).unwrap()
    }

    #[test]
    fn bare_tokens() {
        assert_eq!(tokens("foo bar baz"), vec!["foo", "bar", "baz"]);
        assert_eq!(tokens("  set   key   value  "), vec!["set", "key", "value"]);
        assert_eq!(tokens(""), Vec::<Bytes>::new());
        assert_eq!(tokens("   \t "), Vec::<Bytes>::new());
    }

    #[test]
    fn double_quoted_escapes() {
        assert_eq!(tokens(r#"set k "a b""#), vec!["set", "k", "a b"]);
        assert_eq!(
            tokens(r#""newline\nhere" "tab\there""#),
            vec![
                Bytes::from("newline\nhere".to_string()),
                Bytes::from("tab\there".to_string())
            ]
        );
        assert_eq!(
            tokens(r#""\x41\x62c""#),
            vec![Bytes::from("Abc".to_string())]
        );
        assert_eq!(
            tokens(r#""bell\a backspace\b""#),
            vec![Bytes::from(b"bell\x07 backspace\x08".to_vec())]
        );
        // Unknown escapes decode to the escaped byte itself.
        assert_eq!(tokens(r#""\q\"""#), vec![Bytes::from("q\"".to_string())]);
    }

    #[test]
    fn single_quoted_escapes() {
        assert_eq!(tokens(r"'a b' c"), vec!["a b", "c"]);
        assert_eq!(tokens(r"'don\'t'"), vec!["don't"]);
        // Double-quote machinery does not apply inside single quotes.
        assert_eq!(tokens(r"'a\nb'"), vec![Bytes::from(r"a\nb".to_string())]);
    }

    #[test]
    fn empty_quoted_token_is_kept() {
        assert_eq!(tokens(r#"a "" b"#), vec!["a", "", "b"]);
    }

    #[test]
    fn unbalanced_quotes_fail() {
        assert_eq!(split(r#""foo"#), None);
        assert_eq!(split(r"'foo"), None);
        assert_eq!(split(r#"set k "v"#), None);
    }

    #[test]
    fn quote_must_be_followed_by_space() {
        assert_eq!(split(r#""foo"bar"#), None);
        assert_eq!(split(r"'foo'bar"), None);
        assert_eq!(split(r#""foo" bar"#).map(|v| v.len()), Some(2));
    }

    // Re-quoting the splitter's output and splitting again must yield the
    // same tokens.
    #[test]
    fn requote_round_trip() {
        fn quote(token: &[u8]) -> String {
            let mut out = String::from("\"");
            for &b in token {
                match b {
                    b'"' => out.push_str("\\\""),
                    b'\\' => out.push_str("\\\\"),
                    b'\n' => out.push_str("\\n"),
                    b'\r' => out.push_str("\\r"),
                    b'\t' => out.push_str("\\t"),
                    0x20..=0x7e => out.push(b as char),
                    _ => out.push_str(&format!("\\x{b:02x}")),
                }
            }
            out.push('"');
            out
        }

        let original = tokens(r#"foo "a b\x00c" 'd e' "\xff" plain"#);
        let requoted = original
            .iter()
            .map(|t| quote(t))
            .collect::<Vec<_>>()
            .join(" ");
        let reparsed = split_args(requoted.as_bytes()).unwrap();

        assert_eq!(original, reparsed);
    }
}
