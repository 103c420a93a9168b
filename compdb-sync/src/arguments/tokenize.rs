// SPDX-License-Identifier: GPL-3.0-or-later

//! Shell-like splitting and joining of compiler command strings.
//!
//! The quoting rules are simpler than a POSIX shell. Unquoted backslashes
//! are kept, they are path separators on Windows:
//!
//! - a double-quoted run may contain `\"` and `\\` escapes, any other
//!   backslash is literal,
//! - a single-quoted run is literal up to the closing quote,
//! - outside of quotes every character except whitespace is literal.
//!
//! Adjacent quoted and unquoted runs form one token. An unterminated quote
//! extends to the end of the input.

use std::borrow::Cow;

/// Splits a command string into argument tokens.
pub fn split(command: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;

    let mut chars = command.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            '"' => {
                in_token = true;
                while let Some(c) = chars.next() {
                    match c {
                        '"' => break,
                        '\\' => match chars.peek() {
                            Some(&escaped @ ('"' | '\\')) => {
                                current.push(escaped);
                                chars.next();
                            }
                            _ => current.push('\\'),
                        },
                        other => current.push(other),
                    }
                }
            }
            '\'' => {
                in_token = true;
                for c in chars.by_ref() {
                    if c == '\'' {
                        break;
                    }
                    current.push(c);
                }
            }
            other => {
                in_token = true;
                current.push(other);
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

/// Joins argument tokens into a single command string.
///
/// Tokens containing whitespace or quote characters are double-quoted, with
/// embedded `"` and `\` escaped. `split` reverses this exactly.
pub fn join<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(|token| quote(token.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote(token: &str) -> Cow<'_, str> {
    if token.is_empty() {
        return Cow::Borrowed("\"\"");
    }
    if !token.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'') {
        return Cow::Borrowed(token);
    }
    let mut quoted = String::with_capacity(token.len() + 2);
    quoted.push('"');
    for c in token.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_split_plain_tokens() {
        assert_eq!(split("g++  -c\tsketch.ino.cpp\n-o sketch.o"), vec!["g++", "-c", "sketch.ino.cpp", "-o", "sketch.o"]);
        assert!(split("").is_empty());
        assert!(split("   ").is_empty());
    }

    #[test]
    fn test_split_quoted_tokens() {
        assert_eq!(
            split(r#"gcc "-DNAME=\"me\"" 'single quoted' "C:\Program Files\sdk""#),
            vec!["gcc", r#"-DNAME="me""#, "single quoted", r"C:\Program Files\sdk"]
        );
    }

    #[test]
    fn test_split_concatenates_adjacent_runs() {
        assert_eq!(split(r#"-I"/opt/my sdk"/include -D'A B'=1"#), vec!["-I/opt/my sdk/include", "-DA B=1"]);
    }

    #[test]
    fn test_split_keeps_unquoted_backslashes() {
        assert_eq!(split(r"C:\sketch\sketch.ino -IC:\core"), vec![r"C:\sketch\sketch.ino", r"-IC:\core"]);
    }

    #[test]
    fn test_split_empty_quoted_token() {
        assert_eq!(split(r#"gcc "" main.c"#), vec!["gcc", "", "main.c"]);
    }

    #[test]
    fn test_split_unterminated_quote() {
        assert_eq!(split(r#"gcc "-DX=1 main.c"#), vec!["gcc", "-DX=1 main.c"]);
    }

    #[test]
    fn test_join() {
        assert_eq!(join(&["gcc", "-c", "main.c"]), "gcc -c main.c");
        assert_eq!(join(&["gcc", "-I/opt/my sdk"]), r#"gcc "-I/opt/my sdk""#);
        assert_eq!(join(&["gcc", r#"-DNAME="me""#]), r#"gcc "-DNAME=\"me\"""#);
        assert_eq!(join(&["gcc", r"C:\Program Files\"]), r#"gcc "C:\\Program Files\\""#);
        assert_eq!(join(&["gcc", ""]), r#"gcc """#);
        assert_eq!(join::<&str>(&[]), "");
    }

    proptest! {
        #[test]
        fn test_round_trip_without_quotes(tokens in prop::collection::vec("[^\"']{0,12}", 0..8)) {
            let command = join(&tokens);
            prop_assert_eq!(join(&split(&command)), command);
        }

        #[test]
        fn test_split_reverses_join(tokens in prop::collection::vec("\\PC{0,12}", 0..8)) {
            prop_assert_eq!(split(&join(&tokens)), tokens);
        }
    }
}
