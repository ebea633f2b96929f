//! Best-effort syntactic repair of almost-JSON.
//!
//! Models routinely answer with JSON that a strict parser rejects: single
//! quotes, trailing commas, Python literals, unquoted keys, comments, prose
//! around the object, or output cut off before the closing brackets. The
//! repairer rewrites those into valid JSON. It never guesses at content, so
//! the result still has to pass schema validation.

use serde_json::Value;

/// Returns the body of the first fenced block with a leading language tag
/// (such as `json`) dropped, or the trimmed input when there is no fence.
///
/// # Examples
///
/// ```
/// use vasari_models::strip_code_fence;
///
/// assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
/// assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
/// ```
pub fn strip_code_fence(text: &str) -> &str {
    let Some(body) = text.split("```").nth(1) else {
        return text.trim();
    };
    let body = body.trim_start_matches([' ', '\t']);
    match body.split_once('\n') {
        Some((first, rest))
            if !first.trim().is_empty()
                && first.trim().chars().all(|c| c.is_ascii_alphanumeric() || c == '_') =>
        {
            rest.trim()
        }
        _ => body.trim(),
    }
}

/// Repair `text` into a JSON value, if there is anything object- or
/// array-shaped in it.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use vasari_models::repair_json;
///
/// let fixed = repair_json("Here you go: {'city': 'Tokyo', 'capital': True,}").unwrap();
/// assert_eq!(fixed, json!({"city": "Tokyo", "capital": true}));
/// ```
pub fn repair_json(text: &str) -> Option<Value> {
    let start = text.find(['{', '['])?;
    let rewritten = Repairer::new(&text[start..]).run();
    serde_json::from_str(&rewritten).ok()
}

struct Repairer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    out: String,
    stack: Vec<char>,
}

impl<'a> Repairer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            out: String::with_capacity(text.len()),
            stack: Vec::new(),
        }
    }

    fn run(mut self) -> String {
        while let Some(c) = self.chars.next() {
            match c {
                '"' | '\'' => {
                    if !self.string(c) {
                        break;
                    }
                }
                '{' | '[' => {
                    self.stack.push(c);
                    self.out.push(c);
                }
                '}' | ']' => {
                    self.trim_trailing_comma();
                    if let Some(open) = self.stack.pop() {
                        self.out.push(closer(open));
                    }
                    if self.stack.is_empty() {
                        return self.out;
                    }
                }
                ',' | ':' => self.out.push(c),
                '/' if self.chars.peek() == Some(&'/') => self.skip_line(),
                '/' if self.chars.peek() == Some(&'*') => self.skip_block_comment(),
                '#' => self.skip_line(),
                c if c.is_whitespace() => self.out.push(c),
                c if is_word_char(c) => self.word(c),
                _ => {}
            }
        }
        self.finish()
    }

    /// Copy a string literal opened by `quote`, re-quoting it with `"`.
    ///
    /// Returns `false` if the input ended inside the string.
    fn string(&mut self, quote: char) -> bool {
        self.out.push('"');
        while let Some(c) = self.chars.next() {
            match c {
                '\\' => match self.chars.next() {
                    Some('\'') => self.out.push('\''),
                    Some(escaped) => {
                        self.out.push('\\');
                        self.out.push(escaped);
                    }
                    None => break,
                },
                c if c == quote => {
                    self.out.push('"');
                    return true;
                }
                '"' => self.out.push_str("\\\""),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                c => self.out.push(c),
            }
        }
        self.out.push('"');
        false
    }

    /// A bare token: literal, number, unquoted key or unquoted value.
    fn word(&mut self, first: char) {
        let mut word = String::from(first);
        while let Some(&c) = self.chars.peek() {
            if !is_word_char(c) {
                break;
            }
            word.push(c);
            self.chars.next();
        }

        let literal = match word.as_str() {
            "true" | "True" | "TRUE" => Some("true"),
            "false" | "False" | "FALSE" => Some("false"),
            "null" | "None" | "NULL" | "nil" => Some("null"),
            _ => None,
        };
        if let Some(literal) = literal {
            self.out.push_str(literal);
            return;
        }

        if matches!(serde_json::from_str::<Value>(&word), Ok(Value::Number(_))) {
            self.out.push_str(&word);
            return;
        }

        // Unquoted key or unquoted string value
        self.out.push_str(&Value::String(word).to_string());
    }

    fn skip_line(&mut self) {
        for c in self.chars.by_ref() {
            if c == '\n' {
                self.out.push('\n');
                break;
            }
        }
    }

    fn skip_block_comment(&mut self) {
        self.chars.next();
        let mut previous = '\0';
        for c in self.chars.by_ref() {
            if previous == '*' && c == '/' {
                break;
            }
            previous = c;
        }
    }

    fn trim_trailing_comma(&mut self) {
        let trimmed = self.out.trim_end().len();
        if self.out[..trimmed].ends_with(',') {
            self.out.truncate(trimmed - 1);
        }
    }

    /// Close whatever the input left open.
    fn finish(mut self) -> String {
        self.trim_trailing_comma();
        if self.out.trim_end().ends_with(':') {
            self.out.push_str("null");
        }
        while let Some(open) = self.stack.pop() {
            self.trim_trailing_comma();
            self.out.push(closer(open));
        }
        self.out
    }
}

fn closer(open: char) -> char {
    if open == '{' { '}' } else { ']' }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '+' | '.' | '$')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_json_is_unchanged() {
        let text = r#"{"a": [1, 2.5, -3e2], "b": {"c": null}}"#;
        assert_eq!(
            repair_json(text),
            Some(serde_json::from_str::<Value>(text).unwrap())
        );
    }

    #[test]
    fn trailing_commas_are_dropped() {
        assert_eq!(
            repair_json(r#"{"a": [1, 2,], "b": 3,}"#),
            Some(json!({"a": [1, 2], "b": 3}))
        );
    }

    #[test]
    fn single_quotes_become_double_quotes() {
        assert_eq!(
            repair_json(r#"{'text': 'say "hi"', 'it': 'it\'s'}"#),
            Some(json!({"text": "say \"hi\"", "it": "it's"}))
        );
    }

    #[test]
    fn unquoted_keys_and_python_literals() {
        assert_eq!(
            repair_json("{city: 'Tokyo', capital: True, mayor: None}"),
            Some(json!({"city": "Tokyo", "capital": true, "mayor": null}))
        );
    }

    #[test]
    fn comments_and_prose_are_ignored() {
        let text = "Sure! Here it is:\n{\n  \"a\": 1, // first\n  /* second */ \"b\": 2\n}\nHope that helps.";
        assert_eq!(repair_json(text), Some(json!({"a": 1, "b": 2})));
    }

    #[test]
    fn truncated_output_is_closed() {
        assert_eq!(
            repair_json(r#"{"items": [1, 2, {"x": "abc"#),
            Some(json!({"items": [1, 2, {"x": "abc"}]}))
        );
        assert_eq!(repair_json(r#"{"a": "#), Some(json!({"a": null})));
    }

    #[test]
    fn no_object_means_no_repair() {
        assert_eq!(repair_json("I don't know."), None);
    }

    #[test]
    fn fences_are_stripped() {
        assert_eq!(strip_code_fence("text\n```\n[1]\n```\nmore"), "[1]");
        assert_eq!(strip_code_fence("```json {\"a\": 1}```"), "json {\"a\": 1}");
        assert_eq!(strip_code_fence("```JSON\n{}\n```"), "{}");
    }
}
