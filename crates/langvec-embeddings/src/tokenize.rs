//! Tokenizers used by the lookup and count backends.

/// Split text the way a rule-based NLP tokenizer would for vector lookup:
/// whitespace separates tokens, and leading/trailing punctuation is split
/// off into tokens of its own.
pub fn lexical_tokens(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    for chunk in text.split_whitespace() {
        let start = chunk
            .char_indices()
            .find(|(_, c)| !is_affix(*c))
            .map(|(i, _)| i)
            .unwrap_or(chunk.len());
        let end = chunk
            .char_indices()
            .rev()
            .find(|(_, c)| !is_affix(*c))
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(start);

        push_chars(&mut tokens, &chunk[..start]);
        if start < end {
            tokens.push(&chunk[start..end]);
        }
        push_chars(&mut tokens, &chunk[end.max(start)..]);
    }
    tokens
}

fn is_affix(c: char) -> bool {
    c.is_ascii_punctuation() || matches!(c, '“' | '”' | '‘' | '’' | '…')
}

fn push_chars<'a>(tokens: &mut Vec<&'a str>, s: &'a str) {
    for (i, c) in s.char_indices() {
        tokens.push(&s[i..i + c.len_utf8()]);
    }
}

/// Word tokens for bag-of-words counting: maximal runs of alphanumeric or
/// underscore characters, at least two characters long.
pub fn word_tokens(text: &str) -> Vec<&str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|s| s.chars().count() > 1)
        .collect()
}

/// Replace every run of two or more whitespace characters with one space.
/// Lone whitespace characters are kept as they are, including at either end.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = 0;
    let mut first = ' ';
    for c in text.chars() {
        if c.is_whitespace() {
            if run == 0 {
                first = c;
            }
            run += 1;
            continue;
        }
        push_run(&mut out, run, first);
        run = 0;
        out.push(c);
    }
    push_run(&mut out, run, first);
    out
}

fn push_run(out: &mut String, run: usize, first: char) {
    match run {
        0 => {}
        1 => out.push(first),
        _ => out.push(' '),
    }
}
