use std::sync::LazyLock;

use regex::Regex;

use super::lemma::lemmatize;
use super::stopwords::is_stop_word;
use crate::traits::TokenAnnotation;

/// Words (with inner apostrophes), numbers, or any single other character.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\p{L}\p{M}]+(?:['’][\p{L}\p{M}]+)*|\p{N}+(?:[.,:]\p{N}+)*|\S")
        .expect("token pattern is valid")
});

/// Split `text` into annotated tokens in source order.
pub fn annotate_tokens(text: &str) -> Vec<TokenAnnotation> {
    TOKEN_RE
        .find_iter(text)
        .flat_map(|m| split_contraction(m.as_str()))
        .map(annotate_token)
        .collect()
}

/// `don't` -> `do` + `n't`, `I'm` -> `I` + `'m`.
fn split_contraction(word: &str) -> Vec<&str> {
    for suffix in ["n't", "n’t"] {
        let Some(at) = word.len().checked_sub(suffix.len()).filter(|at| *at > 0) else {
            continue;
        };
        if word.get(at..).is_some_and(|tail| tail.eq_ignore_ascii_case(suffix)) {
            return vec![&word[..at], &word[at..]];
        }
    }
    match word.find(|c: char| c == '\'' || c == '’') {
        Some(at) if at > 0 => vec![&word[..at], &word[at..]],
        _ => vec![word],
    }
}

fn annotate_token(text: &str) -> TokenAnnotation {
    let is_alpha = !text.is_empty() && text.chars().all(char::is_alphabetic);
    let is_punct = !text.is_empty() && text.chars().all(is_punctuation);
    let lemma = if is_alpha {
        lemmatize(text)
    } else {
        text.to_lowercase()
    };

    TokenAnnotation {
        text: text.to_string(),
        lemma,
        is_alpha,
        is_stop: is_stop_word(text),
        is_punct,
    }
}

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation()
        || matches!(
            c,
            '“' | '”' | '‘' | '’' | '—' | '–' | '…' | '«' | '»' | '¡' | '¿' | '·'
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &[TokenAnnotation]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_splits_words_and_punctuation() {
        let tokens = annotate_tokens("Oh great, ANOTHER flat tire!");
        assert_eq!(
            texts(&tokens),
            vec!["Oh", "great", ",", "ANOTHER", "flat", "tire", "!"]
        );
        assert!(tokens[2].is_punct);
        assert!(!tokens[2].is_alpha);
        assert!(tokens[1].is_alpha);
    }

    #[test]
    fn test_splits_contractions() {
        let tokens = annotate_tokens("I don't think it's fine");
        assert_eq!(
            texts(&tokens),
            vec!["I", "do", "n't", "think", "it", "'s", "fine"]
        );
        assert!(tokens[2].is_stop);
        assert!(!tokens[2].is_alpha);
    }

    #[test]
    fn test_numbers_are_not_alpha() {
        let tokens = annotate_tokens("ran 5.5 km at 7:30");
        let number = tokens.iter().find(|t| t.text == "5.5").unwrap();
        assert!(!number.is_alpha);
        assert!(!number.is_punct);
        assert!(tokens.iter().any(|t| t.text == "7:30"));
    }

    #[test]
    fn test_lemma_is_lowercase_base_form() {
        let tokens = annotate_tokens("Dogs Jumped");
        assert_eq!(tokens[0].lemma, "dog");
        assert_eq!(tokens[1].lemma, "jump");
    }

    #[test]
    fn test_curly_quotes_are_punctuation() {
        let tokens = annotate_tokens("“Hello”");
        assert!(tokens.first().unwrap().is_punct);
        assert!(tokens.last().unwrap().is_punct);
    }
}
