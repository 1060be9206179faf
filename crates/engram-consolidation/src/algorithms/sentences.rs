//! Sentence boundary splitting for the summarization algorithms.

/// Split text into sentences on terminal punctuation. A boundary needs
/// trailing whitespace or end-of-string so decimals and abbreviations
/// mostly survive.
pub fn split_sentences(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut sentences = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = text.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        current.push(c);
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let at_end = i + 1 >= chars.len();
        if at_end || chars[i + 1].is_whitespace() {
            let trimmed = current.trim();
            if trimmed.len() > 2 {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    let trimmed = current.trim();
    if trimmed.len() > 2 {
        sentences.push(trimmed.to_string());
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminal_punctuation() {
        let sentences = split_sentences("First point. Second point! A question? Done.");
        assert_eq!(sentences.len(), 4);
        assert_eq!(sentences[0], "First point.");
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(split_sentences("").is_empty());
    }

    #[test]
    fn unterminated_text_is_one_sentence() {
        let sentences = split_sentences("no punctuation here");
        assert_eq!(sentences.len(), 1);
    }

    #[test]
    fn decimals_do_not_split() {
        let sentences = split_sentences("Latency rose to 3.5 seconds. Unacceptable.");
        assert_eq!(sentences.len(), 2);
    }
}
