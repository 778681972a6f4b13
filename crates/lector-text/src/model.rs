//! Text segment model shared by the playback core.
//!
//! Documents are ordered paragraphs, each an ordered run of sentences made of
//! words. Offsets count characters, never bytes: the playback mapper walks
//! synthesized text character by character, and byte offsets would drift on
//! any non-ASCII page.

use serde::{Deserialize, Serialize};

/// A single word with its character span inside the owning sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    /// Character offset of the first character within the sentence text.
    pub start_offset: usize,
    /// Character offset one past the last character within the sentence text.
    pub end_offset: usize,
}

impl Word {
    /// Number of characters in the word.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// An ordered run of words with its character span inside the owning paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub words: Vec<Word>,
    pub start_offset: usize,
    pub end_offset: usize,
}

impl Sentence {
    /// Words joined by single spaces.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for (i, word) in self.words.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&word.text);
        }
        out
    }
}

/// A paragraph with its stable index within the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub index: usize,
    pub sentences: Vec<Sentence>,
}

impl Paragraph {
    /// Concatenated plain text: words joined by single spaces, sentences
    /// joined by single spaces.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for (i, sentence) in self.sentences.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&sentence.text());
        }
        out
    }
}

/// Split one paragraph of plain text into sentences and words.
///
/// Sentences break after a run of `.`, `!` or `?` followed by whitespace;
/// words break on whitespace runs. Offsets index characters of the scanned
/// text so they line up with per-character synthesis alignments.
pub fn segment_paragraph(index: usize, text: &str) -> Paragraph {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut sentence_start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        if is_terminator(chars[i]) {
            let mut end = i + 1;
            while end < chars.len() && is_terminator(chars[end]) {
                end += 1;
            }
            if end >= chars.len() || chars[end].is_whitespace() {
                push_sentence(&mut sentences, &chars, sentence_start, end);
                i = end;
                while i < chars.len() && chars[i].is_whitespace() {
                    i += 1;
                }
                sentence_start = i;
                continue;
            }
        }
        i += 1;
    }
    if sentence_start < chars.len() {
        push_sentence(&mut sentences, &chars, sentence_start, chars.len());
    }

    Paragraph { index, sentences }
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn push_sentence(sentences: &mut Vec<Sentence>, chars: &[char], start: usize, end: usize) {
    let mut s = start;
    let mut e = end;
    while s < e && chars[s].is_whitespace() {
        s += 1;
    }
    while e > s && chars[e - 1].is_whitespace() {
        e -= 1;
    }
    if s == e {
        return;
    }

    let words = split_words(&chars[s..e]);
    if words.is_empty() {
        return;
    }
    sentences.push(Sentence {
        words,
        start_offset: s,
        end_offset: e,
    });
}

fn split_words(chars: &[char]) -> Vec<Word> {
    let mut words = Vec::new();
    let mut i = 0usize;
    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && !chars[i].is_whitespace() {
            i += 1;
        }
        words.push(Word {
            text: chars[start..i].iter().collect(),
            start_offset: start,
            end_offset: i,
        });
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_single_sentence_into_words() {
        let paragraph = segment_paragraph(0, "Hi there.");

        assert_eq!(paragraph.index, 0);
        assert_eq!(paragraph.sentences.len(), 1);
        let sentence = &paragraph.sentences[0];
        assert_eq!(sentence.start_offset, 0);
        assert_eq!(sentence.end_offset, 9);
        assert_eq!(sentence.words.len(), 2);
        assert_eq!(sentence.words[0].text, "Hi");
        assert_eq!(sentence.words[0].start_offset, 0);
        assert_eq!(sentence.words[0].end_offset, 2);
        assert_eq!(sentence.words[1].text, "there.");
        assert_eq!(sentence.words[1].start_offset, 3);
        assert_eq!(sentence.words[1].end_offset, 9);
    }

    #[test]
    fn segments_multiple_sentences() {
        let paragraph = segment_paragraph(2, "First one. Second one! Third?");

        assert_eq!(paragraph.sentences.len(), 3);
        assert_eq!(paragraph.sentences[0].words.len(), 2);
        assert_eq!(paragraph.sentences[1].start_offset, 11);
        assert_eq!(paragraph.sentences[2].words[0].text, "Third?");
    }

    #[test]
    fn terminator_without_following_space_does_not_split() {
        let paragraph = segment_paragraph(0, "Version 2.5 shipped today.");

        assert_eq!(paragraph.sentences.len(), 1);
        assert_eq!(paragraph.sentences[0].words[1].text, "2.5");
    }

    #[test]
    fn empty_text_yields_no_sentences() {
        assert!(segment_paragraph(0, "").sentences.is_empty());
        assert!(segment_paragraph(0, "   ").sentences.is_empty());
    }

    #[test]
    fn offsets_count_characters_not_bytes() {
        let paragraph = segment_paragraph(0, "Héllo wörld.");

        let sentence = &paragraph.sentences[0];
        assert_eq!(sentence.words[0].text, "Héllo");
        assert_eq!(sentence.words[1].start_offset, 6);
        assert_eq!(sentence.words[1].end_offset, 12);
    }

    #[test]
    fn plain_text_joins_words_and_sentences_with_spaces() {
        let paragraph = segment_paragraph(0, "Hi there. Bye now.");

        assert_eq!(paragraph.plain_text(), "Hi there. Bye now.");
    }

    #[test]
    fn plain_text_normalizes_whitespace_runs() {
        let paragraph = segment_paragraph(0, "Hi   there.");

        assert_eq!(paragraph.plain_text(), "Hi there.");
    }
}
