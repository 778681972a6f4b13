//! Time-to-text mapping.
//!
//! Converts an audio timestamp into the paragraph, sentence and word being
//! spoken, by walking the character alignment against segmented text. The
//! segmented text is laid out as a virtual character sequence: one separator
//! character between words, one extra between paragraphs, which mirrors how
//! providers align the text they are sent.

use lector_synth::Alignment;
use lector_text::Paragraph;

/// A word location within segmented text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPosition {
    pub paragraph: usize,
    pub sentence: usize,
    pub word: usize,
}

/// Map `t` seconds of audio to the word being spoken.
///
/// `paragraph_offset` is the document index of the first entry in
/// `paragraphs`; returned positions use document paragraph indices. Returns
/// `None` before the first character sounds or when the timestamp lands on a
/// separator between words.
pub fn map_time_to_position(
    t: f32,
    alignment: &Alignment,
    paragraphs: &[Paragraph],
    paragraph_offset: usize,
) -> Option<TextPosition> {
    let char_index = alignment.index_at(t)?;
    position_of_char(char_index, paragraphs, paragraph_offset)
}

/// Locate the word containing virtual character `char_index`.
fn position_of_char(
    char_index: usize,
    paragraphs: &[Paragraph],
    paragraph_offset: usize,
) -> Option<TextPosition> {
    let mut running = 0usize;
    for (pi, paragraph) in paragraphs.iter().enumerate() {
        for (si, sentence) in paragraph.sentences.iter().enumerate() {
            for (wi, word) in sentence.words.iter().enumerate() {
                let len = word.char_len();
                if char_index < running {
                    // landed on a separator before this word
                    return None;
                }
                if char_index < running + len {
                    return Some(TextPosition {
                        paragraph: paragraph_offset + pi,
                        sentence: si,
                        word: wi,
                    });
                }
                running += len + 1;
            }
        }
        // paragraph break occupies one extra character
        running += 1;
    }
    None
}
