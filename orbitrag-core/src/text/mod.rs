//! Text normalization: sentence segmentation, whitespace and punctuation
//! cleanup, token spans and the lowercase identity keys used for entity merging.

/// Ingestion chunking
pub mod chunking;

pub use chunking::TextChunker;

/// Abbreviations that end in a period without ending a sentence (lowercase, no trailing dot)
const DEFAULT_ABBREVIATIONS: &[&str] = &[
    "e.g", "i.e", "etc", "vs", "approx", "fig", "no", "nos", "dr", "mr", "ms", "st", "sr", "jr",
    "dept", "govt", "est", "resp", "vol", "ref", "al", "ca", "cf", "jan", "feb", "mar", "apr",
    "aug", "sept", "sep", "oct", "nov", "dec",
];

const BULLETS: &[char] = &['-', '*', '•', '▪', '‣'];

/// A normalized sentence with its position in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    /// Cleaned sentence text, original casing preserved
    pub text: String,
    /// Byte offset of the sentence start in the input
    pub offset: usize,
}

/// A word token and its byte span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// Token text as it appears in the input
    pub text: &'a str,
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
}

/// Cleans and segments text.
///
/// The normalizer is stateless between calls: every call to
/// [`TextNormalizer::sentences`] re-derives the same sequence from its input.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    abbreviations: Vec<String>,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextNormalizer {
    /// Create a normalizer with the default abbreviation list
    pub fn new() -> Self {
        Self {
            abbreviations: DEFAULT_ABBREVIATIONS.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Add abbreviations that should not end a sentence
    pub fn with_abbreviations<I, S>(mut self, abbreviations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for abbreviation in abbreviations {
            let normalized = abbreviation.as_ref().trim_end_matches('.').to_lowercase();
            if !normalized.is_empty() && !self.abbreviations.contains(&normalized) {
                self.abbreviations.push(normalized);
            }
        }
        self
    }

    /// Lazily split `text` into normalized sentences
    pub fn sentences<'a>(&'a self, text: &'a str) -> Sentences<'a> {
        Sentences {
            normalizer: self,
            text,
            pos: 0,
        }
    }

    /// Collapse whitespace runs and repeated punctuation, drop control characters
    pub fn clean(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut pending_space = false;
        let mut last: Option<char> = None;

        for ch in text.chars() {
            if ch.is_whitespace() {
                pending_space = true;
                continue;
            }
            if ch.is_control() {
                continue;
            }
            if ch.is_ascii_punctuation() && last == Some(ch) && !pending_space {
                continue;
            }
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
            last = Some(ch);
        }

        out
    }

    fn is_abbreviation(&self, word: &str) -> bool {
        let word = word.trim_start_matches(|c: char| !c.is_alphanumeric());
        if word.is_empty() {
            return false;
        }
        let mut chars = word.chars();
        // Single-letter initials ("J. Smith")
        if let (Some(first), None) = (chars.next(), chars.next()) {
            if first.is_uppercase() {
                return true;
            }
        }
        let lower = word.to_lowercase();
        self.abbreviations.iter().any(|a| *a == lower)
    }
}

/// Lazy, finite sentence sequence over one input
#[derive(Debug, Clone)]
pub struct Sentences<'a> {
    normalizer: &'a TextNormalizer,
    text: &'a str,
    pos: usize,
}

impl<'a> Sentences<'a> {
    /// End of the sentence starting at `start`, and where the next one begins
    fn find_boundary(&self, start: usize) -> (usize, usize) {
        let text = self.text;
        let mut iter = text[start..].char_indices().peekable();

        while let Some((rel, ch)) = iter.next() {
            let i = start + rel;
            match ch {
                '\n' => {
                    let rest = &text[i + 1..];
                    let line = rest.trim_start_matches([' ', '\t', '\r']);
                    if line.starts_with('\n') || starts_with_bullet(line) {
                        return (i, i + 1);
                    }
                },
                '.' | '!' | '?' | '…' => {
                    let mut end = i + ch.len_utf8();
                    while let Some(&(_, next)) = iter.peek() {
                        if matches!(next, '.' | '!' | '?' | '…' | '"' | '\'' | ')' | ']' | '”' | '’') {
                            end += next.len_utf8();
                            iter.next();
                        } else {
                            break;
                        }
                    }

                    let rest = &text[end..];
                    if rest.is_empty() {
                        return (end, end);
                    }
                    if !rest.starts_with(char::is_whitespace) {
                        // "3.5", "INSAT-3D.hdf", "www.mosdac.gov.in"
                        continue;
                    }
                    let after = rest.trim_start();
                    let Some(first) = after.chars().next() else {
                        return (end, text.len());
                    };
                    if ch == '.' && end == i + 1 {
                        let word = text[start..i]
                            .rsplit(|c: char| c.is_whitespace() || c == '(')
                            .next()
                            .unwrap_or("");
                        if self.normalizer.is_abbreviation(word) {
                            continue;
                        }
                    }
                    if is_sentence_start(first) {
                        return (end, end);
                    }
                },
                _ => {},
            }
        }

        (text.len(), text.len())
    }
}

impl<'a> Iterator for Sentences<'a> {
    type Item = Sentence;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let rest = &self.text[self.pos..];
            let trimmed = rest.trim_start();
            if trimmed.is_empty() {
                self.pos = self.text.len();
                return None;
            }
            let start = self.pos + (rest.len() - trimmed.len());
            let (end, next) = self.find_boundary(start);
            self.pos = next.max(start + 1).min(self.text.len());
            while !self.text.is_char_boundary(self.pos) {
                self.pos += 1;
            }

            let raw = &self.text[start..end];
            let body = strip_bullet(raw);
            let offset = start + (raw.len() - body.len());
            let cleaned = self.normalizer.clean(body);
            if cleaned.chars().any(char::is_alphanumeric) {
                return Some(Sentence {
                    text: cleaned,
                    offset,
                });
            }
        }
    }
}

fn starts_with_bullet(line: &str) -> bool {
    let mut chars = line.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(b), Some(' ' | '\t')) if BULLETS.contains(&b)
    )
}

fn strip_bullet(raw: &str) -> &str {
    if starts_with_bullet(raw) {
        let mut chars = raw.chars();
        chars.next();
        chars.as_str().trim_start()
    } else {
        raw
    }
}

fn is_sentence_start(ch: char) -> bool {
    ch.is_uppercase()
        || ch.is_ascii_digit()
        || matches!(ch, '"' | '\'' | '(' | '[' | '“' | '‘')
        || BULLETS.contains(&ch)
}

/// Identity key for a name: lowercase, non-alphanumerics folded to single spaces.
///
/// `"Wind_Data"`, `"wind data"` and `"WIND-DATA"` share the key `"wind data"`.
pub fn normalize_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut pending_space = false;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if pending_space && !key.is_empty() {
                key.push(' ');
            }
            pending_space = false;
            key.extend(ch.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    key
}

/// Word tokens (maximal alphanumeric runs) with their byte spans
pub fn tokens(text: &str) -> impl Iterator<Item = Token<'_>> + '_ {
    let mut chars = text.char_indices().peekable();
    std::iter::from_fn(move || {
        while let Some(&(_, ch)) = chars.peek() {
            if ch.is_alphanumeric() {
                break;
            }
            chars.next();
        }
        let (start, first) = chars.next()?;
        let mut end = start + first.len_utf8();
        while let Some(&(i, ch)) = chars.peek() {
            if !ch.is_alphanumeric() {
                break;
            }
            end = i + ch.len_utf8();
            chars.next();
        }
        Some(Token {
            text: &text[start..end],
            start,
            end,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<String> {
        TextNormalizer::new().sentences(input).map(|s| s.text).collect()
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(texts("").is_empty());
        assert!(texts("   \n\t  ").is_empty());
    }

    #[test]
    fn splits_on_terminal_punctuation() {
        let sentences = texts("INSAT-3D carries an Imager. It was launched in 2013! Is SST available?");
        assert_eq!(
            sentences,
            vec![
                "INSAT-3D carries an Imager.",
                "It was launched in 2013!",
                "Is SST available?"
            ]
        );
    }

    #[test]
    fn keeps_abbreviations_decimals_and_initials_together() {
        let sentences = texts(
            "Products e.g. SST and OLR are hourly. Resolution is 4.5 km. Contact Dr. Rao at SAC. Data by A. K. Sharma follows.",
        );
        assert_eq!(
            sentences,
            vec![
                "Products e.g. SST and OLR are hourly.",
                "Resolution is 4.5 km.",
                "Contact Dr. Rao at SAC.",
                "Data by A. K. Sharma follows."
            ]
        );
    }

    #[test]
    fn collapses_whitespace_and_punctuation_but_keeps_case() {
        let sentences = texts("OCEANSAT-2   provides\n chlorophyll   data!!!  Really??");
        assert_eq!(sentences, vec!["OCEANSAT-2 provides chlorophyll data!", "Really?"]);
    }

    #[test]
    fn blank_lines_and_bullets_are_boundaries() {
        let sentences = texts("Available formats\n\n- NetCDF files\n- HDF5 files\nEnd of list");
        assert_eq!(
            sentences,
            vec!["Available formats", "NetCDF files", "HDF5 files End of list"]
        );
    }

    #[test]
    fn sentence_offsets_point_into_the_input() {
        let input = "SARAL carries AltiKa. SCATSAT-1 carries OSCAT.";
        let sentences: Vec<_> = TextNormalizer::new().sentences(input).collect();
        assert_eq!(sentences.len(), 2);
        assert!(input[sentences[1].offset..].starts_with("SCATSAT-1"));
    }

    #[test]
    fn sequences_are_restartable() {
        let normalizer = TextNormalizer::new();
        let input = "One. Two. Three.";
        let first: Vec<_> = normalizer.sentences(input).collect();
        let second: Vec<_> = normalizer.sentences(input).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn custom_abbreviations() {
        let normalizer = TextNormalizer::new().with_abbreviations(["Sat."]);
        let sentences: Vec<_> = normalizer
            .sentences("Refer to Sat. Ops for details. Done.")
            .map(|s| s.text)
            .collect();
        assert_eq!(sentences, vec!["Refer to Sat. Ops for details.", "Done."]);
    }

    #[test]
    fn normalize_key_folds_case_and_separators() {
        assert_eq!(normalize_key("Wind_Data"), "wind data");
        assert_eq!(normalize_key("  WIND-DATA "), "wind data");
        assert_eq!(normalize_key("INSAT-3D"), "insat 3d");
        assert_eq!(normalize_key("---"), "");
    }

    #[test]
    fn tokens_report_spans() {
        let input = "INSAT-3D, SST!";
        let toks: Vec<_> = tokens(input).collect();
        assert_eq!(toks.iter().map(|t| t.text).collect::<Vec<_>>(), vec!["INSAT", "3D", "SST"]);
        assert_eq!(&input[toks[2].start..toks[2].end], "SST");
    }
}
