/// Text segmentation
/// Turns a text into an ordered sequence of tokens.
/// Implementations must be deterministic and pure.
pub trait Tokenizer {
    fn segment(&self, text: &str) -> Vec<String>;
}

/// Splits on unicode whitespace
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn segment(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }
}

/// Character bigram tokenizer for CJK text
///
/// CJK runs are emitted as overlapping character bigrams; a CJK run of a single
/// character is emitted as that character. Everything else is split on whitespace,
/// and a non-CJK chunk directly touching a CJK run becomes its own token.
///
/// # Examples
/// ```
/// use text_classifier::{BigramTokenizer, Tokenizer};
/// let tokens = BigramTokenizer.segment("数据库 rust");
/// assert_eq!(tokens, vec!["数据", "据库", "rust"]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BigramTokenizer;

impl BigramTokenizer {
    fn flush_run(run: &[char], out: &mut Vec<String>) {
        match run.len() {
            0 => {}
            1 => out.push(run[0].to_string()),
            _ => {
                for pair in run.windows(2) {
                    out.push(pair.iter().collect());
                }
            }
        }
    }
}

impl Tokenizer for BigramTokenizer {
    fn segment(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut run: Vec<char> = Vec::new();
        let mut word = String::new();
        for ch in text.chars() {
            if is_cjk(ch) {
                if !word.is_empty() {
                    out.push(std::mem::take(&mut word));
                }
                run.push(ch);
            } else {
                Self::flush_run(&run, &mut out);
                run.clear();
                if ch.is_whitespace() {
                    if !word.is_empty() {
                        out.push(std::mem::take(&mut word));
                    }
                } else {
                    word.push(ch);
                }
            }
        }
        Self::flush_run(&run, &mut out);
        if !word.is_empty() {
            out.push(word);
        }
        out
    }
}

/// CJK unified ideographs (base block, extension A, compatibility block)
#[inline]
pub fn is_cjk(ch: char) -> bool {
    matches!(ch as u32,
        0x4E00..=0x9FFF
        | 0x3400..=0x4DBF
        | 0xF900..=0xFAFF
    )
}

/// Drop blank lines, collapse runs of horizontal whitespace to one space and
/// trim every line.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let mut first = true;
        for part in line.split(|c: char| c.is_whitespace()).filter(|p| !p.is_empty()) {
            if first {
                if !out.is_empty() {
                    out.push('\n');
                }
                first = false;
            } else {
                out.push(' ');
            }
            out.push_str(part);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_tokenizer_keeps_order_and_repeats() {
        let tokens = WhitespaceTokenizer.segment("  cat dog\tcat\n");
        assert_eq!(tokens, vec!["cat", "dog", "cat"]);
    }

    #[test]
    fn bigram_tokenizer_mixes_scripts() {
        let tokens = BigramTokenizer.segment("服务器为 data2012发送");
        assert_eq!(
            tokens,
            vec!["服务", "务器", "器为", "data2012", "发送"]
        );
    }

    #[test]
    fn bigram_tokenizer_single_cjk_char() {
        let tokens = BigramTokenizer.segment("a 我 b");
        assert_eq!(tokens, vec!["a", "我", "b"]);
    }

    #[test]
    fn normalize_text_drops_blank_lines_and_extra_spaces() {
        let text = "  first   line \n\n \t \nsecond\u{a0}line  ";
        assert_eq!(normalize_text(text), "first line\nsecond line");
        assert_eq!(normalize_text(""), "");
    }
}
