//! SRT/VTT caption to plain transcript conversion.
//!
//! [`normalize`] is pure and total: text without cue timing or a `WEBVTT` header is
//! returned untouched, and running it on its own output changes nothing.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// A timestamp next to a cue arrow, on either side
    static ref TIMING_MARKER: Regex =
        Regex::new(r"-->\s*\d{2}:\d{2}:\d{2}|\d{2}:\d{2}:\d{2}(?:[.,]\d+)?\s*-->").unwrap();
    static ref HEADER_MARKER: Regex = Regex::new(r"(?i)WEBVTT").unwrap();

    static ref CUE_INDEX: Regex = Regex::new(r"^\d+$").unwrap();
    static ref TIMESTAMP_RANGE: Regex = Regex::new(
        r"^(?:\d{2,}:)?\d{2}:\d{2}[,.]\d{3}\s*-->\s*(?:\d{2,}:)?\d{2}:\d{2}[,.]\d{3}"
    )
    .unwrap();
    static ref HEADER_LINE: Regex = Regex::new(r"^WEBVTT").unwrap();
    static ref CUE_POSITION: Regex = Regex::new(r"(?i)\s*position:\d+%.*$").unwrap();
    static ref BLANK_LINE_RUNS: Regex = Regex::new(r"\n{3,}").unwrap();

    static ref SPACE_RUNS: Regex = Regex::new(r"[ \t]{2,}").unwrap();
    static ref SPACE_BEFORE_PUNCTUATION: Regex = Regex::new(r"[ \t]+([,.!?])").unwrap();
    static ref COMMA_RUNS: Regex = Regex::new(r",{2,}").unwrap();
}

/// Whether the text looks like SRT/VTT rather than a finished transcript
pub fn is_timed_caption(text: &str) -> bool {
    TIMING_MARKER.is_match(text) || HEADER_MARKER.is_match(text)
}

/// Convert timed captions into plain transcript text
pub fn normalize(text: &str) -> String {
    if !is_timed_caption(text) {
        return text.to_string();
    }

    // Lines are cleaned before filtering so the filter sees exactly what ends up in the output
    let lines: Vec<String> = text
        .lines()
        .map(clean_line)
        .filter(|line| !is_cue_metadata(line))
        .collect();

    let joined = lines.join("\n");
    BLANK_LINE_RUNS.replace_all(&joined, "\n\n").trim().to_string()
}

/// Strip cue settings and tidy punctuation on a single line
fn clean_line(line: &str) -> String {
    let stripped = CUE_POSITION.replace(line.trim(), "");
    normalize_punctuation(&stripped)
}

fn is_cue_metadata(line: &str) -> bool {
    line.is_empty()
        || CUE_INDEX.is_match(line)
        || TIMESTAMP_RANGE.is_match(line)
        || HEADER_LINE.is_match(line)
}

/// Tidy spacing and repeated punctuation in transcript text
pub fn normalize_punctuation(text: &str) -> String {
    let text = SPACE_BEFORE_PUNCTUATION.replace_all(text, "$1");
    let text = COMMA_RUNS.replace_all(&text, ",");
    let text = collapse_dot_runs(&text);
    let text = space_after_punctuation(&text);
    let text = SPACE_RUNS.replace_all(&text, " ");

    text.trim().to_string()
}

/// `..` becomes `.`, four or more dots become an ellipsis
fn collapse_dot_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '.' {
            out.push(c);
            continue;
        }

        let mut run = 1;
        while chars.peek() == Some(&'.') {
            chars.next();
            run += 1;
        }

        let keep = match run {
            2 => 1,
            n if n >= 4 => 3,
            n => n,
        };
        out.extend(std::iter::repeat('.').take(keep));
    }

    out
}

/// Exactly one space after `,.!?` unless the mark ends the line or sits inside a number
fn space_after_punctuation(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        out.push(c);
        i += 1;

        if !matches!(c, ',' | '.' | '!' | '?') {
            continue;
        }

        let mut next = i;
        while next < chars.len() && matches!(chars[next], ' ' | '\t') {
            next += 1;
        }
        let had_space = next > i;

        match chars.get(next) {
            None | Some('\n') | Some('\r') => {}
            Some(_) if had_space => out.push(' '),
            Some(following) if following.is_alphabetic() => out.push(' '),
            _ => {}
        }

        i = next;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};

    const SRT: &str = "1\n00:00:01,000 --> 00:00:02,500\nWelcome back everyone .\n\n2\n00:00:02,500 --> 00:00:05,000\nToday we cover,, pagination....\n\n3\n00:00:05,000 --> 00:00:07,000\nLet's begin!\n";

    const VTT: &str = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000 position:10%,line-left align:left\nFirst line position:50% align:middle\n\n00:02.000 --> 00:04.000\nSecond  line\n";

    #[test]
    fn test_strips_srt_cue_metadata() {
        let input = "1\n00:00:01,000 --> 00:00:02,000\nHello world.\n";
        assert_eq!(normalize(input), "Hello world.");
    }

    #[test]
    fn test_full_srt() {
        assert_eq!(
            normalize(SRT),
            "Welcome back everyone.\nToday we cover, pagination...\nLet's begin!"
        );
    }

    #[test]
    fn test_vtt_header_and_positions() {
        assert_eq!(normalize(VTT), "First line\nSecond line");
    }

    #[test]
    fn test_crlf_line_endings() {
        let input = "1\r\n00:00:01,000 --> 00:00:02,000\r\nHello\r\n\r\n2\r\n00:00:02,000 --> 00:00:03,000\r\nthere\r\n";
        assert_eq!(normalize(input), "Hello\nthere");
    }

    #[test]
    fn test_plain_text_passes_through_unchanged() {
        let input = "  Hello , world..  Bye\n\n\n\nNo timing here 12:00 ";
        assert_eq!(normalize(input), input);
    }

    #[test]
    fn test_punctuation_normalization() {
        assert_eq!(normalize_punctuation("Hello , world..  Bye"), "Hello, world. Bye");
        assert_eq!(normalize_punctuation("Wait.... what?!"), "Wait... what?!");
        assert_eq!(normalize_punctuation("one,two,,,three"), "one, two, three");
        assert_eq!(normalize_punctuation("Pi is 3.14, roughly."), "Pi is 3.14, roughly.");
        assert_eq!(normalize_punctuation("  end.   \nnext "), "end.\nnext");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            SRT,
            VTT,
            "1\n00:00:01,000 --> 00:00:02,000\nHello world.\n",
            "WEBVTT\n\nNOTE webvtt mentioned again\n\n00:00:01.000 --> 00:00:02.000\nsee --> 00:00:09 later . .  ok",
            "1\n00:00:01,000 --> 00:00:02,000\nA , , b .... c..d\t\tend !\n",
            "Hello , world..  Bye",
            "",
        ];

        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_cue_settings_reveal_an_index_line() {
        let input = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\n12 position:50%\nabout WEBVTT format\n";
        let once = normalize(input);

        assert_eq!(once, "about WEBVTT format");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_punctuation_fix_reveals_a_timestamp_line() {
        let input = "1\n00:00:01,000 --> 00:00:02,000\n00:00:05 ,000 --> 00:00:06,000\nHello\n";
        let once = normalize(input);

        assert_eq!(once, "Hello");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_header_line_is_case_sensitive() {
        let input = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nWebVTT is a format\nwebvtt too\n";

        assert_eq!(normalize(input), "WebVTT is a format\nwebvtt too");
    }

    /// Caption-shaped text assembled from the fragments that trip up line filtering
    #[derive(Debug, Clone)]
    struct CaptionText(String);

    impl Arbitrary for CaptionText {
        fn arbitrary(g: &mut Gen) -> Self {
            const FRAGMENTS: &[&str] = &[
                "1",
                "12",
                "00:00:01,000 --> 00:00:02,000",
                "00:00:05 ,000 --> 00:00:06,000",
                "00:01.500 --> 00:02.000",
                "see --> 00:00:09",
                "WEBVTT",
                "webvtt",
                "WebVTT",
                " position:50%",
                " align:middle",
                ",",
                ",,",
                " ,",
                ".",
                "..",
                "....",
                " . .",
                "!",
                "?",
                " ",
                "  ",
                "\t",
                "\n",
                "\n\n\n",
                "\r\n",
                "hello",
                "World",
                "3.14",
                "1,000",
            ];

            let count = usize::arbitrary(g) % 24;
            let text = (0..count)
                .map(|_| *g.choose(FRAGMENTS).unwrap())
                .collect::<String>();

            CaptionText(text)
        }

        fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
            Box::new(self.0.shrink().map(CaptionText))
        }
    }

    #[quickcheck_macros::quickcheck]
    fn prop_normalize_is_idempotent_on_caption_text(input: CaptionText) -> bool {
        let once = normalize(&input.0);
        normalize(&once) == once
    }

    #[quickcheck_macros::quickcheck]
    fn prop_normalize_is_idempotent_on_any_text(input: String) -> bool {
        let once = normalize(&input);
        normalize(&once) == once
    }

    #[quickcheck_macros::quickcheck]
    fn prop_normalized_lines_are_never_cue_metadata(input: CaptionText) -> bool {
        let once = normalize(&input.0);
        !is_timed_caption(&input.0) || once.lines().all(|line| !is_cue_metadata(line))
    }

    #[test]
    fn test_detection() {
        assert!(is_timed_caption("00:00:01,000 --> 00:00:02,000"));
        assert!(is_timed_caption("webvtt"));
        assert!(!is_timed_caption("Just a transcript, with 10:15 in it."));
    }
}
