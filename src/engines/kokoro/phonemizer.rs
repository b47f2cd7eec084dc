use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use super::model::KokoroError;

/// Location of the espeak-ng binary and its data directory.
///
/// `None` fields fall back to `espeak-ng` from PATH and its built-in data path.
#[derive(Debug, Clone, Default)]
pub struct EspeakConfig {
    pub bin_path: Option<PathBuf>,
    pub data_path: Option<PathBuf>,
}

impl EspeakConfig {
    fn command(&self) -> Command {
        let mut cmd = match &self.bin_path {
            Some(bin) => Command::new(bin),
            None => Command::new("espeak-ng"),
        };
        if let Some(data) = &self.data_path {
            cmd.env("ESPEAK_DATA_PATH", data);
        }
        cmd
    }
}

/// Map a locale tag from the language selector to an espeak-ng voice code.
pub fn espeak_language(locale: &str) -> Option<&'static str> {
    let code = match locale.to_ascii_lowercase().as_str() {
        "en-us" => "en-us",
        "en-gb" => "en-gb",
        "ja-jp" => "ja",
        "zh-cn" => "cmn",
        "de-de" => "de",
        "es-es" => "es",
        "fr-fr" => "fr-fr",
        "it-it" => "it",
        "ko-kr" => "ko",
        "pt-br" => "pt-br",
        "ru-ru" => "ru",
        _ => return None,
    };
    Some(code)
}

/// Turn `text` into Kokoro token ids.
///
/// Punctuation is kept as its own token; the text between punctuation goes
/// through espeak-ng (`lang` is an espeak-ng voice such as `"en-us"` or
/// `"cmn"`) in a single batch. IPA characters missing from `vocab` are dropped.
pub fn phonemize(
    text: &str,
    lang: &str,
    vocab: &HashMap<char, i64>,
    espeak: &EspeakConfig,
) -> Result<Vec<i64>, KokoroError> {
    let parts = split_text_parts(text);
    let segments: Vec<&str> = parts
        .iter()
        .filter_map(|part| match part {
            TextPart::Text(segment) => Some(segment.as_str()),
            TextPart::Punct(_) => None,
        })
        .collect();
    if segments.is_empty() {
        return Ok(punctuation_ids(&parts, vocab));
    }

    let mut phonemes = phonemize_batch(&segments, lang, vocab, espeak)?.into_iter();
    let mut ids = Vec::new();
    for part in &parts {
        match part {
            TextPart::Text(_) => ids.extend(phonemes.next().unwrap_or_default()),
            TextPart::Punct(ch) => ids.extend(vocab.get(ch)),
        }
    }
    Ok(ids)
}

fn punctuation_ids(parts: &[TextPart], vocab: &HashMap<char, i64>) -> Vec<i64> {
    parts
        .iter()
        .filter_map(|part| match part {
            TextPart::Punct(ch) => vocab.get(ch).copied(),
            TextPart::Text(_) => None,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TextPart {
    Text(String),
    Punct(char),
}

/// Split at punctuation, collapsing whitespace runs inside text segments.
fn split_text_parts(text: &str) -> Vec<TextPart> {
    let mut parts = Vec::new();
    let mut current = String::new();

    for (idx, ch) in text.char_indices() {
        if let Some(punct) = boundary(text, idx, ch) {
            flush(&mut parts, &mut current);
            parts.push(TextPart::Punct(punct));
        } else if ch.is_whitespace() {
            if !current.is_empty() && !current.ends_with(' ') {
                current.push(' ');
            }
        } else {
            current.push(ch);
        }
    }
    flush(&mut parts, &mut current);
    parts
}

fn flush(parts: &mut Vec<TextPart>, current: &mut String) {
    let segment = current.trim();
    if !segment.is_empty() {
        parts.push(TextPart::Text(segment.to_string()));
    }
    current.clear();
}

/// The punctuation token `ch` stands for at `idx`, if any. Line breaks end a
/// sentence; `.` and `,` between two digits belong to the number.
fn boundary(text: &str, idx: usize, ch: char) -> Option<char> {
    match ch {
        '.' | ',' => {
            let prev = text[..idx].chars().next_back();
            let next = text[idx + ch.len_utf8()..].chars().next();
            let in_number = prev.is_some_and(|c| c.is_ascii_digit())
                && next.is_some_and(|c| c.is_ascii_digit());
            (!in_number).then_some(ch)
        }
        '!' | '?' | ';' | ':' | '—' | '…' | '"' | '(' | ')' | '\u{201c}' | '\u{201d}' => Some(ch),
        '\n' | '\r' => Some('.'),
        _ => None,
    }
}

/// One espeak-ng run for all segments, one per input line. If the output
/// line count does not match, each segment is run on its own.
fn phonemize_batch(
    segments: &[&str],
    lang: &str,
    vocab: &HashMap<char, i64>,
    espeak: &EspeakConfig,
) -> Result<Vec<Vec<i64>>, KokoroError> {
    let output = run_espeak(&segments.join("\n"), lang, espeak)?;
    let lines: Vec<&str> = output.lines().collect();
    if lines.len() == segments.len() {
        return Ok(lines.iter().map(|line| ipa_to_ids(line, vocab)).collect());
    }

    log::debug!(
        "espeak-ng returned {} lines for {} segments, phonemizing one by one",
        lines.len(),
        segments.len()
    );
    segments
        .iter()
        .map(|segment| Ok(ipa_to_ids(&run_espeak(segment, lang, espeak)?, vocab)))
        .collect()
}

fn run_espeak(input: &str, lang: &str, espeak: &EspeakConfig) -> Result<String, KokoroError> {
    let mut child = espeak
        .command()
        .args(["--ipa", "--stdin", "-q", "-v", lang])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => KokoroError::EspeakNotFound,
            _ => KokoroError::Io(e),
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(newline_terminated(input).as_bytes())?;
    }
    let output = child.wait_with_output()?;

    if !output.status.success() {
        return Err(KokoroError::PhonemizerFailed(format!(
            "espeak-ng exited with code {:?}: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// espeak-ng drops the last token of an unterminated final stdin line.
fn newline_terminated(input: &str) -> Cow<'_, str> {
    if input.ends_with('\n') {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(format!("{input}\n"))
    }
}

/// `_` marks word boundaries in espeak-ng output and has no token.
fn ipa_to_ids(ipa: &str, vocab: &HashMap<char, i64>) -> Vec<i64> {
    ipa.lines()
        .map(str::trim)
        .flat_map(str::chars)
        .filter(|&ch| ch != '_')
        .filter_map(|ch| vocab.get(&ch).copied())
        .collect()
}
