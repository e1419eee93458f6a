use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Turns a human readable string into something safe for a filename and a URL.
pub trait Slugger: Send + Sync {
    fn slug(&self, input: &str) -> String;
}

/// Lowercase ASCII slugs: accents are stripped, a few ligatures are spelled
/// out, and every run of other characters collapses into one separator.
#[derive(Debug, Clone)]
pub struct AsciiSlugger {
    separator: char,
}

impl AsciiSlugger {
    pub fn new(separator: char) -> Self {
        AsciiSlugger { separator }
    }
}

impl Default for AsciiSlugger {
    fn default() -> Self {
        AsciiSlugger::new('-')
    }
}

impl Slugger for AsciiSlugger {
    fn slug(&self, input: &str) -> String {
        let mut slug = String::with_capacity(input.len());
        let mut pending_separator = false;

        let mut buf = [0u8; 4];

        for ch in input.nfd().filter(|c| !is_combining_mark(*c)) {
            let piece: &str = match transliterate(ch) {
                Some(spelled) => spelled,
                None if ch.is_ascii_alphanumeric() => ch.to_ascii_lowercase().encode_utf8(&mut buf),
                None => {
                    pending_separator = true;
                    continue;
                }
            };

            if pending_separator && !slug.is_empty() {
                slug.push(self.separator);
            }
            pending_separator = false;
            slug.push_str(piece);
        }

        slug
    }
}

/// Letters that do not decompose into a base letter plus combining marks.
fn transliterate(ch: char) -> Option<&'static str> {
    let spelled = match ch {
        'ß' => "ss",
        'æ' | 'Æ' => "ae",
        'œ' | 'Œ' => "oe",
        'ø' | 'Ø' => "o",
        'đ' | 'Đ' | 'ð' | 'Ð' => "d",
        'ł' | 'Ł' => "l",
        'þ' | 'Þ' => "th",
        'ı' => "i",
        _ => return None,
    };
    Some(spelled)
}
