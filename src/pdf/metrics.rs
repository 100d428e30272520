//! Standard-14 font metrics and text encoding
//!
//! All generated text uses Helvetica and Helvetica-Bold with
//! WinAnsiEncoding. These fonts are never embedded, so text is measured with
//! the AFM advance widths below (1/1000ths of the em square).

use lopdf::{Dictionary, Document, Object, ObjectId};

/// One of the two faces used by the dossier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Font {
    Helvetica,
    HelveticaBold,
}

/// Helvetica widths for chars 32-126
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, // space ! " # $ % & ' ( )
    389, 584, 278, 333, 278, 278, 556, 556, 556, 556, // * + , - . / 0 1 2 3
    556, 556, 556, 556, 556, 556, 278, 278, 584, 584, // 4 5 6 7 8 9 : ; < =
    584, 556, 1015, 667, 667, 722, 722, 667, 611, 778, // > ? @ A B C D E F G
    722, 278, 500, 667, 556, 833, 722, 778, 667, 778, // H I J K L M N O P Q
    722, 667, 611, 722, 667, 944, 667, 667, 611, 278, // R S T U V W X Y Z [
    278, 278, 469, 556, 333, 556, 556, 500, 556, 556, // \ ] ^ _ ` a b c d e
    278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // f g h i j k l m n o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, // p q r s t u v w x y
    500, 334, 260, 334, 584, // z { | } ~
];

/// Helvetica-Bold widths for chars 32-126
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, // space ! " # $ % & ' ( )
    389, 584, 278, 333, 278, 278, 556, 556, 556, 556, // * + , - . / 0 1 2 3
    556, 556, 556, 556, 556, 556, 333, 333, 584, 584, // 4 5 6 7 8 9 : ; < =
    584, 611, 975, 722, 722, 722, 722, 667, 611, 778, // > ? @ A B C D E F G
    722, 278, 556, 722, 611, 833, 722, 778, 667, 778, // H I J K L M N O P Q
    722, 667, 611, 722, 667, 944, 667, 667, 611, 333, // R S T U V W X Y Z [
    278, 333, 584, 556, 333, 556, 611, 556, 611, 556, // \ ] ^ _ ` a b c d e
    333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // f g h i j k l m n o
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, // p q r s t u v w x y
    500, 389, 280, 389, 584, // z { | } ~
];

/// Helvetica widths for WinAnsi codes 160-255
const HELVETICA_LATIN_WIDTHS: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, // nbsp ¡ ¢ £ ¤ ¥ ¦ § ¨ ©
    370, 556, 584, 333, 737, 333, 400, 584, 333, 333, // ª « ¬ shy ® ¯ ° ± ² ³
    333, 556, 537, 278, 333, 333, 365, 556, 834, 834, // ´ µ ¶ · ¸ ¹ º » ¼ ½
    834, 611, 667, 667, 667, 667, 667, 667, 1000, 722, // ¾ ¿ À Á Â Ã Ä Å Æ Ç
    667, 667, 667, 667, 278, 278, 278, 278, 722, 722, // È É Ê Ë Ì Í Î Ï Ð Ñ
    778, 778, 778, 778, 778, 584, 778, 722, 722, 722, // Ò Ó Ô Õ Ö × Ø Ù Ú Û
    722, 667, 667, 611, 556, 556, 556, 556, 556, 556, // Ü Ý Þ ß à á â ã ä å
    889, 500, 556, 556, 556, 556, 278, 278, 278, 278, // æ ç è é ê ë ì í î ï
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, // ð ñ ò ó ô õ ö ÷ ø ù
    556, 556, 556, 500, 556, 500, // ú û ü ý þ ÿ
];

/// Helvetica-Bold widths for WinAnsi codes 160-255
const HELVETICA_BOLD_LATIN_WIDTHS: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, // nbsp ¡ ¢ £ ¤ ¥ ¦ § ¨ ©
    370, 556, 584, 333, 737, 333, 400, 584, 333, 333, // ª « ¬ shy ® ¯ ° ± ² ³
    333, 611, 556, 278, 333, 333, 365, 556, 834, 834, // ´ µ ¶ · ¸ ¹ º » ¼ ½
    834, 611, 722, 722, 722, 722, 722, 722, 1000, 722, // ¾ ¿ À Á Â Ã Ä Å Æ Ç
    667, 667, 667, 667, 278, 278, 278, 278, 722, 722, // È É Ê Ë Ì Í Î Ï Ð Ñ
    778, 778, 778, 778, 778, 584, 778, 722, 722, 722, // Ò Ó Ô Õ Ö × Ø Ù Ú Û
    722, 667, 667, 611, 556, 556, 556, 556, 556, 556, // Ü Ý Þ ß à á â ã ä å
    889, 556, 556, 556, 556, 556, 278, 278, 278, 278, // æ ç è é ê ë ì í î ï
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, // ð ñ ò ó ô õ ö ÷ ø ù
    611, 611, 611, 556, 611, 556, // ú û ü ý þ ÿ
];

impl Font {
    /// PostScript name of the standard font
    pub fn base_font(&self) -> &'static str {
        match self {
            Font::Helvetica => "Helvetica",
            Font::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// Advance width of one character in 1/1000 em, as it is encoded
    pub fn char_width(&self, c: char) -> u16 {
        let (ascii, latin) = match self {
            Font::Helvetica => (&HELVETICA_WIDTHS, &HELVETICA_LATIN_WIDTHS),
            Font::HelveticaBold => (&HELVETICA_BOLD_WIDTHS, &HELVETICA_BOLD_LATIN_WIDTHS),
        };
        match win_ansi_code(c) {
            code @ 32..=126 => ascii[usize::from(code - 32)],
            code @ 160..=255 => latin[usize::from(code - 160)],
            // ellipsis
            133 => 1000,
            // quoteright
            _ => match self {
                Font::Helvetica => 222,
                Font::HelveticaBold => 278,
            },
        }
    }

    /// Width of `text` in points at `font_size`
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let units: u32 = text.chars().map(|c| self.char_width(c) as u32).sum();
        units as f32 * font_size / 1000.0
    }

    /// Add a font dictionary for this face to `doc`
    pub fn add_to(&self, doc: &mut Document) -> ObjectId {
        let mut font = Dictionary::new();
        font.set("Type", Object::Name(b"Font".to_vec()));
        font.set("Subtype", Object::Name(b"Type1".to_vec()));
        font.set("BaseFont", Object::Name(self.base_font().as_bytes().to_vec()));
        font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
        doc.add_object(Object::Dictionary(font))
    }
}

/// Longest prefix of `text` that fits in `max_width`, with `...` appended
/// when something had to be cut
///
/// Returns the text unchanged when it already fits.
pub fn truncate_to_width(text: &str, font: Font, font_size: f32, max_width: f32) -> (String, bool) {
    if font.text_width(text, font_size) <= max_width {
        return (text.to_string(), false);
    }

    let chars: Vec<char> = text.chars().collect();
    for keep in (0..chars.len()).rev() {
        let candidate: String = chars[..keep].iter().collect::<String>().trim_end().to_string() + "...";
        if font.text_width(&candidate, font_size) <= max_width {
            return (candidate, true);
        }
    }

    ("...".to_string(), true)
}

/// Encode text for a WinAnsiEncoding literal string
///
/// Latin-1 characters map to their own code; anything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_code).collect()
}

/// WinAnsi byte for one character: printable ASCII, Latin-1, `…`, `’`, or `?`
fn win_ansi_code(c: char) -> u8 {
    let code = c as u32;
    if (32..=126).contains(&code) || (160..=255).contains(&code) {
        code as u8
    } else if c == '\u{2026}' {
        133
    } else if c == '\u{2019}' {
        146
    } else {
        b'?'
    }
}

/// Escape and encode text as a PDF literal string body, e.g. `(a\(b\))`
pub fn pdf_literal(text: &str) -> String {
    let mut out = String::from("(");
    for byte in encode_win_ansi(text) {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            0x20..=0x7e => out.push(byte as char),
            _ => out.push_str(&format!("\\{:03o}", byte)),
        }
    }
    out.push(')');
    out
}

/// Encode a PDF text string (outline titles, document info)
///
/// ASCII stays a literal string; anything else is written as UTF-16BE with
/// a byte order mark.
pub fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), lopdf::StringFormat::Literal);
    }

    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, lopdf::StringFormat::Hexadecimal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_widths() {
        assert_eq!(Font::Helvetica.char_width(' '), 278);
        assert_eq!(Font::Helvetica.char_width('W'), 944);
        assert_eq!(Font::HelveticaBold.char_width('i'), 278);
        assert_eq!(Font::HelveticaBold.char_width('~'), 584);
    }

    #[test]
    fn test_latin_widths() {
        assert_eq!(Font::HelveticaBold.char_width('À'), 722);
        assert_eq!(Font::HelveticaBold.char_width('É'), 667);
        assert_eq!(Font::HelveticaBold.char_width('é'), 556);
        assert_eq!(Font::HelveticaBold.char_width('ç'), 556);
        assert_eq!(Font::Helvetica.char_width('ç'), 500);
        assert_eq!(Font::Helvetica.char_width('Æ'), 1000);
        assert_eq!(Font::Helvetica.char_width('ÿ'), 500);
        assert_eq!(Font::Helvetica.char_width('\u{2026}'), 1000);
        assert_eq!(Font::Helvetica.char_width('\u{2019}'), 222);
        // Unencodable characters are drawn as '?'
        assert_eq!(Font::HelveticaBold.char_width('日'), Font::HelveticaBold.char_width('?'));
    }

    #[test]
    fn test_text_width_scales_with_size() {
        let at_10 = Font::HelveticaBold.text_width("DOCUMENT", 10.0);
        let at_20 = Font::HelveticaBold.text_width("DOCUMENT", 20.0);
        assert!((at_20 - 2.0 * at_10).abs() < 0.001);
        // D O C U M E N T = 722+778+722+722+833+667+722+611
        assert!((at_10 - 57.77).abs() < 0.01);
    }

    #[test]
    fn test_truncate_to_width() {
        let (text, truncated) = truncate_to_width("short", Font::Helvetica, 10.0, 500.0);
        assert_eq!(text, "short");
        assert!(!truncated);

        let (text, truncated) = truncate_to_width("a much longer line of text", Font::Helvetica, 10.0, 60.0);
        assert!(truncated);
        assert!(text.ends_with("..."));
        assert!(Font::Helvetica.text_width(&text, 10.0) <= 60.0);
    }

    #[test]
    fn test_pdf_literal_escapes() {
        assert_eq!(pdf_literal("a(b)c\\"), "(a\\(b\\)c\\\\)");
        assert_eq!(pdf_literal("é"), "(\\351)");
        assert_eq!(pdf_literal("日"), "(?)");
    }

    #[test]
    fn test_text_string_encoding() {
        assert_eq!(
            text_string("CNI"),
            Object::String(b"CNI".to_vec(), lopdf::StringFormat::Literal)
        );
        match text_string("Élodie") {
            Object::String(bytes, lopdf::StringFormat::Hexadecimal) => {
                assert_eq!(&bytes[..4], &[0xFE, 0xFF, 0x00, 0xC9]);
            }
            other => panic!("Expected UTF-16 string, got {:?}", other),
        }
    }
}
