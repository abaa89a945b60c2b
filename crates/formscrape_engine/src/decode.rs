use chardetng::EncodingDetector;
use encoding_rs::Encoding;

/// How far into a document to look for a `<meta charset>` declaration.
const META_PRESCAN_BYTES: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPage {
    pub html: String,
    pub encoding: &'static str,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("page is not valid {encoding}")]
    Malformed { encoding: &'static str },
}

/// Decode a fetched page body to UTF-8.
///
/// Encoding is chosen by BOM, then the Content-Type charset, then a
/// `<meta charset>` in the first kilobyte, then `chardetng` guessing.
pub fn decode_page(bytes: &[u8], content_type: Option<&str>) -> Result<DecodedPage, DecodeError> {
    let encoding = Encoding::for_bom(bytes)
        .map(|(encoding, _)| encoding)
        .or_else(|| content_type.and_then(header_charset))
        .or_else(|| meta_charset(bytes))
        .unwrap_or_else(|| {
            let mut detector = EncodingDetector::new();
            detector.feed(bytes, true);
            detector.guess(None, true)
        });

    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(DecodeError::Malformed {
            encoding: encoding.name(),
        });
    }
    Ok(DecodedPage {
        html: text.into_owned(),
        encoding: encoding.name(),
    })
}

fn header_charset(content_type: &str) -> Option<&'static Encoding> {
    content_type.split(';').find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        Encoding::for_label(value.trim().trim_matches(['"', '\'']).as_bytes())
    })
}

fn meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(META_PRESCAN_BYTES)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();
    let start = head.find("charset=")? + "charset=".len();
    let label: String = head[start..]
        .trim_start_matches(['"', '\''])
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'))
        .collect();
    Encoding::for_label(label.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::decode_page;

    #[test]
    fn header_charset_wins_over_guessing() {
        let decoded = decode_page(b"caf\xe9", Some("text/html; charset=\"ISO-8859-1\"")).unwrap();
        assert_eq!(decoded.html, "café");
        assert_eq!(decoded.encoding, "windows-1252");
    }

    #[test]
    fn bom_wins_over_header() {
        let decoded = decode_page(b"\xEF\xBB\xBFhello", Some("text/html; charset=iso-8859-1")).unwrap();
        assert_eq!(decoded.html, "hello");
        assert_eq!(decoded.encoding, "UTF-8");
    }

    #[test]
    fn meta_charset_is_honoured_without_header() {
        let page = b"<html><head><meta charset=\"windows-1252\"></head><body>na\xefve</body></html>";
        let decoded = decode_page(page, None).unwrap();
        assert!(decoded.html.contains("naïve"));
    }
}
