//! Media type inference for uploads, from the file extension.

use mime_guess::MimeGuess;

/// The content type recorded for an uploaded object. Unknown extensions fall
/// back to `application/octet-stream`.
pub(crate) fn media_type_of(name: &str) -> String {
    MimeGuess::from_path(name).first_or_octet_stream().essence_str().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn known_extensions_resolve() {
        assert_eq!(media_type_of("readme.txt"), "text/plain");
        assert_eq!(media_type_of("photo.jpg"), "image/jpeg");
        assert_eq!(media_type_of("data.json"), "application/json");
    }

    #[test]
    fn unknown_extensions_fall_back() {
        assert_eq!(media_type_of("blob.xyz123"), "application/octet-stream");
        assert_eq!(media_type_of("no_extension"), "application/octet-stream");
    }
}
