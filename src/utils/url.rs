//! URL utilities for cipher queries and player bundle locations

use crate::error::SigtractError;
use url::{form_urlencoded, Url};

/// Origin relative player paths are resolved against
pub const PLAYER_BASE_URL: &str = "https://www.youtube.com";

/// Fields of a `signatureCipher` / `cipher` query string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CipherParams {
    /// Scrambled signature
    pub s: Option<String>,
    /// Query parameter the deciphered signature is written to
    pub sp: Option<String>,
    /// Media URL the signature belongs to
    pub url: Option<String>,
}

impl CipherParams {
    /// Parse a URL-encoded cipher query. The first occurrence of each key wins.
    pub fn parse(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let slot = match &*key {
                "s" => &mut params.s,
                "sp" => &mut params.sp,
                "url" => &mut params.url,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }

    /// Scrambled signature, if the query carries a non-empty one
    pub fn signature(&self) -> Option<&str> {
        self.s.as_deref().filter(|s| !s.is_empty())
    }

    /// Signature parameter name, `sig` unless the query names another
    pub fn signature_param(&self) -> &str {
        self.sp.as_deref().filter(|sp| !sp.is_empty()).unwrap_or("sig")
    }
}

/// Percent-decode `text` once more
pub fn decode_component(text: &str) -> Result<String, SigtractError> {
    urlencoding::decode(text)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| SigtractError::Generic(format!("Invalid percent-encoding: {}", e)))
}

/// First value of query parameter `name`
pub fn get_query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Set query parameter `name` to `value`. The first occurrence is replaced in
/// place and later duplicates are removed; a missing parameter is appended.
pub fn set_query_param(url: &mut Url, name: &str, value: &str) {
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut replaced = false;
    for (key, old) in url.query_pairs() {
        if key == name {
            if !replaced {
                pairs.push((key.into_owned(), value.to_string()));
                replaced = true;
            }
        } else {
            pairs.push((key.into_owned(), old.into_owned()));
        }
    }
    if !replaced {
        pairs.push((name.to_string(), value.to_string()));
    }

    url.query_pairs_mut().clear().extend_pairs(pairs);
}

/// Absolute URL of a player bundle given as absolute, protocol-relative, or
/// root-relative location
pub fn resolve_player_url(location: &str) -> Result<Url, SigtractError> {
    if let Some(rest) = location.strip_prefix("//") {
        return Ok(Url::parse(&format!("https://{}", rest))?);
    }
    if location.starts_with('/') {
        return Ok(Url::parse(PLAYER_BASE_URL)?.join(location)?);
    }
    Ok(Url::parse(location)?)
}

/// Check if `location` looks like a player bundle URL rather than a file path
pub fn is_player_url(location: &str) -> bool {
    location.starts_with("http://")
        || location.starts_with("https://")
        || location.starts_with("//")
        || location.starts_with("/s/player/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cipher() {
        let params = CipherParams::parse(
            "s=AOq0QJ8w%3D%3D&sp=signature&url=https%3A%2F%2Fr1.example.com%2Fvideoplayback%3Fitag%3D18%26n%3Dabc",
        );
        assert_eq!(params.s.as_deref(), Some("AOq0QJ8w=="));
        assert_eq!(params.signature_param(), "signature");
        assert_eq!(
            params.url.as_deref(),
            Some("https://r1.example.com/videoplayback?itag=18&n=abc")
        );
    }

    #[test]
    fn test_parse_cipher_defaults() {
        let params = CipherParams::parse("url=https%3A%2F%2Fa.b%2Fc&s=x&s=y");
        assert_eq!(params.s.as_deref(), Some("x"));
        assert_eq!(params.sp, None);
        assert_eq!(params.signature_param(), "sig");
        assert_eq!(params.signature(), Some("x"));
        assert_eq!(CipherParams::parse(""), CipherParams::default());
    }

    #[test]
    fn test_empty_signature_ignored() {
        let params = CipherParams::parse("s=&sp=&url=https%3A%2F%2Fa.b%2Fc");
        assert_eq!(params.s.as_deref(), Some(""));
        assert_eq!(params.signature(), None);
        assert_eq!(params.signature_param(), "sig");
    }

    #[test]
    fn test_decode_component() {
        assert_eq!(decode_component("a%252Fb").unwrap(), "a%2Fb");
        assert_eq!(decode_component("plain").unwrap(), "plain");
        assert!(decode_component("%FF%FE").is_err());
    }

    #[test]
    fn test_set_query_param_replaces_in_place() {
        let mut url = Url::parse("https://a.b/v?n=1&x=2&n=3").unwrap();
        set_query_param(&mut url, "n", "zz");
        assert_eq!(url.as_str(), "https://a.b/v?n=zz&x=2");
        assert_eq!(get_query_param(&url, "n").as_deref(), Some("zz"));
    }

    #[test]
    fn test_set_query_param_appends() {
        let mut url = Url::parse("https://a.b/v?itag=18").unwrap();
        set_query_param(&mut url, "sig", "a=b&c");
        assert_eq!(url.as_str(), "https://a.b/v?itag=18&sig=a%3Db%26c");
        assert_eq!(get_query_param(&url, "sig").as_deref(), Some("a=b&c"));
        assert_eq!(get_query_param(&url, "missing"), None);
    }

    #[test]
    fn test_resolve_player_url() {
        assert_eq!(
            resolve_player_url("/s/player/abc/player_ias.vflset/en_US/base.js")
                .unwrap()
                .as_str(),
            "https://www.youtube.com/s/player/abc/player_ias.vflset/en_US/base.js"
        );
        assert_eq!(
            resolve_player_url("//www.youtube.com/s/player/abc/base.js")
                .unwrap()
                .as_str(),
            "https://www.youtube.com/s/player/abc/base.js"
        );
        assert_eq!(
            resolve_player_url("https://example.com/base.js").unwrap().as_str(),
            "https://example.com/base.js"
        );
        assert!(resolve_player_url("not a url").is_err());
    }

    #[test]
    fn test_is_player_url() {
        assert!(is_player_url("https://www.youtube.com/s/player/abc/base.js"));
        assert!(is_player_url("/s/player/abc/base.js"));
        assert!(!is_player_url("./base.js"));
        assert!(!is_player_url("base.js"));
    }
}
