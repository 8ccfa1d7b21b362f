//! M3U playlist rendering.
//!
//! The catalog playlist is an extended M3U file with one `#EXTINF` line and
//! one absolute `/videos/` URL per entry. It is a pure function of its inputs,
//! which is what makes memoizing it by [`cache_key`] sound.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use sb_core::CatalogEntry;
use sha2::{Digest, Sha256};

/// Characters escaped inside one path segment. Everything outside the RFC 3986
/// `pchar` set, plus `%` itself.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Characters escaped in the user or password part of a URL authority.
const USERINFO: &AsciiSet = &PATH_SEGMENT.add(b':').add(b'@');

/// Percent-encode each `/`-separated segment of `path`, keeping the
/// separators.
///
/// ```
/// use sb_media::playlist::escape_path;
///
/// assert_eq!(escape_path("shows/My Show #1.mkv"), "shows/My%20Show%20%231.mkv");
/// ```
pub fn escape_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// `host:port`, bracketing IPv6 literals.
fn authority(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Absolute stream URL for one catalog path, without credentials.
pub fn stream_url(path: &str, host: &str, port: u16) -> String {
    format!("http://{}/videos/{}", authority(host, port), escape_path(path))
}

fn stream_url_with_auth(path: &str, host: &str, port: u16, auth: Option<(&str, &str)>) -> String {
    match auth {
        Some((user, pass)) if !user.is_empty() && !pass.is_empty() => format!(
            "http://{}:{}@{}/videos/{}",
            utf8_percent_encode(user, USERINFO),
            utf8_percent_encode(pass, USERINFO),
            authority(host, port),
            escape_path(path)
        ),
        _ => stream_url(path, host, port),
    }
}

/// Render the catalog playlist.
///
/// With `auth` set (both parts non-empty) every URL embeds `user:pass@`, so
/// players that cannot prompt for credentials can still follow the links.
pub fn generate(
    entries: &[CatalogEntry],
    host: &str,
    port: u16,
    auth: Option<(&str, &str)>,
) -> String {
    let mut out = String::from("#EXTM3U\n");
    for entry in entries {
        out.push_str("#EXTINF:-1,");
        out.push_str(&entry.path);
        out.push('\n');
        out.push_str(&stream_url_with_auth(&entry.path, host, port, auth));
        out.push('\n');
    }
    out
}

/// Cache key for a rendered playlist: a SHA-256 hex digest over every input
/// that affects [`generate`]'s output.
pub fn cache_key(entries: &[CatalogEntry], host: &str, port: u16, with_auth: bool) -> String {
    let mut hasher = Sha256::new();
    hasher.update(host.as_bytes());
    hasher.update([0u8]);
    hasher.update(port.to_be_bytes());
    hasher.update([u8::from(with_auth)]);
    for entry in entries {
        hasher.update(entry.path.as_bytes());
        hasher.update([0u8]);
        hasher.update(entry.size.to_be_bytes());
    }
    format!("playlist:{}", hex::encode(hasher.finalize()))
}

/// Minimal single-segment playlist pointing at `file_name` itself.
///
/// Used when a client asks for `<file>.m3u8` and no transcoded manifest
/// exists. It is not a conformant HLS media playlist: the 10 second duration
/// is a placeholder and the whole file is treated as one segment.
pub fn fallback_playlist(file_name: &str) -> String {
    format!(
        "#EXTM3U\n\
         #EXT-X-VERSION:3\n\
         #EXT-X-TARGETDURATION:10\n\
         #EXT-X-MEDIA-SEQUENCE:0\n\
         #EXTINF:10.0,\n\
         {}\n\
         #EXT-X-ENDLIST\n",
        utf8_percent_encode(file_name, PATH_SEGMENT)
    )
}
