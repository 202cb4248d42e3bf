//! Gzip response encoding.
//!
//! Each gzip stream carries a random 32-character header filename, so the
//! compressed length of identical payloads varies between responses. This
//! slows down BREACH-style length oracles; it does not remove them.

use std::io::{self, Write};

use flate2::{Compression, GzBuilder};
use rand::distr::Alphanumeric;
use rand::Rng;

const FILENAME_LEN: usize = 32;

/// Whether an `Accept-Encoding` value lists `gzip` as a whole element.
///
/// `testgzip` and `gziptest` do not match; `gzip;q=0` is a refusal.
pub fn accepts_gzip(accept_encoding: &str) -> bool {
    accept_encoding.split(',').any(|element| {
        let mut params = element.split(';');
        let coding = params.next().unwrap_or_default().trim();
        if !coding.eq_ignore_ascii_case("gzip") {
            return false;
        }
        !params.any(|p| {
            let p = p.trim();
            p.strip_prefix("q=")
                .and_then(|q| q.parse::<f32>().ok())
                .is_some_and(|q| q == 0.0)
        })
    })
}

/// Random alphanumeric header filename.
pub fn random_filename() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(FILENAME_LEN)
        .map(char::from)
        .collect()
}

/// Gzip `data` with a random header filename.
pub fn gzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzBuilder::new()
        .filename(random_filename())
        .write(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}
