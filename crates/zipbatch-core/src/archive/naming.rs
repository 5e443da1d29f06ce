//! Zip entry naming for fetched files.

use std::collections::HashSet;

use percent_encoding::percent_decode_str;
use reqwest::Url;

/// Percent-decoded path of `url`, or `None` when the decoded bytes are not
/// valid UTF-8.
pub fn decoded_path(url: &Url) -> Option<String> {
    percent_decode_str(url.path())
        .decode_utf8()
        .ok()
        .map(|path| path.into_owned())
}

/// Entry name for the file at `index`: the last non-empty segment of the
/// decoded URL path, or `file_<index>` when there is none.
///
/// Decoding happens before splitting, so an encoded `%2F` also separates
/// segments and never ends up inside an entry name.
pub fn entry_name(url: &str, index: usize) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| decoded_path(&parsed))
        .and_then(|path| {
            path.split('/')
                .filter(|segment| !segment.is_empty())
                .last()
                .map(str::to_owned)
        })
        .unwrap_or_else(|| format!("file_{index}"))
}

/// Tracks names already written to one archive.
#[derive(Debug, Default)]
pub struct EntryNames {
    used: HashSet<String>,
}

impl EntryNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `name`, or the first free `stem_<n>.ext` if it is taken.
    pub fn claim(&mut self, name: String) -> String {
        if !self.used.contains(&name) {
            self.used.insert(name.clone());
            return name;
        }

        let (stem, ext) = split_extension(&name);
        let mut counter = 1usize;
        loop {
            let candidate = format!("{stem}_{counter}{ext}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

/// Split at the last dot; a leading dot is part of the stem.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}
