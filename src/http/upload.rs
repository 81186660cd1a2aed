// Upload validation and request-scoped scratch files

use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::config::ALLOWED_EXTENSIONS;

/// Lower-cased text after the last `.`, if any
pub fn file_extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// True when the filename has a dot and an allowed audio extension
pub fn allowed_file(filename: &str) -> bool {
    file_extension(filename)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Reduce a client-supplied filename to a safe ASCII name
///
/// Path separators become word breaks, whitespace runs become `_`, any
/// character outside `[A-Za-z0-9._-]` is dropped, and leading/trailing
/// `.`/`_` are trimmed. May return an empty string.
pub fn secure_filename(filename: &str) -> String {
    let spaced: String = filename
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let filtered: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    filtered.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// An uploaded file persisted in the upload directory for one request
///
/// The file name keeps a sanitized stem of the client name plus a random
/// part, so concurrent uploads of `song.wav` never collide. Call
/// [`TempUpload::remove`] once inference is done to observe cleanup
/// failures; dropping the guard without it still deletes the file.
pub struct TempUpload {
    file: NamedTempFile,
}

impl TempUpload {
    /// Write `bytes` into a new scratch file under `dir`
    ///
    /// `original_name` must already have passed [`allowed_file`].
    pub fn create(dir: &Path, original_name: &str, bytes: &[u8]) -> io::Result<Self> {
        let extension = file_extension(original_name).unwrap_or_default();
        let safe = secure_filename(original_name);
        let stem = safe
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .filter(|stem| !stem.is_empty())
            .unwrap_or("upload");

        let prefix = format!("{}-", stem);
        let suffix = format!(".{}", extension);
        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .tempfile_in(dir)?;

        file.write_all(bytes)?;
        file.flush()?;

        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the scratch file, reporting any failure
    pub fn remove(self) -> io::Result<()> {
        self.file.close()
    }
}
