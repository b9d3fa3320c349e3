//! Static-file fallback.
//!
//! Requests that match no route are served from disk. The URL prefix given
//! to [`App::static_files_at`](crate::App::static_files_at) is stripped and
//! the remainder is looked up inside the folder:
//!
//! | Folder | Path | Request | File |
//! |---|---|---|---|
//! | `static` | `/` | `/css/site.css` | `static/css/site.css` |
//! | `public` | `/assets` | `/assets/logo.png` | `public/logo.png` |
//!
//! Directories serve their `index.html`; there are no listings. Anything
//! else answers `404 Not Found`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use http::StatusCode;
use http::header::CONTENT_TYPE;
use tracing::debug;

use crate::response::Response;

/// Folder prefixed to every served path (static files and templates) when an
/// app runs in serverless mode.
pub const SERVERLESS_ROOT: &str = "serverless_function_source_code/";

/// A folder served under a URL path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct StaticDir {
    pub(crate) folder: PathBuf,
    pub(crate) path: String,
}

impl StaticDir {
    pub(crate) fn new(folder: impl Into<PathBuf>, path: impl Into<String>) -> Self {
        Self { folder: folder.into(), path: path.into() }
    }

    /// The same folder served under `prefix` + its own path.
    pub(crate) fn mounted_at(&self, prefix: &str) -> Self {
        Self { folder: self.folder.clone(), path: join(prefix, &self.path) }
    }
}

/// Joins a mount prefix and a path, treating a bare `/` path as empty.
pub(crate) fn join(prefix: &str, path: &str) -> String {
    let path = if path == "/" { "" } else { path };
    let joined = format!("{prefix}{path}");
    if joined.is_empty() { "/".to_owned() } else { joined }
}

/// Serves `request_path` from `dir`.
pub(crate) async fn serve(dir: &StaticDir, request_path: &str) -> Response {
    if request_path == dir.path {
        return Response::not_found();
    }
    let Some(rest) = request_path.strip_prefix(dir.path.as_str()) else {
        return Response::not_found();
    };
    let Some(file) = locate(&dir.folder, rest) else {
        debug!(path = request_path, "rejected static path");
        return Response::not_found();
    };

    match read(&file).await {
        Ok(Some((body, served))) => {
            let mime = mime_guess::from_path(&served).first_or_octet_stream();
            Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE.as_str(), mime.as_ref())
                .no_body()
                .send(body)
        }
        Ok(None) => Response::not_found(),
        Err(e) => {
            debug!(file = %file.display(), "static read failed: {e}");
            Response::status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Maps the URL remainder onto the folder, refusing anything that would
/// climb out of it.
fn locate(folder: &Path, rest: &str) -> Option<PathBuf> {
    let mut file = folder.to_path_buf();
    for segment in rest.split('/').filter(|s| !s.is_empty()) {
        if segment == ".." || segment == "." || segment.contains('\\') {
            return None;
        }
        file.push(segment);
    }
    Some(file)
}

/// Reads `file`, or the `index.html` inside it when it is a directory.
/// `Ok(None)` means there is nothing to serve.
async fn read(file: &Path) -> std::io::Result<Option<(Vec<u8>, PathBuf)>> {
    let target = match tokio::fs::metadata(file).await {
        Ok(meta) if meta.is_dir() => file.join("index.html"),
        Ok(_) => file.to_path_buf(),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    match tokio::fs::read(&target).await {
        Ok(body) => Ok(Some((body, target))),
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => Ok(None),
        Err(e) => Err(e),
    }
}
