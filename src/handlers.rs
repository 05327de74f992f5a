use axum::body::Body;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::TryStreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::{debug, info};

use crate::error::ServeError;
use crate::path::ResolvedPath;

/// In-memory description of a response before it hits the wire.
///
/// Handlers build one of these and never touch the connection themselves.
/// Converting it into an axum [`Response`] is the single place where status,
/// headers and body are finalized; `into_response` takes `self`, so a reply
/// is consumed exactly once.
#[derive(Debug)]
pub struct Reply {
    status: StatusCode,
    body: ReplyBody,
    content_type: Option<String>,
}

#[derive(Debug)]
enum ReplyBody {
    Empty,
    Data(Bytes),
    File(ReaderStream<fs::File>),
}

impl Reply {
    pub fn empty(status: StatusCode) -> Self {
        Reply {
            status,
            body: ReplyBody::Empty,
            content_type: None,
        }
    }

    pub fn text(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Reply {
            status,
            body: ReplyBody::Data(body.into()),
            content_type: None,
        }
    }

    pub fn file(file: fs::File, content_type: Option<String>) -> Self {
        Reply {
            status: StatusCode::OK,
            body: ReplyBody::File(ReaderStream::new(file)),
            content_type,
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let content_type = self
            .content_type
            .unwrap_or_else(|| "text/plain".to_string());
        let body = match self.body {
            ReplyBody::Empty => Body::empty(),
            ReplyBody::Data(bytes) => Body::from(bytes),
            // Streamed chunk by chunk, the file is never buffered whole.
            ReplyBody::File(stream) => Body::from_stream(stream),
        };
        (self.status, [(header::CONTENT_TYPE, content_type)], body).into_response()
    }
}

/// GET: stream a file, or list a directory's immediate children.
pub async fn get(path: ResolvedPath) -> Result<Reply, ServeError> {
    let meta = match fs::metadata(&path).await {
        Ok(meta) => meta,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Reply::text(StatusCode::NOT_FOUND, "File not found"));
        }
        Err(err) => return Err(err.into()),
    };

    if meta.is_dir() {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&path).await?;
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        return Ok(Reply::text(StatusCode::OK, names.join("\n")));
    }

    debug!("Streaming file: {}", path.display());

    let file = fs::File::open(&path).await?;
    let content_type = mime_guess::from_path(&path).first().map(|m| m.to_string());
    Ok(Reply::file(file, content_type))
}

/// PUT: create or truncate the file and copy the whole request body into it.
///
/// The 204 is only produced after the copy completes and the file is flushed.
/// Parent directories are not created, and a failure mid-copy leaves whatever
/// was already written (no cleanup, no atomic rename).
pub async fn put(path: ResolvedPath, body: Body) -> Result<Reply, ServeError> {
    let mut file = fs::File::create(&path).await?;

    let stream = body.into_data_stream().map_err(std::io::Error::other);
    let mut reader = StreamReader::new(stream);
    let written = tokio::io::copy(&mut reader, &mut file).await?;
    file.flush().await?;

    info!("Wrote {} bytes to {}", written, path.display());

    Ok(Reply::empty(StatusCode::NO_CONTENT))
}

/// DELETE: remove a file or an empty directory.
///
/// Deleting something that is already gone counts as success, so repeated
/// deletes never error. A non-empty directory fails `remove_dir` and the
/// error propagates.
pub async fn delete(path: ResolvedPath) -> Result<Reply, ServeError> {
    let meta = match fs::metadata(&path).await {
        Ok(meta) => meta,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Reply::empty(StatusCode::NO_CONTENT));
        }
        Err(err) => return Err(err.into()),
    };

    info!("Deleting: {}", path.display());

    if meta.is_dir() {
        fs::remove_dir(&path).await?;
    } else {
        fs::remove_file(&path).await?;
    }

    Ok(Reply::empty(StatusCode::NO_CONTENT))
}

/// MKCOL: create a single directory, non-recursive.
///
/// Every failure mode (already exists, missing parent, permissions) collapses
/// into a 409 instead of propagating.
pub async fn mkcol(path: ResolvedPath) -> Reply {
    match fs::create_dir(&path).await {
        Ok(()) => Reply::empty(StatusCode::NO_CONTENT),
        Err(err) => {
            debug!("mkcol failed for {}: {}", path.display(), err);
            Reply::empty(StatusCode::CONFLICT)
        }
    }
}

/// Fallback for any unmapped method.
pub fn not_allowed(method: &Method) -> Reply {
    Reply::text(
        StatusCode::METHOD_NOT_ALLOWED,
        format!("Method {method} not allowed."),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn resolved(root: &std::path::Path, url_path: &str) -> ResolvedPath {
        crate::path::resolve(root, url_path).unwrap()
    }

    #[tokio::test]
    async fn get_missing_path_is_404_with_message() {
        let dir = TempDir::new().unwrap();
        let reply = get(resolved(dir.path(), "/nope.txt")).await.unwrap();
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert!(matches!(
            &reply.body,
            ReplyBody::Data(bytes) if bytes == "File not found".as_bytes()
        ));
    }

    #[tokio::test]
    async fn get_directory_lists_children_one_level_deep() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/nested.txt"), "n").unwrap();

        let reply = get(resolved(dir.path(), "/")).await.unwrap();
        assert!(matches!(
            &reply.body,
            ReplyBody::Data(bytes) if bytes == "a.txt\nsub".as_bytes()
        ));
    }

    #[tokio::test]
    async fn delete_missing_path_succeeds() {
        let dir = TempDir::new().unwrap();
        let reply = delete(resolved(dir.path(), "/ghost")).await.unwrap();
        assert_eq!(reply.status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn delete_removes_file_and_empty_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("f"), "x").unwrap();
        std::fs::create_dir(dir.path().join("d")).unwrap();

        delete(resolved(dir.path(), "/f")).await.unwrap();
        delete(resolved(dir.path(), "/d")).await.unwrap();
        assert!(!dir.path().join("f").exists());
        assert!(!dir.path().join("d").exists());
    }

    #[tokio::test]
    async fn mkcol_swallows_errors_into_conflict() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("taken")).unwrap();

        let existing = mkcol(resolved(dir.path(), "/taken")).await;
        assert_eq!(existing.status, StatusCode::CONFLICT);

        let orphan = mkcol(resolved(dir.path(), "/no/parent/here")).await;
        assert_eq!(orphan.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn put_writes_body_to_disk() {
        let dir = TempDir::new().unwrap();
        let reply = put(
            resolved(dir.path(), "/data.bin"),
            Body::from("some payload"),
        )
        .await
        .unwrap();
        assert_eq!(reply.status, StatusCode::NO_CONTENT);
        assert_eq!(
            std::fs::read(dir.path().join("data.bin")).unwrap(),
            b"some payload"
        );
    }

    #[tokio::test]
    async fn put_into_missing_parent_propagates_error() {
        let dir = TempDir::new().unwrap();
        let result = put(
            resolved(dir.path(), "/missing/dir/file"),
            Body::from("payload"),
        )
        .await;
        assert!(matches!(result, Err(ServeError::Io(_))));
    }

    #[test]
    fn reply_defaults_to_text_plain() {
        let response = Reply::text(StatusCode::OK, "hi").into_response();
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain"
        );
    }

    #[test]
    fn not_allowed_names_the_method() {
        let reply = not_allowed(&Method::PATCH);
        assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED);
        assert!(matches!(
            &reply.body,
            ReplyBody::Data(bytes) if bytes == "Method PATCH not allowed.".as_bytes()
        ));
    }
}
