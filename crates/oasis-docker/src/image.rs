//! Image builds from a checked-out workspace.
//!
//! The daemon only accepts a tar archive as build context, so the workspace
//! files are packed in-memory first and streamed to `build_image`. Build
//! output arrives as a stream of events whose text is forwarded to the
//! caller line by line.

use std::path::{Path, PathBuf};

use bollard::Docker;
use bollard::image::BuildImageOptions;
use bytes::Bytes;
use futures::StreamExt;
use oasis_core::progress::strip_ansi;
use oasis_core::{Error, Result};
use tracing::{debug, info};

/// Pack workspace files into an in-memory tar archive.
///
/// `files` are paths relative to `root`, and the archive entries keep those
/// relative names so the Dockerfile sits at the archive root.
pub async fn build_context(root: &Path, files: Vec<PathBuf>) -> Result<Bytes> {
    let root = root.to_path_buf();
    let archive = tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
        let mut builder = tar::Builder::new(Vec::new());
        for relative in &files {
            builder.append_path_with_name(root.join(relative), relative)?;
        }
        Ok(builder.into_inner()?)
    })
    .await
    .map_err(|e| Error::BuildFailed(e.to_string()))??;

    debug!(bytes = archive.len(), "Packed build context");
    Ok(Bytes::from(archive))
}

/// Build `tag` from a packed context, forwarding each event's text to
/// `on_output`.
///
/// The daemon reports failures both as stream errors and as events carrying
/// an `error` field; either fails the build.
pub async fn build<F>(docker: &Docker, tag: &str, context: Bytes, mut on_output: F) -> Result<()>
where
    F: FnMut(String),
{
    info!(tag = %tag, "Building image");

    let options = BuildImageOptions {
        dockerfile: "Dockerfile".to_string(),
        t: tag.to_string(),
        rm: true,
        ..Default::default()
    };

    let mut stream = docker.build_image(options, None, Some(context));
    while let Some(event) = stream.next().await {
        let event = event.map_err(|e| Error::BuildFailed(e.to_string()))?;
        if let Some(error) = event.error {
            return Err(Error::BuildFailed(error));
        }
        if let Some(text) = event.stream.or(event.status) {
            let text = strip_ansi(&text);
            let text = text.trim_end();
            if !text.is_empty() {
                on_output(text.to_string());
            }
        }
    }

    info!(tag = %tag, "Image built");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[tokio::test]
    async fn test_build_context_keeps_relative_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/index.js"), "console.log('hi')\n").unwrap();

        let files = vec![PathBuf::from("Dockerfile"), PathBuf::from("src/index.js")];
        let context = build_context(dir.path(), files).await.unwrap();

        let mut names = Vec::new();
        let mut archive = tar::Archive::new(&context[..]);
        for entry in archive.entries().unwrap() {
            let entry = entry.unwrap();
            names.push(entry.path().unwrap().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["Dockerfile", "src/index.js"]);
    }

    #[tokio::test]
    async fn test_build_context_preserves_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();

        let context = build_context(dir.path(), vec![PathBuf::from("Dockerfile")])
            .await
            .unwrap();

        let mut archive = tar::Archive::new(&context[..]);
        let mut entry = archive.entries().unwrap().next().unwrap().unwrap();
        let mut contents = String::new();
        entry.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "FROM scratch\n");
    }

    #[tokio::test]
    async fn test_build_context_follows_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("real.txt"), "shared config\n").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real.txt"), dir.path().join("link.txt"))
            .unwrap();

        let context = build_context(dir.path(), vec![PathBuf::from("link.txt")])
            .await
            .unwrap();

        let mut archive = tar::Archive::new(&context[..]);
        let mut entry = archive.entries().unwrap().next().unwrap().unwrap();
        assert_eq!(entry.path().unwrap().to_string_lossy(), "link.txt");
        let mut contents = String::new();
        entry.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "shared config\n");
    }

    #[tokio::test]
    async fn test_build_context_fails_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = build_context(dir.path(), vec![PathBuf::from("absent")]).await;
        assert!(result.is_err());
    }
}
