//! Asynchronous file reading with byte-level progress
//!
//! The whole file is read before any of it is decoded. Progress reflects bytes
//! transferred, not data availability.

use std::path::Path;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::config::ReaderConfig;
use crate::error::IngestError;
use crate::progress::percent;

/// Read `path` to text, reporting read progress after every block.
///
/// Invalid UTF-8 is replaced rather than rejected. With `timeout_ms` set, a
/// read that has not finished in time fails with [`IngestError::ReadTimeout`].
pub async fn read_text<P, F>(
    path: P,
    config: &ReaderConfig,
    mut on_progress: F,
) -> Result<String, IngestError>
where
    P: AsRef<Path>,
    F: FnMut(u8),
{
    let read = read_all(path.as_ref(), config.buffer_bytes.max(1), &mut on_progress);

    let bytes = match config.timeout_ms {
        Some(ms) => tokio::time::timeout(Duration::from_millis(ms), read)
            .await
            .map_err(|_| IngestError::ReadTimeout(ms))??,
        None => read.await?,
    };

    Ok(decode_text(bytes))
}

async fn read_all<F>(
    path: &Path,
    buffer_bytes: usize,
    on_progress: &mut F,
) -> Result<Vec<u8>, IngestError>
where
    F: FnMut(u8),
{
    let mut file = File::open(path).await?;
    let total = file.metadata().await?.len();
    log::debug!("reading {} ({} bytes)", path.display(), total);

    let mut bytes = Vec::with_capacity(total as usize);
    let mut buffer = vec![0u8; buffer_bytes];

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        bytes.extend_from_slice(&buffer[..read]);
        on_progress(percent(bytes.len() as u64, total));
    }

    on_progress(100);
    Ok(bytes)
}

fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            log::warn!("input is not valid UTF-8, replacing invalid sequences");
            String::from_utf8_lossy(err.as_bytes()).into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn temp_file(contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("gaze-flux-{}.csv", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_read_reports_block_progress() {
        let path = temp_file(&[b'a'; 1000]);
        let config = ReaderConfig {
            buffer_bytes: 300,
            timeout_ms: None,
        };

        let mut progress = Vec::new();
        let text = read_text(&path, &config, |p| progress.push(p)).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(text.len(), 1000);
        assert!(progress.len() >= 2);
        assert!(progress.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(progress.last(), Some(&100));
    }

    #[tokio::test]
    async fn test_empty_file_reads_as_complete() {
        let path = temp_file(b"");

        let mut progress = Vec::new();
        let text = read_text(&path, &ReaderConfig::default(), |p| progress.push(p))
            .await
            .unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(text, "");
        assert_eq!(progress, vec![100]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let path = temp_file(b"x,y\n1,\xff2");

        let text = read_text(&path, &ReaderConfig::default(), |_| {}).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(text, "x,y\n1,\u{fffd}2");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let path = std::env::temp_dir().join("gaze-flux-does-not-exist.csv");
        let result = read_text(&path, &ReaderConfig::default(), |_| {}).await;
        assert!(matches!(result, Err(IngestError::Io(_))));
    }

    #[tokio::test]
    async fn test_generous_timeout_succeeds() {
        let path = temp_file(b"x,y\n1,2");
        let config = ReaderConfig {
            timeout_ms: Some(30_000),
            ..Default::default()
        };

        let text = read_text(&path, &config, |_| {}).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(text, "x,y\n1,2");
    }

    #[tokio::test]
    async fn test_read_timeout_expires() {
        let path = temp_file(&vec![b'1'; 4 * 1024 * 1024]);
        let config = ReaderConfig {
            buffer_bytes: 16,
            timeout_ms: Some(1),
        };

        let mut progress = Vec::new();
        let result = read_text(&path, &config, |p| progress.push(p)).await;
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(IngestError::ReadTimeout(1))));
        assert_ne!(progress.last(), Some(&100));
    }
}
