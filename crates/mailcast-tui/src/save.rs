//! Saving a generated file to disk under a suggested name.
//!
//! `save_as` only starts the save; the transfer itself runs in the
//! background and reports back over a channel.

use std::path::{Path, PathBuf};

use anyhow::Context;
use mailcast_proto::MailApi;
use reqwest::Url;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Hands a resource URL to the user's download mechanism.
pub trait SaveAs: Clone + Send + Sync + 'static {
    /// Fire and forget. An error means the save could not even be started.
    fn save_as(&self, url: &str, file_name: &str) -> anyhow::Result<()>;
}

/// Result of a background transfer.
#[derive(Debug, Clone)]
pub struct SaveReport {
    pub file_name: String,
    pub result: Result<PathBuf, String>,
}

/// Streams the resource into the downloads directory.
#[derive(Debug, Clone)]
pub struct FileSaver {
    api: MailApi,
    dir: PathBuf,
    reports: mpsc::UnboundedSender<SaveReport>,
}

impl FileSaver {
    pub fn new(api: MailApi, dir: PathBuf, reports: mpsc::UnboundedSender<SaveReport>) -> Self {
        Self { api, dir, reports }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SaveAs for FileSaver {
    fn save_as(&self, url: &str, file_name: &str) -> anyhow::Result<()> {
        let url = Url::parse(url).with_context(|| format!("invalid download url {}", url))?;
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let target = self.dir.join(safe_file_name(file_name));

        let api = self.api.clone();
        let dir = self.dir.clone();
        let reports = self.reports.clone();
        let file_name = file_name.to_string();
        tokio::spawn(async move {
            let result = match fetch_to_file(&api, url.as_str(), &dir, &target).await {
                Ok(bytes) => {
                    info!("[save] wrote {} bytes to {}", bytes, target.display());
                    Ok(target)
                }
                Err(e) => {
                    error!("[save] {} failed: {:#}", file_name, e);
                    Err(format!("{:#}", e))
                }
            };
            let _ = reports.send(SaveReport { file_name, result });
        });
        Ok(())
    }
}

/// Write to a private `.part` file in `dir` and move it over `target` once
/// complete. Concurrent saves of the same name never share a partial file;
/// the last one to finish wins.
async fn fetch_to_file(api: &MailApi, url: &str, dir: &Path, target: &Path) -> anyhow::Result<u64> {
    let mut response = api.open(url).await?;

    let (file, part) = part_file(dir, target)?.into_parts();
    let mut file = tokio::fs::File::from_std(file);
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);

    // Dropping `part` on any earlier error removes the partial file.
    part.persist(target)
        .with_context(|| format!("moving download into {}", target.display()))?;
    Ok(written)
}

fn part_file(dir: &Path, target: &Path) -> anyhow::Result<NamedTempFile> {
    let stem = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    tempfile::Builder::new()
        .prefix(&format!(".{}.", stem))
        .suffix(".part")
        .tempfile_in(dir)
        .with_context(|| format!("creating partial file in {}", dir.display()))
}

/// Keep the suggested name inside the target directory.
fn safe_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "download.mp3".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn saver(base: &str, dir: PathBuf) -> (FileSaver, mpsc::UnboundedReceiver<SaveReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let api = MailApi::new(base).unwrap();
        (FileSaver::new(api, dir, tx), rx)
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("18c2f.mp3"), "18c2f.mp3");
        assert_eq!(safe_file_name("../etc/passwd.mp3"), ".._etc_passwd.mp3");
        assert_eq!(safe_file_name(".."), "download.mp3");
    }

    #[tokio::test]
    async fn test_save_as_streams_into_dir() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/audios/merged/a.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3 fake mp3".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (saver, mut rx) = saver(&server.uri(), dir.path().join("downloads"));

        saver
            .save_as(&format!("{}/audios/merged/a.mp3", server.uri()), "a.mp3")
            .unwrap();

        let report = rx.recv().await.unwrap();
        assert_eq!(report.file_name, "a.mp3");
        let saved = report.result.unwrap();
        assert_eq!(saved, dir.path().join("downloads").join("a.mp3"));
        assert_eq!(std::fs::read(&saved).unwrap(), b"ID3 fake mp3");
        assert_eq!(dir_entries(&dir.path().join("downloads")), ["a.mp3"]);
    }

    #[tokio::test]
    async fn test_save_as_reports_http_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (saver, mut rx) = saver(&server.uri(), dir.path().to_path_buf());

        saver
            .save_as(&format!("{}/audios/merged/gone.mp3", server.uri()), "gone.mp3")
            .unwrap();

        let report = rx.recv().await.unwrap();
        let reason = report.result.unwrap_err();
        assert!(reason.contains("server returned 404"), "{}", reason);
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn test_save_as_rejects_bad_url() {
        let dir = tempfile::tempdir().unwrap();
        let (saver, _rx) = saver("http://mail.lan:3000", dir.path().to_path_buf());
        assert!(saver.save_as("not a url", "x.mp3").is_err());
    }

    #[tokio::test]
    async fn test_overlapping_saves_of_same_name_both_complete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/audios/merged/first.mp3"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![b'A'; 4096])
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/audios/merged/second.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'B'; 4096]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (saver, mut rx) = saver(&server.uri(), dir.path().to_path_buf());

        saver
            .save_as(&format!("{}/audios/merged/first.mp3", server.uri()), "x.mp3")
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        saver
            .save_as(&format!("{}/audios/merged/second.mp3", server.uri()), "x.mp3")
            .unwrap();

        let early = rx.recv().await.unwrap();
        let late = rx.recv().await.unwrap();
        assert_eq!(early.result.unwrap(), dir.path().join("x.mp3"));
        assert_eq!(late.result.unwrap(), dir.path().join("x.mp3"));

        // The transfer that finished last owns the file, whole.
        assert_eq!(std::fs::read(dir.path().join("x.mp3")).unwrap(), vec![b'A'; 4096]);
        assert_eq!(dir_entries(dir.path()), ["x.mp3"]);
    }

    #[test]
    fn test_part_files_are_private_per_transfer() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("x.mp3");

        let mut first = part_file(dir.path(), &target).unwrap();
        let mut second = part_file(dir.path(), &target).unwrap();
        assert_ne!(first.path(), second.path());

        use std::io::Write;
        first.write_all(b"first").unwrap();
        second.write_all(b"second").unwrap();
        first.into_temp_path().persist(&target).unwrap();
        second.into_temp_path().persist(&target).unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"second");
        assert_eq!(dir_entries(dir.path()), ["x.mp3"]);
    }
}
