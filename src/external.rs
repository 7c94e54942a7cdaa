//! Clipboard and media-player integration via external programs.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::ExternalConfig;
use crate::{Error, Result};

/// Side-effecting helpers the UI triggers for a resolved file URL.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Places `text` on the system clipboard.
    async fn copy_to_clipboard(&self, text: &str) -> Result<()>;

    /// Starts the media player on `url` without waiting for it to exit.
    async fn open_in_player(&self, url: &str) -> Result<()>;

    /// Name of the configured player, for status messages.
    fn player_name(&self) -> &str;
}

/// [`Launcher`] backed by real executables.
#[derive(Debug, Clone)]
pub struct SystemLauncher {
    config: ExternalConfig,
}

impl SystemLauncher {
    #[must_use]
    pub const fn new(config: ExternalConfig) -> Self {
        Self { config }
    }

    async fn pipe_to(argv: &[String], text: &str) -> std::io::Result<bool> {
        let Some((program, args)) = argv.split_first() else {
            return Ok(false);
        };
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            // A tool that exits early closes the pipe; its exit status decides.
            match stdin.write_all(text.as_bytes()).await {
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e),
                _ => {}
            }
        }
        Ok(child.wait().await?.success())
    }
}

#[async_trait]
impl Launcher for SystemLauncher {
    async fn copy_to_clipboard(&self, text: &str) -> Result<()> {
        let mut last_failure = String::from("no clipboard command configured");
        for argv in &self.config.clipboard {
            let label = argv.join(" ");
            match Self::pipe_to(argv, text).await {
                Ok(true) => {
                    log::debug!("Copied to clipboard with {label}");
                    return Ok(());
                }
                Ok(false) => last_failure = format!("{label} exited with an error"),
                Err(e) => last_failure = format!("{label}: {e}"),
            }
            log::debug!("Clipboard command failed: {last_failure}");
        }
        Err(Error::External(format!(
            "failed to copy URL to clipboard: {last_failure}"
        )))
    }

    async fn open_in_player(&self, url: &str) -> Result<()> {
        Command::new(&self.config.player)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                Error::External(format!("failed to start {}: {e}", self.config.player))
            })?;
        log::info!("Started {} for {url}", self.config.player);
        Ok(())
    }

    fn player_name(&self) -> &str {
        &self.config.player
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launcher(clipboard: Vec<Vec<String>>, player: &str) -> SystemLauncher {
        SystemLauncher::new(ExternalConfig {
            player: player.to_string(),
            clipboard,
        })
    }

    #[tokio::test]
    async fn copy_fails_over_to_next_command() {
        let launcher = launcher(
            vec![
                vec!["seedr-dl-no-such-clipboard".to_string()],
                vec!["sh".to_string(), "-c".to_string(), "cat >/dev/null".to_string()],
            ],
            "mpv",
        );
        launcher.copy_to_clipboard("https://example.invalid/f").await.unwrap();
    }

    #[tokio::test]
    async fn copy_reports_last_failure() {
        let launcher = launcher(vec![vec!["false".to_string()]], "mpv");
        let err = launcher.copy_to_clipboard("x").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to copy URL to clipboard: false exited with an error"
        );
    }

    #[tokio::test]
    async fn copy_without_commands_fails() {
        let launcher = launcher(Vec::new(), "mpv");
        assert!(launcher.copy_to_clipboard("x").await.is_err());
    }

    #[tokio::test]
    async fn missing_player_is_external_error() {
        let launcher = launcher(Vec::new(), "seedr-dl-no-such-player");
        let err = launcher.open_in_player("https://example.invalid/f").await.unwrap_err();
        assert!(matches!(err, Error::External(ref m) if m.starts_with("failed to start seedr-dl-no-such-player")));
        assert_eq!(launcher.player_name(), "seedr-dl-no-such-player");
    }
}
