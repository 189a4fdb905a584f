//! Example console host.
//!
//! Serves one console connection over newline-delimited JSON: every input
//! line is a protocol frame from the browser, every output line a frame for
//! it. Logs go to stderr.
//!
//! ```text
//! stdin ──▶ ConsoleSession ──▶ Console ──▶ outbox ──▶ stdout
//! ```
//!
//! # Environment
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `PORTICO_LOG` | `tracing` filter directives, e.g. `portico_console=debug` |
//! | `PORTICO_INACTIVITY_SECS` | Inactivity timeout in seconds |

use std::time::Duration;

use portico_conlets::ConletsPlugin;
use portico_console::{ConnectionId, Console, ConsolePlugin, ConsoleSession, LifecycleError};
use portico_core_plugins::{DefaultPlugins, TracingOutput, TracingPlugin};
use portico_system::plugin::PluginGroup;
use portico_system::server::Server;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

/// Filter directives variable.
pub const LOG_VAR: &str = "PORTICO_LOG";
/// Inactivity timeout variable.
pub const INACTIVITY_VAR: &str = "PORTICO_INACTIVITY_SECS";

/// Invalid environment settings.
#[derive(Debug, thiserror::Error)]
#[error("{var} must be a whole number of seconds, got '{value}'")]
pub struct SettingsError {
    var: &'static str,
    value: String,
}

/// Host settings read from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Log filter directives.
    pub log_filter: Option<String>,
    /// Overrides the console's inactivity timeout.
    pub inactivity_timeout: Option<Duration>,
}

impl Settings {
    /// Reads [`LOG_VAR`] and [`INACTIVITY_VAR`].
    ///
    /// # Errors
    ///
    /// Fails if the timeout is not a number.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env), reading through `lookup`.
    ///
    /// # Errors
    ///
    /// Fails if the timeout is not a number.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let inactivity_timeout = match lookup(INACTIVITY_VAR) {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) => Some(Duration::from_secs(secs)),
                Err(_) => {
                    return Err(SettingsError {
                        var: INACTIVITY_VAR,
                        value,
                    });
                }
            },
            None => None,
        };
        Ok(Self {
            log_filter: lookup(LOG_VAR).filter(|filter| !filter.trim().is_empty()),
            inactivity_timeout,
        })
    }
}

/// Builds and finishes a server with the default plugins, the console and
/// the demo components.
#[must_use]
pub fn build_server(settings: &Settings) -> Server {
    let mut tracing = TracingPlugin::default().with_output(TracingOutput::Stderr);
    if let Some(filter) = &settings.log_filter {
        tracing = tracing.with_env_filter(filter.clone());
    }
    let mut console = ConsolePlugin::default();
    if let Some(timeout) = settings.inactivity_timeout {
        console = console.with_inactivity_timeout(timeout);
    }

    let mut server = Server::new();
    server
        .add_plugins(
            DefaultPlugins
                .build()
                .disable::<TracingPlugin>()
                .add(tracing),
        )
        .add_plugins(console)
        .add_plugins(ConletsPlugin.build());
    server.finish();
    server
}

/// Errors ending [`serve`].
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// The connection could not be opened.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Reading frames or writing replies failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The writer task panicked or was cancelled.
    #[error("writer task failed: {0}")]
    Writer(#[from] tokio::task::JoinError),

    /// Someone else already holds the connection's outbox.
    #[error("outbox of connection {0} already taken")]
    OutboxTaken(ConnectionId),
}

/// Serves connection `id` until `input` ends or the connection closes, then
/// closes it and flushes every queued frame to `output`.
///
/// # Errors
///
/// See [`ServeError`].
pub async fn serve<R, W>(
    console: &Console,
    id: ConnectionId,
    input: R,
    mut output: W,
) -> Result<(), ServeError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut session = ConsoleSession::open(console, id)?;
    let Some(mut outbound) = session.take_outbound() else {
        return Err(ServeError::OutboxTaken(session.id().clone()));
    };
    info!(connection = %session.id(), "serving console connection");

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            let line = match frame.to_json() {
                Ok(line) => line,
                Err(err) => {
                    warn!(error = %err, "dropping frame that could not be encoded");
                    continue;
                }
            };
            output.write_all(line.as_bytes()).await?;
            output.write_all(b"\n").await?;
            output.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let mut lines = input.lines();
    let read = loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => {
                session.handle_frame(&line).await;
                if !session.connection().is_connected() {
                    break Ok(());
                }
            }
            Ok(None) => break Ok(()),
            Err(err) => break Err(err),
        }
    };

    session.finish().await;
    writer.await??;
    read?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[test]
    fn settings_from_lookup() {
        let settings = Settings::from_lookup(|var| match var {
            LOG_VAR => Some("portico_console=debug".into()),
            INACTIVITY_VAR => Some(" 90 ".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(settings.log_filter.as_deref(), Some("portico_console=debug"));
        assert_eq!(settings.inactivity_timeout, Some(Duration::from_secs(90)));

        assert_eq!(Settings::from_lookup(|_| None).unwrap(), Settings::default());

        let err = Settings::from_lookup(|var| (var == INACTIVITY_VAR).then(|| "soon".into()))
            .unwrap_err();
        assert!(err.to_string().contains("soon"));
    }

    #[tokio::test]
    async fn serve_answers_each_request_line() {
        let server = build_server(&Settings::default());
        let console = server.get_global::<Console>().cloned().unwrap();

        let input = concat!(
            r#"{"jsonrpc":"2.0","method":"consoleReady","id":1}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"addComponent","params":["SysInfo",{}],"id":2}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"renderComponent","params":["SysInfo",["view"]],"id":3}"#,
            "\n",
        );
        let (writer, mut reader) = tokio::io::duplex(1 << 16);
        serve(
            &console,
            ConnectionId::new("stdio"),
            BufReader::new(input.as_bytes()),
            writer,
        )
        .await
        .unwrap();

        let mut text = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut reader, &mut text)
            .await
            .unwrap();
        let frames: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        let responses: Vec<_> = frames.iter().filter(|f| f.get("result").is_some()).collect();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[1]["result"], "SysInfo");
        assert_eq!(responses[2]["result"], serde_json::json!(["view"]));
        assert!(frames.iter().any(|f| f["method"] == "componentRendered"));
        assert!(console.connection_ids().is_empty());
    }
}
