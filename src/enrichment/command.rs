//! Enrichment through an external command
//!
//! Each call spawns the configured program, writes one JSON request on its
//! stdin, closes stdin and reads the whole of stdout as the response. The
//! request carries an `op` tag naming the operation.

use super::service::{BatchRequest, Connection, EnrichmentError, EnrichmentResult, EnrichmentService};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Program and arguments for [`CommandService`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum CommandRequest<'a> {
    ExtractTheme {
        sentence: &'a str,
        existing_nodes: &'a [String],
    },
    FindConnections {
        new_node: &'a str,
        existing_nodes: &'a [String],
    },
    BulkAnalyze {
        transcripts: &'a str,
        model: &'a str,
    },
}

/// `find_connections` output: a bare array or `{"connections": [...]}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ConnectionsResponse {
    Bare(Vec<Connection>),
    Wrapped { connections: Vec<Connection> },
}

pub struct CommandService {
    config: CommandConfig,
}

impl CommandService {
    pub fn new(config: CommandConfig) -> Self {
        Self { config }
    }

    async fn invoke(&self, request: &CommandRequest<'_>) -> EnrichmentResult<String> {
        let payload = serde_json::to_vec(request)?;

        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                EnrichmentError::Unavailable(format!(
                    "failed to start '{}': {}",
                    self.config.program, e
                ))
            })?;

        // Written from a separate task so a chatty child cannot fill its
        // stdout pipe while we are still blocked on stdin.
        let writer = child.stdin.take().map(|mut stdin| {
            tokio::spawn(async move {
                stdin.write_all(&payload).await?;
                stdin.flush().await
            })
        });

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EnrichmentError::InvocationFailed(format!(
                "'{}' exited with {}: {}",
                self.config.program,
                output.status,
                stderr.trim()
            )));
        }
        if let Some(writer) = writer {
            let written = writer.await.map_err(|e| {
                EnrichmentError::InvocationFailed(format!("request writer failed: {}", e))
            })?;
            match written {
                Ok(()) => {}
                // The child answered and exited without reading all of stdin.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    debug!(program = %self.config.program, "command closed stdin before reading the request");
                }
                Err(e) => return Err(e.into()),
            }
        }

        debug!(program = %self.config.program, bytes = output.stdout.len(), "command responded");
        String::from_utf8(output.stdout).map_err(|e| {
            EnrichmentError::InvocationFailed(format!("response is not UTF-8: {}", e))
        })
    }
}

#[async_trait]
impl EnrichmentService for CommandService {
    async fn extract_theme(
        &self,
        sentence: &str,
        existing_nodes: &[String],
    ) -> EnrichmentResult<String> {
        let response = self
            .invoke(&CommandRequest::ExtractTheme {
                sentence,
                existing_nodes,
            })
            .await?;
        let theme = response.trim().trim_matches('"').to_string();
        if theme.is_empty() {
            return Err(EnrichmentError::InvocationFailed("empty theme".to_string()));
        }
        Ok(theme)
    }

    async fn find_connections(
        &self,
        new_node: &str,
        existing_nodes: &[String],
    ) -> EnrichmentResult<Vec<Connection>> {
        if existing_nodes.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .invoke(&CommandRequest::FindConnections {
                new_node,
                existing_nodes,
            })
            .await?;
        let parsed: ConnectionsResponse = serde_json::from_str(response.trim())?;
        Ok(match parsed {
            ConnectionsResponse::Bare(connections) => connections,
            ConnectionsResponse::Wrapped { connections } => connections,
        })
    }

    async fn bulk_analyze(&self, request: &BatchRequest) -> EnrichmentResult<String> {
        self.invoke(&CommandRequest::BulkAnalyze {
            transcripts: &request.transcripts,
            model: &request.model,
        })
        .await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn service(program: &str, args: &[&str]) -> CommandService {
        CommandService::new(CommandConfig {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        })
    }

    #[tokio::test]
    async fn request_is_written_to_stdin() {
        let echo = service("cat", &[]);
        let response = echo
            .bulk_analyze(&BatchRequest::new("the transcript"))
            .await
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["op"], "bulk_analyze");
        assert_eq!(value["transcripts"], "the transcript");
        assert_eq!(value["model"], crate::enrichment::DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn missing_program_is_unavailable() {
        let missing = service("mindmap-no-such-program", &[]);
        let result = missing.bulk_analyze(&BatchRequest::new("text")).await;
        assert!(matches!(result, Err(EnrichmentError::Unavailable(_))));
    }

    #[tokio::test]
    async fn non_zero_exit_is_invocation_failure() {
        let failing = service("sh", &["-c", "cat > /dev/null; echo nope >&2; exit 3"]);
        let result = failing.bulk_analyze(&BatchRequest::new("text")).await;
        match result {
            Err(EnrichmentError::InvocationFailed(message)) => assert!(message.contains("nope")),
            other => panic!("expected invocation failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn wrapped_connections_are_accepted() {
        let script = r#"cat > /dev/null; echo '{"connections": [{"node": "sales", "strength": 0.8}]}'"#;
        let wrapped = service("sh", &["-c", script]);
        let connections = wrapped
            .find_connections("pricing", &["sales".to_string()])
            .await
            .unwrap();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].node, "sales");
    }

    #[tokio::test]
    async fn reply_without_reading_stdin_is_accepted() {
        let eager = service("sh", &["-c", r#"echo '{"concepts": ["pricing"]}'"#]);
        let transcript = "pricing ".repeat(128 * 1024);
        let response = eager
            .bulk_analyze(&BatchRequest::new(transcript))
            .await
            .unwrap();
        assert!(response.contains("pricing"));
    }

    #[tokio::test]
    async fn theme_is_trimmed() {
        let themed = service("sh", &["-c", "cat > /dev/null; echo '  \"growth\"  '"]);
        let theme = themed.extract_theme("a sentence about growth", &[]).await.unwrap();
        assert_eq!(theme, "growth");
    }
}
