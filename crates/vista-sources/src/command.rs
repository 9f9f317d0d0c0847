use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use vista_types::{FetchContext, Source, SourceData, SourceError, SourceResult};

use crate::fragment::section;

/// Runs an external program and uses its stdout as the fragment.
///
/// The child is killed if the fetch is dropped at the cycle deadline.
#[derive(Clone, Debug)]
pub struct CommandSource {
    name: String,
    program: String,
    args: Vec<String>,
    summary_prefix: Option<String>,
}

impl CommandSource {
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
            summary_prefix: None,
        }
    }

    /// Output lines starting with `prefix` become summary lines instead of
    /// fragment content.
    pub fn with_summary_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.summary_prefix = Some(prefix.into());
        self
    }
}

#[async_trait]
impl Source for CommandSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, ctx: &FetchContext) -> SourceResult<SourceData> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = ctx
            .run(async { command.output().await.map_err(SourceError::from) })
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SourceError::Upstream(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| SourceError::Malformed("command output is not UTF-8".into()))?;
        debug!(source = %self.name, bytes = stdout.len(), "command finished");

        let (summary, body) = split_summary(&stdout, self.summary_prefix.as_deref());
        Ok(SourceData::new(section(&self.name, &body)).with_summary(summary))
    }
}

fn split_summary(output: &str, prefix: Option<&str>) -> (Vec<String>, String) {
    let Some(prefix) = prefix else {
        return (Vec::new(), output.to_string());
    };
    let mut summary = Vec::new();
    let mut body = String::with_capacity(output.len());
    for line in output.lines() {
        match line.strip_prefix(prefix) {
            Some(rest) => summary.push(rest.trim().to_string()),
            None => {
                body.push_str(line);
                body.push('\n');
            }
        }
    }
    (summary, body)
}
