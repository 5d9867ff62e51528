use std::time::Duration;

use log::debug;
use reqwest::Url;

use crate::error::{Error, Result};

use super::models::{CmdContext, CmdInput, CmdOutput, TaskCreatedResponse, TaskStatusResponse};
use super::transport::AuthedClient;

/// Polling cadence for asynchronous remote commands. Injectable so tests
/// can shrink both knobs to run without wall-clock waits.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 100,
        }
    }
}

/// Drives a provisioning backend that executes commands asynchronously:
/// submit a command, receive a task handle, poll until the task finishes,
/// decode its result.
pub struct CmdRunner {
    endpoint: Url,
    director_uuid: String,
    client: AuthedClient,
    poll: PollConfig,
}

impl CmdRunner {
    pub fn new(endpoint: &str, director_uuid: &str, client: AuthedClient) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|err| Error::InvalidArgument(format!("Parsing command endpoint '{endpoint}': {err}")))?;
        Ok(Self {
            endpoint,
            director_uuid: director_uuid.to_string(),
            client,
            poll: PollConfig::default(),
        })
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Submits `method` and blocks (with timed waits between polls) until
    /// the resulting task finishes or the attempt budget runs out. Any
    /// state other than `finished` counts as still running.
    pub async fn run(&self, method: &str, arguments: &[serde_json::Value]) -> Result<CmdOutput> {
        let input = CmdInput {
            method,
            arguments,
            context: CmdContext {
                director_uuid: &self.director_uuid,
            },
        };
        let body = serde_json::to_vec(&input).map_err(|_| Error::ProtocolDecode {
            what: "command input",
            body: method.to_string(),
        })?;

        debug!("Submitting command '{}' to {}", method, self.endpoint);
        let response = self.client.post_json(self.endpoint.clone(), body).await?;
        let created: TaskCreatedResponse =
            serde_json::from_slice(&response.body).map_err(|_| Error::ProtocolDecode {
                what: "task creation response",
                body: response.body_string(),
            })?;

        let task_url = self.task_url(&created.task_id)?;
        for attempt in 0..self.poll.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.poll.interval).await;
            }

            let response = self.client.get_json(task_url.clone()).await?;
            let status: TaskStatusResponse =
                serde_json::from_slice(&response.body).map_err(|_| Error::ProtocolDecode {
                    what: "task status response",
                    body: response.body_string(),
                })?;

            if status.state == "finished" {
                return self.decode_output(method, &status.result);
            }

            debug!(
                "Task '{}' is '{}' (attempt {}/{})",
                created.task_id,
                status.state,
                attempt + 1,
                self.poll.max_attempts
            );
        }

        Err(Error::TaskTimeout {
            task_id: created.task_id,
        })
    }

    fn decode_output(&self, method: &str, result: &str) -> Result<CmdOutput> {
        let output: CmdOutput = serde_json::from_str(result).map_err(|_| Error::ProtocolDecode {
            what: "command output",
            body: result.to_string(),
        })?;

        if !output.log.is_empty() {
            debug!("{}", output.log);
        }

        if let Some(error) = &output.error {
            return Err(Error::Method {
                method: method.to_string(),
                message: error.describe().to_string(),
            });
        }

        Ok(output)
    }

    fn task_url(&self, task_id: &str) -> Result<Url> {
        let base = self.endpoint.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/tasks/{task_id}"))
            .map_err(|err| Error::InvalidArgument(format!("Building task URL: {err}")))
    }
}
