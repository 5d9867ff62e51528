use anyhow::Result;

use crate::api::runner::CmdRunner;
use crate::api::transport::{AuthMode, AuthedClient};
use crate::cli::app::GlobalArgs;
use crate::ui::Ui;

use super::open_session;

/// `run-command`: invoke a method on a provisioning endpoint, wait for
/// its task and print the decoded result.
pub async fn run_command(
    global: &GlobalArgs,
    endpoint: &str,
    director_uuid: &str,
    method: &str,
    arguments: &[String],
    ui: &dyn Ui,
) -> Result<()> {
    let session = open_session(global)?;
    let client = AuthedClient::new(session.executor()?, AuthMode::None);
    let runner = CmdRunner::new(endpoint, director_uuid, client)?;

    let arguments: Vec<serde_json::Value> = arguments.iter().map(|arg| parse_argument(arg)).collect();

    let output = runner.run(method, &arguments).await?;

    ui.print_line(&serde_json::to_string_pretty(&output.result)?);
    Ok(())
}

/// Arguments are JSON values; a bare word that is not valid JSON is
/// taken as a plain string.
fn parse_argument(arg: &str) -> serde_json::Value {
    serde_json::from_str(arg).unwrap_or_else(|_| serde_json::Value::String(arg.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn arguments_parse_as_json_with_a_string_fallback() {
        assert_eq!(parse_argument("42"), json!(42));
        assert_eq!(parse_argument("true"), json!(true));
        assert_eq!(parse_argument(r#"{"size":"large"}"#), json!({"size": "large"}));
        assert_eq!(parse_argument("vm-cid-1"), json!("vm-cid-1"));
    }
}
