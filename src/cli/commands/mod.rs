use std::path::PathBuf;

use anyhow::Result;

use crate::config::Config;
use crate::session::{Session, SessionOpts};

use super::app::GlobalArgs;

pub mod env;
pub mod login;
pub mod run;

pub(crate) fn load_config(global: &GlobalArgs) -> Result<Config> {
    let path: PathBuf = match &global.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };
    Ok(Config::load(path)?)
}

pub(crate) fn session_opts(global: &GlobalArgs) -> SessionOpts {
    SessionOpts {
        environment: global.environment.clone(),
        ca_cert: global.ca_cert.clone(),
        client: global.client.clone(),
        client_secret: global.client_secret.clone(),
        skip_ssl_validation: global.skip_ssl_validation,
    }
}

pub(crate) fn open_session(global: &GlobalArgs) -> Result<Session> {
    let config = load_config(global)?;
    Ok(Session::new(config, session_opts(global)))
}
