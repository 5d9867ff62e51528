use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/*
current_environment = "https://192.168.50.4:25555"

[[environments]]
url = "https://192.168.50.4:25555"
ca_cert = "..."
current_deployment = "test"
username = "admin"
password = "admin"
*/

/// Known environments plus the currently selected one.
///
/// `Config` is a value: every mutator takes `&self` and returns a new
/// `Config`, so a snapshot handed to a caller never changes underneath it.
/// Nothing touches the backing file until [`Config::save`] is called.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    path: PathBuf,
    schema: Schema,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Schema {
    /// Always a full URL, never an alias.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    current_environment: String,

    #[serde(default)]
    environments: Vec<EnvironmentSchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct EnvironmentSchema {
    url: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    ca_cert: String,

    #[serde(default, skip_serializing_if = "is_false")]
    skip_ssl_validation: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    alias: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    current_deployment: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    username: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    password: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    refresh_token: String,
}

fn is_false(flag: &bool) -> bool {
    !flag
}

/// URL plus optional alias, as listed by `environments`.
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    pub url: String,
    pub alias: String,
}

/// Credentials for one environment. At most one of the three shapes is
/// normally populated (basic, OAuth client, refresh token), but the shapes
/// are deliberately independent predicates and may coexist.
///
/// Only `username`, `password` and `refresh_token` are ever persisted;
/// `client`/`client_secret` arrive through command-line options and live
/// for a single invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Creds {
    pub username: String,
    pub password: String,

    pub client: String,
    pub client_secret: String,

    pub refresh_token: String,
}

impl Creds {
    pub fn is_basic_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    pub fn is_client_configured(&self) -> bool {
        !self.client.is_empty()
    }

    pub fn is_refresh_configured(&self) -> bool {
        !self.refresh_token.is_empty()
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "linux") {
            // XDG config directory on Linux
            dirs::config_dir()
                .ok_or_else(|| Error::InvalidArgument("Failed to get config directory".into()))?
                .join("director-cli")
        } else {
            // Home directory with dot prefix on Windows/Mac
            dirs::home_dir()
                .ok_or_else(|| Error::InvalidArgument("Failed to get home directory".into()))?
                .join(".director-cli")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Loads config from `path`. A missing file is an empty config, not an
    /// error, so first-time use needs no setup step.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        debug!("Loading config from {:?}", path);

        if !path.exists() {
            return Ok(Self {
                path,
                schema: Schema::default(),
            });
        }

        let contents = fs::read_to_string(&path).map_err(|source| Error::ConfigRead {
            path: path.clone(),
            source,
        })?;

        let schema: Schema = toml::from_str(&contents).map_err(|source| Error::ConfigParse {
            path: path.clone(),
            source,
        })?;

        debug!("Loaded config with {} environments", schema.environments.len());
        Ok(Self { path, schema })
    }

    /// Current environment URL, or empty when none was ever selected.
    pub fn environment(&self) -> &str {
        &self.schema.current_environment
    }

    pub fn environments(&self) -> Vec<Environment> {
        self.schema
            .environments
            .iter()
            .map(|env| Environment {
                url: env.url.clone(),
                alias: env.alias.clone(),
            })
            .collect()
    }

    /// Resolves a URL or alias to the stored environment URL. Unknown input
    /// is returned unchanged: it is treated as a literal URL so a target
    /// never seen before can be used without registering it first.
    pub fn resolve_environment(&self, url_or_alias: &str) -> String {
        match self.find(url_or_alias) {
            Some(env) => env.url.clone(),
            None => url_or_alias.to_string(),
        }
    }

    /// Registers `url_or_alias` (optionally under `alias`) and makes it the
    /// current environment. When `alias` is empty the first argument may
    /// itself be an alias and is resolved; otherwise it is taken as the
    /// canonical URL. The CA cert input is normalized by [`read_ca_cert`].
    pub fn set_environment(&self, url_or_alias: &str, alias: &str, ca_cert_or_path: &str) -> Config {
        let mut next = self.clone();

        let url = if alias.is_empty() {
            self.resolve_environment(url_or_alias)
        } else {
            let url = url_or_alias.to_string();
            let env = Self::find_or_create(&mut next.schema, &url);
            env.alias = alias.to_string();
            url
        };

        next.schema.current_environment = url.clone();

        let ca_cert = read_ca_cert(ca_cert_or_path);
        let env = Self::find_or_create(&mut next.schema, &url);
        env.ca_cert = ca_cert;

        next
    }

    pub fn ca_cert(&self, url_or_alias: &str) -> String {
        match self.find(url_or_alias) {
            Some(env) => read_ca_cert(&env.ca_cert),
            None => String::new(),
        }
    }

    pub fn skip_ssl_validation(&self, url_or_alias: &str) -> bool {
        self.find(url_or_alias)
            .map(|env| env.skip_ssl_validation)
            .unwrap_or(false)
    }

    pub fn set_skip_ssl_validation(&self, url_or_alias: &str, flag: bool) -> Config {
        let mut next = self.clone();
        let env = Self::find_or_create(&mut next.schema, url_or_alias);
        env.skip_ssl_validation = flag;
        next
    }

    pub fn credentials(&self, url_or_alias: &str) -> Creds {
        match self.find(url_or_alias) {
            Some(env) => Creds {
                username: env.username.clone(),
                password: env.password.clone(),
                refresh_token: env.refresh_token.clone(),
                ..Creds::default()
            },
            None => Creds::default(),
        }
    }

    /// Replaces the whole credentials record for the resolved environment.
    /// Client id/secret are session-scoped and never written to disk.
    pub fn set_credentials(&self, url_or_alias: &str, creds: Creds) -> Config {
        let mut next = self.clone();
        let env = Self::find_or_create(&mut next.schema, url_or_alias);
        env.username = creds.username;
        env.password = creds.password;
        env.refresh_token = creds.refresh_token;
        next
    }

    pub fn unset_credentials(&self, url_or_alias: &str) -> Config {
        let mut next = self.clone();
        let env = Self::find_or_create(&mut next.schema, url_or_alias);
        env.username = String::new();
        env.password = String::new();
        env.refresh_token = String::new();
        next
    }

    pub fn deployment(&self, url_or_alias: &str) -> String {
        self.find(url_or_alias)
            .map(|env| env.current_deployment.clone())
            .unwrap_or_default()
    }

    pub fn set_deployment(&self, url_or_alias: &str, name_or_path: &str) -> Config {
        let mut next = self.clone();
        let env = Self::find_or_create(&mut next.schema, url_or_alias);
        env.current_deployment = name_or_path.to_string();
        next
    }

    /// Serializes the full schema and writes it atomically: the contents go
    /// to a sibling temp file which is then renamed over the target.
    pub fn save(&self) -> Result<()> {
        debug!("Saving config to {:?}", self.path);

        let contents = toml::to_string_pretty(&self.schema).map_err(Error::ConfigSerialize)?;

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir).map_err(|source| Error::ConfigWrite {
                    path: self.path.clone(),
                    source,
                })?;
            }
        }

        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, contents).map_err(|source| Error::ConfigWrite {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| Error::ConfigWrite {
            path: self.path.clone(),
            source,
        })?;

        info!("Config saved to {:?}", self.path);
        Ok(())
    }

    fn find(&self, url_or_alias: &str) -> Option<&EnvironmentSchema> {
        self.schema
            .environments
            .iter()
            .find(|env| url_or_alias == env.url || (!env.alias.is_empty() && url_or_alias == env.alias))
    }

    fn find_or_create<'a>(schema: &'a mut Schema, url_or_alias: &str) -> &'a mut EnvironmentSchema {
        let index = schema
            .environments
            .iter()
            .position(|env| url_or_alias == env.url || (!env.alias.is_empty() && url_or_alias == env.alias));

        match index {
            Some(i) => &mut schema.environments[i],
            None => {
                schema.environments.push(EnvironmentSchema {
                    url: url_or_alias.to_string(),
                    ..EnvironmentSchema::default()
                });
                let last = schema.environments.len() - 1;
                &mut schema.environments[last]
            }
        }
    }
}

/// Normalizes a CA cert input: a string carrying a PEM marker is stored
/// verbatim, anything else is treated as a file path and read once. A
/// missing or unreadable file yields an empty cert rather than an error so
/// a stale path reference cannot break config resolution.
pub(crate) fn read_ca_cert(ca_cert_or_path: &str) -> String {
    if ca_cert_or_path.contains("BEGIN") {
        return ca_cert_or_path.to_string();
    }

    match fs::read_to_string(Path::new(ca_cert_or_path)) {
        Ok(contents) => contents,
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        Config::load(dir.path().join("config.toml")).unwrap()
    }

    #[test]
    fn missing_file_loads_as_empty_config() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        assert_eq!(config.environment(), "");
        assert!(config.environments().is_empty());
    }

    #[test]
    fn resolving_unknown_environment_returns_input_unchanged() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        assert_eq!(config.resolve_environment("https://unknown:25555"), "https://unknown:25555");
        // no mutation happened, so resolving again gives the same literal
        assert_eq!(config.resolve_environment("https://unknown:25555"), "https://unknown:25555");
    }

    #[test]
    fn set_environment_is_copy_on_write() {
        let dir = TempDir::new().unwrap();
        let c1 = config_in(&dir);

        let c2 = c1.set_environment("https://url1", "alias1", "");

        assert_eq!(c1.environment(), "");
        assert!(c1.environments().is_empty());
        assert_eq!(c2.environment(), "https://url1");
        assert_eq!(
            c2.environments(),
            vec![Environment {
                url: "https://url1".to_string(),
                alias: "alias1".to_string(),
            }]
        );
    }

    #[test]
    fn set_environment_resolves_alias_back_to_url() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir)
            .set_environment("https://url1", "alias1", "")
            .set_environment("alias1", "", "");

        assert_eq!(config.environment(), "https://url1");
        assert_eq!(config.environments().len(), 1);
    }

    #[test]
    fn ca_cert_with_pem_marker_is_stored_verbatim() {
        let dir = TempDir::new().unwrap();
        let pem = "-----BEGIN CERTIFICATE-----\nabc\n-----END CERTIFICATE-----\n";
        let config = config_in(&dir).set_environment("https://url1", "", pem);

        assert_eq!(config.ca_cert("https://url1"), pem);
    }

    #[test]
    fn ca_cert_without_marker_is_read_from_path() {
        let dir = TempDir::new().unwrap();
        let pem = "-----BEGIN CERTIFICATE-----\nabc\n-----END CERTIFICATE-----\n";
        let cert_path = dir.path().join("ca.pem");
        fs::write(&cert_path, pem).unwrap();

        let config = config_in(&dir).set_environment("https://url1", "", cert_path.to_str().unwrap());

        assert_eq!(config.ca_cert("https://url1"), pem);
    }

    #[test]
    fn unreadable_ca_cert_path_yields_empty_cert() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir).set_environment("https://url1", "", "/no/such/ca.pem");

        assert_eq!(config.ca_cert("https://url1"), "");
    }

    #[test]
    fn credentials_are_replaced_whole_and_resolve_through_aliases() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir).set_environment("https://url1", "alias1", "").set_credentials(
            "alias1",
            Creds {
                username: "admin".into(),
                password: "secret".into(),
                ..Creds::default()
            },
        );

        let creds = config.credentials("https://url1");
        assert_eq!(creds.username, "admin");
        assert_eq!(creds.password, "secret");
        assert!(creds.is_basic_complete());

        let cleared = config.unset_credentials("alias1");
        assert_eq!(cleared.credentials("https://url1"), Creds::default());
        // the earlier snapshot still holds the old record
        assert_eq!(config.credentials("https://url1").username, "admin");
    }

    #[test]
    fn save_and_load_round_trips_every_field() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let pem = "-----BEGIN CERTIFICATE-----\nabc\n-----END CERTIFICATE-----\n";

        let config = Config::load(&path)
            .unwrap()
            .set_environment("https://url1", "alias1", pem)
            .set_skip_ssl_validation("alias1", true)
            .set_deployment("alias1", "dep1")
            .set_credentials(
                "alias1",
                Creds {
                    username: "admin".into(),
                    password: "secret".into(),
                    refresh_token: "rt-1".into(),
                    ..Creds::default()
                },
            )
            .set_environment("https://url2", "", "");
        config.save().unwrap();

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded, config);
        assert_eq!(reloaded.environment(), "https://url2");
        assert_eq!(reloaded.ca_cert("alias1"), pem);
        assert!(reloaded.skip_ssl_validation("alias1"));
        assert_eq!(reloaded.deployment("alias1"), "dep1");
        assert_eq!(reloaded.credentials("alias1").refresh_token, "rt-1");
        assert!(!dir.path().join("config.toml.tmp").exists());
    }

    #[test]
    fn empty_fields_are_omitted_from_the_saved_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load(&path).unwrap().set_environment("https://url1", "", "");
        config.save().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("url"));
        assert!(!contents.contains("password"));
        assert!(!contents.contains("alias"));
        assert!(!contents.contains("skip_ssl_validation"));
        assert!(!contents.contains("refresh_token"));
    }

    #[test]
    fn client_credentials_are_never_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load(&path).unwrap().set_credentials(
            "https://url1",
            Creds {
                client: "ops-client".into(),
                client_secret: "ops-secret".into(),
                refresh_token: "rt-1".into(),
                ..Creds::default()
            },
        );
        config.save().unwrap();

        let reloaded = Config::load(&path).unwrap();
        let creds = reloaded.credentials("https://url1");
        assert_eq!(creds.client, "");
        assert_eq!(creds.client_secret, "");
        assert_eq!(creds.refresh_token, "rt-1");
    }
}
