//! AWS Credentials loading
//!
//! Supports:
//! - Environment variables (AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, AWS_SESSION_TOKEN)
//! - Static keys in AWS profiles (~/.aws/credentials and ~/.aws/config)

use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// AWS credentials
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

/// Profile keys that need a credential source this tool does not drive
const UNSUPPORTED_SOURCES: &[&str] = &[
    "sso_session",
    "sso_start_url",
    "role_arn",
    "credential_process",
];

/// Load credentials for a given profile
pub fn load_credentials(profile: &str) -> Result<Credentials> {
    // 1. Environment variables apply to the default profile
    if profile == "default" {
        if let Ok(creds) = load_from_env() {
            debug!("Loaded credentials from environment variables");
            return Ok(creds);
        }
    }

    // 2. AWS credentials file
    let creds_path = credentials_file_path()?;
    match load_from_ini(&creds_path, profile) {
        Ok(Some(creds)) => {
            debug!(
                "Loaded credentials from credentials file for profile '{}'",
                profile
            );
            return Ok(creds);
        }
        Ok(None) => {}
        Err(e) => return Err(e),
    }

    // 3. Config file with direct credentials
    let config_path = config_file_path()?;
    if let Some(creds) = load_from_ini(&config_path, profile)? {
        debug!(
            "Loaded credentials from config file for profile '{}'",
            profile
        );
        return Ok(creds);
    }

    Err(anyhow!(
        "No credentials found for profile '{}'. Run 'aws configure --profile {}' or set AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY",
        profile,
        profile
    ))
}

/// Load credentials from environment variables
fn load_from_env() -> Result<Credentials> {
    let access_key_id =
        env::var("AWS_ACCESS_KEY_ID").map_err(|_| anyhow!("AWS_ACCESS_KEY_ID not set"))?;
    let secret_access_key =
        env::var("AWS_SECRET_ACCESS_KEY").map_err(|_| anyhow!("AWS_SECRET_ACCESS_KEY not set"))?;
    let session_token = env::var("AWS_SESSION_TOKEN").ok();

    Ok(Credentials {
        access_key_id,
        secret_access_key,
        session_token,
    })
}

/// Get AWS config directory
pub fn aws_config_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|h| h.join(".aws"))
        .ok_or_else(|| anyhow!("Could not find home directory"))
}

/// ~/.aws/credentials or AWS_SHARED_CREDENTIALS_FILE
fn credentials_file_path() -> Result<PathBuf> {
    match env::var("AWS_SHARED_CREDENTIALS_FILE") {
        Ok(path) => Ok(PathBuf::from(path)),
        Err(_) => Ok(aws_config_dir()?.join("credentials")),
    }
}

/// ~/.aws/config or AWS_CONFIG_FILE
fn config_file_path() -> Result<PathBuf> {
    match env::var("AWS_CONFIG_FILE") {
        Ok(path) => Ok(PathBuf::from(path)),
        Err(_) => Ok(aws_config_dir()?.join("config")),
    }
}

type Section = HashMap<String, String>;

/// Sections of a shared config/credentials file. `[profile name]` headers
/// are keyed by `name`; keys before the first header are ignored.
fn parse_profiles(content: &str) -> HashMap<String, Section> {
    let mut profiles: HashMap<String, Section> = HashMap::new();
    let mut current: Option<String> = None;

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with(&['#', ';'][..]) {
            continue;
        }

        if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let header = header.trim();
            let name = header.strip_prefix("profile ").map_or(header, str::trim);
            profiles.entry(name.to_string()).or_default();
            current = Some(name.to_string());
        } else if let (Some(profile), Some((key, value))) = (&current, line.split_once('=')) {
            profiles
                .entry(profile.clone())
                .or_default()
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    profiles
}

fn read_sections(path: &Path) -> Option<HashMap<String, Section>> {
    fs::read_to_string(path)
        .ok()
        .map(|content| parse_profiles(&content))
}

/// Static keys for `profile` in one INI file. `Ok(None)` when the file or
/// the profile is absent, or the profile has no keys.
fn load_from_ini(path: &Path, profile: &str) -> Result<Option<Credentials>> {
    let Some(sections) = read_sections(path) else {
        return Ok(None);
    };
    let Some(section) = sections.get(profile) else {
        return Ok(None);
    };

    if let (Some(access_key), Some(secret_key)) = (
        section.get("aws_access_key_id"),
        section.get("aws_secret_access_key"),
    ) {
        return Ok(Some(Credentials {
            access_key_id: access_key.clone(),
            secret_access_key: secret_key.clone(),
            session_token: section.get("aws_session_token").cloned(),
        }));
    }

    if let Some(key) = UNSUPPORTED_SOURCES.iter().find(|k| section.contains_key(**k)) {
        bail!(
            "Profile '{}' uses '{}', which is not supported; export static credentials instead (e.g. 'aws configure export-credentials --profile {} --format env')",
            profile,
            key,
            profile
        );
    }

    Ok(None)
}

/// Get the default region for a profile from the config file
pub fn get_profile_region(profile: &str) -> Option<String> {
    let path = config_file_path().ok()?;
    region_from_file(&path, profile)
}

fn region_from_file(path: &Path, profile: &str) -> Option<String> {
    read_sections(path)?.get(profile)?.get("region").cloned()
}
