use crate::mail::MailCredentials;
use anyhow::{anyhow, Result};
use log::info;
use secrecy::SecretString;
use std::env;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

pub const USER_ID_VAR: &str = "EMAILJS_USER_ID";
pub const ACCESS_TOKEN_VAR: &str = "EMAILJS_ACCESS_TOKEN";

pub const REQUIRED_ENV_VARS: &[&str] = &[USER_ID_VAR];

// Names of optional environment variables
pub const OPTIONAL_ENV_VARS: &[&str] =
    &[ACCESS_TOKEN_VAR, "FORMRELAY_LOG_LEVEL", "FORMRELAY_CONFIG_PATH"];

/// Required variables that are unset or blank
pub fn missing_env_vars() -> Vec<&'static str> {
    missing_from(REQUIRED_ENV_VARS)
}

fn missing_from(vars: &[&'static str]) -> Vec<&'static str> {
    vars.iter().copied().filter(|var| non_empty_var(var).is_none()).collect()
}

pub fn load_env_file() -> io::Result<()> {
    match dotenvy::dotenv() {
        Ok(path) => {
            info!("Loaded environment from {:?}", path);
            Ok(())
        }
        Err(e) => {
            info!("No .env file found or error loading it: {}", e);
            create_env_template(Path::new(".env"))
        }
    }
}

/// Write an empty `.env` listing every variable, unless one already exists
pub fn create_env_template(env_path: &Path) -> io::Result<()> {
    if env_path.exists() {
        return Ok(());
    }

    let mut file = File::create(env_path)?;

    for var in REQUIRED_ENV_VARS {
        writeln!(file, "{}=", var)?;
    }

    // Write optional variables with comments
    for var in OPTIONAL_ENV_VARS {
        writeln!(file, "# {}=", var)?;
    }

    Ok(())
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Mail service credentials from the environment
pub fn mail_credentials() -> Result<MailCredentials> {
    let user_id = non_empty_var(USER_ID_VAR).ok_or_else(|| {
        anyhow!("{} is not set; add it to your environment or .env file", USER_ID_VAR)
    })?;
    Ok(MailCredentials {
        user_id: SecretString::from(user_id),
        access_token: non_empty_var(ACCESS_TOKEN_VAR).map(SecretString::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_env_template() -> io::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(".env");
        create_env_template(&path)?;

        let content = std::fs::read_to_string(&path)?;
        assert!(content.contains("EMAILJS_USER_ID="));
        assert!(content.contains("# EMAILJS_ACCESS_TOKEN="));
        Ok(())
    }

    #[test]
    fn test_missing_from_reports_unset_and_blank() {
        env::set_var("FORMRELAY_TEST_PRESENT", "value");
        env::set_var("FORMRELAY_TEST_BLANK", "  ");
        env::remove_var("FORMRELAY_TEST_ABSENT");

        let missing = missing_from(&[
            "FORMRELAY_TEST_PRESENT",
            "FORMRELAY_TEST_BLANK",
            "FORMRELAY_TEST_ABSENT",
        ]);
        assert_eq!(missing, vec!["FORMRELAY_TEST_BLANK", "FORMRELAY_TEST_ABSENT"]);
    }

    #[test]
    fn test_mail_credentials_follow_user_id() {
        env::set_var(USER_ID_VAR, "public-key");
        assert!(missing_env_vars().is_empty());
        assert!(mail_credentials().is_ok());

        env::remove_var(USER_ID_VAR);
        assert_eq!(missing_env_vars(), vec![USER_ID_VAR]);
        assert!(mail_credentials().is_err());
    }

    #[test]
    fn test_existing_env_file_untouched() -> io::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(".env");
        std::fs::write(&path, "EMAILJS_USER_ID=abc\n")?;
        create_env_template(&path)?;
        assert_eq!(std::fs::read_to_string(&path)?, "EMAILJS_USER_ID=abc\n");
        Ok(())
    }
}
