use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use chrono::NaiveDateTime;
use clap::Parser;

use crate::error::Error;
use crate::review::Strategy;

#[derive(Parser)]
#[command(name = "review-gate", version, about)]
pub struct Options {
    /// only merges after this time are checked
    #[arg(
        long = "check_start_time",
        env = "CHECK_START_TIME",
        default_value = "2020-01-01 00:00:00"
    )]
    pub check_start_time: String,
    /// base url of the upsource server
    #[arg(
        long = "upsource_endpoint",
        env = "UPSOURCE_ENDPOINT",
        default_value = "https://xxx.domain"
    )]
    pub upsource_endpoint: String,
    #[arg(
        long = "upsource_username",
        env = "UPSOURCE_USERNAME",
        default_value = "admin"
    )]
    pub upsource_username: String,
    #[arg(
        long = "upsource_password",
        env = "UPSOURCE_PASSWORD",
        hide_env_values = true,
        default_value = "password"
    )]
    pub upsource_password: String,
    #[arg(
        long = "upsource_project",
        env = "UPSOURCE_PROJECT",
        default_value = "projectA"
    )]
    pub upsource_project: String,
    /// result limit for review queries
    #[arg(long = "default_limit", env = "DEFAULT_LIMIT", default_value_t = 100)]
    pub default_limit: u32,
    /// how branches are mapped to reviews
    #[arg(
        long = "check_strategy",
        env = "CHECK_STRATEGY",
        value_enum,
        default_value = "review-search"
    )]
    pub check_strategy: Strategy,
    /// verify the tls certificate of the upsource server
    #[arg(
        long = "upsource_verify_ssl",
        env = "UPSOURCE_VERIFY_SSL",
        action = clap::ArgAction::Set,
        value_parser = parse_bool,
        default_value = "false"
    )]
    pub upsource_verify_ssl: bool,
    /// directory of the git repository to inspect
    #[arg(long = "repo_dir", env = "REPO_DIR", default_value = ".")]
    pub repo_dir: PathBuf,
}

impl Options {
    pub fn validate(&self) -> Result<(), Error> {
        validate_start_time(&self.check_start_time)?;
        Ok(())
    }
}

// keep the password out of the startup config log line
impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("check_start_time", &self.check_start_time)
            .field("upsource_endpoint", &self.upsource_endpoint)
            .field("upsource_username", &self.upsource_username)
            .field("upsource_password", &"<redacted>")
            .field("upsource_project", &self.upsource_project)
            .field("default_limit", &self.default_limit)
            .field("check_strategy", &self.check_strategy)
            .field("upsource_verify_ssl", &self.upsource_verify_ssl)
            .field("repo_dir", &self.repo_dir)
            .finish()
    }
}

const TRUE_WORDS: &[&str] = &["1", "true", "yes", "on", "y", "t"];
const FALSE_WORDS: &[&str] = &["", "0", "false", "no", "off", "n", "f"];

pub fn parse_bool(raw: &str) -> Result<bool, Error> {
    let lower = raw.trim().to_ascii_lowercase();
    if TRUE_WORDS.contains(&lower.as_str()) {
        return Ok(true);
    }
    if FALSE_WORDS.contains(&lower.as_str()) {
        return Ok(false);
    }
    Err(Error::InvalidBool(raw.to_owned()))
}

pub fn validate_start_time(raw: &str) -> Result<(), Error> {
    if NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").is_ok() {
        return Ok(());
    }
    if NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok() {
        return Ok(());
    }
    Err(Error::InvalidStartTime(raw.to_owned()))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    // tests that touch the process environment serialize on this lock
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct EnvVar {
        name: &'static str,
    }

    impl EnvVar {
        fn set(name: &'static str, value: &str) -> EnvVar {
            std::env::set_var(name, value);
            EnvVar { name }
        }
    }

    impl Drop for EnvVar {
        fn drop(&mut self) {
            std::env::remove_var(self.name);
        }
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Options::command().debug_assert()
    }

    #[test]
    fn defaults_match_documented_values() {
        let _lock = ENV_LOCK.lock().unwrap();
        let options = Options::try_parse_from(["review-gate"]).unwrap();
        assert_eq!(options.check_start_time, "2020-01-01 00:00:00");
        assert_eq!(options.upsource_endpoint, "https://xxx.domain");
        assert_eq!(options.upsource_username, "admin");
        assert_eq!(options.upsource_password, "password");
        assert_eq!(options.upsource_project, "projectA");
        assert_eq!(options.default_limit, 100);
        assert_eq!(options.check_strategy, Strategy::ReviewSearch);
        assert!(!options.upsource_verify_ssl);
        assert_eq!(options.repo_dir, PathBuf::from("."));
    }

    #[test]
    fn flags_override_defaults() {
        let options = Options::try_parse_from([
            "review-gate",
            "--upsource_project",
            "projectB",
            "--check_strategy",
            "branch-info",
            "--upsource_verify_ssl",
            "yes",
            "--default_limit",
            "25",
        ])
        .unwrap();
        assert_eq!(options.upsource_project, "projectB");
        assert_eq!(options.check_strategy, Strategy::BranchInfo);
        assert!(options.upsource_verify_ssl);
        assert_eq!(options.default_limit, 25);
    }

    #[test]
    fn env_overrides_default_and_flag_overrides_env() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _vars = [
            EnvVar::set("CHECK_START_TIME", "2021-02-03 04:05:06"),
            EnvVar::set("UPSOURCE_ENDPOINT", "https://env.example.com"),
            EnvVar::set("UPSOURCE_USERNAME", "env-user"),
            EnvVar::set("UPSOURCE_PASSWORD", "env-pass"),
            EnvVar::set("UPSOURCE_PROJECT", "projectEnv"),
            EnvVar::set("DEFAULT_LIMIT", "7"),
            EnvVar::set("CHECK_STRATEGY", "branch-info"),
            EnvVar::set("UPSOURCE_VERIFY_SSL", "yes"),
            EnvVar::set("REPO_DIR", "/somewhere/else"),
        ];

        let from_env = Options::try_parse_from(["review-gate"]).unwrap();
        assert_eq!(from_env.check_start_time, "2021-02-03 04:05:06");
        assert_eq!(from_env.upsource_endpoint, "https://env.example.com");
        assert_eq!(from_env.upsource_username, "env-user");
        assert_eq!(from_env.upsource_password, "env-pass");
        assert_eq!(from_env.upsource_project, "projectEnv");
        assert_eq!(from_env.default_limit, 7);
        assert_eq!(from_env.check_strategy, Strategy::BranchInfo);
        assert!(from_env.upsource_verify_ssl);
        assert_eq!(from_env.repo_dir, PathBuf::from("/somewhere/else"));

        let flag_wins =
            Options::try_parse_from(["review-gate", "--upsource_project", "projectFlag"]).unwrap();
        assert_eq!(flag_wins.upsource_project, "projectFlag");
        assert_eq!(flag_wins.upsource_username, "env-user");
    }

    #[test]
    fn bool_words() {
        for raw in ["1", "true", "Yes", "on", "y", "T"] {
            assert!(parse_bool(raw).unwrap(), "{raw} should be true");
        }
        for raw in ["", "0", "false", "No", "off", "n", "F"] {
            assert!(!parse_bool(raw).unwrap(), "{raw} should be false");
        }
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn start_time_validation() {
        assert!(validate_start_time("2020-01-01 00:00:00").is_ok());
        assert!(validate_start_time("2023-07-15").is_ok());
        assert!(validate_start_time("last tuesday").is_err());
        assert!(validate_start_time("2020-01-01'; rm -rf /").is_err());
    }

    #[test]
    fn debug_hides_password() {
        let options =
            Options::try_parse_from(["review-gate", "--upsource_password", "hunter2"]).unwrap();
        let rendered = format!("{options:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
