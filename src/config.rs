use clap::Args;
use regex::Regex;
use reqwest::Url;
use std::path::PathBuf;
use std::sync::LazyLock;

use crate::monitors::extractor::{parse_selector, InvalidSelector};
use crate::monitors::MissPolicy;
use crate::notifiers::twilio::TWILIO_API_BASE;
use crate::notifiers::{Channel, Notification};

pub const DEFAULT_URL: &str = "https://devconfbd.com/";
pub const DEFAULT_SELECTOR: &str = ".btn.btn-primary.btn-md.bg-gradient-to-r";
pub const DEFAULT_BASELINE: &str =
    r#"Registration will open soon<i class="fa fa-arrow-right ml-1.5 text-sm"></i>"#;
pub const DEFAULT_MESSAGE: &str = "The page you are watching just changed. Go and check it!";

static RE_E164: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("invalid regex: e164"));

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} is not a valid URL `{url}`: {details}")]
    InvalidUrl {
        field: &'static str,
        url: String,
        details: String,
    },
    #[error(transparent)]
    InvalidSelector(#[from] InvalidSelector),
    #[error("{field} must be an E.164 phone number such as +14155238886, got `{value}`")]
    InvalidPhone { field: &'static str, value: String },
    #[error("{field} must not be empty")]
    Missing { field: &'static str },
    #[error("poll interval must be at least one second")]
    ZeroInterval,
}

/// Page and element to watch
#[derive(Debug, Clone, Args)]
pub struct TargetArgs {
    /// Webpage URL to monitor
    #[arg(short, long, env = "TARGET_URL", default_value = DEFAULT_URL)]
    pub url: String,

    /// CSS selector of the watched element
    #[arg(short, long, env = "TARGET_SELECTOR", default_value = DEFAULT_SELECTOR)]
    pub selector: String,

    /// Inner HTML considered "not changed yet"
    #[arg(short, long, env = "BASELINE_FRAGMENT", default_value = DEFAULT_BASELINE)]
    pub baseline: String,
}

#[derive(Debug, Clone, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// What to do when the selector matches nothing
    #[arg(long, env = "ON_SELECTOR_MISS", value_enum, default_value_t = MissPolicy::TreatAsEmpty)]
    pub on_miss: MissPolicy,

    /// Monitoring interval (seconds)
    #[arg(short, long, env = "POLL_INTERVAL_SECS", default_value_t = 60)]
    pub interval: u64,

    /// Twilio account SID
    #[arg(long, env = "TWILIO_ACCOUNT_SID", hide_env_values = true)]
    pub account_sid: String,

    /// Twilio auth token
    #[arg(long, env = "TWILIO_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: String,

    /// Twilio API host
    #[arg(long, env = "TWILIO_API_BASE", default_value = TWILIO_API_BASE)]
    pub twilio_api_base: String,

    /// Sender phone number
    #[arg(long, env = "SENDER_PHONE")]
    pub sender: String,

    /// Receiver phone number
    #[arg(long, env = "RECEIVER_PHONE")]
    pub receiver: String,

    /// Notification channel
    #[arg(long, env = "NOTIFY_CHANNEL", value_enum, default_value_t = Channel::WhatsApp)]
    pub channel: Channel,

    /// Notification text
    #[arg(long, env = "NOTIFY_MESSAGE", default_value = DEFAULT_MESSAGE)]
    pub message: String,

    /// Status server port
    #[arg(short, long, env = "PORT")]
    pub port: u16,

    /// Directory holding info.log and error.log
    #[arg(long, env = "LOG_DIR", default_value = "tmp")]
    pub log_dir: PathBuf,

    /// Deployment region shown on the status page
    #[arg(long, env = "FLY_REGION")]
    pub region: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TargetConfig {
    pub url: String,
    pub selector: String,
    pub baseline: String,
    pub miss_policy: MissPolicy,
    pub interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub sender: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub receiver: String,
    pub message: String,
    pub channel: Channel,
}

impl AlertConfig {
    pub fn notification(&self) -> Notification {
        Notification {
            to: self.receiver.clone(),
            body: self.message.clone(),
            channel: self.channel,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub log_dir: PathBuf,
    pub region: Option<String>,
}

/// Settings for a `watch` run, validated once and never re-read
#[derive(Debug, Clone)]
pub struct Config {
    pub target: TargetConfig,
    pub twilio: TwilioConfig,
    pub alert: AlertConfig,
    pub server: ServerConfig,
}

impl TryFrom<WatchArgs> for Config {
    type Error = ConfigError;

    fn try_from(args: WatchArgs) -> Result<Self, Self::Error> {
        validate_target(&args.target)?;
        if args.interval == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        require("TWILIO_ACCOUNT_SID", &args.account_sid)?;
        require("TWILIO_AUTH_TOKEN", &args.auth_token)?;
        validate_url("TWILIO_API_BASE", &args.twilio_api_base)?;
        validate_phone("SENDER_PHONE", &args.sender)?;
        validate_phone("RECEIVER_PHONE", &args.receiver)?;
        require("NOTIFY_MESSAGE", &args.message)?;

        Ok(Config {
            target: TargetConfig {
                url: args.target.url,
                selector: args.target.selector,
                baseline: args.target.baseline,
                miss_policy: args.on_miss,
                interval_secs: args.interval,
            },
            twilio: TwilioConfig {
                account_sid: args.account_sid.trim().to_string(),
                auth_token: args.auth_token.trim().to_string(),
                sender: args.sender,
                api_base: args.twilio_api_base,
            },
            alert: AlertConfig {
                receiver: args.receiver,
                message: args.message,
                channel: args.channel,
            },
            server: ServerConfig {
                port: args.port,
                log_dir: args.log_dir,
                region: args.region.filter(|r| !r.trim().is_empty()),
            },
        })
    }
}

pub fn validate_target(target: &TargetArgs) -> Result<(), ConfigError> {
    validate_url("TARGET_URL", &target.url)?;
    parse_selector(&target.selector)?;
    Ok(())
}

fn validate_url(field: &'static str, url: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(url).map_err(|e| ConfigError::InvalidUrl {
        field,
        url: url.to_string(),
        details: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl {
            field,
            url: url.to_string(),
            details: format!("unsupported scheme `{}`", other),
        }),
    }
}

fn validate_phone(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if RE_E164.is_match(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidPhone {
            field,
            value: value.to_string(),
        })
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::Missing { field })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args() -> WatchArgs {
        WatchArgs {
            target: TargetArgs {
                url: DEFAULT_URL.to_string(),
                selector: DEFAULT_SELECTOR.to_string(),
                baseline: DEFAULT_BASELINE.to_string(),
            },
            on_miss: MissPolicy::TreatAsEmpty,
            interval: 60,
            account_sid: "AC0123".to_string(),
            auth_token: "secret".to_string(),
            twilio_api_base: TWILIO_API_BASE.to_string(),
            sender: "+14155238886".to_string(),
            receiver: "+8801700000000".to_string(),
            channel: Channel::WhatsApp,
            message: DEFAULT_MESSAGE.to_string(),
            port: 8080,
            log_dir: PathBuf::from("tmp"),
            region: Some("sin".to_string()),
        }
    }

    #[test]
    fn test_valid_args_build_config() {
        let config = Config::try_from(args()).unwrap();

        assert_eq!(config.target.url, DEFAULT_URL);
        assert_eq!(config.target.baseline, DEFAULT_BASELINE);
        assert_eq!(config.target.interval_secs, 60);
        assert_eq!(config.server.region.as_deref(), Some("sin"));
        assert_eq!(config.twilio.api_base, "https://api.twilio.com");

        let notification = config.alert.notification();
        assert_eq!(notification.to, "+8801700000000");
        assert_eq!(notification.channel, Channel::WhatsApp);
    }

    #[test]
    fn test_rejects_non_http_url() {
        let mut args = args();
        args.target.url = "ftp://devconfbd.com/".to_string();

        let err = Config::try_from(args).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn test_rejects_bad_twilio_api_base() {
        let mut args = args();
        args.twilio_api_base = "api.twilio.com".to_string();

        match Config::try_from(args) {
            Err(ConfigError::InvalidUrl { field, .. }) => assert_eq!(field, "TWILIO_API_BASE"),
            other => panic!("expected URL error, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_relative_url() {
        let mut args = args();
        args.target.url = "/tickets".to_string();

        assert!(matches!(
            Config::try_from(args),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_selector() {
        let mut args = args();
        args.target.selector = "a[".to_string();

        assert!(matches!(
            Config::try_from(args),
            Err(ConfigError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_phone_numbers() {
        for bad in ["01700000000", "+0123", "+1 415 523 8886", ""] {
            let mut args = args();
            args.receiver = bad.to_string();

            match Config::try_from(args) {
                Err(ConfigError::InvalidPhone { field, value }) => {
                    assert_eq!(field, "RECEIVER_PHONE");
                    assert_eq!(value, bad);
                }
                other => panic!("expected phone error for {bad:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_rejects_blank_credentials() {
        let mut args = args();
        args.auth_token = "  ".to_string();

        assert!(matches!(
            Config::try_from(args),
            Err(ConfigError::Missing {
                field: "TWILIO_AUTH_TOKEN"
            })
        ));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let mut args = args();
        args.interval = 0;

        assert!(matches!(
            Config::try_from(args),
            Err(ConfigError::ZeroInterval)
        ));
    }

    #[test]
    fn test_blank_region_is_dropped() {
        let mut args = args();
        args.region = Some(" ".to_string());

        assert_eq!(Config::try_from(args).unwrap().server.region, None);
    }

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        watch: WatchArgs,
    }

    #[test]
    fn test_flags_parse_value_enums() {
        let cli = TestCli::try_parse_from([
            "page_watch",
            "--url",
            "http://localhost:4000/",
            "--selector",
            ".test",
            "--baseline",
            "Latest Snippets",
            "--on-miss",
            "skip",
            "--interval",
            "5",
            "--account-sid",
            "AC0123",
            "--auth-token",
            "secret",
            "--twilio-api-base",
            "http://127.0.0.1:4010",
            "--sender",
            "+14155238886",
            "--receiver",
            "+8801700000000",
            "--channel",
            "sms",
            "--message",
            "hi",
            "--port",
            "3000",
            "--log-dir",
            "logs",
            "--region",
            "ams",
        ])
        .unwrap();

        assert_eq!(cli.watch.on_miss, MissPolicy::Skip);
        assert_eq!(cli.watch.channel, Channel::Sms);
        assert_eq!(cli.watch.port, 3000);

        let config = Config::try_from(cli.watch).unwrap();
        assert_eq!(config.target.selector, ".test");
        assert_eq!(config.target.interval_secs, 5);
        assert_eq!(config.twilio.api_base, "http://127.0.0.1:4010");
    }
}
