use secrecy::Secret;
use serde::Deserialize;

use crate::services::policy::{ClassAssignment, MembershipPolicy, PaymentRule};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    // Session cookie is only sent over HTTPS when set
    pub secure_cookies: bool,

    // Bootstrap administrator, upserted at startup
    pub admin_email: Option<String>,
    pub admin_password: Option<Secret<String>>,

    pub policy: MembershipPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        let payment_rule = match config
            .get_string("payment_rule")
            .unwrap_or_else(|_| "scheme_fee".to_string())
            .as_str()
        {
            "scheme_fee" => PaymentRule::SchemeFee,
            "minimum" => PaymentRule::Minimum(config.get("minimum_payment").unwrap_or(100)),
            other => {
                return Err(config::ConfigError::Message(format!(
                    "unknown payment_rule '{}', expected 'scheme_fee' or 'minimum'",
                    other
                )))
            }
        };

        let class_assignment = match config
            .get_string("class_assignment")
            .unwrap_or_else(|_| "active_only".to_string())
            .as_str()
        {
            "active_only" => ClassAssignment::ActiveMembersOnly,
            "all" => ClassAssignment::AllMembers,
            other => {
                return Err(config::ConfigError::Message(format!(
                    "unknown class_assignment '{}', expected 'active_only' or 'all'",
                    other
                )))
            }
        };

        Ok(Self {
            database_url: config.get("database_url")?,
            host: config.get("host").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: config.get("port")?,

            secure_cookies: config.get("secure_cookies").unwrap_or(true),

            admin_email: config.get("admin_email").ok(),
            admin_password: config
                .get::<String>("admin_password")
                .ok()
                .map(Secret::new),

            policy: MembershipPolicy {
                lapse_after_months: config
                    .get("lapse_after_months")
                    .unwrap_or(MembershipPolicy::DEFAULT_LAPSE_MONTHS),
                payment_rule,
                class_assignment,
            },
        })
    }
}
