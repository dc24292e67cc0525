use std::env;

use crate::email::SmtpConfig;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub secret_key: String,
    pub base_url: String,
    pub smtp: Option<SmtpConfig>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL is not set in .env file");
        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "debug".into());
        let secret_key = env::var("SECRET_KEY").expect("SECRET_KEY should be provided");
        let base_url = env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:3000".into());
        let smtp = SmtpConfig::from_env();

        Ok(Self {
            database_url,
            rust_log,
            secret_key,
            base_url,
            smtp,
        })
    }
}
