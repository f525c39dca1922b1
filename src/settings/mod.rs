use std::fs::File;
use std::str::FromStr;
use std::{env, fmt};

use dotenv::dotenv;
use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, TermLogger, TerminalMode, WriteLogger};
use url::Url;

#[derive(Clone)]
pub enum Env {
    Local,
    Dev,
    Stage,
    Production,
}

impl Env {
    pub fn api_base(&self) -> Url {
        let base = match self {
            Env::Local => "http://localhost:8000/api".to_owned(),
            Env::Dev | Env::Stage | Env::Production => {
                env::var("API_BASE").expect("API_BASE must be set")
            }
        };

        Url::parse(&base).expect("API_BASE must be a valid URL")
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env = match self {
            Env::Local => "local",
            Env::Dev => "dev",
            Env::Stage => "stg",
            Env::Production => "prod",
        };
        write!(f, "{env}")
    }
}

#[derive(Clone)]
pub struct Config {
    pub env: Env,
    pub api_base: Url,
}

impl Default for Config {
    fn default() -> Self {
        dotenv().ok();

        let rust_log = env::var("RUST_LOG").unwrap_or("info".into());
        let level = LevelFilter::from_str(&rust_log).unwrap_or(LevelFilter::Info);
        let log_file = env::var("SERVICE_NAME")
            .map(|pkg| format!("{pkg}.log"))
            .unwrap_or("client.log".into());

        CombinedLogger::init(vec![
            TermLogger::new(
                level,
                simplelog::Config::default(),
                TerminalMode::Mixed,
                ColorChoice::Auto,
            ),
            WriteLogger::new(
                level,
                simplelog::Config::default(),
                File::create(log_file).expect("Failed to create log file"),
            ),
        ])
        .expect("Failed to initialize logger");

        let env = env::var("ENV")
            .map(|env| match env.as_str() {
                "local" => Env::Local,
                "dev" => Env::Dev,
                "stg" => Env::Stage,
                "prod" => Env::Production,
                _ => panic!("Invalid environment: {env}"),
            })
            .unwrap_or(Env::Local);

        let api_base = env::var("API_BASE")
            .map(|base| Url::parse(&base).expect("API_BASE must be a valid URL"))
            .unwrap_or(env.api_base());

        Self { env, api_base }
    }
}
