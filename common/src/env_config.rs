use std::{env, sync::Arc};

#[derive(Clone, Debug)]
/// Configuration struct for the server.
///
/// This struct holds all the necessary configuration parameters
/// required to initialize and run the server.
/// It includes database connection details, JWT configuration,
/// server host and port, number of worker threads, CORS settings,
/// logging preferences, billing settings and the content generation client.
pub struct Config {
    // environment
    pub environment: String, // development or production
    /// The URL of the database to connect to.
    pub database_url: String,
    /// Configuration for JWT (JSON Web Token) authentication.
    pub jwt_config: JwtConfig,
    /// The hostname or IP address the server will bind to.
    pub server_host: String,
    /// The port number the server will listen on.
    pub server_port: u16,
    /// The number of worker threads to spawn for handling requests.
    pub num_workers: usize,
    /// The allowed origin for CORS (Cross-Origin Resource Sharing).
    pub cors_allowed_origin: String,
    /// A boolean indicating whether console logging is enabled.
    pub console_logging_enabled: bool,
    /// Requests per second accepted by the global limiter.
    pub global_rate_limit: u32,
    /// Billing settings shared by checkout and one-off purchases.
    pub billing: BillingConfig,
    /// Configuration for the content generation service.
    pub generation: GenerationConfig,
}

#[derive(Clone, Debug)]
/// Configuration for JSON Web Token (JWT) authentication.
///
/// This struct contains the secret key used to sign JWTs and
/// the expiration time in hours for issued tokens.
pub struct JwtConfig {
    /// The secret key used to sign and verify JWTs.
    pub secret: String,
    /// The expiration time for JWTs in hours.
    pub expiration_hours: i64,
}

#[derive(Clone, Debug)]
pub struct BillingConfig {
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook secret
    pub stripe_webhook_secret: String,
    /// ISO currency code used when a request does not name one.
    pub default_currency: String,
    /// Price of a single paid resume download, in minor units.
    pub one_off_download_price: i64,
    /// Activate subscriptions while the payment is still pending.
    pub optimistic_activation: bool,
}

#[derive(Clone, Debug)]
pub struct GenerationConfig {
    pub api_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl JwtConfig {
    /// Creates a new `JwtConfig` instance from environment variables.
    ///
    /// Reads the JWT configuration from environment variables:
    /// - `JWT_SECRET`: Required. The secret key for JWT signing.
    /// - `JWT_EXPIRATION_HOURS`: Optional. Defaults to 24 hours if not provided.
    ///
    /// # Panics
    ///
    /// This function will panic if:
    /// - `JWT_SECRET` environment variable is not set
    /// - `JWT_EXPIRATION_HOURS` is set but cannot be parsed as a valid number
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        JwtConfig {
            secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a valid number"),
        }
    }
}

impl BillingConfig {
    pub fn from_env() -> Self {
        BillingConfig {
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            default_currency: env::var("DEFAULT_CURRENCY")
                .unwrap_or_else(|_| "xaf".to_string())
                .to_lowercase(),
            one_off_download_price: env::var("ONE_OFF_DOWNLOAD_PRICE")
                .unwrap_or_else(|_| "500".to_string())
                .parse()
                .unwrap_or(500),
            optimistic_activation: env_flag("OPTIMISTIC_ACTIVATION", false),
        }
    }
}

impl GenerationConfig {
    pub fn from_env() -> Self {
        GenerationConfig {
            api_url: env::var("GENERATION_API_URL")
                .unwrap_or_else(|_| "http://localhost:8000/v1/generate".to_string()),
            api_key: env::var("GENERATION_API_KEY").unwrap_or_default(),
            timeout_secs: env::var("GENERATION_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// Loads all configuration values from environment variables with sensible defaults
    /// for most optional settings.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `ENVIRONMENT`: `development` or `production`
    /// - `DATABASE_URL`: Connection string for the database
    /// - `JWT_SECRET`: Secret key for JWT signing (via `JwtConfig::from_env()`)
    ///
    /// Optional (with defaults):
    /// - `IP`: Server host (default: "127.0.0.1")
    /// - `PORT`: Server port (default: 8080)
    /// - `WORKERS`: Number of worker threads (default: 4)
    /// - `CORS_ALLOWED_ORIGIN`: Allowed CORS origin (default: "http://localhost:3000")
    /// - `ENABLE_CONSOLE_LOGGING`: Whether to enable console logging (default: true)
    /// - `GLOBAL_RATE_LIMIT`: Requests per second for the whole server (default: 50)
    /// - `STRIPE_SECRET_KEY`, `STRIPE_WEBHOOK_SECRET`, `DEFAULT_CURRENCY` (default: "xaf"),
    ///   `ONE_OFF_DOWNLOAD_PRICE` (default: 500), `OPTIMISTIC_ACTIVATION` (default: false)
    /// - `GENERATION_API_URL`, `GENERATION_API_KEY`, `GENERATION_TIMEOUT_SECS` (default: 60)
    ///
    /// # Panics
    ///
    /// This function will panic if required environment variables are missing or if
    /// numeric values cannot be parsed correctly.
    pub fn from_env() -> Arc<Self> {
        dotenvy::dotenv().ok();

        Arc::new(Config {
            environment: env::var("ENVIRONMENT").expect("ENVIRONMENT must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_config: JwtConfig::from_env(),
            server_host: env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            num_workers: env::var("WORKERS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .unwrap_or(4),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            console_logging_enabled: env_flag("ENABLE_CONSOLE_LOGGING", true),
            global_rate_limit: env::var("GLOBAL_RATE_LIMIT")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .unwrap_or(50),
            billing: BillingConfig::from_env(),
            generation: GenerationConfig::from_env(),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(environment: &str) -> Config {
        Config {
            environment: environment.to_string(),
            database_url: String::new(),
            jwt_config: JwtConfig {
                secret: "secret".to_string(),
                expiration_hours: 1,
            },
            server_host: "127.0.0.1".to_string(),
            server_port: 8080,
            num_workers: 1,
            cors_allowed_origin: "http://localhost:3000".to_string(),
            console_logging_enabled: false,
            global_rate_limit: 50,
            billing: BillingConfig {
                stripe_secret_key: String::new(),
                stripe_webhook_secret: String::new(),
                default_currency: "xaf".to_string(),
                one_off_download_price: 500,
                optimistic_activation: false,
            },
            generation: GenerationConfig {
                api_url: String::new(),
                api_key: String::new(),
                timeout_secs: 1,
            },
        }
    }

    #[test]
    fn only_the_production_environment_is_production() {
        assert!(config("production").is_production());
        assert!(!config("development").is_production());
        assert!(!config("Production-staging").is_production());
    }
}
