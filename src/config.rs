use std::env;

#[derive(Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub cors_origin: Option<String>,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, String> {
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| "JWT_SECRET must be set".to_string())?;

        let cors_origin = env::var("CORS_ORIGIN").ok();

        // Outbound email is optional; without SMTP settings the dispatcher
        // logs notifications instead of sending them.
        let smtp = match (env::var("SMTP_HOST").ok(), env::var("SMTP_FROM").ok()) {
            (Some(host), Some(from)) => {
                let port = env::var("SMTP_PORT")
                    .ok()
                    .and_then(|p| p.parse::<u16>().ok())
                    .unwrap_or(587);
                Some(SmtpConfig {
                    host,
                    port,
                    username: env::var("SMTP_USERNAME").ok(),
                    password: env::var("SMTP_PASSWORD").ok(),
                    from,
                })
            }
            _ => None,
        };

        Ok(ServerConfig {
            bind_addr,
            database_url,
            jwt_secret,
            cors_origin,
            smtp,
        })
    }
}
