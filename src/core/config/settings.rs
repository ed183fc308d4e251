use super::parsing::{
    env_bool, env_optional, env_or_default, parse_cors_origins, parse_environment, parse_u16,
    parse_u32, parse_u64,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    ApiSettings, ConfigError, CorsSettings, DatabaseSettings, ExamSettings, RedisSettings,
    RuntimeSettings, SecuritySettings, ServerHost, ServerPort, ServerSettings, Settings,
    TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("EXAMHALL_HOST", "0.0.0.0");
        let port = env_or_default("EXAMHALL_PORT", "8000");

        let environment = parse_environment(
            env_optional("EXAMHALL_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config =
            env_bool("EXAMHALL_STRICT_CONFIG", false) || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Examhall API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };

        let access_token_expire_minutes = parse_u64(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "10080"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "examhall");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "examhall_db");
        let database_url = env_optional("DATABASE_URL");
        let max_connections = parse_u32(
            "DATABASE_MAX_CONNECTIONS",
            env_or_default("DATABASE_MAX_CONNECTIONS", "30"),
        )?;

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let shuffle_questions_globally = env_bool("SHUFFLE_QUESTIONS_GLOBALLY", true);
        let max_attempts_per_student = parse_u32(
            "MAX_ATTEMPTS_PER_STUDENT",
            env_or_default("MAX_ATTEMPTS_PER_STUDENT", "3"),
        )?;
        let allow_retake = env_bool("ALLOW_RETAKE", true);
        let retake_cooldown_days =
            parse_u32("RETAKE_COOLDOWN_DAYS", env_or_default("RETAKE_COOLDOWN_DAYS", "0"))?;
        let submit_grace_seconds =
            parse_u64("SUBMIT_GRACE_SECONDS", env_or_default("SUBMIT_GRACE_SECONDS", "0"))?;
        let progress_save_interval_seconds = parse_u64(
            "PROGRESS_SAVE_INTERVAL_SECONDS",
            env_or_default("PROGRESS_SAVE_INTERVAL_SECONDS", "2"),
        )?;

        let log_level = env_or_default("EXAMHALL_LOG_LEVEL", "info");
        let json = env_bool("EXAMHALL_LOG_JSON", false);
        let prometheus_enabled = env_bool("PROMETHEUS_ENABLED", false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings { secret_key, access_token_expire_minutes, algorithm },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
                max_connections,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            exam: ExamSettings {
                shuffle_questions_globally,
                max_attempts_per_student,
                allow_retake,
                retake_cooldown_days,
                submit_grace_seconds,
                progress_save_interval_seconds,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn exam(&self) -> &ExamSettings {
        &self.exam
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.exam.max_attempts_per_student == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MAX_ATTEMPTS_PER_STUDENT",
                value: "0".to_string(),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DATABASE_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if env_optional("SECRET_KEY").is_none() {
            return Err(ConfigError::MissingSecret("SECRET_KEY"));
        }

        Ok(())
    }
}
