use crate::config::{Environment, LogFormat, Settings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Directives used when `RUST_LOG` is unset. Provider HTTP plumbing stays
/// quiet so analysis logs remain readable.
fn default_directives(env: &Environment) -> &'static str {
    match env {
        Environment::Dev => "inquiry_analyzer=debug,tower_http=debug,hyper=warn,reqwest=warn,info",
        Environment::Staging => "inquiry_analyzer=debug,tower_http=info,hyper=warn,reqwest=warn,info",
        Environment::Prod => "inquiry_analyzer=info,tower_http=info,warn",
    }
}

pub fn init_logging(settings: &Settings) {
    let env = &settings.env;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(env)));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(env.is_dev())
        .with_line_number(env.is_dev());

    match settings.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.pretty())
            .init(),
    }

    tracing::info!(
        format = ?settings.log_format,
        "Logging initialized for {:?} environment",
        env
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives_parse_for_every_environment() {
        for env in [Environment::Dev, Environment::Staging, Environment::Prod] {
            let directives = default_directives(&env);
            assert!(directives.starts_with("inquiry_analyzer="));
            assert!(EnvFilter::try_new(directives).is_ok());
        }
    }
}
