// api-kit-rs/src/main.rs

use api_kit::{init_logging, shutdown_signal, users, ApiServer, ServerOptions};
use config_rs::ServiceConfig;
use input_validation_rs::Validatable;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::from_env()?;
    init_logging(&config)?;

    tracing::info!(env = %config.env, port = config.port, "Starting API kit demo");

    let options = ServerOptions::new().with_routes(users::routes);
    let server = ApiServer::new(config, options);
    server.engine().check_schema(users::CreateUser::schema())?;

    server.start(shutdown_signal()).await?;

    Ok(())
}
