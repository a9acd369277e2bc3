//! Configuration check command.
//!
//! Runs the same loading and validation as server startup and prints a
//! summary with secrets left out.

use pizza_orders_server::config::ServerConfig;

use super::CommandError;

/// Load the server configuration and print what it resolved to.
///
/// # Errors
///
/// Returns the first configuration problem found.
pub fn check() -> Result<(), CommandError> {
    let config = ServerConfig::from_env()?;
    let identity = &config.identity;

    #[allow(clippy::print_stdout)]
    {
        println!("Configuration OK");
        println!("  listen:            {}", config.socket_addr());
        println!("  issuer:            {}", identity.issuer());
        println!("  audience:          {}", identity.audience);
        println!(
            "  management client: {}",
            identity
                .management
                .as_ref()
                .map_or("not configured (profile fallback disabled)", |m| {
                    m.client_id.as_str()
                })
        );
        println!(
            "  claims namespace:  {}",
            identity.claims_namespace.as_deref().unwrap_or("-")
        );
        println!("  allowed origins:   {}", config.allowed_origins.join(", "));
        println!("  idp timeout:       {:?}", identity.timeout);
        println!("  storage timeout:   {:?}", config.storage_timeout);
        println!(
            "  sentry:            {}",
            if config.sentry_dsn.is_some() { "enabled" } else { "disabled" }
        );
    }

    Ok(())
}
