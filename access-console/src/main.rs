use access_console::authz::{assignable_role_levels, visible_scope};
use access_console::config::get_configuration;
use access_console::services::{HistoryNavigator, TracingNotifier};
use access_console::startup::{build_console, session_storage};
use dotenvy::dotenv;
use secrecy::Secret;
use service_core::observability::{TracingOptions, init_tracing};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    let telemetry = &configuration.telemetry;
    let mut options = TracingOptions::new(&telemetry.service_name);
    options.log_level = telemetry.log_level.clone();
    options.otlp_endpoint = telemetry.otlp_endpoint.clone();
    options.json = telemetry.json;
    init_tracing(&options)?;

    let navigator = Arc::new(HistoryNavigator::new(configuration.routes.clone()));
    let console = build_console(
        &configuration,
        session_storage(&configuration),
        navigator.clone(),
        Arc::new(TracingNotifier),
    )?;

    let context = match console.bootstrapper.restore().await? {
        Some(context) => {
            info!("Restored existing session");
            context
        }
        None => {
            let username = configuration
                .login
                .username
                .clone()
                .or_else(|| std::env::var("ACCESS_CONSOLE_USERNAME").ok())
                .ok_or_else(|| anyhow::anyhow!("No session stored and no login username configured"))?;
            let password = configuration
                .login
                .password
                .clone()
                .or_else(|| std::env::var("ACCESS_CONSOLE_PASSWORD").ok().map(Secret::new))
                .ok_or_else(|| anyhow::anyhow!("No session stored and no login password configured"))?;

            console.bootstrapper.login(&username, &password).await?
        }
    };

    let identity = &context.identity;
    let listing = console.organizations.load(identity).await?;
    let scope = visible_scope(identity.role_level, &identity.home_org_code);
    info!(
        visible_orgs = listing.hierarchy.visible(&scope).len(),
        assignable_levels = ?assignable_role_levels(identity.role_level),
        "Access context ready"
    );

    let summary = serde_json::json!({
        "identity": identity,
        "menus": context.visible_menus(),
        "organizations": listing.tree(access_console::authz::Membership::Effective),
        "organization_warning": listing.warning,
        "loaded_at": context.loaded_at,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
