//! Fezz Dispatch - Example Host
//!
//! Loads settings, validates the host configuration, discovers the sample
//! handlers and pushes one message and one request through the dispatcher.
//!
//! Settings come from `fezz.settings.json` (or the file named by
//! `FEZZ_SETTINGS_FILE`) overlaid with `FEZZ_`-prefixed environment
//! variables, e.g. `FEZZ_Messaging__Group=processing`.

use fezz_dispatch::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

const DEFAULT_SETTINGS_FILE: &str = "fezz.settings.json";

static ORDERS_SEEN: AtomicU64 = AtomicU64::new(0);

/// Sample order event.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderCreated {
    order_id: String,
    amount: f64,
}

#[message_function(name = "order-created", destination = "orders", group = "processing")]
async fn order_created(order: OrderCreated, ctx: &InvocationContext) -> Result<(), FezzError> {
    let seen = ORDERS_SEEN.fetch_add(1, Ordering::SeqCst) + 1;
    tracing::info!(
        order_id = %order.order_id,
        amount = order.amount,
        invocation_id = %ctx.invocation_id,
        seen,
        "order processed"
    );
    Ok(())
}

#[request_function(name = "orders")]
async fn orders_summary(_req: FezzRequest, ctx: &InvocationContext) -> Result<ActionResult, FezzError> {
    Ok(ActionResult::Ok(serde_json::json!({
        "ordersSeen": ORDERS_SEEN.load(Ordering::SeqCst),
        "environment": ctx.get_env("ENVIRONMENT"),
    })))
}

fn load_settings() -> Result<Settings, DispatchError> {
    let path = std::env::var("FEZZ_SETTINGS_FILE").unwrap_or_else(|_| DEFAULT_SETTINGS_FILE.to_string());
    let path = Path::new(&path);
    let file = path.is_file().then(|| {
        tracing::info!(path = %path.display(), "loading settings file");
        path
    });
    Settings::load(file, "FEZZ_")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting Fezz dispatch host...");

    let settings = load_settings()?;
    let config = HostConfig::from_settings(&settings)?.env("ENVIRONMENT", "development");
    config.validate(&settings)?;

    let module = StaticModule::new("sample")
        .with(OrderCreatedHandler::type_info())
        .with(OrdersSummaryHandler::type_info());
    let (table, failures) = InvocationTable::from_modules(&[&module], &settings);
    for failure in &failures {
        tracing::warn!(error = %failure, "module skipped");
    }
    table.export_binding_variables();

    let dispatcher = Dispatcher::new(table).with_config(&config);
    let cancel = CancellationToken::new();

    let order = OrderCreated {
        order_id: "42".to_string(),
        amount: 19.99,
    };
    let envelope = InboundEnvelope::message(serde_json::to_vec(&order)?)
        .with_metadata("message-id", "sample-1");
    let outcome = dispatcher
        .dispatch_subscription("orders", Some("processing"), envelope, cancel.clone())
        .await?;
    tracing::info!(handler = %outcome.handler, stage = %outcome.stage, "message dispatched");

    let request = FezzRequest::new(Method::Get, "/orders");
    let response = dispatcher
        .dispatch_request(OrdersSummaryHandler::NAME, request, cancel)
        .await
        .into_response();
    tracing::info!(
        status = %response.status,
        body = %response.text_body().unwrap_or_default(),
        "request dispatched"
    );

    Ok(())
}
