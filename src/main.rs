use std::path::Path;
use std::sync::Arc;

use laundry_bot::channels::{MessageSink, WhatsAppChannel};
use laundry_bot::config::Config;
use laundry_bot::conversation::store::spawn_idle_sweep;
use laundry_bot::conversation::{ConversationEngine, SessionStore};
use laundry_bot::orders::OrderIdGenerator;
use laundry_bot::store::{LibSqlRecordStore, RecordStore};
use laundry_bot::webhook::{self, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    eprintln!("🧺 Laundry Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Webhook: http://0.0.0.0:{}/webhook", config.port);
    eprintln!("   Database: {}", config.db_path);
    eprintln!("   Order IDs: {:?}", config.order_id_mode);

    // ── Record store ─────────────────────────────────────────────────────
    let records: Arc<dyn RecordStore> =
        Arc::new(LibSqlRecordStore::new_local(Path::new(&config.db_path)).await?);

    // ── Sessions ─────────────────────────────────────────────────────────
    let sessions = Arc::new(SessionStore::new());
    if config.session_ttl_min > 0 {
        let _sweep = spawn_idle_sweep(
            Arc::clone(&sessions),
            chrono::Duration::minutes(config.session_ttl_min as i64),
            std::time::Duration::from_secs(60),
        );
        eprintln!("   Sessions: idle eviction after {} min", config.session_ttl_min);
    } else {
        eprintln!("   Sessions: idle eviction disabled");
    }

    // ── Engine + outbound channel ────────────────────────────────────────
    let engine = Arc::new(ConversationEngine::new(
        Arc::clone(&sessions),
        Arc::clone(&records),
        OrderIdGenerator::new(config.order_id_mode),
        config.operator_number.clone(),
    ));

    let sink: Arc<dyn MessageSink> = Arc::new(WhatsAppChannel::new(
        config.whatsapp_token.clone(),
        config.phone_number_id.clone(),
    ));

    let state = AppState {
        engine,
        sink,
        records,
        verify_token: config.verify_token.clone(),
    };
    let app = webhook::routes(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "Webhook server started");
    axum::serve(listener, app).await?;

    Ok(())
}
