//src/main.rs

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crevin_backend::config::{AppState, Settings};
use crevin_backend::db::MaintenanceRepository;
use crevin_backend::routes;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let settings = Settings::from_env().expect("Falha ao carregar a configuração.");

    let app_state = AppState::new(&settings)
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    match MaintenanceRepository::new(app_state.db_pool.clone()).papel_ignora_rls().await {
        Ok(true) => tracing::warn!("⚠️ O papel do DATABASE_URL ignora row level security; use um papel sem SUPERUSER/BYPASSRLS"),
        Ok(false) => {}
        Err(e) => tracing::warn!("Não foi possível verificar o papel do banco: {}", e),
    }

    let app = routes::app(app_state);

    let listener = TcpListener::bind(&settings.server_addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", settings.server_addr);
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
