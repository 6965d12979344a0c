//src/main.rs

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use pos_backend::{build_router, config::{AppState, Config}};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Inicializa o logger (RUST_LOG sobrescreve o filtro padrão)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;

    // Se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new(&config).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados.")?;

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    if let Some((username, password)) = &config.bootstrap_admin {
        if app_state.auth_service.ensure_bootstrap_admin(username, password).await? {
            tracing::warn!(username = %username, "Administrador inicial criado; troque a senha");
        }
    }

    let app = build_router(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", config.bind_addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Erro no servidor Axum")?;

    tracing::info!("Servidor encerrado");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Falha ao escutar o sinal de encerramento: {}", e);
    }
}
