// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};

use crate::{config::AppState, handlers, middleware::auth::auth_guard};

pub fn app(app_state: AppState) -> Router {
    // Rotas públicas
    let auth_routes = Router::new()
        .route("/login", post(handlers::auth::login));

    // Rotas de usuário (protegidas pelo middleware)
    let user_routes = Router::new()
        .route("/", post(handlers::auth::register))
        .route("/me", get(handlers::auth::get_me))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let finance_routes = Router::new()
        .route("/categorias"
               ,post(handlers::finance::create_categoria)
               .get(handlers::finance::list_categorias)
        )
        // Contas a Pagar
        .route("/contas-pagar"
               ,post(handlers::finance::create_conta_pagar)
               .get(handlers::finance::list_contas_pagar)
        )
        .route("/contas-pagar/{id}"
               ,get(handlers::finance::get_conta_pagar)
               .delete(handlers::finance::delete_conta_pagar)
        )
        .route("/contas-pagar/{id}/status"
               ,patch(handlers::finance::update_status_conta_pagar)
        )
        // Contas a Receber
        .route("/contas-receber"
               ,post(handlers::finance::create_conta_receber)
               .get(handlers::finance::list_contas_receber)
        )
        .route("/contas-receber/{id}"
               ,get(handlers::finance::get_conta_receber)
               .delete(handlers::finance::delete_conta_receber)
        )
        .route("/contas-receber/{id}/status"
               ,patch(handlers::finance::update_status_conta_receber)
        )
        // Rotinas
        .route("/recorrencias/gerar"
               ,post(handlers::finance::gerar_recorrencias)
        )
        .route("/vencidas/marcar"
               ,post(handlers::finance::marcar_vencidas)
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/financeiro", finance_routes)
        .with_state(app_state)
}
