// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::PapelUsuario,
};

/// 1. O Trait que define quais papéis podem executar uma ação
pub trait PapelDef: Send + Sync + 'static {
    fn permitidos() -> &'static [PapelUsuario];
}

/// 2. O Extractor (Guardião)
pub struct RequirePapel<T>(pub PhantomData<T>);

pub fn papel_permitido<T: PapelDef>(papel: PapelUsuario) -> bool {
    T::permitidos().contains(&papel)
}

impl<T, S> FromRequestParts<S> for RequirePapel<T>
where
    T: PapelDef,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let locale = Locale::from_request_parts(parts, state)
            .await
            .unwrap_or_default();

        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| AppError::InvalidToken.to_api_error(&locale))?;

        if !papel_permitido::<T>(user.0.papel) {
            tracing::warn!(user_id = %user.0.id, papel = ?user.0.papel, "Acesso negado");
            return Err(AppError::Forbidden.to_api_error(&locale));
        }

        Ok(RequirePapel(PhantomData))
    }
}

// ---
// DEFINIÇÃO DOS PAPÉIS (TIPOS)
// ---

pub struct SomenteAdmin;
impl PapelDef for SomenteAdmin {
    fn permitidos() -> &'static [PapelUsuario] { &[PapelUsuario::Admin] }
}

pub struct GestaoFinanceira;
impl PapelDef for GestaoFinanceira {
    fn permitidos() -> &'static [PapelUsuario] { &[PapelUsuario::Admin, PapelUsuario::Financeiro] }
}
