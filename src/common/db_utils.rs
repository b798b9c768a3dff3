// src/common/db_utils.rs

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{common::error::AppError, models::tenancy::TenantScope};

// ---
// Helper RLS: A "Chave" para o Banco de Dados
// ---
/// Abre uma transação com as variáveis RLS (`app.tenant_id`, `app.user_id`).
/// `set_config(..., true)` vale só dentro da transação, por isso as queries
/// com escopo de organização precisam rodar nela e fechar com `commit`.
pub(crate) async fn begin_scoped(
    pool: &PgPool,
    scope: &TenantScope,
) -> Result<Transaction<'static, Postgres>, AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT set_config('app.tenant_id', $1, true)")
        .bind(scope.tenant_id.to_string())
        .execute(&mut *tx)
        .await?;

    sqlx::query("SELECT set_config('app.user_id', $1, true)")
        .bind(scope.user_id.to_string())
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}

/// Só `app.user_id`: usado para ler o próprio perfil antes de resolver a organização.
pub(crate) async fn begin_as_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Transaction<'static, Postgres>, AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT set_config('app.user_id', $1, true)")
        .bind(user_id.to_string())
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}
