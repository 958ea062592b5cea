use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::RaidError;
use crate::{attack, defeat, ledger, ranking, registry, AppState};

const DEFAULT_RANKING_LIMIT: usize = 10;

#[derive(Deserialize, Debug)]
pub struct AttackRequest {
    pub user_id: Uuid,
    /// Already-computed "available damage" integer supplied by the upstream
    /// activity system; this server never derives it.
    pub damage: u64,
}

#[derive(Deserialize, Debug)]
pub struct RankingQuery {
    pub limit: Option<usize>,
}

#[get("/boss")]
pub async fn current_boss_route(state: web::Data<AppState>) -> Result<HttpResponse, RaidError> {
    let boss = registry::current_boss(&state.deps).await?;
    Ok(HttpResponse::Ok().json(boss))
}

#[get("/contribution/{user_id}")]
pub async fn contribution_route(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, RaidError> {
    let contribution = ledger::contribution(&state.deps, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(contribution))
}

#[post("/attack")]
pub async fn attack_route(
    state: web::Data<AppState>,
    body: web::Json<AttackRequest>,
) -> Result<HttpResponse, RaidError> {
    let request = body.into_inner();
    let outcome = attack::attack(&state.deps, request.user_id, request.damage).await?;

    // The cascade runs outside the attack transaction: fire-and-forget from
    // the request's point of view, idempotent on the spawn side.
    if outcome.boss_defeated {
        let deps = state.deps.clone();
        let boss_id = outcome.boss_id;
        actix_web::rt::spawn(async move {
            match defeat::on_defeat(&deps, boss_id).await {
                Ok(report) => info!(
                    boss_id = %boss_id,
                    notified = report.notified,
                    failed = report.failed.len(),
                    successor = %report.successor_id,
                    "defeat cascade dispatched"
                ),
                Err(e) => error!(boss_id = %boss_id, error = %e, "defeat cascade failed"),
            }
        });
    }

    Ok(HttpResponse::Ok().json(outcome))
}

#[get("/ranking")]
pub async fn ranking_route(
    state: web::Data<AppState>,
    query: web::Query<RankingQuery>,
) -> Result<HttpResponse, RaidError> {
    let limit = query.limit.unwrap_or(DEFAULT_RANKING_LIMIT);
    let board = ranking::ranking(&state.deps, limit).await?;
    Ok(HttpResponse::Ok().json(board))
}
