use std::sync::Arc;

use actix_web::{http::Method, web, HttpRequest, HttpResponse};
use tokio::sync::Mutex;

use crate::error::ApiError;
use crate::ids::IdSource;
use crate::schemas::{
    Deleted, Expense, ExpenseId, Group, GroupDeleted, NewExpense, NewGroup, NewMember,
};
use crate::store::GroupStore;

pub struct AppState {
    store: Arc<dyn GroupStore>,
    ids: IdSource,
    // Serializes load-mutate-save cycles issued by this process.
    write_gate: Mutex<()>,
}

impl AppState {
    pub fn new(store: Arc<dyn GroupStore>, ids: IdSource) -> Self {
        AppState {
            store,
            ids,
            write_gate: Mutex::new(()),
        }
    }

    async fn modify_group<T>(
        &self,
        id: &str,
        change: impl FnOnce(&mut Group) -> T,
    ) -> Result<T, ApiError> {
        let _gate = self.write_gate.lock().await;
        let mut groups = self.store.load().await?;
        let group = groups.get_mut(id).ok_or(ApiError::GroupNotFound)?;
        let outcome = change(group);
        self.store.save(&groups).await?;
        Ok(outcome)
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/groups")
            .route(web::get().to(list_groups))
            .route(web::post().to(create_group))
            .route(web::method(Method::OPTIONS).to(preflight))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::resource("/groups/{id}")
            .route(web::get().to(get_group))
            .route(web::delete().to(delete_group))
            .route(web::method(Method::OPTIONS).to(preflight))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::resource("/groups/{id}/members")
            .route(web::post().to(add_member))
            .route(web::method(Method::OPTIONS).to(preflight))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::resource("/groups/{id}/members/{name}")
            .route(web::delete().to(remove_member))
            .route(web::method(Method::OPTIONS).to(preflight))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::resource("/groups/{id}/expenses")
            .route(web::post().to(add_expense))
            .route(web::method(Method::OPTIONS).to(preflight))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::resource("/groups/{id}/expenses/{expense_id}")
            .route(web::delete().to(delete_expense))
            .route(web::method(Method::OPTIONS).to(preflight))
            .default_service(web::to(method_not_allowed)),
    );
}

async fn list_groups(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let groups = state.store.load().await?;
    Ok(HttpResponse::Ok().json(groups))
}

async fn get_group(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let groups = state.store.load().await?;
    match groups.get(id.as_str()) {
        Some(group) => Ok(HttpResponse::Ok().json(group)),
        None => Err(ApiError::GroupNotFound),
    }
}

async fn create_group(
    state: web::Data<AppState>,
    json: web::Json<NewGroup>,
) -> Result<HttpResponse, ApiError> {
    let _gate = state.write_gate.lock().await;
    let mut groups = state.store.load().await?;
    let group = Group::new(
        state.ids.group_id(),
        json.into_inner().name,
        state.ids.created_at(),
    );
    groups.insert(group.id.clone(), group.clone());
    state.store.save(&groups).await?;

    tracing::info!(group_id = %group.id, "created group");
    Ok(HttpResponse::Ok().json(group))
}

async fn delete_group(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let _gate = state.write_gate.lock().await;
    let mut groups = state.store.load().await?;
    if groups.remove(&id).is_none() {
        return Err(ApiError::GroupNotFound);
    }
    state.store.save(&groups).await?;

    tracing::info!(group_id = %id, "deleted group");
    Ok(HttpResponse::Ok().json(GroupDeleted {
        success: true,
        group_id: id,
    }))
}

async fn add_member(
    state: web::Data<AppState>,
    id: web::Path<String>,
    json: web::Json<NewMember>,
) -> Result<HttpResponse, ApiError> {
    let name = json.into_inner().name;
    let group = state
        .modify_group(&id, |group| {
            group.add_member(name);
            group.clone()
        })
        .await?;
    Ok(HttpResponse::Ok().json(group))
}

async fn remove_member(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (id, name) = path.into_inner();
    let group = state
        .modify_group(&id, |group| {
            group.remove_member(&name);
            group.clone()
        })
        .await?;
    Ok(HttpResponse::Ok().json(group))
}

async fn add_expense(
    state: web::Data<AppState>,
    id: web::Path<String>,
    json: web::Json<NewExpense>,
) -> Result<HttpResponse, ApiError> {
    let NewExpense {
        payer,
        description,
        amount,
    } = json.into_inner();
    let expense = Expense {
        id: state.ids.expense_id(),
        payer,
        description,
        amount,
    };
    let expense = state
        .modify_group(&id, |group| {
            group.add_expense(expense.clone());
            expense
        })
        .await?;
    Ok(HttpResponse::Ok().json(expense))
}

async fn delete_expense(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (id, expense_id) = path.into_inner();
    let expense_id = parse_expense_id(&expense_id);
    state
        .modify_group(&id, |group| {
            if let Some(expense_id) = expense_id {
                group.remove_expense(expense_id);
            }
        })
        .await?;
    Ok(HttpResponse::Ok().json(Deleted { success: true }))
}

async fn preflight() -> HttpResponse {
    HttpResponse::Ok().finish()
}

async fn method_not_allowed() -> Result<HttpResponse, ApiError> {
    Err(ApiError::MethodNotAllowed)
}

/// Fallback for paths no resource matches.
pub async fn unknown_route(req: HttpRequest) -> HttpResponse {
    if req.method() == Method::OPTIONS {
        return HttpResponse::Ok().finish();
    }
    tracing::warn!(method = %req.method(), path = %req.path(), "no route matched");
    HttpResponse::NotFound()
        .content_type("text/plain; charset=utf-8")
        .body("Not found")
}

/// Reads the integer prefix of `raw` (optional sign, then digits), ignoring
/// leading whitespace. `None` when there are no leading digits.
fn parse_expense_id(raw: &str) -> Option<ExpenseId> {
    let raw = raw.trim_start();
    let sign_len = usize::from(raw.starts_with(['+', '-']));
    let digits_len = raw[sign_len..]
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len() - sign_len);
    if digits_len == 0 {
        return None;
    }
    raw[..sign_len + digits_len].parse().ok()
}
