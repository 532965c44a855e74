use crate::errors::{ApiError, ApiResult};
use crate::models::*;
use aid_ledger::{AidRequestSubmission, Ledger, NewDonation, ReviewDecision};
use actix_web::{http::StatusCode, web, HttpResponse};

// ===== Health Check =====
pub async fn health_check(ledger: web::Data<Ledger>) -> ApiResult<HttpResponse> {
    let status = ledger.status().await?;
    let healthy = status.halted.is_none();

    let body = HealthResponse {
        status: if healthy { "healthy" } else { "halted" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ledger_entries: status.entries,
        tail_hash: status.tail_hash,
        halted: status.halted,
        public_key: ledger.public_key_hex().map(str::to_string),
    };

    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    Ok(HttpResponse::build(code).json(body))
}

// ===== Prometheus Metrics =====
pub async fn metrics(ledger: web::Data<Ledger>) -> ApiResult<HttpResponse> {
    let text = ledger
        .metrics()
        .render()
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(text))
}

// ===== Submit Aid Request =====
pub async fn submit_request(
    req: web::Json<AidRequestSubmission>,
    ledger: web::Data<Ledger>,
) -> ApiResult<HttpResponse> {
    let request = ledger.submit_request(req.into_inner())?;
    Ok(HttpResponse::Created().json(SubmitRequestResponse::from(request)))
}

// ===== List Aid Requests =====
pub async fn list_requests(
    query: web::Query<RequestQuery>,
    ledger: web::Data<Ledger>,
) -> ApiResult<HttpResponse> {
    let requests = match &query.beneficiary_id {
        Some(beneficiary_id) => ledger.requests_for_beneficiary(beneficiary_id)?,
        None => ledger.list_requests()?,
    };
    Ok(HttpResponse::Ok().json(requests))
}

// ===== Get Aid Request =====
pub async fn get_request(
    path: web::Path<String>,
    ledger: web::Data<Ledger>,
) -> ApiResult<HttpResponse> {
    let request = ledger.get_request(&path.into_inner())?;
    Ok(HttpResponse::Ok().json(request))
}

// ===== Review Aid Request =====
pub async fn review_request(
    path: web::Path<String>,
    req: web::Json<ReviewRequest>,
    ledger: web::Data<Ledger>,
) -> ApiResult<HttpResponse> {
    let decision = ReviewDecision::try_from(req.into_inner())?;
    let request = ledger.review_request(&path.into_inner(), decision)?;
    Ok(HttpResponse::Ok().json(request))
}

// ===== Donate =====
pub async fn donate(
    req: web::Json<NewDonation>,
    ledger: web::Data<Ledger>,
) -> ApiResult<HttpResponse> {
    let receipt = ledger.donate(req.into_inner()).await?;
    Ok(HttpResponse::Created().json(receipt))
}

// ===== Donor History =====
pub async fn donor_history(
    query: web::Query<DonationQuery>,
    ledger: web::Data<Ledger>,
) -> ApiResult<HttpResponse> {
    let entries = ledger.donations_by_donor(&query.donor_id).await?;
    Ok(HttpResponse::Ok().json(entries))
}

// ===== Ledger Entries =====
pub async fn ledger_entries(ledger: web::Data<Ledger>) -> ApiResult<HttpResponse> {
    let entries = ledger.entries().await?;
    Ok(HttpResponse::Ok().json(entries))
}

// ===== Verify Ledger =====
pub async fn verify_ledger(ledger: web::Data<Ledger>) -> ApiResult<HttpResponse> {
    let verification = ledger.verify().await?;
    Ok(HttpResponse::Ok().json(verification))
}

// ===== Configure Routes =====
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::Validation(err.to_string()).into()),
    )
    .service(
        web::scope("/requests")
            .route("", web::post().to(submit_request))
            .route("", web::get().to(list_requests))
            .route("/{id}", web::get().to(get_request))
            .route("/{id}/review", web::post().to(review_request)),
    )
    .service(
        web::scope("/donations")
            .route("", web::post().to(donate))
            .route("", web::get().to(donor_history)),
    )
    .service(
        web::scope("/ledger")
            .route("", web::get().to(ledger_entries))
            .route("/verify", web::get().to(verify_ledger)),
    )
    .route("/health", web::get().to(health_check))
    .route("/metrics", web::get().to(metrics));
}
