use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    extract::AppJson,
    quotation::{calculate, validate, FieldErrors, Quotation, ValidatedQuotationInput},
    schemas::{clamp_limit_in_range, QuotationInput, QuotationPath, QuotationsQuery},
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/quotations",
            axum::routing::get(list_quotations).post(create_quotation),
        )
        .route(
            "/quotations/preview",
            axum::routing::post(preview_quotation),
        )
        .route(
            "/quotations/{quotation_id}",
            axum::routing::get(get_quotation),
        )
}

async fn preview_quotation(
    State(state): State<AppState>,
    AppJson(payload): AppJson<QuotationInput>,
) -> AppResult<Json<Value>> {
    let input = validated_input(&state, &payload)?;
    let amounts = calculate(&input);
    Ok(Json(json!({ "input": input, "amounts": amounts })))
}

async fn create_quotation(
    State(state): State<AppState>,
    AppJson(payload): AppJson<QuotationInput>,
) -> AppResult<impl IntoResponse> {
    let input = validated_input(&state, &payload)?;
    let amounts = calculate(&input);
    let quotation = state
        .quotations
        .save(Quotation::assemble(input, amounts))?;

    tracing::info!(
        quotation_id = %quotation.id,
        service_type = quotation.input.service_type().kind().as_str(),
        final_amount_to_client = %quotation.amounts.final_amount_to_client,
        expiry_date = %quotation.amounts.expiry_date,
        "Quotation created"
    );

    Ok((StatusCode::CREATED, Json(quotation)))
}

async fn list_quotations(
    State(state): State<AppState>,
    Query(query): Query<QuotationsQuery>,
) -> AppResult<Json<Value>> {
    let limit = clamp_limit_in_range(query.limit, 1, state.config.quotation_list_max_limit.max(1));
    let rows = state.quotations.list(limit as usize)?;
    Ok(Json(json!({ "data": rows })))
}

async fn get_quotation(
    State(state): State<AppState>,
    Path(path): Path<QuotationPath>,
) -> AppResult<Json<Quotation>> {
    let quotation_id = Uuid::parse_str(path.quotation_id.trim())
        .map_err(|_| AppError::BadRequest("Invalid quotation id.".to_string()))?;
    state
        .quotations
        .get(&quotation_id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Quotation not found.".to_string()))
}

/// Runs the validator, then fills what the property catalog knows about a
/// linked managed property.
fn validated_input(
    state: &AppState,
    payload: &QuotationInput,
) -> AppResult<ValidatedQuotationInput> {
    let input = validate(payload).map_err(rejected)?;
    resolve_linked_property(state, input).map_err(|error| match error {
        AppError::Validation(errors) => rejected(errors),
        other => other,
    })
}

fn rejected(errors: FieldErrors) -> AppError {
    let fields = errors
        .iter()
        .map(|(field, _)| field)
        .collect::<Vec<_>>()
        .join(",");
    tracing::debug!(count = errors.len(), fields = %fields, "Quotation input rejected");
    AppError::Validation(errors)
}

fn resolve_linked_property(
    state: &AppState,
    input: ValidatedQuotationInput,
) -> AppResult<ValidatedQuotationInput> {
    let Some(property_id) = input.property().linked_property_id() else {
        return Ok(input);
    };

    let Some(property) = state.catalog.find_property(property_id)? else {
        return Err(AppError::Validation(FieldErrors::single(
            "linkedPropertyId",
            "Linked property was not found in the property catalog",
        )));
    };
    match property.area_m2 {
        Some(area_m2) => Ok(input.with_linked_area(area_m2)?),
        None => Ok(input),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::error::AppResult;
    use crate::repository::{
        CatalogProperty, InMemoryPropertyCatalog, InMemoryQuotationStore, PropertyCatalog,
    };
    use crate::routes::build_router;
    use crate::state::AppState;

    fn test_state() -> AppState {
        let catalog = InMemoryPropertyCatalog::new([CatalogProperty {
            id: "prop-1".to_string(),
            title: "Villa in Al Yasmin".to_string(),
            usage: Some("Residential".to_string()),
            property_type: Some("Villa".to_string()),
            neighborhood: Some("Al Yasmin".to_string()),
            area_m2: Some(Decimal::from(300)),
        }])
        .expect("valid catalog");
        AppState::with_parts(
            AppConfig::default(),
            Arc::new(catalog),
            Arc::new(InMemoryQuotationStore::new()),
        )
    }

    async fn send(state: &AppState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(payload) => Body::from(payload.to_string()),
                None => Body::empty(),
            })
            .expect("valid request");

        let response = build_router(state.clone())
            .oneshot(request)
            .await
            .expect("router responds");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }

    fn payload() -> Value {
        json!({
            "clientName": "Abdullah Al-Shehri",
            "clientPhone": "+966 55 000 1122",
            "serviceType": "property_management",
            "propertyDescriptionMode": "managed",
            "linkedPropertyId": "prop-1",
            "financialBasis": "per_meter",
            "pricePerMeter": 5000,
            "issueDate": "2024-01-01"
        })
    }

    #[tokio::test]
    async fn preview_uses_catalog_area() {
        let state = test_state();
        let (status, body) = send(&state, "POST", "/v1/quotations/preview", Some(payload())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["amounts"]["baseValue"], "1500000.00");
        assert_eq!(body["amounts"]["finalAmountToClient"], "1725000.00");
        assert_eq!(body["amounts"]["expiryDate"], "2024-01-31");
        assert!(state.quotations.list(10).expect("list succeeds").is_empty());
    }

    #[tokio::test]
    async fn preview_reports_field_errors() {
        let state = test_state();
        let (status, body) = send(
            &state,
            "POST",
            "/v1/quotations/preview",
            Some(json!({
                "clientName": "Abdullah Al-Shehri",
                "clientPhone": "+966550001122",
                "serviceType": "other_services",
                "otherServiceTypeDetail": "",
                "issueDate": "2024-01-01"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["fields"]["otherServiceTypeDetail"].is_array());
    }

    #[tokio::test]
    async fn unknown_linked_property_is_a_field_error() {
        let state = test_state();
        let mut request = payload();
        request["linkedPropertyId"] = json!("prop-404");
        let (status, body) = send(&state, "POST", "/v1/quotations", Some(request)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body["fields"]["linkedPropertyId"][0],
            "Linked property was not found in the property catalog"
        );
    }

    /// A catalog backend that hands back whatever area it holds, unchecked.
    struct FixedAreaCatalog(Decimal);

    impl PropertyCatalog for FixedAreaCatalog {
        fn find_property(&self, property_id: &str) -> AppResult<Option<CatalogProperty>> {
            Ok(Some(CatalogProperty {
                id: property_id.to_string(),
                title: "Land plot".to_string(),
                usage: None,
                property_type: None,
                neighborhood: None,
                area_m2: Some(self.0),
            }))
        }
    }

    #[tokio::test]
    async fn oversized_catalog_area_is_a_field_error() {
        let state = AppState::with_parts(
            AppConfig::default(),
            Arc::new(FixedAreaCatalog(
                "100000000000000000".parse().expect("valid decimal"),
            )),
            Arc::new(InMemoryQuotationStore::new()),
        );
        let mut request = payload();
        request["pricePerMeter"] = json!("1000000000000");

        for uri in ["/v1/quotations/preview", "/v1/quotations"] {
            let (status, body) = send(&state, "POST", uri, Some(request.clone())).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(
                body["fields"]["linkedPropertyId"][0],
                "Linked property has an area outside the supported range"
            );
        }
        assert!(state.quotations.list(10).expect("list succeeds").is_empty());
    }

    #[tokio::test]
    async fn mistyped_body_values_get_structured_errors() {
        let state = test_state();
        let mut request = payload();
        request["taxPercentage"] = json!("abc");
        let (status, body) = send(&state, "POST", "/v1/quotations/preview", Some(request)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Quotation input failed validation.");
        assert!(body["fields"]["_form"][0]
            .as_str()
            .is_some_and(|message| message.contains("taxPercentage")));
    }

    #[tokio::test]
    async fn non_json_body_is_a_bad_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/v1/quotations")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .expect("valid request");
        let response = build_router(test_state())
            .oneshot(request)
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let body: Value = serde_json::from_slice(&bytes).expect("json body");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn creates_lists_and_fetches_quotations() {
        let state = test_state();
        let (status, created) = send(&state, "POST", "/v1/quotations", Some(payload())).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().expect("id present").to_string();
        assert_eq!(created["input"]["property"]["mode"], "managed");

        let (status, fetched) = send(&state, "GET", &format!("/v1/quotations/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["amounts"]["taxAmount"], "225000.00");

        let (status, listed) = send(&state, "GET", "/v1/quotations?limit=5", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed["data"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn missing_and_malformed_ids() {
        let state = test_state();
        let missing = uuid::Uuid::new_v4();
        let (status, _) = send(&state, "GET", &format!("/v1/quotations/{missing}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&state, "GET", "/v1/quotations/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn echoes_request_id() {
        let request = Request::builder()
            .uri("/v1/health")
            .header("x-request-id", "req-123")
            .body(Body::empty())
            .expect("valid request");
        let response = build_router(test_state())
            .oneshot(request)
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("x-request-id")
                .and_then(|value| value.to_str().ok()),
            Some("req-123")
        );
    }
}
