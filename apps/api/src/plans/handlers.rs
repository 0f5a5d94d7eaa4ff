use axum::{extract::Path, Json};

use crate::errors::AppError;
use crate::extraction::ExtractionError;
use crate::plans::{PayerPlan, PlanDescriptor};

/// GET /api/v1/plans
pub async fn handle_list_plans() -> Json<Vec<PlanDescriptor>> {
    Json(PayerPlan::ALL.into_iter().map(PlanDescriptor::from).collect())
}

/// GET /api/v1/plans/:plan/fields
pub async fn handle_plan_fields(Path(plan): Path<String>) -> Result<Json<PlanDescriptor>, AppError> {
    let plan = plan
        .parse::<PayerPlan>()
        .map_err(ExtractionError::from)?;
    Ok(Json(PlanDescriptor::from(plan)))
}
