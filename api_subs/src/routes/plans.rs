use actix_web::{Responder, get, web};
use common::{error::Res, http::Success};
use entitlements::EntitlementEngine;

use crate::dtos::sub::PlansResponse;

/// Lists every plan with its prices and monthly quotas, cheapest first.
///
/// # Output
/// - Success: `{ plans: [{ id, display_name, monthly_price_minor_units,
///   yearly_price_minor_units, currency, feature_quotas }] }` where an
///   unlimited quota is `-1`
#[get("")]
pub async fn get_plans(engine: web::Data<EntitlementEngine>) -> Res<impl Responder> {
    let plans = engine.catalog().list().into_iter().cloned().collect();
    Success::ok(PlansResponse { plans })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{
        App,
        test::{self, TestRequest},
    };
    use db::MemoryStore;
    use entitlements::{OneOffPrice, PlanCatalog};
    use serde_json::Value;

    use super::*;

    #[actix_web::test]
    async fn lists_plans_cheapest_first_with_unlimited_as_minus_one() {
        let engine = web::Data::new(EntitlementEngine::new(
            Arc::new(MemoryStore::new()),
            Arc::new(PlanCatalog::default()),
            OneOffPrice {
                amount_minor_units: 500,
                currency: "xaf".to_string(),
            },
        ));
        let app = test::init_service(
            App::new()
                .app_data(engine)
                .service(web::scope("/plans").service(get_plans)),
        )
        .await;

        let body: Value =
            test::call_and_read_body_json(&app, TestRequest::get().uri("/plans").to_request())
                .await;
        let plans = body["plans"].as_array().unwrap();
        let ids: Vec<&str> = plans.iter().filter_map(|p| p["id"].as_str()).collect();
        assert_eq!(ids, vec!["free", "premium", "professional"]);
        assert_eq!(plans[0]["feature_quotas"]["resume_downloads"], 0);
        assert_eq!(plans[2]["feature_quotas"]["cover_letters"], -1);
        assert_eq!(plans[1]["monthly_price_minor_units"], 3000);
    }
}
