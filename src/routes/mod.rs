// routes/mod.rs
// Route handlers and the application router.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::{session, state::AppState};

mod buildings;
mod helpers;
mod levels;
mod login;
mod logout;
mod owners;
mod payables;
mod payments;
mod reference;
mod reports;
mod staff;
mod transfer;
mod units;

pub use buildings::*;
pub use levels::*;
pub use login::login;
pub use logout::logout;
pub use owners::*;
pub use payables::*;
pub use payments::*;
pub use reference::*;
pub use reports::*;
pub use staff::*;
pub use transfer::*;
pub use units::*;

/// Full application router: `/login` is public, everything else requires a
/// session.
pub fn router(state: Arc<AppState>) -> Router {
    let building = "/api/buildings/{id}";

    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/api/buildings", get(buildings_index).post(buildings_create))
        .route("/api/buildings/recycle-bin", get(buildings_recycle_bin))
        .route("/api/buildings/import", post(buildings_import))
        .route(
            building,
            get(buildings_show)
                .put(buildings_update)
                .delete(buildings_delete),
        )
        .route(&format!("{building}/restore"), post(buildings_restore))
        .route(&format!("{building}/purge"), delete(buildings_purge))
        .route(&format!("{building}/export"), get(buildings_export))
        // Levels
        .route(&format!("{building}/levels"), get(levels_index).post(levels_create))
        .route(&format!("{building}/levels/generate"), post(levels_generate))
        .route(
            &format!("{building}/levels/{{level}}"),
            get(levels_show).put(levels_update).delete(levels_delete),
        )
        // Units
        .route(&format!("{building}/units"), get(units_index).post(units_create))
        .route(
            &format!("{building}/units/{{unit}}"),
            get(units_show).put(units_update).delete(units_delete),
        )
        .route(&format!("{building}/units/{{unit}}/attach"), post(units_attach))
        .route(&format!("{building}/units/{{unit}}/detach"), post(units_detach))
        .route(&format!("{building}/units/{{unit}}/statement"), get(unit_report))
        // Owners
        .route(&format!("{building}/owners"), get(owners_index).post(owners_create))
        .route(
            &format!("{building}/owners/{{owner}}"),
            get(owners_show).put(owners_update).delete(owners_delete),
        )
        .route(&format!("{building}/owners/{{owner}}/statement"), get(owner_report))
        // Payments and payables
        .route(&format!("{building}/payments"), get(payments_index).post(payments_create))
        .route(
            &format!("{building}/payments/{{payment}}"),
            get(payments_show).put(payments_update).delete(payments_delete),
        )
        .route(&format!("{building}/payables"), get(payables_index).post(payables_create))
        .route(
            &format!("{building}/payables/{{payable}}"),
            get(payables_show).put(payables_update).delete(payables_delete),
        )
        // Staff
        .route(&format!("{building}/employees"), get(employees_index).post(employees_create))
        .route(
            &format!("{building}/employees/{{employee}}"),
            get(employees_show).put(employees_update).delete(employees_delete),
        )
        .route(
            &format!("{building}/employees/{{employee}}/salary-history"),
            get(salary_history_index).post(salary_history_create),
        )
        .route(
            &format!("{building}/service-providers"),
            get(service_providers_index).post(service_providers_create),
        )
        .route(
            &format!("{building}/service-providers/{{provider}}"),
            get(service_providers_show)
                .put(service_providers_update)
                .delete(service_providers_delete),
        )
        // Reports and fees
        .route(&format!("{building}/financials"), get(building_report))
        .route(&format!("{building}/quarters"), get(quarters_index))
        .route(&format!("{building}/fees/preview"), get(fees_preview))
        .route(&format!("{building}/fees/recalculate"), post(fees_recalculate))
        // Global reference lists
        .route("/api/reference/{kind}", get(reference_index).post(reference_create))
        .route(
            "/api/reference/{kind}/{id}",
            put(reference_update).delete(reference_delete),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::require_session,
        ));

    Router::new()
        .route("/login", post(login))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
