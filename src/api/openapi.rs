//! OpenAPI documentation

use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, holds, ledger, loans, patrons};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Circulation API",
        version = "1.0.0",
        description = "Single-branch library circulation and reservation REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Patrons
        patrons::get_patron_policy,
        // Loans
        loans::get_patron_loans,
        loans::checkout,
        loans::return_loan,
        loans::return_by_copy,
        loans::renew_loan,
        // Holds
        holds::place_hold,
        holds::cancel_hold,
        holds::get_work_queue,
        // Ledger
        ledger::list_patron_ledger,
        ledger::record_payment,
        ledger::waive_entry,
    ),
    components(
        schemas(
            // Models
            crate::models::patron::BorrowingPolicy,
            crate::models::copy::Work,
            crate::models::copy::Copy,
            crate::models::loan::Loan,
            crate::models::hold::Hold,
            crate::models::ledger::LedgerEntry,
            crate::models::enums::CopyStatus,
            crate::models::enums::HoldStatus,
            crate::models::enums::LedgerEntryKind,
            crate::models::enums::LedgerEntryStatus,
            crate::models::actor::ActorRole,
            // Loans
            loans::CheckoutRequest,
            loans::LoanResponse,
            loans::ReturnResponse,
            // Holds
            holds::PlaceHoldRequest,
            // Ledger
            ledger::PaymentRequest,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "patrons", description = "Patron borrowing policy"),
        (name = "loans", description = "Checkout, return and renewal"),
        (name = "holds", description = "Hold queue management"),
        (name = "ledger", description = "Fines and payments")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
