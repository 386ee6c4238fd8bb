use crate::{
    api::{attendance, budget, employee, kiosk, payroll, pin, vacation},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Per-route-group limiter keyed by peer IP
fn build_limiter(requests_per_min: u32) -> Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let requests_per_min = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond((60_000 / requests_per_min as u64).max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("quota is non-zero");
    Arc::new(Governor::new(&cfg))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = build_limiter(config.rate_login_per_min);
    let refresh_limiter = build_limiter(config.rate_refresh_per_min);
    let kiosk_limiter = build_limiter(config.rate_kiosk_per_min);
    let protected_limiter = build_limiter(config.rate_protected_per_min);

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter)
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter)
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Kiosk devices poll more often than people, so they get their own quota
    cfg.service(
        web::scope(&format!("{}/kiosk", config.api_prefix))
            .wrap(from_fn(auth_middleware))
            .wrap(kiosk_limiter)
            .configure(kiosk_routes),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .configure(api_routes),
    );
}

/// Kiosk flow, mounted under `{prefix}/kiosk`.
pub fn kiosk_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/employees").route(web::get().to(kiosk::search_employees)))
        .service(web::resource("/sessions").route(web::post().to(kiosk::open_session)))
        .service(
            web::resource("/sessions/{id}")
                .route(web::get().to(kiosk::get_session))
                .route(web::delete().to(kiosk::close_session)),
        )
        .service(
            web::resource("/sessions/{id}/employee").route(web::post().to(kiosk::select_employee)),
        )
        .service(web::resource("/sessions/{id}/pin").route(web::post().to(kiosk::enter_pin)))
        .service(web::resource("/sessions/{id}/capture").route(web::post().to(kiosk::capture)));
}

/// Everything else behind the bearer token, mounted under the API prefix.
pub fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/users").route(web::post().to(handlers::register)))
        .service(
            web::scope("/employee")
                // /employee
                .service(
                    web::resource("")
                        .route(web::post().to(employee::create_employee))
                        .route(web::get().to(employee::list_employees)),
                )
                // /employee/branch before /employee/{id}
                .service(web::resource("/branch").route(web::put().to(employee::reassign_branch)))
                // /employee/{id}
                .service(
                    web::resource("/{id}")
                        .route(web::put().to(employee::update_employee))
                        .route(web::get().to(employee::get_employee))
                        .route(web::delete().to(employee::delete_employee)),
                ),
        )
        .service(
            web::scope("/attendance")
                .service(web::resource("/events").route(web::post().to(attendance::clock)))
                .service(web::resource("/report").route(web::get().to(attendance::report)))
                .service(web::resource("/pending").route(web::get().to(attendance::pending)))
                .service(web::resource("/{id}/approve").route(web::put().to(attendance::approve)))
                .service(web::resource("/{id}/reject").route(web::put().to(attendance::reject))),
        )
        .service(
            web::scope("/pin")
                .service(web::resource("/{employee_id}").route(web::put().to(pin::reset_pin)))
                .service(
                    web::resource("/{employee_id}/unlock").route(web::put().to(pin::unlock_pin)),
                ),
        )
        .service(
            web::scope("/payroll")
                .service(
                    web::resource("/liquidations").route(web::post().to(payroll::run_liquidation)),
                )
                .service(web::resource("/receipts").route(web::get().to(payroll::list_receipts)))
                .service(
                    web::resource("/receipts/{id}").route(web::get().to(payroll::get_receipt)),
                ),
        )
        .service(
            web::scope("/vacation")
                .service(
                    web::resource("")
                        .route(web::get().to(vacation::vacation_list))
                        .route(web::post().to(vacation::create_vacation)),
                )
                .service(web::resource("/balance").route(web::get().to(vacation::vacation_balance)))
                .service(web::resource("/{id}").route(web::get().to(vacation::get_vacation)))
                .service(
                    web::resource("/{id}/approve").route(web::put().to(vacation::approve_vacation)),
                )
                .service(
                    web::resource("/{id}/reject").route(web::put().to(vacation::reject_vacation)),
                ),
        )
        .service(
            web::scope("/budget").service(
                web::resource("/{period}")
                    .route(web::get().to(budget::budget_summary))
                    .route(web::put().to(budget::allocate_budget)),
            ),
        );
}

// LOGIN
//  ├─ access_token (ACCESS_TOKEN_TTL)
//  └─ refresh_token (REFRESH_TOKEN_TTL), single use

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns a new token pair
