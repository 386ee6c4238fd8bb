//! Wiring shared by handler tests: in-memory repositories behind the same
//! `web::Data<dyn Trait>` seams the server uses, without rate limiting.

use crate::auth::middleware::auth_middleware;
use crate::config::{Config, test_config};
use crate::repo::memory::{MemoryStore, employee};
use crate::repo::{AttendanceRepo, EmployeeDirectory, PayrollRepo, PinRepo, VacationRepo};
use crate::routes;
use crate::service::kiosk::KioskSessions;
use crate::service::photo::PhotoStore;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::middleware::from_fn;
use actix_web::{App, Error, web};
use std::sync::Arc;
use std::time::Duration;

pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub config: Config,
    pub sessions: KioskSessions,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::with_employees(vec![
                employee(1, "Lucia", "Gomez", 100_000.0),
                employee(2, "Martin", "Perez", 80_000.0),
            ])),
            config: test_config(),
            sessions: KioskSessions::new(Duration::from_secs(60)),
        }
    }

    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody + use<>>,
            Error = Error,
            InitError = (),
        > + use<>,
    > {
        let attendance: Arc<dyn AttendanceRepo> = self.store.clone();
        let pins: Arc<dyn PinRepo> = self.store.clone();
        let payroll: Arc<dyn PayrollRepo> = self.store.clone();
        let directory: Arc<dyn EmployeeDirectory> = self.store.clone();
        let vacations: Arc<dyn VacationRepo> = self.store.clone();
        let photos: Arc<dyn PhotoStore> = self.store.clone();

        App::new()
            .app_data(web::Data::new(self.config.clone()))
            .app_data(web::Data::from(attendance))
            .app_data(web::Data::from(pins))
            .app_data(web::Data::from(payroll))
            .app_data(web::Data::from(directory))
            .app_data(web::Data::from(vacations))
            .app_data(web::Data::from(photos))
            .app_data(web::Data::new(self.sessions.clone()))
            .service(
                web::scope("/api/kiosk")
                    .wrap(from_fn(auth_middleware))
                    .configure(routes::kiosk_routes),
            )
            .service(
                web::scope("/api")
                    .wrap(from_fn(auth_middleware))
                    .configure(routes::api_routes),
            )
    }
}
