use dotenv::dotenv;
use rocket::data::{Limits, ToByteUnit};
use rocket::fairing::AdHoc;
use rocket_okapi::openapi_get_routes;
use rocket_okapi::swagger_ui::*;
use std::sync::Arc;

use train_booking_system::db::Database;
use train_booking_system::routes;
use train_booking_system::services::booking_service::BookingService;
use train_booking_system::services::gateway_service::OrderGatewayClient;
use train_booking_system::services::renderer_service::FileTicketRenderer;
use train_booking_system::store::mysql::MySqlBookingStore;
use train_booking_system::store::BookingStore;
use train_booking_system::swagger::swagger_ui;
use train_booking_system::utils::config::AppConfig;

#[rocket::launch]
async fn rocket() -> _ {
    dotenv().ok();

    // A missing payment secret must fail here, not degrade into
    // accepting every confirmation.
    let config = AppConfig::from_env().expect("invalid configuration");

    let database = Database::new(&config.database_url)
        .await
        .expect("Failed to connect to database");
    Database::ensure_schema(database.get_pool())
        .await
        .expect("Failed to initialize schema");

    let store: Arc<dyn BookingStore> = Arc::new(MySqlBookingStore::new(database.pool.clone()));
    let renderer = Arc::new(FileTicketRenderer::new(config.ticket_output_dir.clone()));
    let booking_service = BookingService::new(store, renderer, &config);
    let gateway = OrderGatewayClient::new(config.gateway.clone());

    // Webhook bodies arrive as raw strings and can exceed Rocket's
    // 8 KiB string default.
    let figment = rocket::Config::figment()
        .merge(("limits", Limits::default().limit("string", 1.mebibytes())));

    rocket::custom(figment)
        .manage(config)
        .manage(booking_service)
        .manage(gateway)
        .mount(
            "/api",
            openapi_get_routes![
                routes::payment_route::create_order,
                routes::payment_route::verify_payment,
                routes::payment_route::payment_status,
                routes::booking_route::booking_history,
                routes::booking_route::get_booking,
                routes::fare_route::quote_fare,
            ],
        )
        .mount(
            "/api",
            rocket::routes![routes::payment_route::gateway_webhook],
        )
        .mount("/swagger", make_swagger_ui(&swagger_ui()))
        .attach(AdHoc::on_response("CORS", |_, res| {
            Box::pin(async move {
                res.set_header(rocket::http::Header::new(
                    "Access-Control-Allow-Origin",
                    "*",
                ));
            })
        }))
}
