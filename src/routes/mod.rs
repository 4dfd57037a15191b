use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers::{admin, bookings, driver, rooms, trips};
use crate::middleware::auth::{auth_middleware, require_admin, require_driver, require_staff};
use crate::middleware::role_rate_limit::{create_role_governor, RateLimitedRole};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let staff_governor = create_role_governor(RateLimitedRole::Staff);
    let driver_governor = create_role_governor(RateLimitedRole::Driver);

    // Front desk routes (requires auth + staff or admin role)
    let staff_routes = Router::new()
        // Rooms
        .route("/rooms", get(rooms::list_rooms))
        .route("/rooms/{id}", get(rooms::get_room))
        .route("/rooms/{id}/clean-status", put(rooms::set_clean_status))
        .route("/rooms/{id}/refresh", post(rooms::refresh_room))
        // Bookings
        .route("/bookings", get(bookings::list_bookings))
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/{id}", get(bookings::get_booking))
        .route("/bookings/{id}", put(bookings::update_booking))
        .route("/bookings/{id}/status", put(bookings::change_status))
        .route("/bookings/{id}/cancel", post(bookings::cancel_booking))
        .route("/bookings/{id}/payments", post(bookings::record_payment))
        .route("/bookings/{id}/transactions", get(bookings::list_transactions))
        .route("/payments/intents", post(bookings::create_payment_intent))
        // Trips
        .route("/trips", get(trips::list_trips))
        .route("/trips", post(trips::request_trip))
        .route("/trips/{id}", get(trips::get_trip))
        .route("/trips/{id}/assign", put(trips::assign_trip))
        .route("/trips/{id}/cancel", post(trips::cancel_trip))
        .layer(staff_governor)
        .layer(middleware::from_fn(require_staff))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Admin routes (requires auth + admin role)
    let admin_routes = Router::new()
        // Inventory
        .route("/rooms", post(rooms::create_room))
        .route("/rooms/{id}/maintenance", put(rooms::set_maintenance))
        .route("/rooms/refresh", post(rooms::refresh_all_rooms))
        .route("/bookings/{id}", delete(bookings::delete_booking))
        // User management
        .route("/users", get(admin::list_all_users))
        .route("/users", post(admin::create_user))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/users/{id}/role", put(admin::update_user_role))
        // Fleet
        .route("/cabs", get(admin::list_cabs))
        .route("/cabs", post(admin::create_cab))
        .route("/drivers", get(admin::list_drivers))
        .route("/drivers", post(admin::register_driver))
        .route("/drivers/{id}/status", put(admin::set_driver_status))
        .route("/drivers/{id}/cab", put(admin::assign_driver_cab))
        .route("/trips/sweep", post(trips::run_dispatch_sweep))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Driver routes (requires auth + driver role)
    let driver_routes = Router::new()
        .route("/trips", get(driver::my_trips))
        .route("/trips/{id}/advance", post(driver::advance_trip))
        .route("/events", get(driver::events))
        .layer(driver_governor)
        .layer(middleware::from_fn(require_driver))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", staff_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/driver", driver_routes)
        .with_state(state)
}
