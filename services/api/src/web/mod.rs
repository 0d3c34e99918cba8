pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;

// Re-export the handlers the binary wires into the router.
pub use middleware::require_auth;
pub use rest::{
    cancel_routine_handler, complete_routine_handler, get_active_routine_handler,
    reorder_sets_handler, start_routine_handler, update_set_handler,
};
