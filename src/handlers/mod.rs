pub mod common;
pub mod dashboard;
pub mod locations;
pub mod products;
pub mod purchase_orders;
pub mod purchases;
pub mod suppliers;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;
