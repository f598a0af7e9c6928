pub mod analytics;
pub mod cache;
pub mod db;
pub mod domain;
pub mod error;
pub mod goals;
pub mod history;
pub mod ledger;
pub mod reads;
pub mod session;
pub mod throttle;
