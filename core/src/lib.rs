pub mod catalog;
pub mod db;
pub mod energy;
pub mod error;
pub mod history;
pub mod ledger;
pub mod models;
pub mod profiles;
pub mod report;
pub mod service;
pub mod store;
pub mod target;
