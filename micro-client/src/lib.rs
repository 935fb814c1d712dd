mod backend;
pub use backend::Backend;

pub mod composite;

mod config;
pub use config::Config;

mod fuzz;

pub mod reconcile;
pub mod repo;

pub mod subscription;
pub use subscription::{Slot, Subscriptions};

pub mod view;

pub mod api {
    pub use micro_api::*;
}
