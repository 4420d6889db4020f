pub mod config;
pub mod db;
pub mod logger;

pub use config::load_app_config;
pub use logger::init_logger;
