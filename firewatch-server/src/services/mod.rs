mod alert_tracker;
mod capture;
mod event_router;
mod image_store;
mod journal;
mod mqtt_service;
mod notifier;
mod reassembler;
mod statistics_service;

pub use alert_tracker::*;
pub use capture::*;
pub use event_router::*;
pub use image_store::*;
pub use journal::*;
pub use mqtt_service::*;
pub use notifier::*;
pub use reassembler::*;
pub use statistics_service::*;
