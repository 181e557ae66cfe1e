pub mod gateway;
pub mod image;
pub mod notify;
pub mod transfer;

pub use gateway::GatewayError;
pub use image::ImageError;
pub use notify::NotifyError;
pub use transfer::TransferError;
