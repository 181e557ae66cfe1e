use time::{Date, Duration, OffsetDateTime};

mod alert;
mod captured_image;
mod detection;
mod device_status;
mod statistics;
mod system_config;
mod system_log;

pub use alert::AlertRepository;
pub use captured_image::CapturedImageRepository;
pub use detection::DetectionRepository;
pub use device_status::DeviceStatusRepository;
pub use statistics::StatisticsRepository;
pub use system_config::SystemConfigRepository;
pub use system_log::SystemLogRepository;

/// UTC start of `date` and of the following day.
pub(crate) fn day_bounds(date: Date) -> (OffsetDateTime, OffsetDateTime) {
    let start = date.midnight().assume_utc();
    (start, start + Duration::days(1))
}
