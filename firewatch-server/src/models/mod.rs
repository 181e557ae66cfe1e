mod alert;
mod captured_image;
mod daily_statistics;
mod detection;
mod device_status;
mod system_config;
mod system_log;

pub use alert::{Alert, AlertStatus, AlertTable, Severity};
pub use captured_image::{CaptureTrigger, CapturedImage, CapturedImageTable};
pub use daily_statistics::{DailyStatistics, DailyStatisticsTable};
pub use detection::{Detection, DetectionTable};
pub use device_status::{DeviceStatus, DeviceStatusTable};
pub use system_config::{ConfigValue, SystemConfig, SystemConfigTable};
pub use system_log::{Component, LogLevel, SystemLog, SystemLogTable};

pub trait Table {
    /// The name of the table
    fn name(&self) -> &'static str;

    /// The SQL statement to create the table
    fn create(&self) -> String;

    /// The SQL statement to dispose the table
    fn dispose(&self) -> String;

    /// The dependencies of the table
    fn dependencies(&self) -> Vec<&'static str>;
}
