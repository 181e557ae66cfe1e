use std::path::PathBuf;
use std::{env, io};

pub mod schema;
pub mod settings;
pub mod storage;

pub use schema::SchemaManager;
pub use settings::{
    Database, Gateway, GatewayAuth, GatewayTopic, Images, Logger, Notifier, Settings, Statistics,
};
pub use storage::Storage;

pub(crate) fn normalize_path(path: &str) -> io::Result<PathBuf> {
    let path_buf = PathBuf::from(path);

    Ok(if path_buf.is_absolute() {
        path_buf
    } else {
        env::current_dir()?.join(path_buf)
    })
}
