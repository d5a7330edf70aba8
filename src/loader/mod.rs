pub mod url_loader;

pub use url_loader::{LoadStats, UrlEntry, UrlList, UrlLoader};
