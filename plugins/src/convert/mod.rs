pub mod extract;
pub mod http;

pub use extract::extract_json_from_string;
pub use http::HttpConverter;
