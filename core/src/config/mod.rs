pub mod load;
pub mod types;

pub use load::{apply_env_overrides, get_docflow_home_dir, load_default, load_from_path};
pub use types::{
    AppConfig, ConverterConfig, EventsOutConfig, GraphConfig, ListenConfig, LoggingConfig,
    NotifyConfig, PipelineConfig, SourceConfig,
};
