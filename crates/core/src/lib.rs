pub mod acquisition;
pub mod archive;
pub mod config;
pub mod dispatcher;
pub mod indexer;
pub mod piqe;
pub mod processor;
pub mod sampler;
pub mod selector;
pub mod store;
pub mod testing;

pub use archive::{ArchiveClient, ArchiveError, Instance, ScanKey, ScanListing, TagValue};
pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use dispatcher::{
    Connector, DispatchError, Dispatcher, DispatcherConfig, RunSummary, ScanResult,
};
pub use piqe::{PiqeError, PiqeOutput, PixelData};
pub use processor::{
    ProcessError, ProcessorConfig, QualityReport, ScanOutcome, ScanProcessor, SkipReason,
};
pub use sampler::{sample_size, SampleError, Sampler};
pub use store::{ScanFilter, ScanRecord, ScanStore, SqliteScanStore, StoreError};
