mod catalog;
mod download;
mod metadata;
mod placement;
mod reference;
mod service;

pub use catalog::{
    CatalogFile, CatalogModel, CatalogVersion, CivitaiCatalog, ModelCatalog, ModelMetadata,
    ModelType,
};
pub use download::{
    build_client, download_to_file, HttpFetcher, ModelFetcher, TransferProgress,
};
pub use metadata::{checksum_matches, compute_sha256};
pub use placement::{is_plain_name, place, route, Destination, Route, WorkspaceLayout};
pub use reference::{DownloadJob, ModelReference, ReferenceError};
pub use service::{
    AcquireError, AcquisitionObserver, AcquisitionPipeline, AcquisitionReport, ItemOutcome,
};
