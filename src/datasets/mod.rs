mod archive;
mod remote;
mod validate;
mod workflow;

pub use archive::{archive_dataset, archive_path, extract_archive};
pub use remote::{EditHandle, EditService, HttpEditService};
pub use validate::{eligible_datasets, validate_dataset, DatasetCheck, InvalidDataset};
pub use workflow::{DatasetRoundTrip, EditOperator, RoundTripReport, RoundTripState};
