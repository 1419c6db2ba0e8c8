//! Shared data model for the workflow core.

mod device;
mod operation;
mod subject;

pub use device::Device;
pub use operation::{Credentials, OperationResult};
pub use subject::{attr, CustomerSummary, ExistingRecord, Subject, SubjectOrigin};
