//! Run configuration and batch instrumentation
//!
//! - [`spec`]: the JSON [`LinkPropSpec`] describing one run
//! - [`validation`]: rule-based checks collected into a report
//! - [`observer`]: hooks fired at batch and augmentation-round boundaries

pub mod error_code;
pub mod errors;
pub mod observer;
pub mod spec;
pub mod validation;

pub use error_code::ErrorCode;
pub use errors::PipelineSpecError;
pub use observer::{BatchObserver, BatchReport, NoopObserver, TracingObserver};
pub use spec::LinkPropSpec;
pub use validation::{ValidationEngine, ValidationReport};
