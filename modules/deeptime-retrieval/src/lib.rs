pub mod catalog;
pub mod error;
pub mod fixtures;
pub mod normalizer;
pub mod planner;
pub mod registry;
pub mod resolver;
pub mod retriever;
pub mod services;
pub mod throttle;

pub use catalog::{default_catalog, default_registry, load_catalog, parse_catalog};
pub use error::{ProviderFailure, ProviderStatus};
pub use normalizer::{normalize, NormalizedBatch, RawResponse};
pub use planner::{plan, CallParams, Plan, PlannedCall};
pub use registry::{RegistryHandle, SourceRegistry};
pub use resolver::{ArchiveLookup, LinkResolver, ResolvedLink, ThrottledArchive};
pub use retriever::{ProviderReport, Retriever, RetrieverOptions, SearchOutcome};
pub use services::{CallContext, ProviderAdapter};
pub use throttle::{RetryPolicy, Throttle};
