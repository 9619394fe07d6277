pub mod controller;
pub mod format;
pub mod manual;
pub mod provider;
pub mod simulated;
pub mod snapshot;
pub mod source;
pub mod types;

pub use controller::MotionController;
pub use format::{format_vector, FormatStyle};
pub use manual::ManualProvider;
pub use provider::{MotionProvider, SampleHandler, SubscriptionHandle};
pub use simulated::SimulatedMotionProvider;
pub use snapshot::{Snapshot, SnapshotCell};
pub use source::{RawAxis, SourceConfig, SourceStatus, StreamSource};
pub use types::{Availability, Channel, Feed, FeedSample, MotionSample, Sample, Vector3};
