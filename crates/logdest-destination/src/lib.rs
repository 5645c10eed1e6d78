pub mod dest_trait;
pub mod elastic;
pub mod host;
pub mod http_dest;
pub mod lifecycle;
pub mod null_dest;
pub mod registry;
mod transport;

pub use dest_trait::Destination;
pub use elastic::ElasticSearchDestination;
pub use host::{DeliveryStats, DestinationHost, HostSettings};
pub use http_dest::HttpDestination;
pub use lifecycle::Lifecycle;
pub use null_dest::NullDestination;
pub use registry::{DestinationFactory, DestinationRegistry};
