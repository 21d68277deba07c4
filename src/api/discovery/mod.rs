mod resolver;

pub use resolver::{
    CapabilityResolver, DiscoveredService, DiscoveryApi, HttpDiscoveryClient, ResolvedCapability,
};

#[cfg(test)]
pub(crate) use resolver::tests as fakes;
