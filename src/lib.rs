mod downlink_policy;
mod link_stats_sampler;
mod policy_config;
mod rate_probe_controller;
mod stream_selector;
mod target_rate_estimator;

pub use downlink_policy::*;
pub use link_stats_sampler::*;
pub use policy_config::*;
pub use rate_probe_controller::*;
pub use stream_selector::*;
pub use target_rate_estimator::*;

pub mod api;
