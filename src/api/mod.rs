/// Injected time source: [Clock](clock::Clock), [SimulatedClock](clock::SimulatedClock).
pub mod clock;

/// Downlink measurements: [LinkStatistics](link_stats::LinkStatistics) and the raw transport counters.
pub mod link_stats;

/// The remote stream catalog and receive sets.
pub mod stream_index;

/// Some unit types, such as [DataRate](units::DataRate) and [Timestamp](units::Timestamp).
pub mod units;
