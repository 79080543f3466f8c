pub mod config;
pub mod cycle;
pub mod delay;
pub mod fetch;
pub mod headway;
pub mod liveness;
pub mod metrics;
pub mod output;
pub mod parser;
pub mod routes;
pub mod scheduler;
pub mod stats;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}

#[cfg(test)]
pub(crate) mod testing;
