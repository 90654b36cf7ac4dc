//! `airhive-sensorql`: GraphQL read path over the AirHive sensor database.
//!
//! Given a location set and a days-back offset, the service answers with a
//! GeoJSON-like feature collection that merges sensor coordinates, live
//! readings and forecasts.
//!
//! Request flow, leaf modules first:
//! - `location` resolves the `loc` parameter into data-source suffixes
//! - `window` turns sensor counts and the days-back offset into row windows
//! - `resolver` fetches and merges the three sources per location
//! - `graphql` builds the schema whose fields delegate to `resolver`
//! - `executor` validates request parameters and runs the document
//! - `routes` exposes it all over HTTP
//!
//! The binary (`main.rs`) only wires configuration, logging, the database
//! pool and the HTTP server around this library (EMBP: each module exposes
//! its surface through this gateway).

pub mod config;
pub mod error;
pub mod executor;
pub mod graphql;
pub mod location;
pub mod models;
pub mod resolver;
pub mod routes;
pub mod store;
pub mod window;

pub use config::Config;
pub use error::{QueryError, StoreError};
pub use executor::{QueryRequest, DEFAULT_QUERY};
pub use graphql::build_schema;
pub use models::{Feature, Geometry, ResultEnvelope, SensorReading};
pub use resolver::{MergePolicy, QueryContext};
pub use store::{MemoryStore, MySqlSensorStore, SensorStore};
