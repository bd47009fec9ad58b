//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `sensor_stream` - TCP client for the measurement service event stream
//! - `submit` - One-shot submission of finalized results (HTTP)
//! - `session_store` - Identity token handoff and result snapshot file

pub mod sensor_stream;
pub mod session_store;
pub mod submit;

// Re-export commonly used types
pub use sensor_stream::SensorStreamClient;
pub use session_store::SessionStore;
pub use submit::ResultSubmitter;
