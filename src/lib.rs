//! CAPI 2.0 protocol engine: registration and capability discovery, listen
//! management, message encoding/decoding and a receive dispatcher that routes
//! inbound messages to per-connection handlers.
//!
//! The engine is transport-agnostic: a [`CapiDriver`] implementation supplies
//! the message exchange (kernel CAPI device, remote CAPI, a test double), and
//! the embedding application receives call events through
//! [`ApplicationInterface`] and [`ConnectionHandler`].

pub mod application;
pub mod config;
pub mod connection;
pub mod driver;
pub mod engine;
pub mod error;
pub mod info;
pub mod profile;
pub mod registry;
pub mod wire;

pub use application::{ApplicationInterface, CallOffer};
pub use config::EngineConfig;
pub use connection::ConnectionHandler;
pub use driver::CapiDriver;
pub use engine::{BProtocol, Capi, ServiceKind};
pub use error::Error;
pub use info::describe_param_info;
pub use profile::{CapiProfile, ControllerProfile};
pub use registry::SharedHandler;
