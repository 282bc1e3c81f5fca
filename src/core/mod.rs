// Core modules implementing the event model, validation passes, and error modeling.
pub mod decode;
pub mod error;
pub mod event;
pub mod presence;
pub mod schema;
