//! Session Module
//!
//! Interactive clients connected through named pipes.
//!
//! ## Architecture
//! ```text
//!  registration FIFO ──► Registrar ──► RegistrationQueue (K slots) ──► SessionWorkerPool
//!                        (1 thread)    free/filled semaphores           (K workers)
//!                                      + read-index mutex                    │
//!                                                                            ▼
//!                                                       Session: HANDSHAKE → ACTIVE → CLOSED
//!                                                       request / response / notify FIFOs
//! ```
//!
//! A burst of handshakes beyond `K` blocks the registrar, which stops
//! draining the registration FIFO: backpressure, never dropped requests.

mod channel;
mod pool;
mod queue;
mod registrar;
#[allow(clippy::module_inception)]
mod session;
mod sink;

pub use channel::{create_fifo, open_reader, open_registration, open_writer, remove_fifo};
pub use pool::SessionWorkerPool;
pub use queue::RegistrationQueue;
pub use registrar::Registrar;
pub use session::{Session, SessionState};
pub use sink::ChannelSink;
