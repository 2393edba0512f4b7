// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! `objlink` — a transparent object-graph RPC runtime.
//!
//! Two peers on a reliable bidirectional message channel expose ordinary
//! in-process objects — classes, instances, functions, getters, setters and
//! async iterators — so each peer can work the other's objects as if they
//! were local, under one uniform async call discipline.
//!
//! The first time a class crosses the wire its shape is described once;
//! after that, instances travel as an id plus their field bag. Identity is
//! preserved both ways by a bidirectional registry, and dropping the last
//! handle to a stub eventually releases the underlying object on its owner.
//!
//! # Architecture
//!
//! ```text
//!  Value ──► marshal ──► WireValue ──► Transport ─ ─ ─ ─► peer dispatch
//!    ▲           │                        ▲                    │
//!    │      ObjectRegistry            objlink-pipe         registry / mirror
//!    │           │                    (or your binding)        │
//!  Stub ◄── unmarshal ◄── WireValue ◄── Transport ◄─ ─ ─  marshaled reply
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use objlink::{ClassDef, Record, Session, Value};
//!
//! # async fn example(transport_a: Arc<dyn objlink::Transport>,
//! #                  transport_b: Arc<dyn objlink::Transport>) -> objlink::Result<()> {
//! // Peer A: expose a Car with a getter/setter pair.
//! let car_class = ClassDef::builder("Car")
//!     .getter_setter(
//!         "owner",
//!         |obj| Ok(obj.field("_owner").unwrap_or(Value::Null)),
//!         |obj, v| {
//!             obj.set_field("_owner", v);
//!             Ok(())
//!         },
//!     )
//!     .build();
//! let seed = car_class.instance(Record::from([("_owner".to_string(), Value::from("Fred"))]));
//! let _server = Session::start(transport_a, seed);
//!
//! // Peer B: fetch the seed and drive it.
//! let client = Session::start(transport_b, Value::Null);
//! let car = client.remote_start().await?;
//! let car = car.as_stub().expect("classed objects arrive as stubs");
//! assert_eq!(car.get("owner").await?, Value::from("Fred"));
//! car.set("owner", Value::from("Wilma")).await?;
//! # Ok(())
//! # }
//! ```

pub mod class;
pub mod error;
mod gc;
mod marshal;
mod mirror;
pub mod object;
mod registry;
pub mod session;
pub mod stub;
pub mod transport;
pub mod value;

pub use class::{ClassBuilder, ClassDef};
pub use error::{Result, RpcError};
pub use object::{LocalFunction, LocalObject};
pub use session::Session;
pub use stub::{Stub, ValueStream};
pub use transport::{Payload, Transport, VerbHandler};
pub use value::{Record, Value};

// The wire vocabulary is part of the public surface: transports and tests
// speak it directly.
pub use objlink_wire as wire;
pub use objlink_wire::{IteratorKind, ObjectId, Verb};
