//! In-memory reactive state container with locked write windows and batched
//! watcher notification.
//!
//! `reactive-store` holds a tree of named root containers (keyed collections
//! and plain records), enforces single-writer mutation discipline through an
//! explicit read/write gate, records fine-grained change events during each
//! write window, and notifies subscribers in batch when the window closes.
//! Server-produced delta lists ("state updates") apply as an alternative
//! mutation path inside a single window.
//!
//! # Core Concepts
//!
//! - **StateTree**: named roots, each a keyed collection or a plain record
//! - **Bracket**: a read-only → mutable → read-only cycle; mutations happen
//!   inside, one notification batch follows
//! - **Mutation**: a named two-phase handler, the sole sanctioned way to
//!   change state
//! - **Watcher**: a (pattern, handler) pair a subscriber registers to
//!   receive batched change notifications
//! - **State update**: an ordered add/update/delete/put list applied as one
//!   bracket
//!
//! # Quick Start
//!
//! ```
//! use reactive_store::{Pattern, Reactive, StateUpdate, Subscriber, UpdateAction};
//! use serde_json::json;
//!
//! let mut reactive = Reactive::new("city");
//! reactive.set_initial_state(json!({
//!     "people": [{"id": 1, "name": "Carlos", "bitten": false}],
//! }))?;
//!
//! // A subscriber redraws rows when people change.
//! reactive.subscribe(
//!     "person-list",
//!     Subscriber::new()
//!         .on_ready(|_state| { /* initial render */ })
//!         .watch(Pattern::scope("people"), |notification| {
//!             let _row = notification.element;
//!         }),
//! );
//!
//! // A remote round trip answered with a state update list.
//! reactive.process_updates(&[StateUpdate::new(
//!     "people",
//!     UpdateAction::Update,
//!     json!({"id": 1, "bitten": true}),
//! )])?;
//!
//! assert_eq!(reactive.get("people", 1)?["bitten"], json!(true));
//! # Ok::<(), reactive_store::StoreError>(())
//! ```
//!
//! # Dispatching mutations
//!
//! Components never touch the tree directly; they dispatch named mutations:
//!
//! ```
//! use reactive_store::{Id, Reactive};
//! use serde_json::json;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let mut reactive = Reactive::new("city");
//! reactive.set_initial_state(json!({
//!     "people": [{"id": 2, "name": "Amaia", "bitten": false}],
//! }))?;
//!
//! reactive.register_mutation_fn("bite", |store, args| {
//!     let id = Id::from_value(&args[0]).expect("person id");
//!     store.set_read_only(false);
//!     let result = store.set_attribute("people", &id, "bitten", json!(true));
//!     store.set_read_only(true);
//!     result
//! });
//!
//! reactive.dispatch("bite", &[json!(2)]).await?;
//! assert_eq!(reactive.get("people", 2)?["bitten"], json!(true));
//! # Ok::<(), reactive_store::StoreError>(())
//! # }).unwrap();
//! ```

mod container;
mod error;
mod event;
mod id;
mod mutation;
mod pattern;
mod reactive;
mod store;
mod tracker;
mod update;
mod watcher;

pub use container::{Container, KeyedCollection, PlainRecord, StateTree};
pub use error::{value_type_name, StoreError, StoreResult};
pub use event::{ChangeEvent, EventKind};
pub use id::Id;
pub use mutation::{Mutation, MutationRegistry};
pub use pattern::Pattern;
pub use reactive::Reactive;
pub use store::StateStore;
pub use tracker::ChangeTracker;
pub use update::{apply_updates, StateUpdate, UpdateAction};
pub use watcher::{Notification, Subscriber, Watcher, WatcherRegistry};

// Re-export serde_json::Value for convenience
pub use serde_json::Value;
