//! # Repository Module
//!
//! Database repository implementations for Caixa.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  Ledger modules expose free fns over a generic executor:                │
//! │                                                                         │
//! │  insert / fetch / claim_open / list_*                                   │
//! │  └── run on the pool for reads, or on &mut *tx inside one SQLite        │
//! │      transaction when CashRegister sequences a mutation                 │
//! │                                                                         │
//! │  The catalog keeps a pool-holding ProductRepository.                    │
//! │                                                                         │
//! │  SQL stays in this module; the register service only sequences it.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`register`] - Register sessions and the open-register claim
//! - [`entry`] - Append-only ledger entries
//! - [`sale`] - Sales and sale items
//! - [`ProductRepository`](product::ProductRepository) - Catalog reads

pub mod entry;
pub mod product;
pub mod register;
pub mod sale;
