//! Model to entity mappers
//!
//! `From<Model> for Entity` for rows that always map cleanly, and
//! `TryFrom` where the stored value is re-validated (room names).

mod message;
mod presence;
mod room;
mod user;
