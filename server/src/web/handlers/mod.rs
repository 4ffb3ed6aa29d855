// mapofus-server/src/web/handlers/mod.rs

pub mod admin;
pub mod health;
pub mod maps;
pub mod share;
pub mod webhook;
