//! Library crate for higawari-bot, exposing its modules to the binary.

pub mod chat;
pub mod config;
pub mod dao;
mod dto;
pub mod error;
pub mod i18n;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(test)]
mod testing;
