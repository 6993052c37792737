mod config;
mod registry;
mod service;
mod stream;
