mod error;
mod logger;
mod services;
