mod commands;
mod error;
mod logger;
